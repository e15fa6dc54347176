//! Caller identity for HTTP handlers.
//!
//! The provider login happens in front of the gateway. A trusted proxy
//! forwards the result in `X-Auth-User-Id` / `X-Auth-Username`, optionally
//! together with `Authorization: Bearer <token>` proving the request really
//! came through it.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use chousei_core::{
    config::{AuthConfig, AuthMode, USERNAME_HEADER, USER_ID_HEADER},
    ChouseiError,
};
use chousei_users::User;
use tracing::debug;

use crate::{app::AppState, error::ApiError};

/// The authenticated caller. Extracting it records the login, so the user
/// row always exists before any schedule write references it.
#[derive(Debug, Clone)]
pub struct Viewer(pub User);

impl FromRequestParts<Arc<AppState>> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        check_auth(state, &parts.headers)?;
        let (user_id, username) = identity(&parts.headers)?;
        let user = state.users.upsert(&user_id, &username)?;
        debug!(user_id = %user.user_id, "viewer authenticated");
        Ok(Viewer(user))
    }
}

/// Proxy token check. `none` trusts the identity headers outright.
fn check_auth(state: &AppState, headers: &HeaderMap) -> Result<(), ChouseiError> {
    match state.config.gateway.auth.mode {
        AuthMode::None => Ok(()),
        AuthMode::TrustedProxy => {
            // No token configured: the proxy is trusted by network placement.
            let Some(expected) = state.config.gateway.auth.token.as_deref() else {
                return Ok(());
            };
            match extract_bearer(headers) {
                Some(token) if token == expected => Ok(()),
                Some(_) => Err(ChouseiError::AuthFailed("proxy token mismatch".into())),
                None => Err(ChouseiError::AuthFailed(
                    "missing Authorization: Bearer header".into(),
                )),
            }
        }
    }
}

/// Startup warning for configurations where anyone who can reach the port
/// can claim any identity.
pub fn unguarded_identity_warning(auth: &AuthConfig) -> Option<&'static str> {
    match (&auth.mode, &auth.token) {
        (AuthMode::TrustedProxy, None) => Some(
            "trusted-proxy auth has no token: identity headers are accepted from any \
             client that can reach this port; set gateway.auth.token",
        ),
        (AuthMode::None, _) => {
            Some("auth mode is none: identity headers are trusted as sent; local use only")
        }
        (AuthMode::TrustedProxy, Some(_)) => None,
    }
}

fn identity(headers: &HeaderMap) -> Result<(String, String), ChouseiError> {
    let user_id = header_str(headers, USER_ID_HEADER)
        .ok_or_else(|| ChouseiError::AuthFailed(format!("missing {USER_ID_HEADER} header")))?;
    let username = header_str(headers, USERNAME_HEADER)
        .ok_or_else(|| ChouseiError::AuthFailed(format!("missing {USERNAME_HEADER} header")))?;
    Ok((user_id.to_string(), username.to_string()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
