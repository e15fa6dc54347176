use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChouseiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl ChouseiError {
    /// Short error code string sent to clients in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ChouseiError::Config(_) => "CONFIG_ERROR",
            ChouseiError::AuthFailed(_) => "AUTH_FAILED",
            ChouseiError::NotFound { .. } => "NOT_FOUND",
            ChouseiError::PermissionDenied { .. } => "PERMISSION_DENIED",
            ChouseiError::BadRequest(_) => "BAD_REQUEST",
            ChouseiError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// True for the two conditions that must look identical to the caller:
    /// a missing schedule and one the actor may not touch.
    pub fn is_hidden_resource(&self) -> bool {
        matches!(
            self,
            ChouseiError::NotFound { .. } | ChouseiError::PermissionDenied { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ChouseiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_and_denied_are_hidden() {
        let hidden = [
            ChouseiError::NotFound { what: "schedule x".into() },
            ChouseiError::PermissionDenied { reason: "not owner".into() },
        ];
        for e in &hidden {
            assert!(e.is_hidden_resource(), "{}", e.code());
        }

        let visible = [
            ChouseiError::Config("bad tz".into()),
            ChouseiError::AuthFailed("no header".into()),
            ChouseiError::BadRequest("flag".into()),
            ChouseiError::Database("locked".into()),
        ];
        let codes: Vec<_> = visible.iter().map(ChouseiError::code).collect();
        assert_eq!(
            codes,
            vec!["CONFIG_ERROR", "AUTH_FAILED", "BAD_REQUEST", "DATABASE_ERROR"]
        );
        assert!(visible.iter().all(|e| !e.is_hidden_resource()));
    }
}
