use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";
/// Header the upstream proxy uses to forward the provider's user id.
pub const USER_ID_HEADER: &str = "x-auth-user-id";
/// Header the upstream proxy uses to forward the provider's username.
pub const USERNAME_HEADER: &str = "x-auth-username";

/// Top-level config (chousei.toml + CHOUSEI_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChouseiConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            auth: AuthConfig::default(),
        }
    }
}

/// How the gateway learns who is calling. The OAuth handshake itself lives
/// in front of us; we only consume its result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    /// Shared secret the proxy sends as `Authorization: Bearer <token>`.
    /// Only checked in `trusted-proxy` mode, and only when set.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Identity headers are accepted from a proxy that completed the
    /// provider login.
    #[default]
    TrustedProxy,
    /// Identity headers are trusted without a proxy token. Local use only.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// IANA zone used when formatting `updated_at` for listings.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl DisplayConfig {
    pub fn tz(&self) -> crate::error::Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            crate::error::ChouseiError::Config(format!(
                "invalid display timezone {}: {e}",
                self.timezone
            ))
        })
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.chousei/chousei.db", home)
}

impl ChouseiConfig {
    /// Load config from a TOML file with CHOUSEI_* env var overrides.
    ///
    /// Path precedence: explicit argument, then ~/.chousei/chousei.toml.
    /// A missing file is not an error; defaults fill every field.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ChouseiConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CHOUSEI_").split("_"))
            .extract()
            .map_err(|e| crate::error::ChouseiError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.chousei/chousei.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_usable() {
        let cfg = ChouseiConfig::default();
        assert_eq!(cfg.gateway.port, DEFAULT_PORT);
        assert_eq!(cfg.gateway.auth.mode, AuthMode::TrustedProxy);
        assert!(cfg.gateway.auth.token.is_none());
        assert_eq!(cfg.display.tz().unwrap(), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn toml_and_env_are_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "chousei.toml",
                r#"
                [gateway]
                bind = "0.0.0.0"

                [gateway.auth]
                mode = "none"

                [display]
                timezone = "UTC"
                "#,
            )?;
            jail.set_env("CHOUSEI_GATEWAY_PORT", "9100");

            let cfg = ChouseiConfig::load(Some("chousei.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.gateway.bind, "0.0.0.0");
            assert_eq!(cfg.gateway.port, 9100);
            assert_eq!(cfg.gateway.auth.mode, AuthMode::None);
            assert_eq!(cfg.display.tz().map_err(|e| e.to_string())?, chrono_tz::UTC);
            Ok(())
        });
    }

    #[test]
    fn unknown_timezone_is_a_config_error() {
        let display = DisplayConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
        };
        let err = display.tz().unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
