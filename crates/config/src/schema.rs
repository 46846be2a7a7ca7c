//! Config schema types (server, auth, stream, login codes).
use std::collections::HashMap;

use {
    secrecy::{ExposeSecret, SecretString},
    serde::{Deserialize, Serialize, Serializer},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LansiteConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub stream: StreamConfig,
    /// Login codes: `CODE = "display name"`.
    pub codes: HashMap<String, String>,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Public base URL used when building redirect/return URLs.
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
            url: "http://localhost".into(),
        }
    }
}

/// How people sign in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Sign in with codes handed out by the host instead of Steam.
    pub login_with_code: bool,
    /// For LANs without internet access. Skips the Steam key check.
    pub offline_mode: bool,
    /// Enables `/devlogin?username=`. Insecure.
    pub developer_mode: bool,
    /// The first identity to connect becomes an admin.
    pub auto_op_first_user: bool,
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub steam_api_key: Option<SecretString>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_with_code: false,
            offline_mode: false,
            developer_mode: false,
            auto_op_first_user: true,
            steam_api_key: None,
        }
    }
}

/// Behaviour of the main stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub private_messaging: bool,
    /// Route event creation by regular users through admin approval.
    pub require_admin_verification: bool,
    /// Only admins may create events at all.
    pub events_admin_only: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            private_messaging: true,
            require_admin_verification: true,
            events_admin_only: false,
        }
    }
}

fn serialize_option_secret<S: Serializer>(
    secret: &Option<SecretString>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: LansiteConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert!(cfg.auth.auto_op_first_user);
        assert!(cfg.stream.require_admin_verification);
        assert!(cfg.auth.steam_api_key.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: LansiteConfig = toml::from_str(
            r#"
            [auth]
            login_with_code = true

            [codes]
            ABCDE = "ann"
            "#,
        )
        .unwrap();
        assert!(cfg.auth.login_with_code);
        assert!(cfg.auth.auto_op_first_user);
        assert_eq!(cfg.codes.get("ABCDE").map(String::as_str), Some("ann"));
    }

    #[test]
    fn steam_key_is_redacted_in_debug() {
        let cfg: LansiteConfig =
            toml::from_str("[auth]\nsteam_api_key = \"0123456789abcdef0123456789abcdef\"").unwrap();
        assert!(!format!("{cfg:?}").contains("0123456789abcdef"));
        let round = toml::to_string(&cfg).unwrap();
        assert!(round.contains("0123456789abcdef0123456789abcdef"));
    }
}
