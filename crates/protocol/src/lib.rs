//! Wire protocol spoken between the gateway and browser clients.
//!
//! Every WebSocket message is a single JSON text frame. Clients send
//! [`ClientFrame`]s (`{"method": .., "params": ..}`), the gateway answers and
//! broadcasts [`ServerFrame`]s (`{"event": .., "payload": ..}`).

pub mod frames;

use serde::{Deserialize, Serialize};

pub use frames::{ClientFrame, ServerFrame};

pub const PROTOCOL_VERSION: u32 = 1;

/// Lifetime of the `id`/`secret` login cookies.
pub const CREDENTIAL_COOKIE_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

// ── Error shape ──────────────────────────────────────────────────────────────

pub mod error_codes {
    pub const AUTHENTICATION_FAILED: &str = "AUTHENTICATION_FAILED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CAPACITY_EXCEEDED: &str = "CAPACITY_EXCEEDED";
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
}

/// Error payload carried by the `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
}

impl ErrorShape {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

// ── Identity projection ──────────────────────────────────────────────────────

/// Profile data asserted by an external identity provider (e.g. Steam).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// The only representation of an identity that is ever sent to clients.
///
/// Never carries the reconnect secret or the provider-asserted profile; the
/// external id doubles as a sign-in key and stays server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub id: u64,
    pub display_name: String,
    pub privileged: bool,
    pub pm_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_identity_uses_camel_case() {
        let who = PublicIdentity {
            id: 3,
            display_name: "kacza".into(),
            privileged: true,
            pm_enabled: false,
        };
        let json = serde_json::to_value(&who).unwrap();
        assert_eq!(json["displayName"], "kacza");
        assert_eq!(json["pmEnabled"], false);
        assert!(json.get("external").is_none());
        assert!(json.get("secret").is_none());
    }
}
