use {
    lansite_protocol::{ExternalProfile, PublicIdentity},
    rand::Rng,
    secrecy::{ExposeSecret, Secret, SecretString},
    subtle::ConstantTimeEq,
};

use crate::connection::Connection;

const SECRET_BYTES: usize = 20;

/// Generate a fresh reconnect secret (40 hex chars).
pub fn generate_secret() -> SecretString {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill(&mut bytes);
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    Secret::new(hex)
}

/// A participant known to a stream.
#[derive(Debug)]
pub struct Identity {
    pub id: u64,
    secret: SecretString,
    pub display_name: String,
    pub privileged: bool,
    pub pm_enabled: bool,
    pub external: Option<ExternalProfile>,
    connection: Option<Connection>,
}

impl Identity {
    pub fn new(
        id: u64,
        secret: SecretString,
        display_name: impl Into<String>,
        external: Option<ExternalProfile>,
        pm_enabled: bool,
    ) -> Self {
        Self {
            id,
            secret,
            display_name: display_name.into(),
            privileged: false,
            pm_enabled,
            external,
            connection: None,
        }
    }

    /// Projection safe to broadcast to other clients.
    pub fn public(&self) -> PublicIdentity {
        PublicIdentity {
            id: self.id,
            display_name: self.display_name.clone(),
            privileged: self.privileged,
            pm_enabled: self.pm_enabled,
        }
    }

    /// Constant-time check of a presented secret.
    pub fn verify(&self, secret: &str) -> bool {
        self.secret
            .expose_secret()
            .as_bytes()
            .ct_eq(secret.as_bytes())
            .into()
    }

    /// Secret for handing back to its owner at login. Never broadcast.
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub(crate) fn set_secret(&mut self, secret: SecretString) {
        self.secret = secret;
    }

    pub fn is_online(&self) -> bool {
        self.connection.is_some()
    }

    pub(crate) fn attach(&mut self, connection: Connection) {
        self.connection = Some(connection);
    }

    /// Drop the connection if it is still the one identified by `conn_id`.
    pub(crate) fn detach(&mut self, conn_id: &str) -> bool {
        match &self.connection {
            Some(conn) if conn.conn_id() == conn_id => {
                self.connection = None;
                true
            },
            _ => false,
        }
    }

    /// Send a frame if online. Offline identities silently drop it.
    pub fn send(&self, frame: &str) -> bool {
        self.connection.as_ref().is_some_and(|c| c.send(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_unique_hex() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.expose_secret().len(), SECRET_BYTES * 2);
        assert!(a.expose_secret().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.expose_secret(), b.expose_secret());
    }

    #[test]
    fn verify_rejects_prefix_and_wrong_secret() {
        let who = Identity::new(1, Secret::new("abcd".into()), "ann", None, true);
        assert!(who.verify("abcd"));
        assert!(!who.verify("abc"));
        assert!(!who.verify("abce"));
    }

    #[test]
    fn public_projection_omits_secret() {
        let who = Identity::new(1, Secret::new("hunter2".into()), "ann", None, true);
        let debug = format!("{:?}", who.public());
        assert!(!debug.contains("hunter2"));
        assert!(!format!("{who:?}").contains("hunter2"));
    }

    #[test]
    fn public_projection_omits_external_id() {
        let profile = ExternalProfile {
            id: "code:QWERT".into(),
            avatar: None,
        };
        let who = Identity::new(1, generate_secret(), "ann", Some(profile), true);
        assert!(who.external.is_some());
        let debug = format!("{:?}", who.public());
        assert!(!debug.contains("QWERT"));
        assert!(!debug.contains("external"));
    }

    #[test]
    fn detach_ignores_stale_connection() {
        let mut who = Identity::new(1, generate_secret(), "ann", None, true);
        let (first, _rx1) = Connection::channel("c1");
        let (second, _rx2) = Connection::channel("c2");
        who.attach(first);
        who.attach(second);
        assert!(!who.detach("c1"));
        assert!(who.is_online());
        assert!(who.detach("c2"));
        assert!(!who.is_online());
    }

    #[test]
    fn send_to_offline_identity_is_dropped() {
        let who = Identity::new(1, generate_secret(), "ann", None, true);
        assert!(!who.send("{}"));
    }
}
