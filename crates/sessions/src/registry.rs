use {
    lansite_protocol::{ExternalProfile, PublicIdentity},
    secrecy::{ExposeSecret, Secret, SecretString},
    tracing::{debug, info, warn},
};

use crate::{
    connection::Connection,
    error::RegistryError,
    identity::{Identity, generate_secret},
};

/// Room-scoped set of identities.
///
/// The registry only holds state. Callers that change anything visible to
/// other clients (privilege, connect, disconnect) broadcast the roster
/// themselves afterwards.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    identities: Vec<Identity>,
    last_id: u64,
    pm_default: bool,
}

impl SessionRegistry {
    /// `pm_default` is the `pm_enabled` flag given to new identities.
    pub fn new(pm_default: bool) -> Self {
        Self {
            identities: Vec::new(),
            last_id: 0,
            pm_default,
        }
    }

    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.identities.iter().position(|i| i.id == id)
    }

    /// Update the identity matching `(id, secret)`, or create a new one with
    /// the next free id.
    pub fn register(
        &mut self,
        secret: SecretString,
        id: Option<u64>,
        display_name: &str,
        external: Option<ExternalProfile>,
    ) -> &Identity {
        let existing = id.and_then(|id| {
            self.position(id)
                .filter(|&idx| self.identities[idx].verify(secret.expose_secret()))
        });

        let idx = match existing {
            Some(idx) => {
                let identity = &mut self.identities[idx];
                identity.display_name = display_name.to_string();
                identity.external = external;
                debug!(id = identity.id, "updated identity");
                idx
            },
            None => {
                let id = self.next_id();
                let pm_enabled = self.pm_default;
                self.identities.push(Identity::new(
                    id,
                    secret,
                    display_name,
                    external,
                    pm_enabled,
                ));
                info!(id, display_name, "registered identity");
                self.identities.len() - 1
            },
        };
        &self.identities[idx]
    }

    /// Login path used after an external assertion: reuse the identity linked
    /// to the same external id when there is one, otherwise mint a new one.
    pub fn sign_in(&mut self, display_name: &str, external: Option<ExternalProfile>) -> &Identity {
        let known = external
            .as_ref()
            .and_then(|e| self.find_by_external(&e.id))
            .map(|i| (i.id, Secret::new(i.secret().expose_secret().clone())));

        match known {
            Some((id, secret)) => self.register(secret, Some(id), display_name, external),
            None => self.register(generate_secret(), None, display_name, external),
        }
    }

    /// Insert or refresh an identity under a fixed id. Used to mirror a main
    /// stream identity into a side stream with the same credentials.
    pub fn adopt(
        &mut self,
        id: u64,
        secret: SecretString,
        display_name: &str,
        external: Option<ExternalProfile>,
    ) -> &Identity {
        let idx = match self.position(id) {
            Some(idx) => {
                let identity = &mut self.identities[idx];
                identity.set_secret(secret);
                identity.display_name = display_name.to_string();
                identity.external = external;
                idx
            },
            None => {
                self.last_id = self.last_id.max(id);
                let pm_enabled = self.pm_default;
                self.identities.push(Identity::new(
                    id,
                    secret,
                    display_name,
                    external,
                    pm_enabled,
                ));
                self.identities.len() - 1
            },
        };
        &self.identities[idx]
    }

    /// Bind a live connection to the identity on an exact `(id, secret)` match.
    pub fn reconnect(
        &mut self,
        id: u64,
        secret: &str,
        connection: Connection,
    ) -> Result<&Identity, RegistryError> {
        let Some(idx) = self
            .position(id)
            .filter(|&idx| self.identities[idx].verify(secret))
        else {
            warn!(id, "reconnect rejected");
            return Err(RegistryError::AuthenticationFailed { id });
        };
        let identity = &mut self.identities[idx];
        debug!(id, conn_id = connection.conn_id(), "identity connected");
        identity.attach(connection);
        Ok(&self.identities[idx])
    }

    /// Mark the identity offline if `conn_id` is still its live connection.
    pub fn disconnect(&mut self, id: u64, conn_id: &str) -> bool {
        self.find_mut(id).is_some_and(|i| i.detach(conn_id))
    }

    pub fn check_credentials(&self, id: u64, secret: &str) -> Option<&Identity> {
        self.find(id).filter(|i| i.verify(secret))
    }

    pub fn find(&self, id: u64) -> Option<&Identity> {
        self.identities.iter().find(|i| i.id == id)
    }

    pub fn find_mut(&mut self, id: u64) -> Option<&mut Identity> {
        self.identities.iter_mut().find(|i| i.id == id)
    }

    pub fn find_by_external(&self, external_id: &str) -> Option<&Identity> {
        self.identities
            .iter()
            .find(|i| i.external.as_ref().is_some_and(|e| e.id == external_id))
    }

    pub fn set_privileged(&mut self, id: u64, privileged: bool) -> Result<(), RegistryError> {
        let identity = self.find_mut(id).ok_or(RegistryError::NotFound(id))?;
        identity.privileged = privileged;
        info!(id, privileged, "privilege changed");
        Ok(())
    }

    pub fn is_online(&self, id: u64) -> bool {
        self.find(id).is_some_and(Identity::is_online)
    }

    /// Flip `pm_enabled` for every identity and for identities created later.
    pub fn set_pm_enabled_all(&mut self, enabled: bool) {
        self.pm_default = enabled;
        for identity in &mut self.identities {
            identity.pm_enabled = enabled;
        }
    }

    pub fn public_roster(&self) -> Vec<PublicIdentity> {
        self.identities.iter().map(Identity::public).collect()
    }

    pub fn online(&self) -> impl Iterator<Item = &Identity> {
        self.identities.iter().filter(|i| i.is_online())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.identities.iter()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
