#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("authentication failed for identity {id}")]
    AuthenticationFailed { id: u64 },

    #[error("identity {0} not found")]
    NotFound(u64),
}
