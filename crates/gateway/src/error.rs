use {
    lansite_protocol::{ErrorShape, error_codes},
    lansite_sessions::RegistryError,
};

/// Failures of stream, box and request operations.
///
/// Only authentication and permission failures are reported back to the
/// client. The rest come from stale client views or refused input and are
/// logged where they are detected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("event {0} is full")]
    CapacityExceeded(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl StreamError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => error_codes::AUTHENTICATION_FAILED,
            Self::PermissionDenied(_) => error_codes::PERMISSION_DENIED,
            Self::NotFound(_) => error_codes::NOT_FOUND,
            Self::CapacityExceeded(_) => error_codes::CAPACITY_EXCEEDED,
            Self::InvalidArgument(_) => error_codes::INVALID_ARGUMENT,
        }
    }

    /// Whether the originating client is told about this failure.
    pub fn is_surfaced(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::PermissionDenied(_))
    }

    pub fn to_error_shape(&self) -> ErrorShape {
        ErrorShape::new(self.code(), self.to_string())
    }
}

impl From<RegistryError> for StreamError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AuthenticationFailed { .. } => Self::AuthenticationFailed,
            RegistryError::NotFound(id) => Self::NotFound(format!("identity {id}")),
        }
    }
}
