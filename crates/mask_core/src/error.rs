use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("not_found - {0}")]
    NotFound(String),
    #[error("already_exists - {0}")]
    AlreadyExists(String),
    #[error("invalid_store - {0}")]
    InvalidExistingStore(String),
    #[error("out_of_range - {0}")]
    OutOfRange(String),
    #[error("deleted - {0}")]
    Deleted(String),
    #[error("unsupported - {0}")]
    Unsupported(String),
    #[error("persist_failed - {0}")]
    PersistFailed(String),
    #[error("invalid_input - {0}")]
    InvalidInput(String),
    #[error("io_error - {0}")]
    Io(String),
}

impl AppError {
    pub fn not_found<M: Into<String>>(message: M) -> Self {
        Self::NotFound(message.into())
    }

    pub fn already_exists<M: Into<String>>(message: M) -> Self {
        Self::AlreadyExists(message.into())
    }

    pub fn invalid_store<M: Into<String>>(message: M) -> Self {
        Self::InvalidExistingStore(message.into())
    }

    pub fn out_of_range<M: Into<String>>(message: M) -> Self {
        Self::OutOfRange(message.into())
    }

    pub fn deleted<M: Into<String>>(message: M) -> Self {
        Self::Deleted(message.into())
    }

    /// Operations that exist on the command surface but are not implemented.
    pub fn unsupported(operation: &str) -> Self {
        Self::Unsupported(format!("`{operation}` is not supported yet"))
    }

    pub fn persist_failed<M: Into<String>>(message: M) -> Self {
        Self::PersistFailed(message.into())
    }

    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::InvalidExistingStore(_) => "invalid_store",
            Self::OutOfRange(_) => "out_of_range",
            Self::Deleted(_) => "deleted",
            Self::Unsupported(_) => "unsupported",
            Self::PersistFailed(_) => "persist_failed",
            Self::InvalidInput(_) => "invalid_input",
            Self::Io(_) => "io_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(message)
            | Self::AlreadyExists(message)
            | Self::InvalidExistingStore(message)
            | Self::OutOfRange(message)
            | Self::Deleted(message)
            | Self::Unsupported(message)
            | Self::PersistFailed(message)
            | Self::InvalidInput(message)
            | Self::Io(message) => message,
        }
    }
}
