use thiserror::Error;

use crate::backend::BackendError;
use crate::storage::StorageError;

/// Titled, user-facing message shown as a dismissible alert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{title}: {message}")]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new("Success", message)
    }
}

/// Failures while wiring the client together.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("backend: {0}")]
    Backend(#[from] BackendError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
