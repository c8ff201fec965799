use thiserror::Error;

use crate::form::ValidationErrors;
use crate::remote::RemoteError;

/// Failures surfaced to whoever drives the directory session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Local, field-scoped; never reaches the network.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// The service was unreachable or answered with something unreadable.
    #[error("Something went wrong: {0}")]
    Transport(String),

    /// The service answered with a non-success status. The message is the
    /// one the service provided.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// An action needing a specific number of selected contacts was invoked
    /// with a different number.
    #[error("select exactly {required} contact to continue ({actual} selected)")]
    Precondition { required: usize, actual: usize },
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Transport(message) => Error::Transport(message),
            RemoteError::Rejected { status, message } => Error::Rejected { status, message },
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
