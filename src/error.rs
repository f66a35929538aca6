//! Error taxonomy for transaction orchestration.

use thiserror::Error;

use crate::chain::ChainError;

/// Errors raised by orchestrators, the queue store and the backing clients.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No wallet account connected")]
    NoAccount,

    #[error("Could not resolve {kind} {id}")]
    MissingEntity { kind: &'static str, id: String },

    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("Not allowed: {reason}")]
    NotAllowed { reason: String },

    #[error("Nothing to do for {action}")]
    NothingToDo { action: String },

    #[error("Step '{step}' rejected: {message}")]
    WriteRejected { step: String, message: String },

    #[error("Wallet does not support the request for step '{step}'")]
    Unsupported { step: String },

    #[error("Chain read failed: {0}")]
    Chain(#[from] ChainError),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn missing(kind: &'static str, id: impl ToString) -> Self {
        Error::MissingEntity {
            kind,
            id: id.to_string(),
        }
    }

    pub fn not_allowed(reason: impl Into<String>) -> Self {
        Error::NotAllowed {
            reason: reason.into(),
        }
    }

    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        Error::InvalidAmount {
            reason: reason.into(),
        }
    }

    /// True for errors raised before any step was submitted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::NoAccount
                | Error::MissingEntity { .. }
                | Error::InvalidAmount { .. }
                | Error::AlreadyExists { .. }
                | Error::NotAllowed { .. }
                | Error::NothingToDo { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
