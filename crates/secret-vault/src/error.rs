//! Error types for the secret vault

use thiserror::Error;

/// Errors surfaced by a remote secret store client.
///
/// Client adapters must map their service's failures onto these variants so
/// that the vault can recognize conflicts and missing secrets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretsManagerError {
    /// A secret with the requested name already exists
    #[error("secret already exists: {0}")]
    AlreadyExists(String),

    /// The referenced secret does not exist
    #[error("secret not found: {0}")]
    NotFound(String),

    /// The request contained an invalid parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other service failure
    #[error("secrets manager error: {0}")]
    Service(String),
}

/// Secret vault error type
#[derive(Error, Debug)]
pub enum Error {
    /// The secret failed validation before any remote call was made
    #[error("invalid secret: {0}")]
    InvalidSecret(String),

    /// An operation was given an empty secret ID
    #[error("must specify a non-empty ID")]
    EmptyId,

    /// The remote store returned a response without a required field
    #[error("expected {0} in the response, but none was returned from Secrets Manager")]
    MissingResponseField(&'static str),

    /// A remote call failed
    #[error("{operation}: {source}")]
    Remote {
        /// Description of the failed call
        operation: String,
        /// Underlying client error
        #[source]
        source: SecretsManagerError,
    },

    /// The external cache rejected an update
    #[error("{operation}: {source}")]
    Cache {
        /// Description of the failed cache call
        operation: String,
        /// Underlying cache error
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// Wrap a client error with the operation that produced it
    pub fn remote(operation: impl Into<String>, source: SecretsManagerError) -> Self {
        Self::Remote {
            operation: operation.into(),
            source,
        }
    }

    /// Wrap a cache error with the operation that produced it
    pub fn cache(operation: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Cache {
            operation: operation.into(),
            source,
        }
    }

    /// Whether the remote store reported the secret as missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Remote {
                source: SecretsManagerError::NotFound(_),
                ..
            }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
