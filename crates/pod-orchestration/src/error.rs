//! Error types for pod orchestration

use crate::options::ValidationErrors;
use thiserror::Error;

/// Errors surfaced by a remote orchestration client.
///
/// Client adapters must map a stop or describe of a task that no longer
/// exists onto [`EcsError::TaskNotFound`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The referenced task does not exist
    #[error("task '{arn}' not found")]
    TaskNotFound {
        /// ARN of the missing task
        arn: String,
    },

    /// The request contained an invalid parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Some other referenced resource does not exist
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Any other service failure
    #[error("ECS error: {0}")]
    Service(String),
}

/// Pod orchestration error type
#[derive(Error, Debug)]
pub enum Error {
    /// Options failed validation; no remote call was made
    #[error("invalid {subject}: {errors}")]
    Validation {
        /// What was being validated
        subject: String,
        /// Every violation found
        errors: ValidationErrors,
    },

    /// A task reported by the orchestration service as missing
    #[error("task '{arn}' not found")]
    TaskNotFound {
        /// ARN of the missing task
        arn: String,
    },

    /// A failure entry returned by the orchestration service
    #[error("{0}")]
    Failure(String),

    /// A response was well-formed but missing what the caller needs
    #[error("{0}")]
    UnexpectedResponse(String),

    /// An operation needs a vault but none was configured
    #[error("cannot {action} without a vault")]
    MissingVault {
        /// The operation that needed the vault
        action: String,
    },

    /// Remote orchestration client error
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// Secret vault error
    #[error(transparent)]
    Vault(#[from] secret_vault::Error),

    /// The external definition cache rejected an update
    #[error("{operation}: {source}")]
    Cache {
        /// Description of the failed cache call
        operation: String,
        /// Underlying cache error
        #[source]
        source: anyhow::Error,
    },

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Several independent failures
    #[error("{}", join_errors(.0))]
    Multiple(Vec<Error>),

    /// An error annotated with the operation that produced it
    #[error("{context}: {source}")]
    Context {
        /// Description of the failed operation
        context: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a validation error
    pub fn validation(subject: impl Into<String>, errors: ValidationErrors) -> Self {
        Self::Validation {
            subject: subject.into(),
            errors,
        }
    }

    /// Create a missing-vault error
    pub fn missing_vault(action: impl Into<String>) -> Self {
        Self::MissingVault {
            action: action.into(),
        }
    }

    /// Wrap a cache error with the operation that produced it
    pub fn cache(operation: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Cache {
            operation: operation.into(),
            source,
        }
    }

    /// Collapse a list of errors. A single error is returned as-is.
    ///
    /// Returns `None` if the list is empty.
    pub fn from_many(mut errors: Vec<Error>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Whether this error, or the error it wraps, reports a missing task
    pub fn is_task_not_found(&self) -> bool {
        match self {
            Self::TaskNotFound { .. } | Self::Ecs(EcsError::TaskNotFound { .. }) => true,
            Self::Context { source, .. } => source.is_task_not_found(),
            Self::Multiple(errors) => errors.iter().all(Error::is_task_not_found),
            _ => false,
        }
    }
}

/// Attach operation context to fallible results
pub trait ResultExt<T> {
    /// Wrap the error with a fixed context message
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Wrap the error with a lazily built context message
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Context {
            context: context.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| Error::Context {
            context: f(),
            source: Box::new(e.into()),
        })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_not_found_seen_through_context() {
        let err: Result<()> = Err(EcsError::TaskNotFound {
            arn: "arn:task/1".to_string(),
        })
        .context("stopping pod");
        let err = err.unwrap_err();
        assert!(err.is_task_not_found());
        assert_eq!(err.to_string(), "stopping pod: task 'arn:task/1' not found");
    }

    #[test]
    fn test_multiple_renders_every_message() {
        let err = Error::from_many(vec![
            Error::Failure("first".to_string()),
            Error::missing_vault("delete secret 's' for container 'c'"),
        ])
        .unwrap();
        assert_eq!(
            err.to_string(),
            "first; cannot delete secret 's' for container 'c' without a vault"
        );
        assert!(!err.is_task_not_found());
    }

    #[test]
    fn test_from_many_unwraps_single_error() {
        assert!(Error::from_many(Vec::new()).is_none());
        let err = Error::from_many(vec![Error::TaskNotFound {
            arn: "a".to_string(),
        }])
        .unwrap();
        assert!(matches!(err, Error::TaskNotFound { .. }));
    }
}
