//! Remote secret store client interface
//!
//! The request and response shapes follow the remote Secrets Manager API.
//! Adapters own retries, backoff and credentials.

use crate::error::SecretsManagerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of a single client call
pub type ClientResult<T> = std::result::Result<T, SecretsManagerError>;

/// A remote resource tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

impl Tag {
    /// Create a tag
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Convert a tag map into the remote tag list. Order is unspecified.
pub fn export_tags(tags: &HashMap<String, String>) -> Vec<Tag> {
    tags.iter().map(|(k, v)| Tag::new(k, v)).collect()
}

/// Request to create a secret
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSecretInput {
    /// Secret name
    pub name: String,
    /// Secret value
    pub secret_string: String,
    /// Tags applied at creation
    pub tags: Vec<Tag>,
}

/// Response to a create request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSecretOutput {
    /// ARN of the new secret
    pub arn: Option<String>,
    /// Name of the new secret
    pub name: Option<String>,
}

/// Response to a value lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetSecretValueOutput {
    /// ARN of the secret
    pub arn: Option<String>,
    /// Name of the secret
    pub name: Option<String>,
    /// Plaintext value
    pub secret_string: Option<String>,
}

/// Response to a describe request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeSecretOutput {
    /// ARN of the secret
    pub arn: Option<String>,
    /// Name of the secret
    pub name: Option<String>,
    /// Tags on the secret
    pub tags: Vec<Tag>,
}

/// Filter applied when listing secrets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretFilter {
    /// Secrets whose name starts with the prefix
    NamePrefix(String),
    /// Secrets carrying the tag key
    TagKey(String),
    /// Secrets carrying a tag with this value
    TagValue(String),
}

/// Request to update a secret value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSecretInput {
    /// Name or ARN of the secret
    pub secret_id: String,
    /// New value
    pub secret_string: String,
}

/// Request to delete a secret
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSecretInput {
    /// Name or ARN of the secret
    pub secret_id: String,
    /// Skip the recovery window
    pub force_delete_without_recovery: bool,
}

/// Client for a remote secret store.
///
/// Secret IDs accept either the secret's ARN or its name.
#[async_trait]
pub trait SecretsManagerClient: Send + Sync {
    /// Create a new secret, failing with [`SecretsManagerError::AlreadyExists`] on a name conflict
    async fn create_secret(&self, input: CreateSecretInput) -> ClientResult<CreateSecretOutput>;

    /// Get the current value of a secret
    async fn get_secret_value(&self, secret_id: &str) -> ClientResult<GetSecretValueOutput>;

    /// Describe a secret's metadata
    async fn describe_secret(&self, secret_id: &str) -> ClientResult<DescribeSecretOutput>;

    /// List secrets matching every filter
    async fn list_secrets(&self, filters: &[SecretFilter]) -> ClientResult<Vec<DescribeSecretOutput>>;

    /// Overwrite a secret's value
    async fn update_secret_value(&self, input: UpdateSecretInput) -> ClientResult<()>;

    /// Delete a secret
    async fn delete_secret(&self, input: DeleteSecretInput) -> ClientResult<()>;

    /// Add or overwrite tags on a secret
    async fn tag_resource(&self, secret_id: &str, tags: Vec<Tag>) -> ClientResult<()>;
}
