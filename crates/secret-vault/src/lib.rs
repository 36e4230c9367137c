//! # Secret Vault
//!
//! Named secrets backed by a remote secret store, optionally mirrored into an
//! external cache.
//!
//! Secrets created through a cached vault are tagged remotely as pending
//! until the cache has recorded them, after which they are re-tagged as
//! tracked. Anything left pending after a partial failure can be found by
//! its tag and reconciled out of band.
//!
//! ## Example
//!
//! ```rust
//! use secret_vault::{MemorySecretsManager, NamedSecret, SecretsManagerVault, Vault};
//! use std::sync::Arc;
//!
//! # async fn example() -> secret_vault::Result<()> {
//! let vault = SecretsManagerVault::new(Arc::new(MemorySecretsManager::new()));
//!
//! let id = vault.create_secret(NamedSecret::new("db-password", "hunter2")).await?;
//! assert_eq!(vault.get_value(&id).await?, "hunter2");
//! vault.delete_secret(&id).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod cache;
mod client;
mod error;
mod memory;
mod secret;
mod vault;

pub use cache::{DEFAULT_TRACKING_TAG, SecretCache, SecretCacheItem, tracking_tag};
pub use client::{
    ClientResult, CreateSecretInput, CreateSecretOutput, DeleteSecretInput, DescribeSecretOutput,
    GetSecretValueOutput, SecretFilter, SecretsManagerClient, Tag, UpdateSecretInput, export_tags,
};
pub use error::{Error, Result, SecretsManagerError};
pub use memory::{MemorySecretCache, MemorySecretsManager, SecretsOperation, StoredSecret};
pub use secret::NamedSecret;
pub use vault::{SecretsManagerVault, Vault};
