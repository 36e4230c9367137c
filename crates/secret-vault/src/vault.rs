//! Secret vault backed by a remote secret store

use crate::{
    cache::{SecretCache, SecretCacheItem, tracking_tag},
    client::{CreateSecretInput, DeleteSecretInput, SecretsManagerClient, Tag, UpdateSecretInput},
    error::{Error, Result, SecretsManagerError},
    secret::NamedSecret,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Manages the lifecycle of named secrets.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Create a secret and return its ID.
    ///
    /// If a secret with the same name already exists, its ID is returned and
    /// its value is left untouched.
    async fn create_secret(&self, secret: NamedSecret) -> Result<String>;

    /// Get the value of the secret with the given ID
    async fn get_value(&self, id: &str) -> Result<String>;

    /// Overwrite the value of the secret with the given name
    async fn update_value(&self, secret: NamedSecret) -> Result<()>;

    /// Delete the secret with the given ID, bypassing any recovery window
    async fn delete_secret(&self, id: &str) -> Result<()>;
}

/// [`Vault`] implementation over a [`SecretsManagerClient`].
///
/// When a cache is configured, creation is two-phase: the secret is created
/// remotely tagged as pending, recorded in the cache, then re-tagged as
/// tracked. A failure between those steps leaves the secret pending for an
/// out-of-band sweep to reconcile.
#[derive(Clone)]
pub struct SecretsManagerVault {
    client: Arc<dyn SecretsManagerClient>,
    cache: Option<Arc<dyn SecretCache>>,
}

impl SecretsManagerVault {
    /// Create a vault without a cache
    pub fn new(client: Arc<dyn SecretsManagerClient>) -> Self {
        Self {
            client,
            cache: None,
        }
    }

    /// Mirror created secrets into the given cache
    pub fn with_cache(mut self, cache: Arc<dyn SecretCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn cache_tag(&self) -> Option<String> {
        self.cache
            .as_ref()
            .map(|cache| tracking_tag(&cache.tag()).to_string())
    }

    async fn existing_secret_id(&self, name: &str) -> Result<String> {
        let out = self
            .client
            .describe_secret(name)
            .await
            .map_err(|e| Error::remote("describing already-existing secret", e))?;
        out.arn
            .ok_or(Error::MissingResponseField("an ID for an already-existing secret"))
    }
}

#[async_trait]
impl Vault for SecretsManagerVault {
    async fn create_secret(&self, secret: NamedSecret) -> Result<String> {
        secret.validate().map_err(Error::InvalidSecret)?;
        let name = secret.name.unwrap_or_default();
        let tag = self.cache_tag();

        let input = CreateSecretInput {
            name: name.clone(),
            secret_string: secret.value.unwrap_or_default(),
            tags: tag
                .iter()
                .map(|tag| Tag::new(tag, false.to_string()))
                .collect(),
        };

        let out = match self.client.create_secret(input).await {
            Ok(out) => out,
            Err(SecretsManagerError::AlreadyExists(_)) => {
                debug!("Secret '{}' already exists, reusing it", name);
                return self.existing_secret_id(&name).await;
            }
            Err(e) => return Err(Error::remote(format!("creating secret '{}'", name), e)),
        };
        let arn = out.arn.ok_or(Error::MissingResponseField("an ID"))?;
        info!("Created secret '{}' ({})", name, arn);

        let (Some(cache), Some(tag)) = (&self.cache, tag) else {
            return Ok(arn);
        };

        let item = SecretCacheItem {
            id: arn.clone(),
            name,
        };
        cache.put(item.clone()).await.map_err(|e| {
            warn!("Secret '{}' left pending: cache update failed", item.id);
            Error::cache(
                format!(
                    "adding secret cache item '{}' named '{}' to cache",
                    item.id, item.name
                ),
                e,
            )
        })?;

        self.client
            .tag_resource(&arn, vec![Tag::new(tag, true.to_string())])
            .await
            .map_err(|e| {
                Error::remote(
                    format!(
                        "re-tagging secret cache item '{}' named '{}' to indicate that it is tracked",
                        item.id, item.name
                    ),
                    e,
                )
            })?;

        Ok(arn)
    }

    async fn get_value(&self, id: &str) -> Result<String> {
        if id.is_empty() {
            return Err(Error::EmptyId);
        }
        let out = self
            .client
            .get_secret_value(id)
            .await
            .map_err(|e| Error::remote(format!("getting value of secret '{}'", id), e))?;
        out.secret_string.ok_or(Error::MissingResponseField("a value"))
    }

    async fn update_value(&self, secret: NamedSecret) -> Result<()> {
        secret.validate().map_err(Error::InvalidSecret)?;
        let name = secret.name.unwrap_or_default();
        self.client
            .update_secret_value(UpdateSecretInput {
                secret_id: name.clone(),
                secret_string: secret.value.unwrap_or_default(),
            })
            .await
            .map_err(|e| Error::remote(format!("updating value of secret '{}'", name), e))?;
        debug!("Updated value of secret '{}'", name);
        Ok(())
    }

    async fn delete_secret(&self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(Error::EmptyId);
        }
        self.client
            .delete_secret(DeleteSecretInput {
                secret_id: id.to_string(),
                force_delete_without_recovery: true,
            })
            .await
            .map_err(|e| Error::remote(format!("deleting secret '{}'", id), e))?;
        info!("Deleted secret '{}'", id);

        if let Some(cache) = &self.cache {
            cache
                .delete(id)
                .await
                .map_err(|e| Error::cache(format!("deleting secret '{}' from cache", id), e))?;
        }

        Ok(())
    }
}
