//! In-memory secret store and cache
//!
//! Both types are plain values that callers construct and share through an
//! `Arc`. They are intended for tests and local development.

use crate::{
    cache::{SecretCache, SecretCacheItem},
    client::{
        ClientResult, CreateSecretInput, CreateSecretOutput, DeleteSecretInput,
        DescribeSecretOutput, GetSecretValueOutput, SecretFilter, SecretsManagerClient, Tag,
        UpdateSecretInput,
    },
    error::SecretsManagerError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Remote calls that can be observed or made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretsOperation {
    /// `create_secret`
    Create,
    /// `get_secret_value`
    GetValue,
    /// `describe_secret`
    Describe,
    /// `list_secrets`
    List,
    /// `update_secret_value`
    Update,
    /// `delete_secret`
    Delete,
    /// `tag_resource`
    TagResource,
}

/// A secret stored in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSecret {
    /// Generated ARN
    pub arn: String,
    /// Friendly name
    pub name: String,
    /// Current value
    pub value: String,
    /// Tags on the secret
    pub tags: HashMap<String, String>,
}

#[derive(Default)]
struct State {
    secrets: HashMap<String, StoredSecret>,
    failures: HashMap<SecretsOperation, SecretsManagerError>,
    calls: HashMap<SecretsOperation, usize>,
}

impl State {
    fn begin(&mut self, op: SecretsOperation) -> ClientResult<()> {
        *self.calls.entry(op).or_default() += 1;
        match self.failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn find(&self, id: &str) -> ClientResult<&StoredSecret> {
        self.secrets
            .values()
            .find(|s| s.arn == id || s.name == id)
            .ok_or_else(|| SecretsManagerError::NotFound(id.to_string()))
    }

    fn find_mut(&mut self, id: &str) -> ClientResult<&mut StoredSecret> {
        self.secrets
            .values_mut()
            .find(|s| s.arn == id || s.name == id)
            .ok_or_else(|| SecretsManagerError::NotFound(id.to_string()))
    }
}

/// In-memory [`SecretsManagerClient`]
#[derive(Default)]
pub struct MemorySecretsManager {
    state: RwLock<State>,
}

impl MemorySecretsManager {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call of `op` fail with `err`
    pub fn fail_next(&self, op: SecretsOperation, err: SecretsManagerError) {
        self.write().failures.insert(op, err);
    }

    /// Number of times `op` has been called
    pub fn calls(&self, op: SecretsOperation) -> usize {
        self.read().calls.get(&op).copied().unwrap_or_default()
    }

    /// Number of stored secrets
    pub fn len(&self) -> usize {
        self.read().secrets.len()
    }

    /// Whether the store holds no secrets
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a secret by ARN or name
    pub fn secret(&self, id: &str) -> Option<StoredSecret> {
        self.read().find(id).ok().cloned()
    }

    /// Tags of a secret by ARN or name
    pub fn tags(&self, id: &str) -> Option<HashMap<String, String>> {
        self.secret(id).map(|s| s.tags)
    }

    /// All stored secrets
    pub fn secrets(&self) -> Vec<StoredSecret> {
        self.read().secrets.values().cloned().collect()
    }
}

fn describe(secret: &StoredSecret) -> DescribeSecretOutput {
    DescribeSecretOutput {
        arn: Some(secret.arn.clone()),
        name: Some(secret.name.clone()),
        tags: secret
            .tags
            .iter()
            .map(|(k, v)| Tag::new(k, v))
            .collect(),
    }
}

fn matches_filter(secret: &StoredSecret, filter: &SecretFilter) -> bool {
    match filter {
        SecretFilter::NamePrefix(prefix) => secret.name.starts_with(prefix.as_str()),
        SecretFilter::TagKey(key) => secret.tags.contains_key(key),
        SecretFilter::TagValue(value) => secret.tags.values().any(|v| v == value),
    }
}

#[async_trait]
impl SecretsManagerClient for MemorySecretsManager {
    async fn create_secret(&self, input: CreateSecretInput) -> ClientResult<CreateSecretOutput> {
        let mut state = self.write();
        state.begin(SecretsOperation::Create)?;
        if input.name.is_empty() {
            return Err(SecretsManagerError::InvalidParameter(
                "secret name cannot be empty".to_string(),
            ));
        }
        if state.find(&input.name).is_ok() {
            return Err(SecretsManagerError::AlreadyExists(input.name));
        }

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let arn = format!(
            "arn:aws:secretsmanager:us-east-1:000000000000:secret:{}-{}",
            input.name,
            &suffix[..6]
        );
        let secret = StoredSecret {
            arn: arn.clone(),
            name: input.name.clone(),
            value: input.secret_string,
            tags: input.tags.into_iter().map(|t| (t.key, t.value)).collect(),
        };
        state.secrets.insert(arn.clone(), secret);

        Ok(CreateSecretOutput {
            arn: Some(arn),
            name: Some(input.name),
        })
    }

    async fn get_secret_value(&self, secret_id: &str) -> ClientResult<GetSecretValueOutput> {
        let mut state = self.write();
        state.begin(SecretsOperation::GetValue)?;
        let secret = state.find(secret_id)?;
        Ok(GetSecretValueOutput {
            arn: Some(secret.arn.clone()),
            name: Some(secret.name.clone()),
            secret_string: Some(secret.value.clone()),
        })
    }

    async fn describe_secret(&self, secret_id: &str) -> ClientResult<DescribeSecretOutput> {
        let mut state = self.write();
        state.begin(SecretsOperation::Describe)?;
        state.find(secret_id).map(describe)
    }

    async fn list_secrets(&self, filters: &[SecretFilter]) -> ClientResult<Vec<DescribeSecretOutput>> {
        let mut state = self.write();
        state.begin(SecretsOperation::List)?;
        Ok(state
            .secrets
            .values()
            .filter(|s| filters.iter().all(|f| matches_filter(s, f)))
            .map(describe)
            .collect())
    }

    async fn update_secret_value(&self, input: UpdateSecretInput) -> ClientResult<()> {
        let mut state = self.write();
        state.begin(SecretsOperation::Update)?;
        state.find_mut(&input.secret_id)?.value = input.secret_string;
        Ok(())
    }

    async fn delete_secret(&self, input: DeleteSecretInput) -> ClientResult<()> {
        let mut state = self.write();
        state.begin(SecretsOperation::Delete)?;
        let arn = state.find(&input.secret_id)?.arn.clone();
        state.secrets.remove(&arn);
        Ok(())
    }

    async fn tag_resource(&self, secret_id: &str, tags: Vec<Tag>) -> ClientResult<()> {
        let mut state = self.write();
        state.begin(SecretsOperation::TagResource)?;
        let secret = state.find_mut(secret_id)?;
        secret
            .tags
            .extend(tags.into_iter().map(|t| (t.key, t.value)));
        Ok(())
    }
}

/// In-memory [`SecretCache`]
#[derive(Default)]
pub struct MemorySecretCache {
    items: RwLock<HashMap<String, SecretCacheItem>>,
    tag: String,
    fail_puts: RwLock<bool>,
}

impl MemorySecretCache {
    /// Create an empty cache using the default tracking tag
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom tracking tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Make every subsequent `put` fail while `fail` is set
    pub fn set_fail_puts(&self, fail: bool) {
        *self.fail_puts.write().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    /// Look up a cached item
    pub fn get(&self, id: &str) -> Option<SecretCacheItem> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Number of cached items
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SecretCache for MemorySecretCache {
    async fn put(&self, item: SecretCacheItem) -> anyhow::Result<()> {
        if *self.fail_puts.read().unwrap_or_else(PoisonError::into_inner) {
            anyhow::bail!("cache unavailable");
        }
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item.id.clone(), item);
        Ok(())
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        Ok(())
    }

    fn tag(&self) -> String {
        self.tag.clone()
    }
}
