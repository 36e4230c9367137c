use crate::definition::{PodDefinitionCache, PodDefinitionItem};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// In-memory [`PodDefinitionCache`]
#[derive(Debug, Default)]
pub struct MemoryPodDefinitionCache {
    items: RwLock<HashMap<String, PodDefinitionItem>>,
    tag: String,
    fail_puts: AtomicBool,
}

impl MemoryPodDefinitionCache {
    /// Create an empty cache using the default tracking tag
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom tracking tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Make `put` fail while set
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Look up a cached definition
    pub fn get(&self, id: &str) -> Option<PodDefinitionItem> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Number of cached definitions
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PodDefinitionCache for MemoryPodDefinitionCache {
    async fn put(&self, item: PodDefinitionItem) -> anyhow::Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            anyhow::bail!("pod definition cache unavailable");
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
