//! Configuration values for pod definitions and pod launches
//!
//! Every options type offers consuming `with_*` setters, a pure `validate`
//! that reports every violation and returns a copy with defaults filled in,
//! and a left-to-right `merge`. Collections count as unset when empty.

mod container;
mod creation;
mod definition;
mod execution;

pub use container::{
    ContainerDefinition, EnvironmentVariable, KeyValue, LogConfiguration, PortMapping,
    RepositoryCredentials, SecretOptions, StoredRepositoryCredentials,
};
pub use creation::PodCreationOptions;
pub use definition::{NetworkMode, PodDefinitionOptions};
pub use execution::{
    AwsVpcOptions, CONSTRAINT_DISTINCT_INSTANCE, MAX_OVERRIDE_SIZE_BYTES, OverrideContainerDefinition,
    OverridePodDefinitionOptions, PlacementOptions, PlacementStrategy, PodExecutionOptions,
    STRATEGY_PARAM_BINPACK_CPU, STRATEGY_PARAM_BINPACK_MEMORY, STRATEGY_PARAM_SPREAD_HOST,
};

use sha2::{Digest as _, Sha256};
use std::collections::HashMap;
use std::fmt;

/// Accumulated validation failures, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    messages: Vec<String>,
}

impl ValidationErrors {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation
    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Record a violation if `condition` holds
    pub fn push_when(&mut self, condition: bool, message: impl Into<String>) {
        if condition {
            self.push(message);
        }
    }

    /// Record a nested set of violations as one `"<prefix>: <errors>"` entry
    pub fn wrap(&mut self, prefix: impl fmt::Display, nested: ValidationErrors) {
        if !nested.is_empty() {
            self.push(format!("{}: {}", prefix, nested));
        }
    }

    /// Whether no violations were recorded
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of recorded violations
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Recorded messages
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// `Ok(value)` if nothing was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Outcome of validating an options value.
///
/// `value` carries whatever defaults could be filled in, even when `errors`
/// is not empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    /// Copy of the input with defaults applied
    pub value: T,
    /// Every violation found
    pub errors: ValidationErrors,
}

impl<T> Validated<T> {
    pub(crate) fn new(value: T, errors: ValidationErrors) -> Self {
        Self { value, errors }
    }

    /// Whether validation passed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The defaulted value, or the errors if any were found
    pub fn into_result(self) -> Result<T, ValidationErrors> {
        self.errors.into_result(self.value)
    }
}

/// Random identifier used for unnamed pods and containers
pub(crate) fn random_name() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Overwrite `slot` when `value` is set
pub(crate) fn merge_option<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        slot.clone_from(value);
    }
}

/// Overwrite `slot` when `value` is non-empty
pub(crate) fn merge_vec<T: Clone>(slot: &mut Vec<T>, value: &[T]) {
    if !value.is_empty() {
        *slot = value.to_vec();
    }
}

/// Overwrite `slot` when `value` is non-empty
pub(crate) fn merge_map(slot: &mut HashMap<String, String>, value: &HashMap<String, String>) {
    if !value.is_empty() {
        slot.clone_from(value);
    }
}

/// Incremental content digest.
///
/// Each field is written with its label so that skipping an unset field can
/// never make two different values collide.
pub(crate) struct ContentDigest(Sha256);

impl ContentDigest {
    pub(crate) fn new() -> Self {
        Self(Sha256::new())
    }

    pub(crate) fn field(&mut self, label: &str, value: impl fmt::Display) -> &mut Self {
        self.0.update(label.as_bytes());
        self.0.update([b'=']);
        self.0.update(value.to_string().as_bytes());
        self.0.update([0u8]);
        self
    }

    pub(crate) fn optional(&mut self, label: &str, value: Option<impl fmt::Display>) -> &mut Self {
        if let Some(value) = value {
            self.field(label, value);
        }
        self
    }

    /// Add a collection whose order carries no meaning
    pub(crate) fn unordered(&mut self, label: &str, mut digests: Vec<String>) -> &mut Self {
        if digests.is_empty() {
            return self;
        }
        digests.sort();
        for digest in digests {
            self.field(label, digest);
        }
        self
    }

    pub(crate) fn pairs(&mut self, label: &str, pairs: &HashMap<String, String>) -> &mut Self {
        let digests = pairs
            .iter()
            .map(|(k, v)| {
                let mut pair = ContentDigest::new();
                pair.field("key", k).field("value", v);
                pair.finish()
            })
            .collect();
        self.unordered(label, digests)
    }

    pub(crate) fn finish(&self) -> String {
        hex::encode(self.0.clone().finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_skips_empty_nested_errors() {
        let mut errors = ValidationErrors::new();
        errors.wrap("container definition 'web'", ValidationErrors::new());
        assert!(errors.is_empty());

        let mut nested = ValidationErrors::new();
        nested.push("must specify an image");
        nested.push("must have positive CPU value if non-default");
        errors.wrap("container definition 'web'", nested);
        assert_eq!(
            errors.to_string(),
            "container definition 'web': must specify an image; must have positive CPU value if non-default"
        );
    }

    #[test]
    fn test_digest_labels_disambiguate_fields() {
        let mut a = ContentDigest::new();
        a.optional("name", Some("x")).optional("image", None::<&str>);
        let mut b = ContentDigest::new();
        b.optional("name", None::<&str>).optional("image", Some("x"));
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_unordered_ignores_input_order() {
        let mut a = ContentDigest::new();
        a.unordered("item", vec!["b".to_string(), "a".to_string()]);
        let mut b = ContentDigest::new();
        b.unordered("item", vec!["a".to_string(), "b".to_string()]);
        assert_eq!(a.finish(), b.finish());
    }
}
