//! Named secret values

use serde::{Deserialize, Serialize};

/// A secret identified by its friendly name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedSecret {
    /// Friendly name of the secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Plaintext value of the secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl NamedSecret {
    /// Create a new secret with the given name and value
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
        }
    }

    /// Set the secret name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the secret value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Check that both fields are present and the name is non-empty.
    ///
    /// Every problem is reported, joined with `"; "`.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut errors = Vec::new();
        match self.name.as_deref() {
            None => errors.push("must specify a name"),
            Some("") => errors.push("cannot specify an empty name"),
            Some(_) => {}
        }
        if self.value.is_none() {
            errors.push("must specify a value");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_secret() {
        assert!(NamedSecret::new("db-password", "hunter2").validate().is_ok());
    }

    #[test]
    fn test_empty_value_is_allowed() {
        assert!(NamedSecret::new("flag", "").validate().is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let err = NamedSecret::default().validate().unwrap_err();
        assert!(err.contains("must specify a name"));
        assert!(err.contains("must specify a value"));

        let err = NamedSecret::new("", "v").validate().unwrap_err();
        assert_eq!(err, "cannot specify an empty name");
    }
}
