//! Container-level definition options

use super::{ContentDigest, Validated, ValidationErrors, random_name};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Exclusive lower bound for a port number
const MIN_PORT: i32 = 0;
/// Exclusive upper bound for a port number
const MAX_PORT: i32 = 1 << 16;

/// Settings for a single container within a pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerDefinition {
    /// Friendly name of the container. A random name is assigned on validation if unset.
    pub name: Option<String>,
    /// Image to run. Required.
    pub image: Option<String>,
    /// Command to run, split into arguments
    pub command: Vec<String>,
    /// Working directory for the command
    pub working_dir: Option<String>,
    /// Memory to allocate, in MB. Required if the pod sets no memory limit.
    pub memory_mb: Option<i32>,
    /// CPU units to allocate (1024 units is one vCPU). Required if the pod sets no CPU limit.
    pub cpu: Option<i32>,
    /// Environment variables
    pub env_vars: Vec<EnvironmentVariable>,
    /// Credentials for pulling a private image
    pub repo_creds: Option<RepositoryCredentials>,
    /// Port mappings
    pub port_mappings: Vec<PortMapping>,
    /// Log routing
    pub log_configuration: Option<LogConfiguration>,
}

impl ContainerDefinition {
    /// Create an empty container definition
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the container name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the image
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the command
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the memory in MB
    pub fn with_memory_mb(mut self, memory_mb: i32) -> Self {
        self.memory_mb = Some(memory_mb);
        self
    }

    /// Set the CPU units
    pub fn with_cpu(mut self, cpu: i32) -> Self {
        self.cpu = Some(cpu);
        self
    }

    /// Replace the environment variables
    pub fn with_environment_variables(mut self, env_vars: Vec<EnvironmentVariable>) -> Self {
        self.env_vars = env_vars;
        self
    }

    /// Append environment variables
    pub fn add_environment_variables(
        mut self,
        env_vars: impl IntoIterator<Item = EnvironmentVariable>,
    ) -> Self {
        self.env_vars.extend(env_vars);
        self
    }

    /// Set the repository credentials
    pub fn with_repository_credentials(mut self, creds: RepositoryCredentials) -> Self {
        self.repo_creds = Some(creds);
        self
    }

    /// Replace the port mappings
    pub fn with_port_mappings(mut self, mappings: Vec<PortMapping>) -> Self {
        self.port_mappings = mappings;
        self
    }

    /// Append port mappings
    pub fn add_port_mappings(mut self, mappings: impl IntoIterator<Item = PortMapping>) -> Self {
        self.port_mappings.extend(mappings);
        self
    }

    /// Set the log configuration
    pub fn with_log_configuration(mut self, config: LogConfiguration) -> Self {
        self.log_configuration = Some(config);
        self
    }

    /// Check the definition. A random name is assigned only if it is valid.
    pub fn validate(&self) -> Validated<Self> {
        let mut errors = ValidationErrors::new();
        errors.push_when(self.image.is_none(), "must specify an image");
        errors.push_when(
            self.image.as_deref() == Some(""),
            "cannot specify an empty image",
        );
        errors.push_when(
            self.memory_mb.is_some_and(|m| m <= 0),
            "must have positive memory value if non-default",
        );
        errors.push_when(
            self.cpu.is_some_and(|c| c <= 0),
            "must have positive CPU value if non-default",
        );
        for env_var in &self.env_vars {
            errors.wrap(
                format_args!(
                    "environment variable '{}'",
                    env_var.name.as_deref().unwrap_or_default()
                ),
                env_var.validate(),
            );
        }
        if let Some(creds) = &self.repo_creds {
            errors.wrap("invalid repository credentials", creds.validate());
        }
        if let Some(config) = &self.log_configuration {
            errors.wrap("invalid log configuration", config.validate());
        }
        for mapping in &self.port_mappings {
            errors.wrap("invalid port mapping", mapping.validate());
        }

        let mut value = self.clone();
        if errors.is_empty() && value.name.is_none() {
            value.name = Some(random_name());
        }
        Validated::new(value, errors)
    }

    pub(crate) fn digest(&self) -> String {
        let mut d = ContentDigest::new();
        d.optional("name", self.name.as_deref())
            .optional("image", self.image.as_deref());
        for arg in &self.command {
            d.field("command", arg);
        }
        d.optional("working_dir", self.working_dir.as_deref())
            .optional("memory_mb", self.memory_mb)
            .optional("cpu", self.cpu)
            .unordered(
                "env_var",
                self.env_vars.iter().map(EnvironmentVariable::digest).collect(),
            )
            .optional(
                "repo_creds",
                self.repo_creds.as_ref().map(RepositoryCredentials::digest),
            )
            .optional(
                "log_configuration",
                self.log_configuration.as_ref().map(LogConfiguration::digest),
            )
            .unordered(
                "port_mapping",
                self.port_mappings.iter().map(PortMapping::digest).collect(),
            );
        d.finish()
    }
}

/// A plain name and value pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyValue {
    /// Variable name. Required.
    pub name: Option<String>,
    /// Variable value
    pub value: Option<String>,
}

impl KeyValue {
    /// Create a pair
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
        }
    }

    /// Check that the name is set and non-empty
    pub fn validate(&self) -> ValidationErrors {
        validate_name(self.name.as_deref())
    }
}

fn validate_name(name: Option<&str>) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.push_when(name.is_none(), "must specify a name");
    errors.push_when(name == Some(""), "cannot specify an empty name");
    errors
}

/// An environment variable holding either a plaintext value or a secret reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentVariable {
    /// Variable name. Required.
    pub name: Option<String>,
    /// Plaintext value
    pub value: Option<String>,
    /// Secret supplying the value
    pub secret_opts: Option<SecretOptions>,
}

impl EnvironmentVariable {
    /// Create an empty environment variable
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set a plaintext value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Source the value from a secret
    pub fn with_secret_options(mut self, opts: SecretOptions) -> Self {
        self.secret_opts = Some(opts);
        self
    }

    /// Check that exactly one of the value and secret reference is set
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = validate_name(self.name.as_deref());
        errors.push_when(
            self.value.is_none() && self.secret_opts.is_none(),
            "must either specify a value or reference a secret",
        );
        errors.push_when(
            self.value.is_some() && self.secret_opts.is_some(),
            "cannot both specify a value and reference a secret",
        );
        if let Some(opts) = &self.secret_opts {
            errors.wrap("invalid secret options", opts.validate());
        }
        errors
    }

    fn digest(&self) -> String {
        let mut d = ContentDigest::new();
        d.optional("name", self.name.as_deref())
            .optional("value", self.value.as_deref())
            .optional(
                "secret_opts",
                self.secret_opts.as_ref().map(SecretOptions::digest),
            );
        d.finish()
    }
}

/// Reference to an existing secret, or a request to create one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretOptions {
    /// ID of an existing secret
    pub id: Option<String>,
    /// Friendly name. Required when creating a new secret.
    pub name: Option<String>,
    /// Value of a secret to create
    pub new_value: Option<String>,
    /// Whether the pod is responsible for deleting the secret
    pub owned: Option<bool>,
}

impl SecretOptions {
    /// Create empty secret options
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference an existing secret
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the friendly name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Request a new secret with this value
    pub fn with_new_value(mut self, value: impl Into<String>) -> Self {
        self.new_value = Some(value.into());
        self
    }

    /// Mark whether the pod owns the secret
    pub fn with_owned(mut self, owned: bool) -> Self {
        self.owned = Some(owned);
        self
    }

    /// Whether the pod owns the secret
    pub fn is_owned(&self) -> bool {
        self.owned.unwrap_or_default()
    }

    /// Check that exactly one of the ID and new value is set
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.push_when(
            self.id.is_none() && self.new_value.is_none(),
            "must specify either an existing secret ID or a new secret to be created",
        );
        errors.push_when(
            self.id.is_some() && self.new_value.is_some(),
            "cannot specify both an existing secret ID and a new secret to be created",
        );
        errors.push_when(
            self.new_value.is_some() && self.name.is_none(),
            "cannot specify a new secret to be created without a name",
        );
        errors.push_when(
            self.id.as_deref() == Some(""),
            "cannot specify an empty secret ID",
        );
        errors
    }

    fn digest(&self) -> String {
        let mut d = ContentDigest::new();
        d.optional("id", self.id.as_deref())
            .optional("name", self.name.as_deref())
            .optional("new_value", self.new_value.as_deref())
            .optional("owned", self.owned);
        d.finish()
    }
}

/// Credentials for pulling images from a private registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryCredentials {
    /// ID of an existing secret holding the credentials
    pub id: Option<String>,
    /// Friendly name. Required when storing new credentials.
    pub name: Option<String>,
    /// Credentials to store as a new secret
    pub new_creds: Option<StoredRepositoryCredentials>,
    /// Whether the pod is responsible for deleting the secret
    pub owned: Option<bool>,
}

impl RepositoryCredentials {
    /// Create empty repository credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference an existing secret
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the friendly name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Store these credentials as a new secret
    pub fn with_new_credentials(mut self, creds: StoredRepositoryCredentials) -> Self {
        self.new_creds = Some(creds);
        self
    }

    /// Mark whether the pod owns the secret
    pub fn with_owned(mut self, owned: bool) -> Self {
        self.owned = Some(owned);
        self
    }

    /// Whether the pod owns the secret
    pub fn is_owned(&self) -> bool {
        self.owned.unwrap_or_default()
    }

    /// Check that exactly one of the ID and new credentials is set
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.push_when(
            self.id.is_none() && self.new_creds.is_none(),
            "must specify either an existing secret ID or new credentials to create",
        );
        errors.push_when(
            self.id.is_some() && self.new_creds.is_some(),
            "cannot specify both an existing secret ID and a new secret to create",
        );
        errors.push_when(
            self.new_creds.is_some() && self.name.is_none(),
            "cannot specify a new secret to be created without a name",
        );
        errors.push_when(
            self.id.as_deref() == Some(""),
            "cannot specify an empty secret ID",
        );
        if let Some(creds) = &self.new_creds {
            errors.wrap("invalid new credentials to create", creds.validate());
        }
        errors
    }

    fn digest(&self) -> String {
        let mut d = ContentDigest::new();
        d.optional("id", self.id.as_deref())
            .optional("name", self.name.as_deref())
            .optional(
                "new_creds",
                self.new_creds.as_ref().map(StoredRepositoryCredentials::digest),
            )
            .optional("owned", self.owned);
        d.finish()
    }
}

/// Registry username and password, stored as a JSON secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRepositoryCredentials {
    /// Registry username
    pub username: Option<String>,
    /// Registry password
    pub password: Option<String>,
}

impl StoredRepositoryCredentials {
    /// Create credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Check that both fields are set and non-empty
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.push_when(
            self.username.as_deref().unwrap_or_default().is_empty(),
            "must specify a username",
        );
        errors.push_when(
            self.password.as_deref().unwrap_or_default().is_empty(),
            "must specify a password",
        );
        errors
    }

    fn digest(&self) -> String {
        let mut d = ContentDigest::new();
        d.optional("username", self.username.as_deref())
            .optional("password", self.password.as_deref());
        d.finish()
    }
}

/// Log driver and its options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfiguration {
    /// Log driver, e.g. `awslogs`
    pub log_driver: Option<String>,
    /// Driver options
    pub options: HashMap<String, String>,
}

impl LogConfiguration {
    /// Create an empty log configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log driver
    pub fn with_log_driver(mut self, driver: impl Into<String>) -> Self {
        self.log_driver = Some(driver.into());
        self
    }

    /// Replace the driver options
    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options = options;
        self
    }

    /// Check that the driver and its required options are set
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.push_when(self.log_driver.is_none(), "must specify a log driver");
        if self.options.is_empty() {
            errors.push("must specify log driver options");
            return errors;
        }
        for key in ["awslogs-group", "awslogs-region"] {
            errors.push_when(
                self.options.get(key).is_none_or(String::is_empty),
                format!("must specify {} in options", key),
            );
        }
        errors
    }

    fn digest(&self) -> String {
        let mut d = ContentDigest::new();
        d.optional("log_driver", self.log_driver.as_deref())
            .pairs("option", &self.options);
        d.finish()
    }
}

/// A container port, optionally bound to a host port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortMapping {
    /// Port inside the container. Required.
    pub container_port: Option<i32>,
    /// Port on the host
    pub host_port: Option<i32>,
}

impl PortMapping {
    /// Map the given container port
    pub fn new(container_port: i32) -> Self {
        Self {
            container_port: Some(container_port),
            host_port: None,
        }
    }

    /// Bind to a host port
    pub fn with_host_port(mut self, port: i32) -> Self {
        self.host_port = Some(port);
        self
    }

    /// Check that the ports are in range
    pub fn validate(&self) -> ValidationErrors {
        let in_range = |port: i32| port > MIN_PORT && port < MAX_PORT;
        let mut errors = ValidationErrors::new();
        errors.push_when(self.container_port.is_none(), "must specify a container port");
        errors.push_when(
            !in_range(self.container_port.unwrap_or_default()),
            format!("must specify a container port between {}-{}", MIN_PORT, MAX_PORT),
        );
        if let Some(host_port) = self.host_port {
            errors.push_when(
                !in_range(host_port),
                format!("must specify a host port between {}-{}", MIN_PORT, MAX_PORT),
            );
        }
        errors
    }

    fn digest(&self) -> String {
        let mut d = ContentDigest::new();
        d.optional("container_port", self.container_port)
            .optional("host_port", self.host_port);
        d.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_container_gets_random_name() {
        let validated = ContainerDefinition::new().with_image("alpine").validate();
        assert!(validated.is_valid());
        assert!(!validated.value.name.unwrap().is_empty());
    }

    #[test]
    fn test_invalid_container_keeps_name_unset() {
        let validated = ContainerDefinition::new().with_cpu(0).validate();
        assert!(validated.value.name.is_none());
        assert_eq!(validated.errors.len(), 2);
        assert_eq!(validated.errors.messages()[0], "must specify an image");
    }

    #[test]
    fn test_env_var_requires_exactly_one_source() {
        let neither = EnvironmentVariable::new().with_name("A");
        assert_eq!(
            neither.validate().messages(),
            ["must either specify a value or reference a secret"]
        );

        let both = EnvironmentVariable::new()
            .with_name("A")
            .with_value("v")
            .with_secret_options(SecretOptions::new().with_id("arn:secret"));
        assert_eq!(
            both.validate().messages(),
            ["cannot both specify a value and reference a secret"]
        );

        let secret = EnvironmentVariable::new()
            .with_name("A")
            .with_secret_options(SecretOptions::new().with_id("arn:secret"));
        assert!(secret.validate().is_empty());
    }

    #[test]
    fn test_new_secret_requires_name() {
        let errors = SecretOptions::new().with_new_value("v").validate();
        assert_eq!(
            errors.messages(),
            ["cannot specify a new secret to be created without a name"]
        );
        assert!(SecretOptions::new().with_id("").validate().messages()
            .contains(&"cannot specify an empty secret ID".to_string()));
    }

    #[test]
    fn test_repository_credentials_validate_new_creds() {
        let creds = RepositoryCredentials::new()
            .with_name("registry")
            .with_new_credentials(StoredRepositoryCredentials::new("user", ""));
        let errors = creds.validate();
        assert_eq!(
            errors.to_string(),
            "invalid new credentials to create: must specify a password"
        );
    }

    #[test]
    fn test_log_configuration_requires_awslogs_options() {
        let config = LogConfiguration::new()
            .with_log_driver("awslogs")
            .with_options(HashMap::from([(
                "awslogs-group".to_string(),
                "pods".to_string(),
            )]));
        assert_eq!(
            config.validate().messages(),
            ["must specify awslogs-region in options"]
        );
        assert_eq!(
            LogConfiguration::new().validate().len(),
            2,
            "driver and options are both missing"
        );
    }

    #[test]
    fn test_port_bounds() {
        assert!(PortMapping::new(8080).with_host_port(80).validate().is_empty());
        assert_eq!(PortMapping::new(0).validate().len(), 1);
        assert_eq!(PortMapping::new(65536).validate().len(), 1);
        assert_eq!(PortMapping::new(22).with_host_port(-1).validate().len(), 1);
        assert_eq!(PortMapping::default().validate().len(), 2);
    }

    #[test]
    fn test_stored_credentials_serialize_as_json_object() {
        let json = serde_json::to_value(StoredRepositoryCredentials::new("u", "p")).unwrap();
        assert_eq!(json, serde_json::json!({"username": "u", "password": "p"}));
    }

    #[test]
    fn test_container_digest_ignores_env_var_order() {
        let a = EnvironmentVariable::new().with_name("A").with_value("1");
        let b = EnvironmentVariable::new().with_name("B").with_value("2");
        let first = ContainerDefinition::new()
            .with_image("alpine")
            .with_environment_variables(vec![a.clone(), b.clone()]);
        let second = ContainerDefinition::new()
            .with_image("alpine")
            .with_environment_variables(vec![b, a]);
        assert_eq!(first.digest(), second.digest());

        let reordered_command = first.clone().with_command(["b", "a"]);
        assert_ne!(first.with_command(["a", "b"]).digest(), reordered_command.digest());
    }
}
