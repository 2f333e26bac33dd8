//! Service configuration: endpoint resolution and operation bindings.
//!
//! A service is described declaratively (often straight from JSON embedded
//! in route metadata) and resolved once at construction time into a fully
//! qualified base address plus the sub-paths for each standard operation.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Base address used when an endpoint does not carry its own absolute address.
pub const DEFAULT_BASE_ADDRESS: &str = "http://localhost:8000/";

/// Response field used to identify entities unless overridden.
pub const DEFAULT_KEY_PROPERTY: &str = "id";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a service's backend resource lives.
///
/// The plain form names a resource under the default base address; the
/// structured form points at another deployment (an absolute address, or
/// an address relative to the default one) plus the contract mounted there.
///
/// Deserializes from either a JSON string or an object:
///
/// ```json
/// "users"
/// { "contract": "auth", "address": "https://sso.example.com" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    /// A resource path appended to the default base address.
    Path(String),
    /// A contract hosted at an explicit address.
    Remote {
        /// Contract (resource group) mounted at the address.
        contract: String,
        /// Absolute address, or an address fragment relative to the default.
        address: String,
    },
}

impl Endpoint {
    /// A plain endpoint under the default base address.
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// A structured endpoint addressing a contract at another deployment.
    #[must_use]
    pub fn remote(contract: impl Into<String>, address: impl Into<String>) -> Self {
        Self::Remote {
            contract: contract.into(),
            address: address.into(),
        }
    }
}

/// Resolve an endpoint against a default base address.
///
/// The result always ends with exactly one `/`, ready for operation
/// paths to be appended. An existing trailing `/` is never doubled.
///
/// # Errors
///
/// - [`ConfigError::EmptyEndpoint`] when a plain endpoint is blank
/// - [`ConfigError::EmptyAddress`] / [`ConfigError::EmptyContract`] when a
///   structured endpoint has a blank part
///
/// # Example
///
/// ```
/// use wallflower_api::config::{DEFAULT_BASE_ADDRESS, Endpoint, resolve_address};
///
/// let address = resolve_address(DEFAULT_BASE_ADDRESS, &Endpoint::path("users"));
/// assert_eq!(address.as_deref(), Ok("http://localhost:8000/users/"));
///
/// let remote = Endpoint::remote("auth", "https://sso.example.com");
/// let address = resolve_address(DEFAULT_BASE_ADDRESS, &remote);
/// assert_eq!(address.as_deref(), Ok("https://sso.example.com/auth/"));
/// ```
pub fn resolve_address(default_address: &str, endpoint: &Endpoint) -> Result<String, ConfigError> {
    match endpoint {
        Endpoint::Path(path) => {
            if path.trim().is_empty() {
                return Err(ConfigError::EmptyEndpoint);
            }
            let mut address = format!("{default_address}{path}");
            ensure_trailing_slash(&mut address);
            Ok(address)
        }
        Endpoint::Remote { contract, address } => {
            if address.trim().is_empty() {
                return Err(ConfigError::EmptyAddress);
            }
            if contract.trim().is_empty() {
                return Err(ConfigError::EmptyContract);
            }

            // An absolute address replaces the default; anything else is
            // treated as a fragment under it.
            let mut resolved = if address.starts_with("http") {
                address.clone()
            } else {
                format!("{default_address}{address}")
            };
            ensure_trailing_slash(&mut resolved);
            resolved.push_str(contract);
            ensure_trailing_slash(&mut resolved);
            Ok(resolved)
        }
    }
}

fn ensure_trailing_slash(address: &mut String) {
    if !address.ends_with('/') {
        address.push('/');
    }
}

/// The standard operations a bound service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// List entities.
    Query,
    /// Create an entity.
    Create,
    /// Delete an entity.
    Delete,
    /// Update an entity.
    Update,
    /// Read a single entity.
    Read,
}

/// Sub-paths for the standard operations, relative to the service address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    /// Path for [`Operation::Query`].
    pub query: String,
    /// Path for [`Operation::Create`].
    pub create: String,
    /// Path for [`Operation::Delete`].
    pub delete: String,
    /// Path for [`Operation::Update`].
    pub update: String,
    /// Path for [`Operation::Read`].
    pub read: String,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            query: "list".to_owned(),
            create: "create".to_owned(),
            delete: "delete".to_owned(),
            update: "update".to_owned(),
            read: "read".to_owned(),
        }
    }
}

impl Bindings {
    /// The sub-path bound to `operation`.
    #[must_use]
    pub fn path(&self, operation: Operation) -> &str {
        match operation {
            Operation::Query => &self.query,
            Operation::Create => &self.create,
            Operation::Delete => &self.delete,
            Operation::Update => &self.update,
            Operation::Read => &self.read,
        }
    }

    /// Apply per-service overrides on top of these bindings.
    #[must_use]
    pub fn merge(mut self, overrides: BindingOverrides) -> Self {
        if let Some(query) = overrides.query {
            self.query = query;
        }
        if let Some(create) = overrides.create {
            self.create = create;
        }
        if let Some(delete) = overrides.delete {
            self.delete = delete;
        }
        if let Some(update) = overrides.update {
            self.update = update;
        }
        if let Some(read) = overrides.read {
            self.read = read;
        }
        self
    }
}

/// Partial operation bindings; absent fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BindingOverrides {
    /// Override for [`Operation::Query`].
    pub query: Option<String>,
    /// Override for [`Operation::Create`].
    pub create: Option<String>,
    /// Override for [`Operation::Delete`].
    pub delete: Option<String>,
    /// Override for [`Operation::Update`].
    pub update: Option<String>,
    /// Override for [`Operation::Read`].
    pub read: Option<String>,
}

/// Declarative service description, as embedded in route metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Where the backend resource lives. Required to build a config.
    pub endpoint: Option<Endpoint>,
    /// Operation binding overrides.
    #[serde(default)]
    pub bindings: BindingOverrides,
    /// Override for the entity key property.
    pub key_property: Option<String>,
}

/// Resolved configuration for one `SourceService`.
///
/// # Example
///
/// ```
/// use wallflower_api::config::{Endpoint, Operation, ServiceConfig};
///
/// let config = ServiceConfig::new(&Endpoint::path("projects"))?;
///
/// assert_eq!(config.base_address(), "http://localhost:8000/projects/");
/// assert_eq!(config.bindings().path(Operation::Query), "list");
/// assert_eq!(config.key_property(), "id");
/// # Ok::<(), wallflower_api::error::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    base_address: String,
    bindings: Bindings,
    key_property: String,
    timeout: Duration,
}

impl ServiceConfig {
    /// Resolve a configuration from an endpoint, with default bindings,
    /// key property, and timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the endpoint does not resolve.
    pub fn new(endpoint: &Endpoint) -> Result<Self, ConfigError> {
        Ok(Self {
            base_address: resolve_address(DEFAULT_BASE_ADDRESS, endpoint)?,
            bindings: Bindings::default(),
            key_property: DEFAULT_KEY_PROPERTY.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Build a configuration from a declarative spec.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEndpoint`] when the spec has no
    /// endpoint, or the endpoint's own resolution error.
    pub fn from_spec(spec: ServiceSpec) -> Result<Self, ConfigError> {
        let endpoint = spec.endpoint.ok_or(ConfigError::MissingEndpoint)?;
        let mut config = Self::new(&endpoint)?;
        config.bindings = config.bindings.merge(spec.bindings);
        if let Some(key_property) = spec.key_property {
            config.key_property = key_property;
        }
        Ok(config)
    }

    /// Replace operation bindings with overrides applied to the defaults.
    #[must_use]
    pub fn with_bindings(mut self, overrides: BindingOverrides) -> Self {
        self.bindings = self.bindings.merge(overrides);
        self
    }

    /// Override the entity key property.
    #[must_use]
    pub fn with_key_property(mut self, key_property: impl Into<String>) -> Self {
        self.key_property = key_property.into();
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fully qualified service address, ending in `/`.
    #[must_use]
    pub fn base_address(&self) -> &str {
        &self.base_address
    }

    /// Operation bindings.
    #[must_use]
    pub const fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Response field identifying entities.
    #[must_use]
    pub fn key_property(&self) -> &str {
        &self.key_property
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}
