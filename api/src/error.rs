//! Error types for service configuration.

use thiserror::Error;

/// Errors raised while building a service configuration or client.
///
/// These surface misconfiguration at construction time; once a service
/// is built, request failures travel over the error bus instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No endpoint was supplied where one is required.
    #[error("Service endpoint is required")]
    MissingEndpoint,

    /// The plain endpoint string was empty or whitespace.
    #[error("Service endpoint is empty")]
    EmptyEndpoint,

    /// The structured endpoint's address was empty or whitespace.
    #[error("Service endpoint address is empty")]
    EmptyAddress,

    /// The structured endpoint's contract was empty or whitespace.
    #[error("Service endpoint contract is empty")]
    EmptyContract,

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}
