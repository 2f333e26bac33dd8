//! Session environment.
//!
//! This module defines the environment type for dependency injection
//! in the session reducer.

use crate::gateway::AuthGateway;
use wallflower_core::storage::Storage;

/// Session environment.
///
/// Contains the external dependencies the session reducer needs: the
/// backend gateway and the storage the token and profile persist in.
#[derive(Clone)]
pub struct SessionEnvironment<G, S>
where
    G: AuthGateway + Clone,
    S: Storage + Clone,
{
    /// Backend gateway.
    pub gateway: G,

    /// Persistent storage for the token and cached profile.
    pub storage: S,
}

impl<G, S> SessionEnvironment<G, S>
where
    G: AuthGateway + Clone,
    S: Storage + Clone,
{
    /// Create an environment from its dependencies.
    pub const fn new(gateway: G, storage: S) -> Self {
        Self { gateway, storage }
    }
}
