//! The backend gateway the session reducer talks through.
//!
//! The reducer never sees HTTP. It sees [`AuthGateway`]: four async
//! operations that resolve to `Some` on success and `None` on any
//! failure. Failures themselves travel on the service's error bus.

use std::future::Future;

use serde::Serialize;
use wallflower_api::config::{Endpoint, ServiceConfig};
use wallflower_api::error::ConfigError;
use wallflower_api::{ApiError, SourceService};
use wallflower_core::event_bus::EventBus;
use wallflower_core::storage::Storage;

use crate::constants::{AUTH_RESOURCE, operations};
use crate::state::{RegisterRequest, UserProfile};

/// Backend session operations.
///
/// Every method resolves to `None` on failure. Nothing here returns an
/// error: classification and user notification happen on the error bus,
/// and the reducer only needs to know whether the operation landed.
pub trait AuthGateway: Send + Sync {
    /// Exchange credentials for a session token.
    fn login(
        &self,
        login: &str,
        password: &str,
    ) -> impl Future<Output = Option<String>> + Send;

    /// Create a new account.
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Option<bool>> + Send;

    /// Fetch the profile of the user the current token belongs to.
    fn profile(&self) -> impl Future<Output = Option<UserProfile>> + Send;

    /// Invalidate the session server-side.
    fn logout(&self) -> impl Future<Output = Option<bool>> + Send;
}

/// Login payload.
#[derive(Serialize)]
struct Credentials<'a> {
    login: &'a str,
    password: &'a str,
}

/// An [`AuthGateway`] backed by a [`SourceService`] bound to the `auth`
/// resource.
#[derive(Debug, Clone)]
pub struct ApiAuthGateway<S> {
    service: SourceService<S>,
}

impl<S> ApiAuthGateway<S>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    /// Build a gateway for the `auth` resource under the default address.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(storage: S, events: EventBus<ApiError>) -> Result<Self, ConfigError> {
        let config = ServiceConfig::new(&Endpoint::path(AUTH_RESOURCE))?;
        Ok(Self::with_service(SourceService::new(
            config, storage, events,
        )?))
    }

    /// Wrap an already-configured service.
    #[must_use]
    pub const fn with_service(service: SourceService<S>) -> Self {
        Self { service }
    }
}

impl<S> AuthGateway for ApiAuthGateway<S>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    fn login(
        &self,
        login: &str,
        password: &str,
    ) -> impl Future<Output = Option<String>> + Send {
        async move {
            self.service
                .call(operations::LOGIN)
                .json(&Credentials { login, password })
                .send()
                .await
        }
    }

    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Option<bool>> + Send {
        async move {
            self.service
                .call(operations::REGISTER)
                .json(request)
                .send()
                .await
        }
    }

    fn profile(&self) -> impl Future<Output = Option<UserProfile>> + Send {
        async move { self.service.call(operations::PROFILE).send().await }
    }

    fn logout(&self) -> impl Future<Output = Option<bool>> + Send {
        async move { self.service.call(operations::LOGOUT).send().await }
    }
}
