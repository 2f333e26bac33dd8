//! The session store.
//!
//! [`Session`] wraps a [`Store`] running the [`SessionReducer`] and
//! exposes the lifecycle as plain async calls: each command is sent into
//! the store, and the call resolves when the matching event action comes
//! back out.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use wallflower_api::config::{Endpoint, ServiceConfig};
use wallflower_api::error::ConfigError;
use wallflower_api::{ApiError, SourceService};
use wallflower_core::event_bus::EventBus;
use wallflower_core::storage::Storage;
use wallflower_runtime::Store;

use crate::actions::SessionAction;
use crate::constants::{AUTH_RESOURCE, keys};
use crate::environment::SessionEnvironment;
use crate::gateway::{ApiAuthGateway, AuthGateway};
use crate::reducer::SessionReducer;
use crate::state::{RegisterRequest, SessionState, UserProfile};

/// How long a lifecycle call waits for its event action.
const WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// A live session over a reducer-driven store.
///
/// Clones share the same store. State is only ever mutated by the
/// reducer; this type just sends actions and waits for outcomes.
///
/// # Example
///
/// ```ignore
/// let session = Session::connect(storage, events).await?;
/// if session.login("ada", "secret").await {
///     println!("welcome {:?}", session.user().await);
/// }
/// ```
#[derive(Clone)]
pub struct Session<G, S>
where
    G: AuthGateway + Clone + 'static,
    S: Storage + Clone + 'static,
{
    store: Arc<Store<SessionState, SessionAction, SessionEnvironment<G, S>, SessionReducer<G, S>>>,
}

impl<G, S> Session<G, S>
where
    G: AuthGateway + Clone + 'static,
    S: Storage + Clone + 'static,
{
    /// Restore a session from storage.
    ///
    /// Loads the persisted token and profile. When a token survived but
    /// its profile did not, the profile is fetched before this returns,
    /// so callers never observe an authenticated session that is still
    /// waiting on its profile. A failed fetch does not block restoring;
    /// the session comes back authenticated and profile-less.
    pub async fn restore(gateway: G, storage: S) -> Self {
        let token = storage.load_or(keys::TOKEN, String::new());
        let user: Option<UserProfile> = storage.load(keys::USER);
        let needs_profile = !token.is_empty() && user.is_none();

        let store = Store::new(
            SessionState { token, user },
            SessionReducer::new(),
            SessionEnvironment::new(gateway, storage),
        );
        let session = Self {
            store: Arc::new(store),
        };

        if needs_profile {
            let _ = session.refresh_profile().await;
        }
        session
    }

    /// Log in with credentials.
    ///
    /// Resolves once the session is established (or wasn't). On success
    /// the token is already persisted; the profile fetch continues in
    /// the background.
    pub async fn login(&self, login: &str, password: &str) -> bool {
        let outcome = self
            .store
            .send_and_wait_for(
                SessionAction::LogIn {
                    login: login.to_owned(),
                    password: password.to_owned(),
                },
                |action| {
                    matches!(
                        action,
                        SessionAction::LoggedIn { .. } | SessionAction::LogInFailed
                    )
                },
                WAIT_TIMEOUT,
            )
            .await;

        matches!(outcome, Ok(SessionAction::LoggedIn { .. }))
    }

    /// Create a new account.
    ///
    /// Registration never logs the account in; resolves to whether the
    /// account was created.
    pub async fn register(&self, request: RegisterRequest) -> bool {
        let outcome = self
            .store
            .send_and_wait_for(
                SessionAction::Register(request),
                |action| matches!(action, SessionAction::RegisterFinished { .. }),
                WAIT_TIMEOUT,
            )
            .await;

        matches!(
            outcome,
            Ok(SessionAction::RegisterFinished { created: true })
        )
    }

    /// Re-fetch the current user's profile.
    ///
    /// Resolves to whether a fresh profile arrived. On failure any
    /// cached profile is kept.
    pub async fn refresh_profile(&self) -> bool {
        let outcome = self
            .store
            .send_and_wait_for(
                SessionAction::RefreshProfile,
                |action| {
                    matches!(
                        action,
                        SessionAction::ProfileLoaded(_) | SessionAction::ProfileUnavailable
                    )
                },
                WAIT_TIMEOUT,
            )
            .await;

        matches!(outcome, Ok(SessionAction::ProfileLoaded(_)))
    }

    /// Log out.
    ///
    /// Local state and storage are only cleared once the backend
    /// confirms; resolves to whether that happened.
    pub async fn logout(&self) -> bool {
        let outcome = self
            .store
            .send_and_wait_for(
                SessionAction::LogOut,
                |action| {
                    matches!(
                        action,
                        SessionAction::LoggedOut | SessionAction::LogOutFailed
                    )
                },
                WAIT_TIMEOUT,
            )
            .await;

        matches!(outcome, Ok(SessionAction::LoggedOut))
    }

    /// Whether a session token is present.
    pub async fn is_authenticated(&self) -> bool {
        self.store.state(SessionState::is_authenticated).await
    }

    /// The current session token. Empty means unauthenticated.
    pub async fn token(&self) -> String {
        self.store.state(|state| state.token.clone()).await
    }

    /// The cached user profile, if one has been fetched.
    pub async fn user(&self) -> Option<UserProfile> {
        self.store.state(|state| state.user.clone()).await
    }

    /// Subscribe to the session's action feed.
    ///
    /// Observers see every action after it has been reduced, so state
    /// reads made on receipt are consistent with the action.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<SessionAction> {
        self.store.subscribe_actions()
    }
}

impl<S> Session<ApiAuthGateway<S>, S>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    /// Restore a session backed by the HTTP gateway under the default
    /// address.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub async fn connect(storage: S, events: EventBus<ApiError>) -> Result<Self, ConfigError> {
        let gateway = ApiAuthGateway::new(storage.clone(), events)?;
        Ok(Self::restore(gateway, storage).await)
    }

    /// Restore a session whose gateway talks to `address`.
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint does not resolve or the HTTP
    /// client cannot be constructed.
    pub async fn connect_to(
        address: &str,
        storage: S,
        events: EventBus<ApiError>,
    ) -> Result<Self, ConfigError> {
        let config = ServiceConfig::new(&Endpoint::remote(AUTH_RESOURCE, address))?;
        let service = SourceService::new(config, storage.clone(), events)?;
        let gateway = ApiAuthGateway::with_service(service);
        Ok(Self::restore(gateway, storage).await)
    }
}

impl<G, S> std::fmt::Debug for Session<G, S>
where
    G: AuthGateway + Clone + 'static,
    S: Storage + Clone + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
