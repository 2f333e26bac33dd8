//! Mock gateway implementation for testing.
//!
//! Provides a scriptable, in-memory [`AuthGateway`] so session logic
//! can be tested at memory speed, without any HTTP.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::gateway::AuthGateway;
use crate::state::{RegisterRequest, UserProfile};

/// Scripted responses and call counters.
#[derive(Debug, Default)]
struct MockState {
    login: Option<String>,
    register: Option<bool>,
    profile: Option<UserProfile>,
    logout: Option<bool>,
    profile_delay: Option<Duration>,
    login_calls: usize,
    register_calls: usize,
    profile_calls: usize,
    logout_calls: usize,
}

/// Mock auth gateway.
///
/// Every operation resolves to its scripted response; unscripted
/// operations resolve to `None`, the failure shape. Clones share the
/// same script and counters.
#[derive(Debug, Clone, Default)]
pub struct MockAuthGateway {
    inner: Arc<Mutex<MockState>>,
}

impl MockAuthGateway {
    /// Create a gateway with every operation scripted to fail.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Script the login response.
    pub fn respond_login(&self, token: Option<String>) {
        self.lock().login = token;
    }

    /// Script the registration response.
    pub fn respond_register(&self, created: Option<bool>) {
        self.lock().register = created;
    }

    /// Script the profile response.
    pub fn respond_profile(&self, profile: Option<UserProfile>) {
        self.lock().profile = profile;
    }

    /// Script the logout response.
    pub fn respond_logout(&self, done: Option<bool>) {
        self.lock().logout = done;
    }

    /// Delay profile responses, to stage races with in-flight fetches.
    pub fn delay_profile(&self, delay: Duration) {
        self.lock().profile_delay = Some(delay);
    }

    /// How many times `login` was called.
    #[must_use]
    pub fn login_calls(&self) -> usize {
        self.lock().login_calls
    }

    /// How many times `register` was called.
    #[must_use]
    pub fn register_calls(&self) -> usize {
        self.lock().register_calls
    }

    /// How many times `profile` was called.
    #[must_use]
    pub fn profile_calls(&self) -> usize {
        self.lock().profile_calls
    }

    /// How many times `logout` was called.
    #[must_use]
    pub fn logout_calls(&self) -> usize {
        self.lock().logout_calls
    }
}

impl AuthGateway for MockAuthGateway {
    fn login(
        &self,
        _login: &str,
        _password: &str,
    ) -> impl Future<Output = Option<String>> + Send {
        let response = {
            let mut state = self.lock();
            state.login_calls += 1;
            state.login.clone()
        };
        async move { response }
    }

    fn register(
        &self,
        _request: &RegisterRequest,
    ) -> impl Future<Output = Option<bool>> + Send {
        let response = {
            let mut state = self.lock();
            state.register_calls += 1;
            state.register
        };
        async move { response }
    }

    fn profile(&self) -> impl Future<Output = Option<UserProfile>> + Send {
        // The guard is released before the delay; the future must be Send.
        let (response, delay) = {
            let mut state = self.lock();
            state.profile_calls += 1;
            (state.profile.clone(), state.profile_delay)
        };
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            response
        }
    }

    fn logout(&self) -> impl Future<Output = Option<bool>> + Send {
        let response = {
            let mut state = self.lock();
            state.logout_calls += 1;
            state.logout
        };
        async move { response }
    }
}

/// A fixed profile for tests.
#[must_use]
pub fn sample_profile() -> UserProfile {
    UserProfile {
        name: "Ada".to_owned(),
        surname: "Lovelace".to_owned(),
        patronymic: None,
        email: "ada@example.com".to_owned(),
        full_name: "Ada Lovelace".to_owned(),
        short_full_name: "Lovelace A.".to_owned(),
        initials: "AL".to_owned(),
    }
}
