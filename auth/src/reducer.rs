//! Session reducer.
//!
//! This reducer owns the session lifecycle: login, registration,
//! profile refresh, and logout.
//!
//! # Flow
//!
//! 1. A command arrives (`LogIn`, `Register`, `RefreshProfile`, `LogOut`)
//! 2. The reducer dispatches a gateway effect
//! 3. The effect resolves to an event (`LoggedIn`, `LogInFailed`, ...)
//! 4. The event mutates state and persists it
//!
//! Observers wait on the event actions; the commands themselves never
//! report an outcome.

use crate::actions::SessionAction;
use crate::constants::keys;
use crate::environment::SessionEnvironment;
use crate::gateway::AuthGateway;
use crate::state::SessionState;
use wallflower_core::effect::Effect;
use wallflower_core::reducer::Reducer;
use wallflower_core::storage::Storage;
use wallflower_core::{SmallVec, smallvec};

/// Session reducer.
///
/// Stateless; all dependencies arrive through the environment.
#[derive(Debug, Clone)]
pub struct SessionReducer<G, S> {
    /// Phantom data to hold type parameters.
    _phantom: std::marker::PhantomData<(G, S)>,
}

impl<G, S> SessionReducer<G, S> {
    /// Create a new session reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<G, S> Default for SessionReducer<G, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G, S> Reducer for SessionReducer<G, S>
where
    G: AuthGateway + Clone + 'static,
    S: Storage + Clone + 'static,
{
    type State = SessionState;
    type Action = SessionAction;
    type Environment = SessionEnvironment<G, S>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ═══════════════════════════════════════════════════════════════
            // LogIn: Exchange credentials for a token
            // ═══════════════════════════════════════════════════════════════
            SessionAction::LogIn { login, password } => {
                let gateway = env.gateway.clone();

                smallvec![Effect::Future(Box::pin(async move {
                    match gateway.login(&login, &password).await {
                        Some(token) if !token.is_empty() => {
                            Some(SessionAction::LoggedIn { token })
                        }
                        _ => Some(SessionAction::LogInFailed),
                    }
                }))]
            }

            // ═══════════════════════════════════════════════════════════════
            // LoggedIn: Persist the token, then chase the profile
            // ═══════════════════════════════════════════════════════════════
            SessionAction::LoggedIn { token } => {
                state.token = token;
                if let Err(error) = env.storage.save(keys::TOKEN, &state.token) {
                    tracing::warn!(%error, "failed to persist session token");
                }

                smallvec![Effect::Future(Box::pin(async move {
                    Some(SessionAction::RefreshProfile)
                }))]
            }

            // ═══════════════════════════════════════════════════════════════
            // Register: Create an account, without logging it in
            // ═══════════════════════════════════════════════════════════════
            SessionAction::Register(request) => {
                let gateway = env.gateway.clone();

                smallvec![Effect::Future(Box::pin(async move {
                    let created = matches!(gateway.register(&request).await, Some(true));
                    Some(SessionAction::RegisterFinished { created })
                }))]
            }

            // ═══════════════════════════════════════════════════════════════
            // RefreshProfile: Fetch the profile for the current token
            // ═══════════════════════════════════════════════════════════════
            SessionAction::RefreshProfile => {
                if state.token.is_empty() {
                    // Observers wait on a terminal profile action even
                    // when there is no token to present.
                    return smallvec![Effect::Future(Box::pin(async move {
                        Some(SessionAction::ProfileUnavailable)
                    }))];
                }

                let gateway = env.gateway.clone();
                smallvec![Effect::Future(Box::pin(async move {
                    match gateway.profile().await {
                        Some(profile) => Some(SessionAction::ProfileLoaded(profile)),
                        None => Some(SessionAction::ProfileUnavailable),
                    }
                }))]
            }

            // ═══════════════════════════════════════════════════════════════
            // ProfileLoaded: Cache and persist, unless the session is gone
            // ═══════════════════════════════════════════════════════════════
            SessionAction::ProfileLoaded(profile) => {
                if state.token.is_empty() {
                    // A logout swept through while the fetch was in flight.
                    tracing::debug!("discarding profile that arrived after logout");
                    return smallvec![Effect::None];
                }

                if let Err(error) = env.storage.save(keys::USER, &profile) {
                    tracing::warn!(%error, "failed to persist user profile");
                }
                state.user = Some(profile);
                smallvec![Effect::None]
            }

            // ═══════════════════════════════════════════════════════════════
            // ProfileUnavailable: Keep whatever profile is cached
            // ═══════════════════════════════════════════════════════════════
            SessionAction::ProfileUnavailable => {
                if state.user.is_some() {
                    tracing::warn!("profile refresh failed, keeping cached profile");
                }
                smallvec![Effect::None]
            }

            // ═══════════════════════════════════════════════════════════════
            // LogOut: Ask the backend to drop the session
            // ═══════════════════════════════════════════════════════════════
            SessionAction::LogOut => {
                let gateway = env.gateway.clone();

                smallvec![Effect::Future(Box::pin(async move {
                    match gateway.logout().await {
                        Some(true) => Some(SessionAction::LoggedOut),
                        _ => Some(SessionAction::LogOutFailed),
                    }
                }))]
            }

            // ═══════════════════════════════════════════════════════════════
            // LoggedOut: Clear state and storage
            // ═══════════════════════════════════════════════════════════════
            SessionAction::LoggedOut => {
                state.token.clear();
                state.user = None;

                for key in [keys::TOKEN, keys::USER] {
                    if let Err(error) = env.storage.remove(key) {
                        tracing::warn!(key, %error, "failed to clear stored session data");
                    }
                }
                smallvec![Effect::None]
            }

            // ═══════════════════════════════════════════════════════════════
            // Terminal events: Observed, never reduced further
            // ═══════════════════════════════════════════════════════════════
            SessionAction::LogInFailed
            | SessionAction::RegisterFinished { .. }
            | SessionAction::LogOutFailed => {
                smallvec![Effect::None]
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/panic
mod tests {
    use super::*;
    use crate::mocks::{MockAuthGateway, sample_profile};
    use crate::state::UserProfile;
    use wallflower_core::storage::MemoryStorage;
    use wallflower_testing::ReducerTest;
    use wallflower_testing::assertions::{assert_has_future_effect, assert_no_effects};

    type TestEnv = SessionEnvironment<MockAuthGateway, MemoryStorage>;

    fn test_env(gateway: MockAuthGateway) -> TestEnv {
        SessionEnvironment::new(gateway, MemoryStorage::new())
    }

    /// Resolve a single future effect to its follow-up action.
    fn resolve(
        mut effects: SmallVec<[Effect<SessionAction>; 4]>,
    ) -> Option<SessionAction> {
        assert_eq!(effects.len(), 1);
        let Some(Effect::Future(future)) = effects.pop() else {
            panic!("expected a future effect");
        };
        tokio_test::block_on(future)
    }

    #[test]
    fn test_login_success_resolves_to_logged_in() {
        let gateway = MockAuthGateway::new();
        gateway.respond_login(Some("tok123".to_owned()));

        let reducer = SessionReducer::new();
        let env = test_env(gateway.clone());
        let mut state = SessionState::default();

        let effects = reducer.reduce(
            &mut state,
            SessionAction::LogIn {
                login: "ada".to_owned(),
                password: "secret".to_owned(),
            },
            &env,
        );

        assert_eq!(
            resolve(effects),
            Some(SessionAction::LoggedIn {
                token: "tok123".to_owned()
            })
        );
        assert_eq!(gateway.login_calls(), 1);
    }

    #[test]
    fn test_login_empty_token_resolves_to_failure() {
        let gateway = MockAuthGateway::new();
        gateway.respond_login(Some(String::new()));

        let reducer = SessionReducer::new();
        let env = test_env(gateway);
        let mut state = SessionState::default();

        let effects = reducer.reduce(
            &mut state,
            SessionAction::LogIn {
                login: "ada".to_owned(),
                password: "secret".to_owned(),
            },
            &env,
        );

        assert_eq!(resolve(effects), Some(SessionAction::LogInFailed));
    }

    #[test]
    fn test_logged_in_persists_token_and_chases_profile() {
        let env = test_env(MockAuthGateway::new());
        let storage = env.storage.clone();

        let reducer = SessionReducer::new();
        let mut state = SessionState::default();
        let effects = reducer.reduce(
            &mut state,
            SessionAction::LoggedIn {
                token: "tok123".to_owned(),
            },
            &env,
        );

        assert_eq!(state.token, "tok123");
        assert_eq!(storage.load::<String>(keys::TOKEN).as_deref(), Some("tok123"));
        assert_eq!(resolve(effects), Some(SessionAction::RefreshProfile));
    }

    #[test]
    fn test_refresh_without_token_resolves_to_unavailable() {
        let gateway = MockAuthGateway::new();
        let reducer = SessionReducer::new();
        let env = test_env(gateway.clone());
        let mut state = SessionState::default();

        let effects = reducer.reduce(&mut state, SessionAction::RefreshProfile, &env);

        assert_eq!(resolve(effects), Some(SessionAction::ProfileUnavailable));
        assert_eq!(gateway.profile_calls(), 0);
    }

    #[test]
    fn test_refresh_with_token_fetches_profile() {
        let gateway = MockAuthGateway::new();
        gateway.respond_profile(Some(sample_profile()));

        let reducer = SessionReducer::new();
        let env = test_env(gateway);
        let mut state = SessionState {
            token: "tok123".to_owned(),
            user: None,
        };

        let effects = reducer.reduce(&mut state, SessionAction::RefreshProfile, &env);

        assert_eq!(
            resolve(effects),
            Some(SessionAction::ProfileLoaded(sample_profile()))
        );
    }

    #[test]
    fn test_profile_loaded_caches_and_persists() {
        let env = test_env(MockAuthGateway::new());
        let storage = env.storage.clone();

        let reducer = SessionReducer::new();
        let mut state = SessionState {
            token: "tok123".to_owned(),
            user: None,
        };
        let effects = reducer.reduce(
            &mut state,
            SessionAction::ProfileLoaded(sample_profile()),
            &env,
        );

        assert_no_effects(&effects);
        assert_eq!(state.user, Some(sample_profile()));
        assert_eq!(
            storage.load::<UserProfile>(keys::USER),
            Some(sample_profile())
        );
    }

    #[test]
    fn test_profile_arriving_after_logout_is_discarded() {
        let env = test_env(MockAuthGateway::new());
        let storage = env.storage.clone();

        let reducer = SessionReducer::new();
        let mut state = SessionState::default();
        let effects = reducer.reduce(
            &mut state,
            SessionAction::ProfileLoaded(sample_profile()),
            &env,
        );

        assert_no_effects(&effects);
        assert_eq!(state.user, None);
        assert_eq!(storage.load::<UserProfile>(keys::USER), None);
    }

    #[test]
    fn test_profile_unavailable_keeps_cached_profile() {
        ReducerTest::new(SessionReducer::new())
            .with_env(test_env(MockAuthGateway::new()))
            .given_state(SessionState {
                token: "tok123".to_owned(),
                user: Some(sample_profile()),
            })
            .when_action(SessionAction::ProfileUnavailable)
            .then_state(|state| {
                assert_eq!(state.user, Some(sample_profile()));
            })
            .then_effects(|effects| {
                assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn test_logout_dispatches_gateway_effect() {
        ReducerTest::new(SessionReducer::new())
            .with_env(test_env(MockAuthGateway::new()))
            .given_state(SessionState {
                token: "tok123".to_owned(),
                user: Some(sample_profile()),
            })
            .when_action(SessionAction::LogOut)
            .then_state(|state| {
                // Nothing is cleared until the backend confirms.
                assert!(state.is_authenticated());
            })
            .then_effects(|effects| {
                assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_logged_out_clears_state_and_storage() {
        let env = test_env(MockAuthGateway::new());
        let storage = env.storage.clone();
        storage.save(keys::TOKEN, "tok123").unwrap();
        storage.save(keys::USER, &sample_profile()).unwrap();

        let reducer = SessionReducer::new();
        let mut state = SessionState {
            token: "tok123".to_owned(),
            user: Some(sample_profile()),
        };
        let effects = reducer.reduce(&mut state, SessionAction::LoggedOut, &env);

        assert_no_effects(&effects);
        assert!(!state.is_authenticated());
        assert_eq!(state.user, None);
        assert_eq!(storage.get_raw(keys::TOKEN), None);
        assert_eq!(storage.get_raw(keys::USER), None);
    }

    #[test]
    fn test_register_reports_backend_confirmation() {
        let gateway = MockAuthGateway::new();
        gateway.respond_register(Some(true));

        let reducer = SessionReducer::new();
        let env = test_env(gateway.clone());
        let mut state = SessionState::default();

        let effects = reducer.reduce(
            &mut state,
            SessionAction::Register(crate::state::RegisterRequest::default()),
            &env,
        );

        assert_eq!(
            resolve(effects),
            Some(SessionAction::RegisterFinished { created: true })
        );
        assert!(!state.is_authenticated());
        assert_eq!(gateway.register_calls(), 1);
    }
}
