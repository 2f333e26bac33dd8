//! # Wallflower Testing
//!
//! Test support for reducer-based features: a fluent Given-When-Then
//! harness plus matchers for the effect lists reducers return.
//!
//! ## Example
//!
//! ```ignore
//! use wallflower_testing::{ReducerTest, assertions::assert_has_future_effect};
//!
//! #[test]
//! fn test_login_dispatches_gateway_effect() {
//!     ReducerTest::new(SessionReducer::new())
//!         .with_env(test_environment())
//!         .given_state(SessionState::default())
//!         .when_action(SessionAction::LogIn {
//!             login: "ada".to_owned(),
//!             password: "secret".to_owned(),
//!         })
//!         .then_effects(|effects| {
//!             assert_has_future_effect(effects);
//!         })
//!         .run();
//! }
//! ```


pub use reducer_test::{ReducerTest, assertions};
