//! # Wallflower Session
//!
//! This crate owns the authenticated session: logging in, keeping the
//! profile fresh, logging out, and guarding navigation, all built on the
//! Wallflower reducer architecture.
//!
//! ## Features
//!
//! - **Reducer-driven**: every session mutation flows through one reducer
//! - **Persistent**: token and profile survive restarts via [`Storage`]
//! - **Silent failures**: backend errors travel on the error bus, never
//!   through return values
//! - **Testable**: session logic runs at memory speed against a mock
//!   gateway
//!
//! ## Architecture
//!
//! ```text
//! Command → Reducer → Gateway Effect → Event → State + Storage
//!                                        ↓
//!                                    Observers
//! ```
//!
//! ## Example: Login
//!
//! ```rust,ignore
//! use wallflower_auth::Session;
//!
//! let session = Session::connect(storage, events).await?;
//! if session.login("ada", "secret").await {
//!     assert!(session.is_authenticated().await);
//! }
//! ```
//!
//! [`Storage`]: wallflower_core::storage::Storage

// Public modules
pub mod actions;
pub mod constants;
pub mod environment;
pub mod gateway;
pub mod guard;
pub mod reducer;
pub mod session;
pub mod state;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use actions::SessionAction;
pub use environment::SessionEnvironment;
pub use gateway::{ApiAuthGateway, AuthGateway};
pub use guard::{Navigation, RoutePolicy, check_navigation};
pub use reducer::SessionReducer;
pub use session::Session;
pub use state::{RegisterRequest, SessionState, UserProfile};
