//! Session actions.
//!
//! This module defines all possible inputs to the session reducer:
//! commands express user intent, events report what an effect produced.

use crate::state::{RegisterRequest, UserProfile};

/// Session action.
///
/// Every command dispatches an effect that resolves to one of the event
/// variants; observers wait on the events to learn an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    // ═══════════════════════════════════════════════════════════════════════
    // Login Flow
    // ═══════════════════════════════════════════════════════════════════════
    /// Exchange credentials for a session token.
    LogIn {
        /// Account login.
        login: String,

        /// Account password.
        password: String,
    },

    /// A token came back; the session is established.
    ///
    /// Persists the token and chases it with a profile refresh.
    LoggedIn {
        /// The session token the backend issued.
        token: String,
    },

    /// The backend rejected the credentials or was unreachable.
    LogInFailed,

    // ═══════════════════════════════════════════════════════════════════════
    // Registration
    // ═══════════════════════════════════════════════════════════════════════
    /// Create a new account.
    ///
    /// Registration never logs the new account in; the user signs in
    /// afterwards with the credentials they chose.
    Register(RegisterRequest),

    /// The registration attempt resolved.
    RegisterFinished {
        /// Whether the account was created.
        created: bool,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Profile
    // ═══════════════════════════════════════════════════════════════════════
    /// Fetch the current user's profile.
    RefreshProfile,

    /// A profile came back.
    ProfileLoaded(UserProfile),

    /// The profile fetch failed; any cached profile is kept.
    ProfileUnavailable,

    // ═══════════════════════════════════════════════════════════════════════
    // Logout
    // ═══════════════════════════════════════════════════════════════════════
    /// Invalidate the session server-side.
    LogOut,

    /// The backend confirmed the logout; local state is cleared.
    LoggedOut,

    /// The backend rejected the logout; the session stays as it was.
    LogOutFailed,
}
