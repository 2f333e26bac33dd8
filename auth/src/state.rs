//! Session state types.
//!
//! This module defines the state managed by the session reducer. All
//! types are `Clone` to support the functional architecture pattern.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════
// Core State Types
// ═══════════════════════════════════════════════════════════════════════

/// Root session state.
///
/// The token and the profile are independently optional: a non-empty
/// token with no profile is a valid transient state while the profile
/// fetch is in flight. An empty token always implies no profile.
///
/// # Examples
///
/// ```
/// # use wallflower_auth::SessionState;
/// let state = SessionState::default();
/// assert!(!state.is_authenticated());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// The session token. Empty means unauthenticated.
    pub token: String,

    /// The cached user profile, once fetched.
    pub user: Option<UserProfile>,
}

impl SessionState {
    /// Whether a session token is present.
    ///
    /// The profile may still be missing; authentication is a property of
    /// the token alone.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }
}

/// A user profile as the backend returns it.
///
/// The display fields (`full_name`, `short_full_name`, `initials`) are
/// computed server-side; the client carries them verbatim. The backend
/// speaks snake_case, so the field names go on the wire as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Given name.
    pub name: String,

    /// Family name.
    pub surname: String,

    /// Patronymic, where the locale uses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patronymic: Option<String>,

    /// Contact email.
    pub email: String,

    /// Full display name, e.g. "Ada Lovelace".
    pub full_name: String,

    /// Abbreviated display name, e.g. "Lovelace A.".
    pub short_full_name: String,

    /// Monogram initials, e.g. "AL".
    pub initials: String,
}

// ═══════════════════════════════════════════════════════════════════════
// Requests
// ═══════════════════════════════════════════════════════════════════════

/// Payload for creating a new account.
///
/// Carries the same person fields as [`UserProfile`] plus the chosen
/// credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Given name.
    pub name: String,

    /// Family name.
    pub surname: String,

    /// Patronymic, where the locale uses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patronymic: Option<String>,

    /// Contact email.
    pub email: String,

    /// Chosen login.
    pub login: String,

    /// Chosen password.
    pub password: String,
}
