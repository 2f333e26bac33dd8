//! Session constants.
//!
//! This module contains the storage keys, route paths, and backend
//! operation names used throughout the session system.

/// The backend resource the auth gateway talks to.
pub const AUTH_RESOURCE: &str = "auth";

/// Storage keys for persisted session data.
pub mod keys {
    /// The session token, sent as a bearer header on every call.
    pub const TOKEN: &str = wallflower_api::service::TOKEN_STORAGE_KEY;

    /// The cached user profile.
    pub const USER: &str = "user";

    /// The persisted UI theme preference.
    pub const APP_THEME: &str = "appTheme";

    /// The persisted sidebar expansion preference.
    pub const MENU_EXPANDED: &str = "menu-expanded";
}

/// Route paths the navigation guard redirects to.
pub mod routes {
    /// The login page, for unauthenticated visitors to protected routes.
    pub const LOGIN: &str = "/login";

    /// The home page, for authenticated visitors to guest-only routes.
    pub const HOME: &str = "/";
}

/// Backend operation names under the auth resource.
pub mod operations {
    /// Exchange credentials for a session token.
    pub const LOGIN: &str = "login";

    /// Fetch the current user's profile.
    pub const PROFILE: &str = "me";

    /// Create a new account.
    pub const REGISTER: &str = "register";

    /// Invalidate the session server-side.
    pub const LOGOUT: &str = "logout";
}
