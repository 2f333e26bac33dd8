//! Route guard.
//!
//! Every navigation is checked against the session before it lands: a
//! route declares a [`RoutePolicy`], the guard answers with a
//! [`Navigation`] decision.

use crate::constants::routes;
use crate::gateway::AuthGateway;
use crate::session::Session;
use wallflower_core::storage::Storage;

/// What a route requires of its visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutePolicy {
    /// Only authenticated users may enter.
    pub requires_auth: bool,

    /// Only guests may enter (login and registration pages).
    pub requires_guest: bool,
}

impl RoutePolicy {
    /// A route for authenticated users only.
    #[must_use]
    pub const fn authenticated() -> Self {
        Self {
            requires_auth: true,
            requires_guest: false,
        }
    }

    /// A route for guests only.
    #[must_use]
    pub const fn guest() -> Self {
        Self {
            requires_auth: false,
            requires_guest: true,
        }
    }

    /// A route anyone may enter.
    #[must_use]
    pub const fn open() -> Self {
        Self {
            requires_auth: false,
            requires_guest: false,
        }
    }
}

/// The guard's decision for one navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Let the navigation through.
    Allow,

    /// Send the visitor to the login page.
    RedirectToLogin,

    /// Send the visitor to the home page.
    RedirectToHome,
}

impl Navigation {
    /// The path to redirect to, if the navigation was not allowed.
    #[must_use]
    pub const fn redirect_path(self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin => Some(routes::LOGIN),
            Self::RedirectToHome => Some(routes::HOME),
        }
    }
}

/// Decide a navigation against the current session.
///
/// An authenticated session with no cached profile refreshes it first,
/// so protected pages land with the profile already present. The
/// decision itself only looks at the token: a failed refresh does not
/// log the visitor out.
pub async fn check_navigation<G, S>(session: &Session<G, S>, policy: RoutePolicy) -> Navigation
where
    G: AuthGateway + Clone + 'static,
    S: Storage + Clone + 'static,
{
    if session.is_authenticated().await && session.user().await.is_none() {
        let _ = session.refresh_profile().await;
    }

    let authenticated = session.is_authenticated().await;
    if policy.requires_auth && !authenticated {
        return Navigation::RedirectToLogin;
    }
    if policy.requires_guest && authenticated {
        return Navigation::RedirectToHome;
    }
    Navigation::Allow
}
