//! # Wallflower Core
//!
//! Building blocks for a client-side session and request pipeline: pure
//! reducers with explicit effects, a typed [`event_bus`], and pluggable
//! key/value [`storage`].
//!
//! A feature is modeled as a state type, an action enum covering both the
//! intents a caller can express and the outcomes effects report back, and
//! a [`reducer::Reducer`] that folds actions into state. Anything touching
//! the outside world is returned from the reducer as an [`effect::Effect`]
//! value and executed later by the runtime crate, which keeps every
//! reducer a plain synchronous function under test.
//!
//! ```ignore
//! use wallflower_core::effect::Effect;
//! use wallflower_core::reducer::Reducer;
//! use wallflower_core::{SmallVec, smallvec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct PreferencesState {
//!     dark_theme: bool,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum PreferencesAction {
//!     ToggleTheme,
//! }
//!
//! struct PreferencesReducer;
//!
//! impl Reducer for PreferencesReducer {
//!     type State = PreferencesState;
//!     type Action = PreferencesAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut PreferencesState,
//!         action: PreferencesAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<PreferencesAction>; 4]> {
//!         let PreferencesAction::ToggleTheme = action;
//!         state.dark_theme = !state.dark_theme;
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod event_bus;
pub mod storage;

/// The reducer abstraction every feature implements.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Folds actions into state and names the side effects to run next.
    ///
    /// Implementations carry no mutable state of their own; everything
    /// that changes lives in `State`, and everything external comes in
    /// through `Environment`. That split is what lets a reducer be driven
    /// exhaustively in tests with nothing but a scripted environment.
    ///
    /// ```ignore
    /// impl Reducer for SessionReducer {
    ///     type State = SessionState;
    ///     type Action = SessionAction;
    ///     type Environment = SessionEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut Self::State,
    ///         action: Self::Action,
    ///         env: &Self::Environment,
    ///     ) -> SmallVec<[Effect<Self::Action>; 4]> {
    ///         smallvec![Effect::None]
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// State the reducer owns.
        type State;
        /// Inputs: caller intents plus the outcomes effects feed back.
        type Action;
        /// Dependencies injected when the store is built.
        type Environment;

        /// Apply `action` to `state` and return the effects to execute.
        ///
        /// State is mutated in place. The inline capacity of four covers
        /// the widest fan-out a single action produces; the common
        /// one-effect path never touches the heap.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Side effects as values.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Work a reducer wants performed after it returns.
    ///
    /// Reducers only describe the work; the runtime store interprets the
    /// description. A `Future` resolving to `Some(action)` feeds that
    /// action back into the reducer, which is how a multi-step flow
    /// (request, then response, then state update) is written.
    pub enum Effect<Action> {
        /// Nothing to do.
        None,

        /// Run an async computation; feed any produced action back.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Dispatch `action` once `duration` has elapsed.
        Delay {
            /// How long to wait first.
            duration: Duration,
            /// What to dispatch afterwards.
            action: Box<Action>,
        },

        /// Run all of these concurrently.
        Parallel(Vec<Effect<Action>>),

        /// Run these one at a time, each waiting out the one before it.
        Sequential(Vec<Effect<Action>>),
    }

    impl<Action> Effect<Action> {
        /// Pair this effect with another to run concurrently.
        #[must_use]
        pub fn merge(self, other: Self) -> Self {
            Self::Parallel(vec![self, other])
        }

        /// Run `other` only after this effect has fully completed.
        #[must_use]
        pub fn chain(self, other: Self) -> Self {
            Self::Sequential(vec![self, other])
        }
    }

    // Boxed futures are opaque, and Action deliberately isn't required to
    // be Debug here.
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::None => write!(f, "Effect::None"),
                Self::Future(_) => write!(f, "Effect::Future(...)"),
                Self::Delay { duration, .. } => write!(f, "Effect::Delay({duration:?})"),
                Self::Parallel(effects) => write!(f, "Effect::Parallel({} effects)", effects.len()),
                Self::Sequential(effects) => {
                    write!(f, "Effect::Sequential({} effects)", effects.len())
                }
            }
        }
    }

}
