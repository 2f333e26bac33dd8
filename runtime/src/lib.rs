//! # Wallflower Runtime
//!
//! The imperative shell around reducers: the [`Store`] owns state, runs
//! reductions, and executes the effects they return.
//!
//! Sending an action reduces it synchronously under a write lock, then
//! spawns its effects onto the tokio runtime. When an effect resolves to a
//! follow-up action, the store reduces that action too and publishes it on
//! an action feed, so callers can drive request/response flows with
//! [`Store::send_and_wait_for`] instead of polling state.
//!
//! ```ignore
//! use std::time::Duration;
//! use wallflower_runtime::Store;
//!
//! let store = Store::new(SessionState::default(), reducer, environment);
//!
//! // Fire-and-forget: returns once effects are spawned.
//! let mut handle = store.send(SessionAction::RefreshProfile).await;
//!
//! // Or block until everything the send started has settled.
//! handle.wait_with_timeout(Duration::from_secs(5)).await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, watch};
use wallflower_core::{effect::Effect, reducer::Reducer};

/// Failures surfaced by the store's waiting APIs.
pub mod error {
    use thiserror::Error;

    /// Why a wait on the store gave up.
    ///
    /// Sending is infallible; only `send_and_wait_for` and
    /// `EffectHandle::wait_with_timeout` return these.
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// The deadline passed before the awaited outcome arrived.
        #[error("timed out waiting on the store")]
        Timeout,

        /// The action feed shut down, so the outcome can never arrive.
        ///
        /// Happens only once the store and every clone of it are gone.
        #[error("store action feed closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// How many actions the feed retains for a slow observer.
const ACTION_FEED_CAPACITY: usize = 16;

/// Books the in-flight effects of a single `send` call.
///
/// Every spawned effect holds an [`InFlight`] entry; the paired
/// [`EffectHandle`] blocks until the entry count drains to zero.
struct EffectLedger {
    in_flight: Arc<AtomicUsize>,
    wake: watch::Sender<()>,
}

impl EffectLedger {
    fn new() -> Self {
        let (wake, _) = watch::channel(());
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            wake,
        }
    }

    /// Book one effect. The entry is released when the guard drops,
    /// panicking effects included.
    fn begin(&self) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight {
            in_flight: Arc::clone(&self.in_flight),
            wake: self.wake.clone(),
        }
    }

    fn handle(&self) -> EffectHandle {
        EffectHandle {
            in_flight: Arc::clone(&self.in_flight),
            wake: self.wake.subscribe(),
        }
    }
}

/// One booked effect; releases its ledger entry on drop.
struct InFlight {
    in_flight: Arc<AtomicUsize>,
    wake: watch::Sender<()>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Last entry out wakes the waiters.
            let _ = self.wake.send(());
        }
    }
}

/// Completion handle for the effects spawned by one [`Store::send`].
///
/// `send` returns as soon as effect execution has been started. The handle
/// is how callers block until those effects, and the round of feedback
/// reductions they trigger, have been processed.
///
/// ```ignore
/// let mut handle = store.send(SessionAction::LogOut).await;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    in_flight: Arc<AtomicUsize>,
    wake: watch::Receiver<()>,
}

impl EffectHandle {
    /// A handle with nothing left to wait for.
    ///
    /// Handy as the seed value when sends happen in a loop:
    ///
    /// ```ignore
    /// let mut last = EffectHandle::completed();
    /// for action in actions {
    ///     last = store.send(action).await;
    /// }
    /// last.wait().await;
    /// ```
    #[must_use]
    pub fn completed() -> Self {
        // A fresh ledger has no entries, so its handle never blocks.
        EffectLedger::new().handle()
    }

    /// Block until every booked effect has finished.
    pub async fn wait(&mut self) {
        loop {
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            // An error here means every guard is gone, which implies the
            // count already drained; the next pass observes that.
            let _ = self.wake.changed().await;
        }
    }

    /// Like [`wait`](Self::wait), bounded by a deadline.
    ///
    /// # Errors
    ///
    /// [`StoreError::Timeout`] if effects are still running when the
    /// deadline passes.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Runtime coordinator for one reducer.
///
/// Owns the state behind an `RwLock`, the reducer, and the environment the
/// reducer reads its dependencies from. Cloning a store is cheap; every
/// clone operates on the same state and the same action feed.
///
/// # Type Parameters
///
/// - `S`: state
/// - `A`: action
/// - `E`: environment
/// - `R`: the reducer driving the other three
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    /// Feed of actions produced by effects. Initial actions passed to
    /// `send` are not published, only feedback is.
    action_feed: broadcast::Sender<A>,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Build a store from its three parts.
    ///
    /// The action feed buffers the 16 most recent feedback actions per
    /// observer; a session-scoped store stays well under that.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        let (action_feed, _) = broadcast::channel(ACTION_FEED_CAPACITY);

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            action_feed,
        }
    }

    /// Reduce `action` and kick off the effects it returns.
    ///
    /// The reduction itself is synchronous: when `send` returns, state
    /// already reflects the action. Effects run on spawned tasks and may
    /// still be in flight; the returned [`EffectHandle`] waits for them.
    ///
    /// Concurrent sends serialize at the state lock, so reductions never
    /// interleave, but the effects of different sends do.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn send(&self, action: A) -> EffectHandle
    where
        R: Clone,
        E: Clone,
    {
        let effects = {
            let mut state = self.state.write().await;
            self.reducer.reduce(&mut state, action, &self.environment)
        };
        tracing::trace!(count = effects.len(), "reduction returned effects");

        let ledger = EffectLedger::new();
        let handle = ledger.handle();
        for effect in effects {
            self.spawn_effect(effect, &ledger);
        }

        handle
    }

    /// Send `action`, then block until the feed carries an action matching
    /// `predicate` or until `timeout` expires.
    ///
    /// A matching action has already been reduced by the time it shows up
    /// on the feed, so reading state after this returns observes the
    /// settled outcome.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`] when nothing matched in time.
    /// - [`StoreError::ChannelClosed`] when the feed shut down mid-wait.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let outcome = store.send_and_wait_for(
    ///     SessionAction::LogIn { login, password },
    ///     |a| matches!(a, SessionAction::LoggedIn { .. } | SessionAction::LogInFailed),
    ///     Duration::from_secs(30),
    /// ).await?;
    /// ```
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        R: Clone,
        E: Clone,
        F: Fn(&A) -> bool,
    {
        // Subscribe first so the outcome cannot slip past between the send
        // and the wait.
        let mut feed = self.action_feed.subscribe();
        self.send(action).await;

        let waited = tokio::time::timeout(timeout, async move {
            loop {
                match feed.recv().await {
                    Ok(seen) if predicate(&seen) => break Ok(seen),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Keep listening; if the match was among the dropped
                        // actions, the timeout reports it.
                        tracing::warn!(missed, "action feed observer fell behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break Err(StoreError::ChannelClosed);
                    }
                }
            }
        })
        .await;

        match waited {
            Ok(outcome) => outcome,
            Err(_) => Err(StoreError::Timeout),
        }
    }

    /// Observe the action feed.
    ///
    /// Every feedback action is published after it has been reduced, in
    /// reduction order. A receiver that falls behind skips ahead and gets
    /// `RecvError::Lagged` once.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.action_feed.subscribe()
    }

    /// Read a projection of current state.
    ///
    /// The read lock is held only for the closure, so keep it small and
    /// clone out what you need:
    ///
    /// ```ignore
    /// let token = store.state(|s| s.token.clone()).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Reduce a feedback action, then publish it on the feed.
    ///
    /// Reduction comes first so an observer matching the published action
    /// reads state the action has already settled into.
    async fn feed_back(&self, action: A)
    where
        R: Clone,
        E: Clone,
    {
        let _ = self.send(action.clone()).await;
        let _ = self.action_feed.send(action);
    }

    fn spawn_effect(&self, effect: Effect<A>, ledger: &EffectLedger)
    where
        R: Clone,
        E: Clone,
    {
        match effect {
            Effect::None => {
                // Nothing to book.
            }
            Effect::Future(fut) => {
                let entry = ledger.begin();
                let store = self.clone();
                tokio::spawn(async move {
                    let _entry = entry;
                    match fut.await {
                        Some(action) => store.feed_back(action).await,
                        None => tracing::trace!("effect resolved without a follow-up"),
                    }
                });
            }
            Effect::Delay { duration, action } => {
                let entry = ledger.begin();
                let store = self.clone();
                tokio::spawn(async move {
                    let _entry = entry;
                    tokio::time::sleep(duration).await;
                    store.feed_back(*action).await;
                });
            }
            Effect::Parallel(effects) => {
                // Siblings book into the same ledger and race freely.
                for effect in effects {
                    self.spawn_effect(effect, ledger);
                }
            }
            Effect::Sequential(effects) => {
                let entry = ledger.begin();
                let store = self.clone();
                tokio::spawn(async move {
                    let _entry = entry;
                    for effect in effects {
                        // Each step gets its own ledger so the next step
                        // starts only after this one fully drains.
                        let step = EffectLedger::new();
                        let mut done = step.handle();
                        store.spawn_effect(effect, &step);
                        drop(step);
                        done.wait().await;
                    }
                });
            }
        }
    }
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            action_feed: self.action_feed.clone(),
        }
    }
}
