//! Typed in-process event bus.
//!
//! This module provides [`EventBus`], a broadcast channel for fanning one
//! kind of event out to any number of subscribers. Producers publish
//! without knowing who is listening; publishing never blocks and never
//! fails, even with zero subscribers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   Producer   │ (request service, classifier, ...)
//! └──────┬───────┘
//!        │ publish(event)
//!        ▼
//! ┌──────────────┐
//! │   EventBus   │◄─── Fire-and-forget fan-out
//! └──────┬───────┘
//!        │
//!   ┌────┴─────┐
//!   ▼          ▼
//! ┌──────┐ ┌──────┐
//! │ Sub  │ │ Sub  │ (toast renderer, logger, tests, ...)
//! └──────┘ └──────┘
//! ```
//!
//! # Key Principles
//!
//! - **Decoupled producers**: publishing with no subscribers is a no-op
//! - **Per-subscriber cursors**: every subscription sees every event
//!   published after it was created
//! - **Bounded buffering**: slow subscribers skip over missed events
//!   rather than stalling producers
//!
//! # Example
//!
//! ```rust,ignore
//! use wallflower_core::event_bus::EventBus;
//!
//! let bus: EventBus<String> = EventBus::new();
//! let mut subscription = bus.subscribe();
//!
//! bus.publish("hello".to_string());
//!
//! if let Some(event) = subscription.next().await {
//!     println!("Received: {event}");
//! }
//! ```

use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default buffer capacity for a bus created with [`EventBus::new`].
pub const DEFAULT_CAPACITY: usize = 16;

/// A typed broadcast bus for one kind of event.
///
/// Cloning the bus is cheap and every clone publishes into the same
/// channel, so a bus can be handed to several producers.
pub struct EventBus<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    /// Create a bus with the default buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus buffering up to `capacity` events per subscriber.
    ///
    /// A subscriber that falls more than `capacity` events behind skips
    /// ahead to the oldest buffered event.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        // The broadcast channel rejects a zero capacity.
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers the event was delivered to.
    /// Publishing with no subscribers is not an error; the event is
    /// simply dropped.
    pub fn publish(&self, event: E) -> usize {
        match self.sender.send(event) {
            Ok(delivered) => delivered,
            Err(_) => {
                debug!("event published with no subscribers");
                0
            }
        }
    }

    /// Open a new subscription.
    ///
    /// The subscription only observes events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<E> {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of currently open subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

/// A single subscriber's view of an [`EventBus`].
pub struct Subscription<E> {
    receiver: broadcast::Receiver<E>,
}

impl<E: Clone> Subscription<E> {
    /// Wait for the next event.
    ///
    /// Returns `None` once the bus and all its clones have been dropped.
    /// If this subscriber lagged behind, the skipped events are logged
    /// and the next buffered event is returned.
    pub async fn next(&mut self) -> Option<E> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscription lagged, skipping missed events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next event if one is already buffered.
    ///
    /// Never waits. Returns `None` when the buffer is empty or the bus
    /// is closed.
    pub fn try_next(&mut self) -> Option<E> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscription lagged, skipping missed events");
                }
                Err(_) => return None,
            }
        }
    }
}

impl<E> std::fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_published_events() {
        let bus: EventBus<u32> = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.publish(7), 2);

        assert_eq!(first.next().await, Some(7));
        assert_eq!(second.next().await, Some(7));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let bus: EventBus<u32> = EventBus::new();
        assert_eq!(bus.publish(1), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscription_only_sees_events_after_creation() {
        let bus: EventBus<u32> = EventBus::new();
        bus.publish(1);

        let mut subscription = bus.subscribe();
        bus.publish(2);

        assert_eq!(subscription.next().await, Some(2));
        assert_eq!(subscription.try_next(), None);
    }

    #[tokio::test]
    async fn clones_publish_into_the_same_channel() {
        let bus: EventBus<&'static str> = EventBus::new();
        let mut subscription = bus.subscribe();

        let producer = bus.clone();
        producer.publish("from clone");

        assert_eq!(subscription.next().await, Some("from clone"));
    }

    #[tokio::test]
    async fn next_returns_none_when_bus_is_dropped() {
        let bus: EventBus<u32> = EventBus::new();
        let mut subscription = bus.subscribe();
        drop(bus);

        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn lagged_subscriber_skips_to_oldest_buffered_event() {
        let bus: EventBus<u32> = EventBus::with_capacity(2);
        let mut subscription = bus.subscribe();

        for event in 0..5 {
            bus.publish(event);
        }

        // Buffer holds the last two events only.
        assert_eq!(subscription.next().await, Some(3));
        assert_eq!(subscription.next().await, Some(4));
    }
}
