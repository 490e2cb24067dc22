//! Multi-subscriber event fan-out.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::trace;

use super::stream::EventStream;

/// Publishes events to every live [`EventStream`].
///
/// Each subscriber owns an unbounded channel, so `publish` never waits on a
/// subscriber and a stalled or dropped subscriber cannot affect the caller.
/// The subscriber list is copy-on-write: `publish` clones an `Arc` snapshot
/// under a read lock and sends outside of it, while subscribing and pruning
/// replace the whole list under the write lock.
pub struct EventPublisher<E> {
    subscribers: RwLock<Arc<Vec<UnboundedSender<E>>>>,
    published: AtomicU64,
}

impl<E> EventPublisher<E>
where
    E: Clone + Send + 'static,
{
    /// Create a publisher with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self { subscribers: RwLock::new(Arc::new(Vec::new())), published: AtomicU64::new(0) }
    }

    /// Register a new subscriber.
    ///
    /// The stream receives every event published after this call returns,
    /// in publish order. Dropping the stream unsubscribes.
    pub fn subscribe(&self) -> EventStream<E> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut guard = self.subscribers.write();
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().filter(|s| !s.is_closed()).cloned());
        next.push(sender);
        *guard = Arc::new(next);
        EventStream::new(receiver)
    }

    /// Deliver `event` to every current subscriber without blocking.
    pub fn publish(&self, event: E) {
        self.published.fetch_add(1, Ordering::Relaxed);
        let snapshot = Arc::clone(&self.subscribers.read());
        if snapshot.is_empty() {
            return;
        }

        let mut saw_closed = false;
        for sender in snapshot.iter() {
            if sender.send(event.clone()).is_err() {
                saw_closed = true;
            }
        }

        if saw_closed {
            self.prune();
        }
    }

    /// Number of subscribers whose streams are still open
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().iter().filter(|s| !s.is_closed()).count()
    }

    /// Total events published, including those nobody was listening to
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    fn prune(&self) {
        let mut guard = self.subscribers.write();
        let before = guard.len();
        if guard.iter().any(UnboundedSender::is_closed) {
            let live: Vec<_> = guard.iter().filter(|s| !s.is_closed()).cloned().collect();
            *guard = Arc::new(live);
        }
        trace!(removed = before - guard.len(), "pruned closed event subscribers");
    }
}

impl<E> Default for EventPublisher<E>
where
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventPublisher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("subscribers", &self.subscribers.read().len())
            .field("published", &self.published.load(Ordering::Relaxed))
            .finish()
    }
}
