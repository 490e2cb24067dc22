//! Subscriber side of the event publisher.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};

use futures::Stream;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

/// A subscription to an [`EventPublisher`](super::EventPublisher).
///
/// Receives events published after the subscription was created, in publish
/// order. Usable from synchronous code (`try_next`, `drain`,
/// `blocking_next`), from async code (`next_event` or the [`Stream`] impl),
/// or handed to a dedicated consumer thread with [`spawn_consumer`].
///
/// [`spawn_consumer`]: EventStream::spawn_consumer
#[derive(Debug)]
pub struct EventStream<E> {
    receiver: UnboundedReceiver<E>,
}

impl<E> EventStream<E> {
    pub(crate) fn new(receiver: UnboundedReceiver<E>) -> Self {
        Self { receiver }
    }

    /// Next buffered event, if any, without waiting
    pub fn try_next(&mut self) -> Option<E> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the publisher is gone and the buffer is empty.
    pub async fn next_event(&mut self) -> Option<E> {
        self.receiver.recv().await
    }

    /// Block the current thread until the next event arrives.
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_next(&mut self) -> Option<E> {
        self.receiver.blocking_recv()
    }

    /// Take every buffered event
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        while let Some(event) = self.try_next() {
            events.push(event);
        }
        events
    }

    /// Stop receiving new events. Already buffered events stay readable.
    pub fn close(&mut self) {
        self.receiver.close();
    }

    /// Consume events on a dedicated thread.
    ///
    /// A panic inside `consumer` is caught and logged; the thread keeps
    /// consuming. The thread exits once the publisher is dropped and returns
    /// the number of events the consumer handled without panicking.
    pub fn spawn_consumer<F>(mut self, name: &str, mut consumer: F) -> io::Result<JoinHandle<u64>>
    where
        E: Send + 'static,
        F: FnMut(E) + Send + 'static,
    {
        let thread_name = name.to_owned();
        thread::Builder::new().name(format!("{name}-events")).spawn(move || {
            let mut handled = 0_u64;
            while let Some(event) = self.receiver.blocking_recv() {
                match panic::catch_unwind(AssertUnwindSafe(|| consumer(event))) {
                    Ok(()) => handled += 1,
                    Err(_) => warn!(consumer = %thread_name, "event consumer panicked; continuing"),
                }
            }
            debug!(consumer = %thread_name, handled, "event consumer finished");
            handled
        })
    }
}

impl<E> Stream for EventStream<E> {
    type Item = E;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        self.receiver.poll_recv(cx)
    }
}
