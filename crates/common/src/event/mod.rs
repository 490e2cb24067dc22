//! Non-blocking event fan-out
//!
//! An [`EventPublisher`] owns the subscriber list; each call to
//! [`EventPublisher::subscribe`] returns an [`EventStream`]. Publishing never
//! blocks on subscribers and never fails, whether or not anyone listens.
//!
//! ```
//! use rebound_common::event::EventPublisher;
//!
//! let publisher = EventPublisher::new();
//! let mut stream = publisher.subscribe();
//! publisher.publish("retry");
//! publisher.publish("success");
//! assert_eq!(stream.drain(), vec!["retry", "success"]);
//! ```

pub mod publisher;
pub mod stream;

pub use publisher::EventPublisher;
pub use stream::EventStream;
