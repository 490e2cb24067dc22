//! Common utility functions and helper macros
//!
//! - **[`macros`]**: declarative macros for label enums
//! - **[`serde`]**: duration serialization helpers for configuration files

#[macro_use]
pub mod macros;
pub mod serde;

pub use self::serde::{duration_millis, option_duration_millis};
