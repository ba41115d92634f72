// src/event/mod.rs

//! Event decoding.
//!
//! - [`flags`] holds the raw flag table and the pure classifier.
//! - [`record`] wraps a path plus its flags into the value handed to
//!   event callbacks.

pub mod flags;
pub mod record;

pub use flags::{classify, describe, Classification, EventKind, RawFlags};
pub use record::EventRecord;
