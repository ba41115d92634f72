// src/watch/mod.rs

//! Watch sessions and the native layer underneath them.
//!
//! - [`session`] owns the start/stop lifecycle of one subscription.
//! - [`native`] defines the facility/handle protocol a session drives.
//! - [`notify_backend`] is the production facility (`notify` crate).
//! - [`dispatch`] decides which execution context runs the callback.
//!
//! Nothing here filters, coalesces or debounces events.

pub mod dispatch;
mod gate;
pub mod native;
pub mod notify_backend;
pub mod session;

pub use dispatch::{AffiliatedContext, AffiliatedReceiver, EventCallback, ExecutionContext};
pub use native::{
    CreateFlags, EventSink, NativeFacility, NativeSubscription, RawBatch, SubscriptionRequest,
};
pub use notify_backend::{translate_event, EventTranslator, NotifyFacility};
pub use session::{SessionOptions, SessionState, WatchSession, WatchTarget};
