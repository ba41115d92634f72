// src/watch/native.rs

//! The seam between a [`WatchSession`](super::WatchSession) and the OS
//! change-notification facility.
//!
//! A [`NativeFacility`] turns a [`SubscriptionRequest`] into a handle that
//! follows the native protocol: `start`, then later `stop`, `invalidate` and
//! `release`, strictly in that order. Events flow back through the
//! [`EventSink`] handed over at creation time.
//!
//! Production code uses [`NotifyFacility`](super::NotifyFacility); tests can
//! provide their own facility that records calls and injects events.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;

use crate::errors::Result;
use crate::event::RawFlags;
use crate::types::SinceWhen;

bitflags! {
    /// Subscription creation flags (`kFSEventStreamCreateFlag*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CreateFlags: u32 {
        const USE_CF_TYPES      = 0x0000_0001;
        const NO_DEFER          = 0x0000_0002;
        const WATCH_ROOT        = 0x0000_0004;
        const IGNORE_SELF       = 0x0000_0008;
        const FILE_EVENTS       = 0x0000_0010;
        const MARK_SELF         = 0x0000_0020;
        const USE_EXTENDED_DATA = 0x0000_0040;
    }
}

/// Everything a facility needs to create one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub paths: Vec<PathBuf>,
    pub since: SinceWhen,
    /// How long the facility may hold events back to batch them.
    pub latency: Duration,
    pub flags: CreateFlags,
}

impl SubscriptionRequest {
    /// Request file-level events with the richest flag set available.
    pub fn new(paths: Vec<PathBuf>, since: SinceWhen, latency: Duration) -> Self {
        Self {
            paths,
            since,
            latency,
            flags: CreateFlags::FILE_EVENTS | CreateFlags::USE_EXTENDED_DATA,
        }
    }
}

/// One batch of `(path, flags)` pairs, in the order the facility saw them.
pub type RawBatch = Vec<(PathBuf, RawFlags)>;

/// Delivery endpoint handed to a facility. Cheap to clone.
#[derive(Clone)]
pub struct EventSink {
    deliver: Arc<dyn Fn(RawBatch) + Send + Sync>,
}

impl EventSink {
    pub fn new<F>(deliver: F) -> Self
    where
        F: Fn(RawBatch) + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    /// Hand a batch to the session. May be called from any thread.
    pub fn deliver_batch(&self, batch: RawBatch) {
        if batch.is_empty() {
            return;
        }
        (self.deliver)(batch);
    }

    pub fn deliver(&self, path: impl Into<PathBuf>, flags: RawFlags) {
        self.deliver_batch(vec![(path.into(), flags)]);
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}

/// Handle for one native subscription.
///
/// Owned exclusively by the session that created it.
pub trait NativeSubscription: Send {
    /// Begin delivering events into the sink.
    fn start(&mut self) -> Result<()>;

    /// Halt further delivery.
    fn stop(&mut self);

    /// Detach the handle from whatever context it was scheduled on.
    fn invalidate(&mut self);

    /// Free the native resources. Consumes the handle.
    fn release(self: Box<Self>);
}

/// Factory for native subscriptions.
pub trait NativeFacility: Send + Sync + fmt::Debug {
    fn create(
        &self,
        request: &SubscriptionRequest,
        sink: EventSink,
    ) -> Result<Box<dyn NativeSubscription>>;
}
