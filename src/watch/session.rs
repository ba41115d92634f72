// src/watch/session.rs

//! Lifecycle of a single native change-notification subscription.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{FileWatchError, Result};
use crate::event::EventRecord;
use crate::types::SinceWhen;

use super::dispatch::{Dispatcher, EventCallback, ExecutionContext};
use super::gate::DeliveryGate;
use super::native::{NativeFacility, NativeSubscription, SubscriptionRequest};
use super::notify_backend::NotifyFacility;

/// Ordered, non-empty set of paths a session watches.
///
/// Duplicates are dropped (first occurrence wins). Paths are used exactly as
/// given; expanding `~` or making them absolute is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    paths: Vec<PathBuf>,
}

impl WatchTarget {
    pub fn new<I>(paths: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        let mut unique: Vec<PathBuf> = Vec::new();
        for path in paths {
            let path = path.into();
            if path.as_os_str().is_empty() {
                return Err(FileWatchError::InvalidTarget(
                    "watch paths must not be empty strings".to_string(),
                ));
            }
            if !unique.contains(&path) {
                unique.push(path);
            }
        }

        if unique.is_empty() {
            return Err(FileWatchError::InvalidTarget(
                "at least one path is required".to_string(),
            ));
        }

        Ok(Self { paths: unique })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always false for a constructed target.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// Knobs fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub context: ExecutionContext,
    /// Advisory batching window passed to the facility.
    pub latency: Duration,
    pub since: SinceWhen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
}

/// Resources that exist only while running.
struct Active {
    handle: Box<dyn NativeSubscription>,
    gate: Arc<DeliveryGate>,
}

struct Inner {
    active: Option<Active>,
    /// Stops that have taken their handle but not yet released it.
    stopping: usize,
    callback: EventCallback,
}

impl Inner {
    fn is_live(&self) -> bool {
        self.active.is_some() || self.stopping > 0
    }
}

/// Watches a fixed [`WatchTarget`] and reports every change to one callback.
///
/// `start` and `stop` may be called from any thread and are idempotent.
/// After `stop` returns, the callback is never invoked again for this run.
///
/// In [`ExecutionContext::Background`] the callback runs on the facility's
/// thread and must not call `stop` itself; use an affiliated context (or
/// signal another thread) for that.
pub struct WatchSession {
    target: WatchTarget,
    options: SessionOptions,
    facility: Arc<dyn NativeFacility>,
    inner: Mutex<Inner>,
}

impl fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSession")
            .field("target", &self.target)
            .field("options", &self.options)
            .field("facility", &self.facility)
            .field("state", &self.state())
            .finish()
    }
}

impl WatchSession {
    /// Session on the default `notify` facility with default options.
    pub fn new<I, F>(paths: I, callback: F) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
        F: Fn(&EventRecord) + Send + Sync + 'static,
    {
        Self::with_options(
            paths,
            SessionOptions::default(),
            Arc::new(NotifyFacility::new()),
            callback,
        )
    }

    pub fn with_options<I, F>(
        paths: I,
        options: SessionOptions,
        facility: Arc<dyn NativeFacility>,
        callback: F,
    ) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
        F: Fn(&EventRecord) + Send + Sync + 'static,
    {
        let target = WatchTarget::new(paths)?;
        Ok(Self {
            target,
            options,
            facility,
            inner: Mutex::new(Inner {
                active: None,
                stopping: 0,
                callback: Arc::new(callback),
            }),
        })
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// A session reads as running until its last `stop` has released the
    /// native handle. Never waits on in-flight callbacks.
    pub fn state(&self) -> SessionState {
        if self.lock_inner().is_live() {
            SessionState::Running
        } else {
            SessionState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Replace the callback. Only allowed while idle.
    pub fn set_callback<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&EventRecord) + Send + Sync + 'static,
    {
        let mut inner = self.lock_inner();
        if inner.is_live() {
            return Err(FileWatchError::CallbackLocked);
        }
        inner.callback = Arc::new(callback);
        Ok(())
    }

    /// Subscribe and begin delivering events. No-op if already running.
    ///
    /// On failure the session stays idle with no native handle left behind,
    /// and a later `start` may retry.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.lock_inner();
        if inner.active.is_some() {
            debug!(paths = ?self.target.paths(), "start: session already running");
            return Ok(());
        }

        let request = SubscriptionRequest::new(
            self.target.paths().to_vec(),
            self.options.since,
            self.options.latency,
        );
        let gate = Arc::new(DeliveryGate::new());
        let sink = Dispatcher::new(
            self.options.context.clone(),
            Arc::clone(&gate),
            Arc::clone(&inner.callback),
        )
        .into_sink();

        let mut handle = match self.facility.create(&request, sink) {
            Ok(handle) => handle,
            Err(err) => {
                let err = FileWatchError::subscription("create", err);
                warn!(paths = ?self.target.paths(), error = %err, "could not create subscription");
                return Err(err);
            }
        };

        if let Err(err) = handle.start() {
            gate.close();
            handle.invalidate();
            handle.release();
            let err = FileWatchError::subscription("start", err);
            warn!(paths = ?self.target.paths(), error = %err, "could not start subscription");
            return Err(err);
        }

        info!(
            paths = ?self.target.paths(),
            context = %self.options.context,
            "watch session started"
        );
        inner.active = Some(Active { handle, gate });
        Ok(())
    }

    /// Halt delivery and release the native handle. No-op if idle.
    ///
    /// Callbacks already running on other threads are allowed to finish
    /// before this returns; none start afterwards. The session lock is not
    /// held while waiting, so those callbacks may still query the session.
    pub fn stop(&self) {
        let Some(Active { mut handle, gate }) = ({
            let mut inner = self.lock_inner();
            let active = inner.active.take();
            if active.is_some() {
                inner.stopping += 1;
            }
            active
        }) else {
            debug!(paths = ?self.target.paths(), "stop: session already idle");
            return;
        };

        gate.close();
        handle.stop();
        handle.invalidate();
        handle.release();

        self.lock_inner().stopping -= 1;
        info!(paths = ?self.target.paths(), "watch session stopped");
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.stop();
    }
}
