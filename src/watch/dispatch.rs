// src/watch/dispatch.rs

//! Choosing the execution context event callbacks run on.
//!
//! - [`ExecutionContext::Background`] (default) runs the callback directly on
//!   whatever thread the native facility delivers from. For the `notify`
//!   backend that is its internal watcher thread.
//! - [`ExecutionContext::Affiliated`] queues each event onto an
//!   [`AffiliatedContext`]; the thread owning the matching
//!   [`AffiliatedReceiver`] runs the callbacks when it drains the queue.
//!
//! Both paths go through the session's delivery gate, so a stopped session
//! never invokes its callback again, even for events already queued.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::event::EventRecord;
use crate::types::ExecutionContextKind;

use super::gate::DeliveryGate;
use super::native::{EventSink, RawBatch};

/// Callback invoked once per delivered event.
pub type EventCallback = Arc<dyn Fn(&EventRecord) + Send + Sync>;

type Job = Box<dyn FnOnce() + Send>;

/// Where a session's callbacks run.
#[derive(Clone, Default)]
pub enum ExecutionContext {
    #[default]
    Background,
    Affiliated(AffiliatedContext),
}

impl ExecutionContext {
    pub fn kind(&self) -> ExecutionContextKind {
        match self {
            ExecutionContext::Background => ExecutionContextKind::Background,
            ExecutionContext::Affiliated(_) => ExecutionContextKind::Affiliated,
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExecutionContext::{:?}", self.kind())
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind(), f)
    }
}

/// Sending half of an affiliated context. Cloneable; give one to each session
/// whose callbacks should run on the owning thread.
#[derive(Clone)]
pub struct AffiliatedContext {
    tx: mpsc::UnboundedSender<Job>,
}

impl AffiliatedContext {
    /// Create a context and the receiver its owner drains.
    pub fn new() -> (Self, AffiliatedReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, AffiliatedReceiver { rx })
    }

    fn post(&self, job: Job) -> bool {
        self.tx.send(job).is_ok()
    }
}

impl fmt::Debug for AffiliatedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AffiliatedContext")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Receiving half of an affiliated context. Callbacks run on whichever thread
/// calls into it.
pub struct AffiliatedReceiver {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl AffiliatedReceiver {
    /// Run every queued callback without blocking. Returns how many jobs were
    /// taken off the queue (jobs for stopped sessions count but do nothing).
    pub fn drain(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Wait for the next job and run it. Returns `false` once every
    /// [`AffiliatedContext`] handle has been dropped and the queue is empty.
    pub async fn recv_one(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run jobs until every [`AffiliatedContext`] handle is gone.
    pub async fn run(mut self) {
        while self.recv_one().await {}
        debug!("affiliated context closed");
    }
}

impl fmt::Debug for AffiliatedReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AffiliatedReceiver").finish_non_exhaustive()
    }
}

/// Unpacks native batches into [`EventRecord`]s and hands each one to the
/// callback on the configured context.
pub(crate) struct Dispatcher {
    context: ExecutionContext,
    gate: Arc<DeliveryGate>,
    callback: EventCallback,
    receiver_gone: AtomicBool,
}

impl Dispatcher {
    pub(crate) fn new(
        context: ExecutionContext,
        gate: Arc<DeliveryGate>,
        callback: EventCallback,
    ) -> Self {
        Self {
            context,
            gate,
            callback,
            receiver_gone: AtomicBool::new(false),
        }
    }

    pub(crate) fn into_sink(self) -> EventSink {
        let dispatcher = Arc::new(self);
        EventSink::new(move |batch| dispatcher.dispatch(batch))
    }

    fn dispatch(&self, batch: RawBatch) {
        trace!(events = batch.len(), "dispatching native batch");
        for (path, flags) in batch {
            let record = EventRecord::new(path, flags);
            match &self.context {
                ExecutionContext::Background => {
                    let callback = &self.callback;
                    if !self.gate.run(|| callback(&record)) {
                        trace!("session stopped; dropping rest of batch");
                        return;
                    }
                }
                ExecutionContext::Affiliated(ctx) => {
                    if !self.gate.is_open() {
                        return;
                    }
                    let gate = Arc::clone(&self.gate);
                    let callback = Arc::clone(&self.callback);
                    let posted = ctx.post(Box::new(move || {
                        gate.run(|| callback(&record));
                    }));
                    if !posted {
                        if !self.receiver_gone.swap(true, Ordering::Relaxed) {
                            warn!("affiliated receiver dropped; events are being discarded");
                        }
                        return;
                    }
                }
            }
        }
    }
}
