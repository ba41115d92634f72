use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use filewatch::errors::{FileWatchError, Result};
use filewatch::event::RawFlags;
use filewatch::watch::{EventSink, NativeFacility, NativeSubscription, SubscriptionRequest};

/// One call made by a session into the fake native layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Create(Vec<PathBuf>),
    Start,
    Stop,
    Invalidate,
    Release,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<FakeCall>,
    requests: Vec<SubscriptionRequest>,
    sink: Option<EventSink>,
    live_handles: usize,
    fail_next_create: bool,
    fail_next_start: bool,
}

/// A fake native facility that:
/// - records every protocol call in order
/// - counts handles that have been created but not released
/// - can be told to fail the next `create` or `start`
/// - lets tests inject events, including after the session stopped, to
///   mimic a native layer that races with `stop`.
#[derive(Debug, Clone, Default)]
pub struct FakeFacility {
    state: Arc<Mutex<FakeState>>,
}

impl FakeFacility {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn fail_next_create(&self) {
        self.lock().fail_next_create = true;
    }

    pub fn fail_next_start(&self) {
        self.lock().fail_next_start = true;
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.lock().calls.clone()
    }

    pub fn create_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, FakeCall::Create(_)))
            .count()
    }

    pub fn live_handles(&self) -> usize {
        self.lock().live_handles
    }

    pub fn last_request(&self) -> Option<SubscriptionRequest> {
        self.lock().requests.last().cloned()
    }

    /// Deliver one event through the most recently created sink.
    ///
    /// Returns `false` if no subscription was ever created.
    pub fn inject(&self, path: impl Into<PathBuf>, flags: RawFlags) -> bool {
        self.inject_batch(vec![(path.into(), flags)])
    }

    pub fn inject_batch(&self, batch: Vec<(PathBuf, RawFlags)>) -> bool {
        // Clone the sink out so callbacks never run under our lock.
        let sink = self.lock().sink.clone();
        match sink {
            Some(sink) => {
                sink.deliver_batch(batch);
                true
            }
            None => false,
        }
    }
}

impl NativeFacility for FakeFacility {
    fn create(
        &self,
        request: &SubscriptionRequest,
        sink: EventSink,
    ) -> Result<Box<dyn NativeSubscription>> {
        let mut state = self.lock();
        state.calls.push(FakeCall::Create(request.paths.clone()));
        state.requests.push(request.clone());

        if std::mem::take(&mut state.fail_next_create) {
            return Err(FileWatchError::SubscriptionFailed(
                "fake: create refused".to_string(),
            ));
        }

        state.sink = Some(sink);
        state.live_handles += 1;
        Ok(Box::new(FakeSubscription {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSubscription {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSubscription {
    fn record(&self, call: FakeCall) -> MutexGuard<'_, FakeState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

impl NativeSubscription for FakeSubscription {
    fn start(&mut self) -> Result<()> {
        let mut state = self.record(FakeCall::Start);
        if std::mem::take(&mut state.fail_next_start) {
            return Err(FileWatchError::SubscriptionFailed(
                "fake: start refused".to_string(),
            ));
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.record(FakeCall::Stop);
    }

    fn invalidate(&mut self) {
        self.record(FakeCall::Invalidate);
    }

    fn release(self: Box<Self>) {
        let mut state = self.record(FakeCall::Release);
        state.live_handles -= 1;
    }
}
