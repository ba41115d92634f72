// src/watch/gate.rs

//! Delivery gate shared by a running session and its event sink.
//!
//! Once closed, no new callback may begin. Closing blocks until callbacks
//! already running on other threads have returned, which is what lets
//! `WatchSession::stop` promise that nothing is delivered after it returns.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

#[derive(Debug)]
struct GateState {
    open: bool,
    in_flight: Vec<ThreadId>,
}

#[derive(Debug)]
pub(crate) struct DeliveryGate {
    state: Mutex<GateState>,
    drained: Condvar,
}

impl DeliveryGate {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                open: true,
                in_flight: Vec::new(),
            }),
            drained: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Run `deliver` if the gate is still open. Returns whether it ran.
    pub(crate) fn run<F: FnOnce()>(&self, deliver: F) -> bool {
        let me = thread::current().id();
        {
            let mut state = self.lock();
            if !state.open {
                return false;
            }
            state.in_flight.push(me);
        }

        let _in_flight = InFlight { gate: self, thread: me };
        deliver();
        true
    }

    /// Close the gate and wait for deliveries on other threads to finish.
    ///
    /// A delivery running on the calling thread (a callback that stops its own
    /// session) is not waited for.
    pub(crate) fn close(&self) {
        let me = thread::current().id();
        let mut state = self.lock();
        state.open = false;
        while state.in_flight.iter().any(|t| *t != me) {
            state = self
                .drained
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Clears the in-flight mark even if the callback panics.
struct InFlight<'a> {
    gate: &'a DeliveryGate,
    thread: ThreadId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.lock();
        if let Some(pos) = state.in_flight.iter().position(|t| *t == self.thread) {
            state.in_flight.swap_remove(pos);
        }
        self.gate.drained.notify_all();
    }
}
