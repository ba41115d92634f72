#![allow(dead_code)]

use std::sync::Arc;

use filewatch::watch::{SessionOptions, WatchSession};
use filewatch_test_utils::{FakeFacility, Recorder};

pub use filewatch_test_utils::init_tracing;

/// Session over the fake native layer with default options.
pub fn fake_session(paths: &[&str]) -> (WatchSession, FakeFacility, Recorder) {
    fake_session_with(paths, SessionOptions::default())
}

pub fn fake_session_with(
    paths: &[&str],
    options: SessionOptions,
) -> (WatchSession, FakeFacility, Recorder) {
    let facility = FakeFacility::new();
    let recorder = Recorder::new();
    let session = WatchSession::with_options(
        paths.iter().copied(),
        options,
        Arc::new(facility.clone()),
        recorder.callback(),
    )
    .expect("valid target");
    (session, facility, recorder)
}
