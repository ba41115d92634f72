// tests/event_delivery.rs

mod common;
use crate::common::{fake_session, fake_session_with, init_tracing};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use filewatch::event::{EventRecord, RawFlags};
use filewatch::watch::{AffiliatedContext, ExecutionContext, SessionOptions, WatchSession};
use filewatch_test_utils::{with_timeout, FakeFacility};

#[test]
fn created_file_is_decoded_and_described() {
    init_tracing();
    let (session, facility, recorder) = fake_session(&["/tmp/watch"]);
    session.start().unwrap();

    facility.inject(
        "/tmp/watch/a.txt",
        RawFlags::ITEM_IS_FILE | RawFlags::ITEM_CREATED,
    );

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.path(), Path::new("/tmp/watch/a.txt"));
    assert!(event.file_created());
    assert!(!event.dir_created());
    assert_eq!(event.description(), "The file /tmp/watch/a.txt was created");
}

#[test]
fn batches_are_unpacked_in_order() {
    init_tracing();
    let (session, facility, recorder) = fake_session(&["/tmp/watch"]);
    session.start().unwrap();

    let names = ["one", "two", "three", "four"];
    let batch: Vec<(PathBuf, RawFlags)> = names
        .iter()
        .map(|n| (PathBuf::from(format!("/tmp/watch/{n}")), RawFlags::ITEM_MODIFIED))
        .collect();
    facility.inject_batch(batch);
    facility.inject("/tmp/watch/five", RawFlags::ITEM_REMOVED);

    let seen: Vec<String> = recorder
        .events()
        .iter()
        .map(|e| e.path().file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(seen, vec!["one", "two", "three", "four", "five"]);
}

#[test]
fn stop_waits_for_in_flight_background_callback() {
    init_tracing();
    let facility = FakeFacility::new();
    let finished = Arc::new(AtomicBool::new(false));
    let (entered_tx, entered_rx) = mpsc::channel();

    let session = {
        let finished = Arc::clone(&finished);
        let entered_tx = std::sync::Mutex::new(entered_tx);
        WatchSession::with_options(
            ["/tmp/watch"],
            SessionOptions::default(),
            Arc::new(facility.clone()),
            move |_event: &EventRecord| {
                entered_tx.lock().unwrap().send(()).unwrap();
                thread::sleep(Duration::from_millis(150));
                finished.store(true, Ordering::SeqCst);
            },
        )
        .unwrap()
    };
    session.start().unwrap();

    let native = {
        let facility = facility.clone();
        thread::spawn(move || {
            facility.inject("/tmp/watch/slow", RawFlags::ITEM_IS_FILE | RawFlags::ITEM_MODIFIED);
        })
    };

    entered_rx.recv().unwrap();
    session.stop();
    assert!(
        finished.load(Ordering::SeqCst),
        "stop returned while a callback was still running"
    );
    native.join().unwrap();
}

#[test]
fn callback_can_read_session_state_while_stop_waits() {
    init_tracing();
    let facility = FakeFacility::new();
    let slot: Arc<std::sync::OnceLock<Arc<WatchSession>>> = Arc::new(std::sync::OnceLock::new());
    let (entered_tx, entered_rx) = mpsc::channel();
    let (seen_tx, seen_rx) = mpsc::channel();

    let session = {
        let slot = Arc::clone(&slot);
        let entered_tx = std::sync::Mutex::new(entered_tx);
        let seen_tx = std::sync::Mutex::new(seen_tx);
        Arc::new(
            WatchSession::with_options(
                ["/tmp/watch"],
                SessionOptions::default(),
                Arc::new(facility.clone()),
                move |_event: &EventRecord| {
                    entered_tx.lock().unwrap().send(()).unwrap();
                    thread::sleep(Duration::from_millis(200));
                    if let Some(session) = slot.get() {
                        let running = session.is_running();
                        let debug = format!("{session:?}");
                        let _ = seen_tx.lock().unwrap().send((running, debug));
                    }
                },
            )
            .unwrap(),
        )
    };
    slot.set(Arc::clone(&session)).unwrap();
    session.start().unwrap();

    let native = {
        let facility = facility.clone();
        thread::spawn(move || {
            facility.inject("/tmp/watch/slow", RawFlags::ITEM_IS_FILE | RawFlags::ITEM_MODIFIED);
        })
    };
    entered_rx.recv().unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let stopper = {
        let session = Arc::clone(&session);
        thread::spawn(move || {
            session.stop();
            done_tx.send(()).unwrap();
        })
    };

    done_rx
        .recv_timeout(Duration::from_secs(3))
        .expect("stop() blocked while a callback read session state");
    let (running, debug) = seen_rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert!(running, "session reads as running until stop completes");
    assert!(debug.contains("Running"));
    assert!(!session.is_running());
    assert_eq!(facility.live_handles(), 0);

    stopper.join().unwrap();
    native.join().unwrap();
}

#[test]
fn set_callback_stays_locked_until_stop_finishes() {
    init_tracing();
    let facility = FakeFacility::new();
    let slot: Arc<std::sync::OnceLock<Arc<WatchSession>>> = Arc::new(std::sync::OnceLock::new());
    let (entered_tx, entered_rx) = mpsc::channel();
    let (locked_tx, locked_rx) = mpsc::channel();

    let session = {
        let slot = Arc::clone(&slot);
        let entered_tx = std::sync::Mutex::new(entered_tx);
        let locked_tx = std::sync::Mutex::new(locked_tx);
        Arc::new(
            WatchSession::with_options(
                ["/tmp/watch"],
                SessionOptions::default(),
                Arc::new(facility.clone()),
                move |_event: &EventRecord| {
                    entered_tx.lock().unwrap().send(()).unwrap();
                    thread::sleep(Duration::from_millis(150));
                    if let Some(session) = slot.get() {
                        let locked = session.set_callback(|_: &EventRecord| {}).is_err();
                        let _ = locked_tx.lock().unwrap().send(locked);
                    }
                },
            )
            .unwrap(),
        )
    };
    slot.set(Arc::clone(&session)).unwrap();
    session.start().unwrap();

    let native = {
        let facility = facility.clone();
        thread::spawn(move || {
            facility.inject("/tmp/watch/slow", RawFlags::ITEM_MODIFIED);
        })
    };
    entered_rx.recv().unwrap();
    session.stop();

    assert!(locked_rx.recv_timeout(Duration::from_secs(1)).unwrap());
    assert!(session.set_callback(|_: &EventRecord| {}).is_ok());
    native.join().unwrap();
}

#[test]
fn affiliated_callbacks_run_only_when_drained() {
    init_tracing();
    let (ctx, mut rx) = AffiliatedContext::new();
    let options = SessionOptions {
        context: ExecutionContext::Affiliated(ctx),
        ..SessionOptions::default()
    };
    let (session, facility, recorder) = fake_session_with(&["/tmp/watch"], options);
    session.start().unwrap();

    facility.inject("/tmp/watch/a", RawFlags::ITEM_IS_FILE | RawFlags::ITEM_CREATED);
    facility.inject("/tmp/watch/b", RawFlags::ITEM_IS_DIR | RawFlags::ITEM_RENAMED);
    assert!(recorder.is_empty());

    let owner = thread::current().id();
    assert_eq!(rx.drain(), 2);
    assert_eq!(thread::current().id(), owner);

    let events = recorder.events();
    assert!(events[0].file_created());
    assert!(events[1].dir_renamed());
}

#[test]
fn affiliated_events_queued_before_stop_are_dropped() {
    init_tracing();
    let (ctx, mut rx) = AffiliatedContext::new();
    let options = SessionOptions {
        context: ExecutionContext::Affiliated(ctx),
        ..SessionOptions::default()
    };
    let (session, facility, recorder) = fake_session_with(&["/tmp/watch"], options);
    session.start().unwrap();

    facility.inject("/tmp/watch/late", RawFlags::ITEM_MODIFIED);
    session.stop();

    rx.drain();
    assert!(recorder.is_empty());
}

#[test]
fn affiliated_callback_may_stop_its_own_session() {
    init_tracing();
    let (ctx, mut rx) = AffiliatedContext::new();
    let facility = FakeFacility::new();
    let slot: Arc<std::sync::OnceLock<Arc<WatchSession>>> = Arc::new(std::sync::OnceLock::new());
    let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let session = {
        let slot = Arc::clone(&slot);
        let count = Arc::clone(&count);
        Arc::new(
            WatchSession::with_options(
                ["/tmp/watch"],
                SessionOptions {
                    context: ExecutionContext::Affiliated(ctx),
                    ..SessionOptions::default()
                },
                Arc::new(facility.clone()),
                move |_event: &EventRecord| {
                    count.fetch_add(1, Ordering::SeqCst);
                    if let Some(session) = slot.get() {
                        session.stop();
                    }
                },
            )
            .unwrap(),
        )
    };
    slot.set(Arc::clone(&session)).unwrap();
    session.start().unwrap();

    facility.inject_batch(vec![
        (PathBuf::from("/tmp/watch/1"), RawFlags::ITEM_CREATED),
        (PathBuf::from("/tmp/watch/2"), RawFlags::ITEM_CREATED),
    ]);
    rx.drain();

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!session.is_running());
    assert_eq!(facility.live_handles(), 0);
}

#[tokio::test]
async fn affiliated_receiver_runs_jobs_on_the_async_owner() {
    init_tracing();
    let (ctx, mut rx) = AffiliatedContext::new();
    let options = SessionOptions {
        context: ExecutionContext::Affiliated(ctx),
        ..SessionOptions::default()
    };
    let (session, facility, recorder) = fake_session_with(&["/tmp/watch"], options);
    session.start().unwrap();

    let native = thread::spawn(move || {
        facility.inject("/tmp/watch/async", RawFlags::ITEM_IS_FILE | RawFlags::ITEM_MODIFIED);
    });

    assert!(with_timeout(rx.recv_one()).await);
    native.join().unwrap();

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].file_modified());
    assert_eq!(events[0].to_string(), "The file /tmp/watch/async was modified");
}
