use std::sync::{Arc, Mutex};

use filewatch::event::EventRecord;

/// Collects every record a session delivers.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<EventRecord>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback suitable for `WatchSession` that appends to this recorder.
    pub fn callback(&self) -> impl Fn(&EventRecord) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event: &EventRecord| events.lock().unwrap().push(event.clone())
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
