use std::sync::{Arc, Mutex};

use flowgraph::sink::LogSink;
use flowgraph::store::RunRecord;

/// Sink event as recorded by [`RecordingLogSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Attached(String),
    Detached(String),
}

/// Log sink that records every attach/detach with the run key.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl LogSink for RecordingLogSink {
    fn attach(&mut self, run: &RunRecord) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Attached(run.run_key.clone()));
    }

    fn detach(&mut self, run: &RunRecord) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Detached(run.run_key.clone()));
    }
}
