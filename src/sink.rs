// src/sink.rs

//! Log sinks attached for the duration of a run.
//!
//! The graph calls [`LogSink::attach`] from `start_run` and
//! [`LogSink::detach`] from `finish_run`. While attached, the sink's
//! [`span`](LogSink::span) is used to instrument traversal and finalization,
//! so every scheduler log line of the run carries the run's identity.

use std::fmt::Debug;

use tracing::{Span, debug, info_span};

use crate::store::RunRecord;

pub trait LogSink: Send + Sync + Debug {
    /// Begin capturing log output for `run`.
    fn attach(&mut self, run: &RunRecord);

    /// Stop capturing log output for `run`.
    fn detach(&mut self, run: &RunRecord);

    /// Span under which the graph logs while the sink is attached.
    fn span(&self) -> Span {
        Span::none()
    }
}

/// Sink that captures nothing.
#[derive(Debug, Clone, Default)]
pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn attach(&mut self, _run: &RunRecord) {}

    fn detach(&mut self, _run: &RunRecord) {}
}

/// Default sink: correlates run output through a `flow_run` tracing span.
#[derive(Debug, Default)]
pub struct TracingLogSink {
    span: Option<Span>,
}

impl TracingLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.span.is_some()
    }
}

impl LogSink for TracingLogSink {
    fn attach(&mut self, run: &RunRecord) {
        let span = info_span!(
            "flow_run",
            flow = %run.flow,
            run_key = %run.run_key,
            run_id = %run.run_id,
        );
        span.in_scope(|| debug!("log sink attached"));
        self.span = Some(span);
    }

    fn detach(&mut self, _run: &RunRecord) {
        if let Some(span) = self.span.take() {
            span.in_scope(|| debug!("log sink detached"));
        }
    }

    fn span(&self) -> Span {
        self.span.clone().unwrap_or_else(Span::none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_sink_tracks_attachment() {
        let run = RunRecord::embryo("nightly", "k");
        let mut sink = TracingLogSink::new();
        assert!(!sink.is_attached());

        sink.attach(&run);
        assert!(sink.is_attached());

        sink.detach(&run);
        assert!(!sink.is_attached());

        // Detaching twice is harmless.
        sink.detach(&run);
        assert!(!sink.is_attached());
    }
}
