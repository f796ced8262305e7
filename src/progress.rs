//! Progress/log channel between the phase pipeline and its display.
//!
//! A bounded single-producer, single-consumer queue. The pipeline thread owns
//! the [`ProgressSender`]; dropping it closes the channel, and a closed, empty
//! channel is the consumer's normal end-of-stream signal.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::time::Duration;

/// Queue depth between the pipeline and the display
pub const CHANNEL_CAPACITY: usize = 20;

/// One pipeline event. Immutable once sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseUpdate {
    /// Ordinal of the active phase, if the event is tied to one
    pub phase: Option<usize>,
    pub description: String,
    /// Completion in `[0, 1]`; `None` for interstitial log lines
    pub fraction: Option<f64>,
    pub log_line: Option<String>,
    /// Terminal failure message
    pub error: Option<String>,
    /// Pipeline finished successfully
    pub done: bool,
}

impl PhaseUpdate {
    /// Pre-execution event for a phase
    pub fn phase_started(phase: usize, description: &str, fraction: f64) -> Self {
        Self {
            phase: Some(phase),
            description: description.to_string(),
            fraction: Some(fraction),
            log_line: None,
            error: None,
            done: false,
        }
    }

    /// Terminal failure event
    pub fn phase_failed(phase: usize, description: &str, fraction: f64, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::phase_started(phase, description, fraction)
        }
    }

    /// Advisory log line, not tied to a fraction
    pub fn log(line: impl Into<String>) -> Self {
        Self {
            phase: None,
            description: String::new(),
            fraction: None,
            log_line: Some(line.into()),
            error: None,
            done: false,
        }
    }

    /// Final success event
    pub fn finished(description: &str) -> Self {
        Self {
            phase: None,
            description: description.to_string(),
            fraction: Some(1.0),
            log_line: None,
            error: None,
            done: true,
        }
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        self.done || self.error.is_some()
    }
}

/// Create a connected sender/receiver pair
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::sync_channel(CHANNEL_CAPACITY);
    (ProgressSender { tx }, ProgressReceiver { rx })
}

/// Write-only endpoint held by the pipeline
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: SyncSender<PhaseUpdate>,
}

impl ProgressSender {
    /// Blocks while the queue is full. A departed consumer is not an error;
    /// the pipeline keeps running without a display.
    pub fn send(&self, update: PhaseUpdate) {
        let _ = self.tx.send(update);
    }

    pub fn log(&self, line: impl Into<String>) {
        self.send(PhaseUpdate::log(line));
    }
}

/// Result of a single non-blocking read
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    Update(PhaseUpdate),
    /// Nothing queued yet; ask again later
    Pending,
    /// Producer finished and the queue is drained
    Closed,
}

/// Read-only endpoint held by the display
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: Receiver<PhaseUpdate>,
}

impl ProgressReceiver {
    /// Take at most one event without blocking
    pub fn poll(&self) -> Poll {
        match self.rx.try_recv() {
            Ok(update) => Poll::Update(update),
            Err(TryRecvError::Empty) => Poll::Pending,
            Err(TryRecvError::Disconnected) => Poll::Closed,
        }
    }

    /// Wait up to `timeout` for the next event
    pub fn poll_timeout(&self, timeout: Duration) -> Poll {
        match self.rx.recv_timeout(timeout) {
            Ok(update) => Poll::Update(update),
            Err(RecvTimeoutError::Timeout) => Poll::Pending,
            Err(RecvTimeoutError::Disconnected) => Poll::Closed,
        }
    }

    /// Blocking read; `None` once the channel is closed and drained
    pub fn recv(&self) -> Option<PhaseUpdate> {
        self.rx.recv().ok()
    }
}

impl Iterator for ProgressReceiver {
    type Item = PhaseUpdate;

    fn next(&mut self) -> Option<PhaseUpdate> {
        self.recv()
    }
}
