//! Pipeline logs and batch progress reporting.
//!
//! Two channels live here:
//!
//! - A global [`LogBroadcaster`] for pipeline narration (what the stages are
//!   doing), echoed to stdout and broadcast to any subscriber.
//! - An injectable [`ProgressReporter`] implementing the progress-event
//!   contract consumed by whatever surface drives a batch (CLI, web glue).
//!   Events are cumulative: each event only overwrites the fields it
//!   specifies; subscribers always receive the merged snapshot.
//!
//! Sends are fire-and-forget. Dropping every receiver never fails a batch.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

// =============================================================================
// Pipeline logs
// =============================================================================

/// Log level for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Global log broadcaster.
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Broadcasts log entries to all subscribers, echoing to stdout.
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a log entry to all subscribers.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry {
            level,
            message: message.into(),
        };
        let prefix = match entry.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        println!("{} {}", prefix, entry.message);
        let _ = self.sender.send(entry);
    }

    /// Get a receiver for streaming.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogLevel::Info, msg);
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogLevel::Success, msg);
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogLevel::Warning, msg);
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogLevel::Error, msg);
}

// =============================================================================
// Batch progress
// =============================================================================

/// Status of a running batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Processing,
    Completed,
    Error,
    Connected,
    Waiting,
}

/// The merged progress state sent to subscribers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProgressStatus>,
}

/// A partial progress event. Only the fields it carries overwrite the
/// reporter state.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    message: Option<String>,
    progress: Option<f32>,
    current: Option<usize>,
    total: Option<usize>,
    status: Option<ProgressStatus>,
}

impl Progress {
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn progress(mut self, pct: f32) -> Self {
        self.progress = Some(pct);
        self
    }

    pub fn current(mut self, current: usize) -> Self {
        self.current = Some(current);
        self
    }

    pub fn total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    pub fn status(mut self, status: ProgressStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Progress reporter injected into the batch orchestrators.
///
/// Holds the cumulative state and broadcasts a merged snapshot on every
/// event. Safe to call from a blocking worker while a consumer polls the
/// subscription from async code.
pub struct ProgressReporter {
    state: Mutex<ProgressUpdate>,
    sender: broadcast::Sender<ProgressUpdate>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            state: Mutex::new(ProgressUpdate::default()),
            sender,
        }
    }

    /// Merge a partial event into the state and broadcast the snapshot.
    pub fn send(&self, event: Progress) {
        let snapshot = {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(message) = event.message {
                state.message = message;
            }
            if let Some(progress) = event.progress {
                state.progress = Some(progress);
            }
            if let Some(current) = event.current {
                state.current = Some(current);
            }
            if let Some(total) = event.total {
                state.total = Some(total);
            }
            if let Some(status) = event.status {
                state.status = Some(status);
            }
            state.clone()
        };
        let _ = self.sender.send(snapshot);
    }

    /// Report a failure. The orchestrators call this exactly once per batch,
    /// at the boundary, before propagating the error.
    pub fn error(&self, message: impl Into<String>) {
        self.send(Progress::msg(message).status(ProgressStatus::Error));
    }

    /// Current merged state.
    pub fn snapshot(&self) -> ProgressUpdate {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get a receiver for streaming updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
