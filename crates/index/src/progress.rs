//! Progress reporting for long-running index operations.
//!
//! Builds and updates emit one event per embedding batch; the CLI turns
//! them into status lines.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Embed,
    Index,
    Persist,
    Train,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Embed => "embed",
            Self::Index => "index",
            Self::Persist => "persist",
            Self::Train => "train",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: Phase,

    /// Documents (or vectors) processed so far
    pub current: u64,

    pub total: Option<u64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    pub fn new(phase: Phase, current: u64, total: Option<u64>, message: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            message: message.into(),
            elapsed_secs: 0.0,
        }
    }

    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|t| {
            if t > 0 {
                self.current as f64 / t as f64 * 100.0
            } else {
                100.0
            }
        })
    }

    /// One status line, e.g. `[embed] 500/1000 (50%) - model=trigram-v1`.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };
        let pct = self
            .percentage()
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    pub fn emit(&self, mut event: ProgressEvent) {
        event.elapsed_secs = self.start_time.elapsed().as_secs_f64();
        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            elapsed_secs = event.elapsed_secs,
            "{}",
            event.message
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }

    pub fn embed(&self, current: u64, total: Option<u64>, model: &str) {
        self.emit(ProgressEvent::new(
            Phase::Embed,
            current,
            total,
            format!("model={}", model),
        ));
    }

    pub fn index(&self, current: u64, total: Option<u64>) {
        self.emit(ProgressEvent::new(
            Phase::Index,
            current,
            total,
            "inserting vectors",
        ));
    }

    pub fn persist(&self, vectors: u64) {
        self.emit(ProgressEvent::new(
            Phase::Persist,
            vectors,
            None,
            "writing snapshot",
        ));
    }

    pub fn train(&self, samples: u64, clusters: usize) {
        self.emit(ProgressEvent::new(
            Phase::Train,
            samples,
            None,
            format!("{} clusters", clusters),
        ));
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.callback.is_some())
            .finish()
    }
}
