//! Build Reporting
//!
//! The reporter accumulates the log of a single build run, mirrors it into
//! `tracing`, and can stream events to one listener over a channel.

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

/// Events emitted while a build runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// A task started
    TaskStarted { task: String },
    /// A task finished successfully
    TaskFinished { task: String },
    /// Overall progress, 0..=100
    Progress(u32),
    /// Log line
    Log { level: LogLevel, message: String },
    /// The run ended
    Finished { success: bool },
}

/// Log levels for log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One accumulated log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Per-build log sink
#[derive(Debug, Default)]
pub struct Reporter {
    entries: Vec<LogEntry>,
    progress: u32,
    listener: Option<Sender<BuildEvent>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reporter together with the receiving end of its event stream
    pub fn with_listener() -> (Self, Receiver<BuildEvent>) {
        let (sender, receiver) = unbounded();
        let reporter = Self {
            listener: Some(sender),
            ..Self::default()
        };
        (reporter, receiver)
    }

    /// User-facing status line
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.push(LogLevel::Info, message);
    }

    /// Detail line, kept in the build log but only traced at debug level
    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        self.push(LogLevel::Debug, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.push(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.push(LogLevel::Error, message);
    }

    /// Record progress; values never go backwards and are capped at 100
    pub fn set_progress(&mut self, percent: u32) {
        let percent = percent.min(100);
        if percent > self.progress {
            self.progress = percent;
            self.emit(BuildEvent::Progress(percent));
        }
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// The log as newline-separated text
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.message);
            out.push('\n');
        }
        out
    }

    /// Send an event to the listener, if one is attached
    pub fn emit(&self, event: BuildEvent) {
        if let Some(ref listener) = self.listener {
            // A dropped receiver only means nobody is watching anymore.
            let _ = listener.send(event);
        }
    }

    fn push(&mut self, level: LogLevel, message: String) {
        self.emit(BuildEvent::Log {
            level,
            message: message.clone(),
        });
        self.entries.push(LogEntry { level, message });
    }
}
