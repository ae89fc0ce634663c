use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::lock;

/// Default maximum number of log entries to keep in memory
pub const DEFAULT_MAX_LOG_LINES: usize = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
}

/// Bounded activity log. Every entry is also emitted through `tracing`
/// with a `[component]` prefix.
#[derive(Debug)]
pub struct LogManager {
    entries: Mutex<VecDeque<LogEntry>>,
    max_lines: usize,
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOG_LINES)
    }
}

impl LogManager {
    pub fn new(max_lines: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max_lines.min(DEFAULT_MAX_LOG_LINES))),
            max_lines,
        }
    }

    pub fn log(&self, level: LogLevel, component: &str, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("[{component}] {message}"),
            LogLevel::Info => tracing::info!("[{component}] {message}"),
            LogLevel::Warn => tracing::warn!("[{component}] {message}"),
            LogLevel::Error => tracing::error!("[{component}] {message}"),
        }

        let entry = LogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level,
            component: component.to_string(),
            message: message.to_string(),
        };

        let mut entries = lock(&self.entries);
        entries.push_back(entry);

        while entries.len() > self.max_lines {
            entries.pop_front();
        }
    }

    pub fn debug(&self, component: &str, message: &str) {
        self.log(LogLevel::Debug, component, message);
    }

    pub fn info(&self, component: &str, message: &str) {
        self.log(LogLevel::Info, component, message);
    }

    pub fn warn(&self, component: &str, message: &str) {
        self.log(LogLevel::Warn, component, message);
    }

    pub fn error(&self, component: &str, message: &str) {
        self.log(LogLevel::Error, component, message);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        lock(&self.entries).iter().cloned().collect()
    }

    pub fn entries_for(&self, component: &str) -> Vec<LogEntry> {
        lock(&self.entries)
            .iter()
            .filter(|e| e.component == component)
            .cloned()
            .collect()
    }

    pub fn errors(&self) -> Vec<LogEntry> {
        lock(&self.entries)
            .iter()
            .filter(|e| e.level == LogLevel::Error)
            .cloned()
            .collect()
    }
}
