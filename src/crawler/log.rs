use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

/// Severity of a spider log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// One entry of a spider's log stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// A subscriber to a spider's log stream
pub type LogListener = Box<dyn Fn(&LogEntry) + Send + Sync>;

/// Fans log entries out to `tracing` and to registered listeners
#[derive(Default)]
pub(crate) struct LogStream {
    listeners: RwLock<Vec<LogListener>>,
}

impl LogStream {
    pub fn subscribe(&self, listener: LogListener) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(listener);
        }
    }

    pub fn emit(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }

        let Ok(listeners) = self.listeners.read() else {
            return;
        };
        if listeners.is_empty() {
            return;
        }
        let entry = LogEntry { level, message };
        for listener in listeners.iter() {
            listener(&entry);
        }
    }
}
