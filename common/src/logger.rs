use chrono::{DateTime, Local};
use serde::Deserialize;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Log levels in order of increasing severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Path to log file
    pub log_file: PathBuf,
    /// Minimum log level to record
    pub min_level: LogLevel,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            log_file: PathBuf::from("camtune.log"),
            min_level: LogLevel::Info,
        }
    }
}

/// Logger that appends timestamped records to a file and mirrors them to
/// `tracing` for the console.
///
/// One instance is built per process and handed to each component as an
/// `Arc<Logger>`.
///
/// # Examples
///
/// ```no_run
/// use common::logger::{Logger, LoggerConfig, LogLevel};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = LoggerConfig {
///     log_file: "capture.log".into(),
///     min_level: LogLevel::Warning,
/// };
/// let logger = Logger::with_config(config)?;
/// logger.info("This info won't be logged");
/// logger.warn("This warning will be logged");
/// # Ok(())
/// # }
/// ```
pub struct Logger {
    config: LoggerConfig,
    file: Mutex<File>,
    /// forward records to `tracing`; off while a full-screen UI is active
    console: AtomicBool,
}

impl Logger {
    /// Create a new logger with a custom configuration. Missing parent
    /// directories of the log file are created.
    pub fn with_config(config: LoggerConfig) -> Result<Self, io::Error> {
        if let Some(parent) = config.log_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;

        Ok(Logger {
            config,
            file: Mutex::new(file),
            console: AtomicBool::new(true),
        })
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Toggle mirroring of records to `tracing`
    pub fn set_console_echo(&self, enabled: bool) {
        self.console.store(enabled, Ordering::Relaxed);
    }

    /// Log a message at the specified level
    ///
    /// Only logs the message if the specified level is greater than or equal to
    /// the logger's minimum log level.
    pub fn log(&self, level: LogLevel, message: &str) -> Result<(), io::Error> {
        if level < self.config.min_level {
            return Ok(());
        }

        if self.console.load(Ordering::Relaxed) {
            match level {
                LogLevel::Trace => tracing::trace!("{}", message),
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warning => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            }
        }

        let timestamp: DateTime<Local> = Local::now();
        let formatted_timestamp = timestamp.format("%Y-%m-%d %H:%M:%S%.6f %:z").to_string();

        let log_entry = format!("{} [{}] {}\n", formatted_timestamp, level, message);

        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        file.write_all(log_entry.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// Log without failing the caller; a broken log file only costs the record
    fn record(&self, level: LogLevel, message: &str) {
        if let Err(e) = self.log(level, message) {
            if self.console.load(Ordering::Relaxed) {
                tracing::warn!("failed to write {}: {}", self.config.log_file.display(), e);
            }
        }
    }

    pub fn trace(&self, message: &str) {
        self.record(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) {
        self.record(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) {
        self.record(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) {
        self.record(LogLevel::Warning, message)
    }

    pub fn error(&self, message: &str) {
        self.record(LogLevel::Error, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger_in(dir: &tempfile::TempDir, min_level: LogLevel) -> Logger {
        Logger::with_config(LoggerConfig {
            log_file: dir.path().join("logs").join("test.log"),
            min_level,
        })
        .unwrap()
    }

    #[test]
    fn creates_missing_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(&dir, LogLevel::Debug);
        logger.info("hello");
        assert!(dir.path().join("logs").join("test.log").exists());
    }

    #[test]
    fn filters_below_min_level() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(&dir, LogLevel::Warning);
        logger.info("quiet");
        logger.error("loud");

        let contents = fs::read_to_string(&logger.config().log_file).unwrap();
        assert!(!contents.contains("quiet"));
        assert!(contents.contains("[ERROR] loud"));
    }

    #[test]
    fn appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(&dir, LogLevel::Trace);
        logger.set_console_echo(false);
        logger.trace("one");
        logger.warn("two");

        let contents = fs::read_to_string(&logger.config().log_file).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[TRACE] one"));
        assert!(lines[1].ends_with("[WARNING] two"));
    }

    #[test]
    fn error_is_the_most_severe_level() {
        let levels = [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
        ];
        assert!(levels.windows(2).all(|pair| pair[0] < pair[1]));

        let dir = tempfile::tempdir().unwrap();
        let logger = logger_in(&dir, LogLevel::Error);
        logger.warn("dropped");
        logger.error("kept");
        let contents = fs::read_to_string(&logger.config().log_file).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn level_names_deserialize_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            level: LogLevel,
        }
        let w: Wrapper = toml::from_str("level = \"warn\"").unwrap();
        assert_eq!(w.level, LogLevel::Warning);
        let w: Wrapper = toml::from_str("level = \"debug\"").unwrap();
        assert_eq!(w.level, LogLevel::Debug);
    }
}
