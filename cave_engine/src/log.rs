//! Engine logging
//!
//! All engine output goes through one process-wide [`Logger`]. The default
//! logger prints colored lines to stdout; applications can swap it for their
//! own sink with [`set_logger`] and raise the noise floor with
//! [`set_min_severity`]. The `engine_*!` macros are the only entry points
//! used inside the crate.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{OnceLock, PoisonError, RwLock};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};

/// Destination for engine log entries
///
/// # Example
///
/// ```no_run
/// use cave_engine::cave::log::{Logger, LogEntry};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, entry: &LogEntry) {
///         eprintln!("{}: {}", entry.source, entry.message);
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// One log record
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,
    /// Subsystem tag, e.g. `"cave::Renderer"`
    pub source: String,
    pub message: String,
    /// Call site, set for ERROR entries only
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl LogEntry {
    fn location(&self) -> Option<(&'static str, u32)> {
        self.file.zip(self.line)
    }
}

/// Log severity, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Per-batch events
    Trace,
    Debug,
    Info,
    Warn,
    /// Failures; carries the call site
    Error,
}

impl LogSeverity {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogSeverity::Trace,
            1 => LogSeverity::Debug,
            2 => LogSeverity::Info,
            3 => LogSeverity::Warn,
            _ => LogSeverity::Error,
        }
    }

    /// Fixed-width tag used in formatted output
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }

    fn colored_label(self) -> ColoredString {
        let label = self.label();
        match self {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        }
    }
}

/// Stdout logger
///
/// Lines read `[timestamp] [SEVERITY] [source] message`, with ` (file:line)`
/// appended for ERROR entries.
pub struct DefaultLogger;

impl DefaultLogger {
    /// Format an entry without color codes
    pub fn format_plain(entry: &LogEntry) -> String {
        format_line(entry, entry.severity.label(), &entry.source)
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        println!(
            "{}",
            format_line(entry, entry.severity.colored_label(), entry.source.bright_blue())
        );
    }
}

fn format_line(entry: &LogEntry, severity: impl fmt::Display, source: impl fmt::Display) -> String {
    let timestamp: DateTime<Local> = entry.timestamp.into();
    let mut line = format!(
        "[{}] [{}] [{}] {}",
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        severity,
        source,
        entry.message
    );
    if let Some((file, line_number)) = entry.location() {
        line.push_str(&format!(" ({}:{})", file, line_number));
    }
    line
}

// ============================================================================
// Process-wide logger
// ============================================================================

static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(LogSeverity::Debug as u8);

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

/// Replace the process-wide logger
pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
    *logger().write().unwrap_or_else(PoisonError::into_inner) = Box::new(logger_impl);
}

/// Restore [`DefaultLogger`]
pub fn reset_logger() {
    set_logger(DefaultLogger);
}

/// Drop entries below `severity` (default: Debug)
pub fn set_min_severity(severity: LogSeverity) {
    MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
}

pub fn min_severity() -> LogSeverity {
    LogSeverity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
}

/// Entry point of `engine_trace!` through `engine_warn!`
pub fn log(severity: LogSeverity, source: &str, message: String) {
    dispatch(severity, source, message, None);
}

/// Entry point of `engine_error!`
pub fn log_detailed(severity: LogSeverity, source: &str, message: String, file: &'static str, line: u32) {
    dispatch(severity, source, message, Some((file, line)));
}

fn dispatch(severity: LogSeverity, source: &str, message: String, location: Option<(&'static str, u32)>) {
    if severity < min_severity() {
        return;
    }
    let entry = LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: source.to_string(),
        message,
        file: location.map(|(file, _)| file),
        line: location.map(|(_, line)| line),
    };
    logger().read().unwrap_or_else(PoisonError::into_inner).log(&entry);
}

// ============================================================================
// Macros
// ============================================================================

#[doc(hidden)]
#[macro_export]
macro_rules! __engine_log {
    ($severity:ident, $source:expr, $($arg:tt)*) => {
        $crate::log::log($crate::log::LogSeverity::$severity, $source, format!($($arg)*))
    };
}

/// Log at TRACE severity (filtered out by default)
///
/// ```no_run
/// # use cave_engine::engine_trace;
/// engine_trace!("cave::Renderer2D", "Flushed {} quad(s)", 12);
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Trace, $source, $($arg)*) };
}

#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Debug, $source, $($arg)*) };
}

/// Log at INFO severity
///
/// ```no_run
/// # use cave_engine::engine_info;
/// engine_info!("cave::Renderer", "Renderer initialized ({})", "Software");
/// ```
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Info, $source, $($arg)*) };
}

#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Warn, $source, $($arg)*) };
}

/// Log at ERROR severity with the call site attached
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!(),
        )
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
