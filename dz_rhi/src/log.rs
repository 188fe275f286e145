//! Internal logging system for the DenOfIz RHI
//!
//! This module provides a flexible logging system with:
//! - Customizable logger via Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default
//! - File and line information for detailed ERROR logs
//! - Macros that log and build an [`Error`](crate::dz::Error) in one step

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// # Example
///
/// ```no_run
/// use dz_rhi::dz::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "dz::ShaderCompiler", "dz::vulkan")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for detailed ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for detailed ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Very verbose debug information
    Trace,

    /// Development/debugging information
    Debug,

    /// Important informational messages
    Info,

    /// Recoverable inconsistencies (cache fallback, root signature churn, ...)
    Warn,

    /// Errors (with file:line details)
    Error,
}

/// Default logger implementation using colored console output
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let severity_str = match entry.severity {
            LogSeverity::Trace => "TRACE".bright_black(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        };

        let source = entry.source.bright_blue();

        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            eprintln!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity_str, source, entry.message, file, line
            );
        } else {
            println!("[{}] [{}] [{}] {}", timestamp, severity_str, source, entry.message);
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::dz::Engine::log(
            $crate::dz::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::dz::Engine::log(
            $crate::dz::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message
///
/// ```no_run
/// dz_rhi::engine_info!("dz::Engine", "Device '{}' registered", "main");
/// ```
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::dz::Engine::log(
            $crate::dz::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::dz::Engine::log(
            $crate::dz::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::dz::Engine::log_detailed(
            $crate::dz::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR and evaluate to the matching [`Error`](crate::dz::Error)
///
/// Without a variant the error is `Error::BackendError`:
///
/// ```no_run
/// # use dz_rhi::engine_err;
/// let e = engine_err!("dz::vulkan", "vkQueueSubmit failed: {}", -4);
/// let c = engine_err!("dz::ShaderProgram", Configuration => "space {} is reserved", 31);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $kind:ident => $($arg:tt)+) => {{
        let message = format!($($arg)+);
        $crate::engine_error!($source, "{}", message);
        $crate::dz::Error::$kind(message)
    }};
    ($source:expr, $($arg:tt)+) => {{
        let message = format!($($arg)+);
        $crate::engine_error!($source, "{}", message);
        $crate::dz::Error::BackendError(message)
    }};
}

/// Log an ERROR and return it from the enclosing function
#[macro_export]
macro_rules! engine_bail {
    ($($arg:tt)+) => {
        return Err($crate::engine_err!($($arg)+))
    };
}

/// Log a WARN and evaluate to the matching [`Error`](crate::dz::Error)
///
/// Used for caller-contract violations that must be reported without
/// being treated as fatal.
#[macro_export]
macro_rules! engine_warn_err {
    ($source:expr, $kind:ident => $($arg:tt)+) => {{
        let message = format!($($arg)+);
        $crate::engine_warn!($source, "{}", message);
        $crate::dz::Error::$kind(message)
    }};
    ($source:expr, $($arg:tt)+) => {{
        let message = format!($($arg)+);
        $crate::engine_warn!($source, "{}", message);
        $crate::dz::Error::BackendError(message)
    }};
}

/// Log a WARN and return the matching error from the enclosing function
#[macro_export]
macro_rules! engine_bail_warn {
    ($($arg:tt)+) => {
        return Err($crate::engine_warn_err!($($arg)+))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
