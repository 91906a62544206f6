//! Logging macros
//!
//! Like `println!`, but the call site's file, line and module path are
//! recorded as the event's code location, and extra attributes can follow a
//! `;` as `key => value` pairs. Values are captured through `serde`, falling
//! back to their `Debug` text when they cannot be represented as JSON.
//!
//! # Examples
//!
//! ```
//! use otel_logger_system::{info, warn, LogSettings, LoggingSession};
//!
//! let session = LoggingSession::start(LogSettings::new("svc").with_async(false)).unwrap();
//! let logger = session.logger("svc.http");
//!
//! info!(logger, "Server started");
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! warn!(logger, "slow request"; "path" => "/checkout", "elapsed_ms" => 1250);
//! ```

/// Log at an explicit level.
///
/// # Examples
///
/// ```
/// # use otel_logger_system::{LogSettings, LoggingSession, LogLevel};
/// # let session = LoggingSession::start(LogSettings::new("svc").with_async(false)).unwrap();
/// # let logger = session.logger("svc");
/// use otel_logger_system::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500; "retryable" => false);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $fmt:literal $(, $arg:expr)* ; $($key:expr => $value:expr),+ $(,)?) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled(level) {
            #[allow(unused_mut)]
            let mut extras = $crate::Attributes::new();
            $( extras.insert_serialized($key, &$value); )+
            logger.log_event(
                $crate::LogEvent::new(level, format!($fmt $(, $arg)*))
                    .with_location(file!(), line!(), module_path!())
                    .with_attributes(extras),
            );
        }
    }};
    ($logger:expr, $level:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled(level) {
            logger.log_event(
                $crate::LogEvent::new(level, format!($fmt $(, $arg)*))
                    .with_location(file!(), line!(), module_path!()),
            );
        }
    }};
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
///
/// ```
/// # use otel_logger_system::{LogSettings, LoggingSession};
/// # let session = LoggingSession::start(LogSettings::new("svc").with_async(false).with_level("DEBUG")).unwrap();
/// # let logger = session.logger("svc");
/// use otel_logger_system::debug;
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// ```
/// # use otel_logger_system::{LogSettings, LoggingSession};
/// # let session = LoggingSession::start(LogSettings::new("svc").with_async(false)).unwrap();
/// # let logger = session.logger("svc");
/// use otel_logger_system::error;
/// error!(logger, "Failed to connect to {}", "db-01"; "attempt" => 3);
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}
