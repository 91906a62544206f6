//! # OTel Logger System
//!
//! Structured logging whose records line up with the OpenTelemetry log data
//! model, delivered to console, rotating file and remote exporter sinks.
//!
//! ## Features
//!
//! - **Structured records**: JSON lines with `time`, `severity_text`,
//!   `severity_number`, `body`, resource attributes and trace correlation
//! - **Redaction**: sensitive keys and pattern matches are masked before any
//!   sink sees a record
//! - **Context**: thread-local attribute frames merged into every event
//! - **Async dispatch**: a bounded queue with drop-oldest or drop-newest
//!   overflow and a single dispatcher thread that drains on shutdown
//!
//! ## Example
//!
//! ```
//! use otel_logger_system::{log_context, Attributes, LogSettings, LoggingSession};
//!
//! let mut session = LoggingSession::start(
//!     LogSettings::new("checkout")
//!         .with_environment("staging")
//!         .with_static_attribute("team", "payments"),
//! )
//! .unwrap();
//!
//! let logger = session.logger("checkout.api");
//! {
//!     let _ctx = log_context(Attributes::new().with_field("request_id", "r-42"));
//!     logger.info("order accepted");
//! }
//!
//! assert!(session.shutdown());
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        configure_logging, current_context, get_logger, log_context, shutdown_logging,
        with_log_context, Attributes, ConsoleMode, ConsoleSettings, ContextGuard, FileSettings,
        LogEvent, LogLevel, LogSettings, Logger, LoggerError, LoggerMetrics, LoggingGuard,
        LoggingSession, OverflowPolicy, RemoteSettings, Result, SessionOptions, Sink, TraceContext,
    };
    pub use crate::{debug, error, fatal, info, log, trace, warn};
}

pub use crate::core::{
    configure_logging, configure_logging_with, current_context, get_logger, log_context,
    logging_state, severity_number, shutdown_logging, with_log_context, Attributes, CodeLocation,
    ConsoleMode, ConsoleSettings, ContextGuard, ContextSnapshot, EventBuilder, ExceptionInfo,
    FileSettings, FormatOptions, FormattedRecord, LogEvent, LogLevel, LogSettings, Logger,
    LoggerError, LoggerMetrics, LoggingGuard, LoggingSession, OutputFormat, OverflowCallback,
    OverflowPolicy, RecordFormatter, Redactor, RemoteSettings, Result, SessionOptions, SessionState,
    SharedTraceProvider, Sink, StaticMetadata, TimeZoneMode, TraceContext, TraceContextProvider,
    DEFAULT_REDACT_KEYS, DEFAULT_SHUTDOWN_TIMEOUT, REDACTION_MASK,
};
