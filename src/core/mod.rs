//! Core logging types: events, formatting, the dispatch pipeline and sessions

pub mod attributes;
pub mod dispatcher;
pub mod error;
pub mod log_context;
pub mod log_event;
pub mod log_level;
pub mod logger;
pub mod metadata;
pub mod metrics;
pub mod output_format;
pub mod overflow_policy;
pub mod queue;
pub mod redaction;
pub mod session;
pub mod settings;
pub mod sink;
pub mod timestamp;
pub mod trace_context;

pub use attributes::Attributes;
pub use dispatcher::{Dispatcher, SinkSet};
pub use error::{LoggerError, Result};
pub use log_context::{current_context, log_context, with_log_context, ContextGuard, ContextSnapshot};
pub use log_event::{CodeLocation, ExceptionInfo, LogEvent};
pub use log_level::{severity_number, LogLevel};
pub use logger::{EventBuilder, Logger};
pub use metadata::StaticMetadata;
pub use metrics::LoggerMetrics;
pub use output_format::{FormatOptions, FormattedRecord, OutputFormat, RecordFormatter};
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use queue::{dispatch_queue, DispatchQueue, PushOutcome, QueueReceiver};
pub use redaction::{Redactor, DEFAULT_REDACT_KEYS, REDACTION_MASK};
pub use session::{
    configure_logging, configure_logging_with, get_logger, logging_state, shutdown_logging,
    LoggingGuard, LoggingSession, SessionOptions, SessionState,
};
pub use settings::{
    ConsoleMode, ConsoleSettings, FileSettings, LogSettings, RemoteSettings,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use sink::Sink;
pub use timestamp::TimeZoneMode;
pub use trace_context::{SharedTraceProvider, TraceContext, TraceContextProvider};
