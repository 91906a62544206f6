//! Log event produced at a call site

use super::attributes::Attributes;
use super::log_level::LogLevel;
use super::trace_context::TraceContext;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cell::RefCell;
use std::error::Error;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

/// Get cached thread ID, computing and caching it on first access
fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

/// Get cached thread name, computing and caching it on first access
fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Source location of the logging call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLocation {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl CodeLocation {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }

    /// Final path component of `file`
    pub fn file_name(&self) -> &str {
        self.file
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.file)
    }
}

/// Error details attached to an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
    pub stacktrace: String,
}

impl ExceptionInfo {
    pub fn new(
        type_name: impl Into<String>,
        message: impl Into<String>,
        stacktrace: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            stacktrace: stacktrace.into(),
        }
    }

    /// Capture an error, its type name and its `source()` chain
    pub fn from_error<E: Error + 'static>(error: &E) -> Self {
        let full_name = std::any::type_name::<E>();
        let type_name = short_type_name(full_name).to_string();
        let message = error.to_string();

        let mut trace = format!("{}: {}", full_name, message);
        let mut source = error.source();
        while let Some(cause) = source {
            trace.push_str("\nCaused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }

        Self {
            type_name,
            message,
            stacktrace: trace.trim_end().to_string(),
        }
    }
}

/// `alloc::string::String` -> `String`, keeping generic arguments intact
fn short_type_name(full: &str) -> &str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Immutable value describing one logging call
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Message template; `{}` placeholders are filled from `args`
    pub message: String,
    pub args: Vec<Value>,
    pub logger_name: Option<String>,
    pub location: Option<CodeLocation>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    pub exception: Option<ExceptionInfo>,
    pub stack: Option<String>,
    pub attributes: Attributes,
    pub trace: Option<TraceContext>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            args: Vec::new(),
            logger_name: None,
            location: None,
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
            exception: None,
            stack: None,
            attributes: Attributes::new(),
            trace: None,
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = Some(name.into());
        self
    }

    pub fn with_location(mut self, file: &str, line: u32, function: &str) -> Self {
        self.location = Some(CodeLocation::new(file, line, function));
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn with_error<E: Error + 'static>(self, error: &E) -> Self {
        self.with_exception(ExceptionInfo::from_error(error))
    }

    /// Capture the current call stack into the `stack` field
    pub fn with_stack(mut self) -> Self {
        self.stack = Some(std::backtrace::Backtrace::force_capture().to_string());
        self
    }

    pub fn with_trace(mut self, trace: TraceContext) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Render the message template with its positional arguments
    ///
    /// Each `{}` consumes the next argument; surplus arguments are ignored
    /// and placeholders without an argument are left as-is.
    pub fn body(&self) -> String {
        if self.args.is_empty() {
            return self.message.clone();
        }

        let mut out = String::with_capacity(self.message.len() + 16 * self.args.len());
        let mut args = self.args.iter();
        let mut rest = self.message.as_str();
        while let Some(idx) = rest.find("{}") {
            out.push_str(&rest[..idx]);
            match args.next() {
                Some(Value::String(s)) => out.push_str(s),
                Some(other) => out.push_str(&other.to_string()),
                None => out.push_str("{}"),
            }
            rest = &rest[idx + 2..];
        }
        out.push_str(rest);
        out
    }
}
