//! Logging session lifecycle
//!
//! A [`LoggingSession`] exclusively owns one pipeline: its sinks, and in
//! async mode the dispatch queue and dispatcher thread. Reconfiguring stops
//! and closes the current pipeline before the next one is built, so two
//! dispatchers never run against the same sinks. Dropping the session shuts
//! it down.
//!
//! The free functions [`configure_logging`], [`get_logger`] and
//! [`shutdown_logging`] manage one process-wide session for applications
//! that prefer a global. Statics are never dropped, so `configure_logging`
//! hands back a [`LoggingGuard`] that drains the session when it goes out of
//! scope at the end of `main`.

use super::dispatcher::{Dispatcher, SinkSet};
use super::error::Result;
use super::logger::{stop_pipeline, Delivery, Logger, Pipeline, SessionCore, StopMode};
use super::metrics::LoggerMetrics;
use super::output_format::RecordFormatter;
use super::overflow_policy::OverflowCallback;
use super::queue::dispatch_queue;
use super::settings::LogSettings;
use super::trace_context::SharedTraceProvider;
use crate::sinks::{build_sinks, SharedExporterFactory};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconfigured,
    /// Sinks written from the calling thread
    Sync,
    /// Events queued for the dispatcher thread
    Async,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unconfigured => write!(f, "unconfigured"),
            SessionState::Sync => write!(f, "configured (sync)"),
            SessionState::Async => write!(f, "configured (async)"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Capabilities supplied by the application rather than by settings
#[derive(Clone, Default)]
pub struct SessionOptions {
    pub exporter_factory: Option<SharedExporterFactory>,
    pub trace_provider: Option<SharedTraceProvider>,
    pub on_overflow: Option<OverflowCallback>,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn exporter_factory(mut self, factory: SharedExporterFactory) -> Self {
        self.exporter_factory = Some(factory);
        self
    }

    #[must_use]
    pub fn trace_provider(mut self, provider: SharedTraceProvider) -> Self {
        self.trace_provider = Some(provider);
        self
    }

    /// Called with the running drop count on the first overflow drop and
    /// every 1000th after
    #[must_use]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("exporter_factory", &self.exporter_factory.is_some())
            .field("trace_provider", &self.trace_provider.is_some())
            .field("on_overflow", &self.on_overflow.is_some())
            .finish()
    }
}

/// An active logging configuration
///
/// # Example
///
/// ```no_run
/// use otel_logger_system::{FileSettings, LogSettings, LoggingSession};
///
/// let settings = LogSettings::new("checkout")
///     .without_console()
///     .with_file(FileSettings::new("/var/log/checkout.jsonl"));
///
/// let mut session = LoggingSession::start(settings).unwrap();
/// session.logger("checkout.api").info("ready");
///
/// if !session.shutdown() {
///     eprintln!("Warning: logging shutdown timed out");
/// }
/// ```
pub struct LoggingSession {
    core: Arc<SessionCore>,
    settings: LogSettings,
    options: SessionOptions,
    stopped: bool,
}

impl LoggingSession {
    /// Validate `settings`, open the sinks and start delivery
    pub fn start(settings: LogSettings) -> Result<Self> {
        Self::start_with(settings, SessionOptions::default())
    }

    pub fn start_with(settings: LogSettings, options: SessionOptions) -> Result<Self> {
        Self::start_on(Arc::new(SessionCore::new()), settings, options)
    }

    fn start_on(core: Arc<SessionCore>, settings: LogSettings, options: SessionOptions) -> Result<Self> {
        let pipeline = build_pipeline(&settings, &options, core.metrics())?;
        core.install(pipeline);
        Ok(Self {
            core,
            settings,
            options,
            stopped: false,
        })
    }

    /// Replace the configuration
    ///
    /// The new settings are validated first; if they are invalid the current
    /// pipeline keeps running. Otherwise the current pipeline is drained and
    /// closed before the new sinks are opened, even when draining takes
    /// longer than the shutdown timeout. Logger handles obtained earlier keep
    /// working against the new pipeline.
    pub fn reconfigure(&mut self, settings: LogSettings) -> Result<()> {
        settings.validate()?;

        if let Some(previous) = self.core.take() {
            stop_pipeline(
                previous,
                self.settings.shutdown_timeout,
                StopMode::Wait,
                self.core.metrics(),
            );
        }

        let pipeline = build_pipeline(&settings, &self.options, self.core.metrics());
        self.settings = settings;
        match pipeline {
            Ok(pipeline) => {
                self.core.install(pipeline);
                self.stopped = false;
                Ok(())
            }
            Err(e) => {
                self.stopped = true;
                Err(e)
            }
        }
    }

    /// Named logger bound to this session
    pub fn logger(&self, name: &str) -> Logger {
        Logger::new(name, Arc::clone(&self.core))
    }

    pub fn settings(&self) -> &LogSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        self.core.metrics()
    }

    pub fn state(&self) -> SessionState {
        match self.core.is_async() {
            Some(true) => SessionState::Async,
            Some(false) => SessionState::Sync,
            None if self.stopped => SessionState::Stopped,
            None => SessionState::Unconfigured,
        }
    }

    /// Events waiting for the dispatcher
    pub fn pending(&self) -> usize {
        self.core.queue_len()
    }

    /// Drain and stop using the configured shutdown timeout
    pub fn shutdown(&mut self) -> bool {
        self.shutdown_with_timeout(self.settings.shutdown_timeout)
    }

    /// Drain queued events, close every sink, and wait up to `timeout`
    ///
    /// Idempotent. Returns `false` if the dispatcher was still draining when
    /// the timeout expired; it keeps running detached in that case.
    pub fn shutdown_with_timeout(&mut self, timeout: Duration) -> bool {
        self.stopped = true;
        match self.core.take() {
            Some(pipeline) => stop_pipeline(pipeline, timeout, StopMode::Detach, self.core.metrics()),
            None => true,
        }
    }
}

impl Drop for LoggingSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for LoggingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingSession")
            .field("service_name", &self.settings.service_name)
            .field("state", &self.state())
            .finish()
    }
}

fn build_pipeline(
    settings: &LogSettings,
    options: &SessionOptions,
    metrics: &Arc<LoggerMetrics>,
) -> Result<Pipeline> {
    settings.validate()?;
    let min_level = settings.min_level()?;

    let metadata = Arc::new(settings.static_metadata());
    let formatter = Arc::new(RecordFormatter::new(
        Arc::clone(&metadata),
        settings.format_options(),
        Arc::new(settings.redactor()),
    ));

    let sinks = build_sinks(settings, &metadata, options.exporter_factory.as_deref())?;
    let sink_set = SinkSet::new(sinks, formatter, Arc::clone(metrics));

    let delivery = if settings.async_mode {
        let (queue, receiver) = dispatch_queue(settings.queue_capacity, settings.overflow_policy);
        let dispatcher = Dispatcher::spawn(receiver, sink_set)?;
        Delivery::Async { queue, dispatcher }
    } else {
        Delivery::Sync(parking_lot::Mutex::new(sink_set))
    };

    let trace_provider = if settings.try_trace_context {
        options.trace_provider.clone()
    } else {
        None
    };

    Ok(Pipeline {
        delivery,
        min_level,
        static_attributes: metadata.attributes.clone(),
        trace_provider,
        on_overflow: options.on_overflow.clone(),
    })
}

struct GlobalLogging {
    core: Arc<SessionCore>,
    slot: Mutex<GlobalSlot>,
}

#[derive(Default)]
struct GlobalSlot {
    session: Option<LoggingSession>,
    /// Bumped by every successful configure; identifies the live guard
    generation: u64,
}

fn global() -> &'static GlobalLogging {
    static GLOBAL: OnceLock<GlobalLogging> = OnceLock::new();
    GLOBAL.get_or_init(|| GlobalLogging {
        core: Arc::new(SessionCore::new()),
        slot: Mutex::new(GlobalSlot::default()),
    })
}

/// Drains the process-wide session when dropped
///
/// Only the guard from the most recent [`configure_logging`] call shuts the
/// session down; guards from earlier calls become inert once logging is
/// reconfigured. Keep it alive in `main`:
///
/// ```no_run
/// use otel_logger_system::{configure_logging, get_logger, LogSettings};
///
/// let _logging = configure_logging(LogSettings::new("worker")).unwrap();
/// get_logger("worker").info("started");
/// // queued events are delivered when `_logging` goes out of scope
/// ```
#[must_use = "dropping the guard immediately shuts logging down"]
#[derive(Debug)]
pub struct LoggingGuard {
    generation: u64,
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        let session = {
            let mut slot = global().slot.lock();
            if slot.generation != self.generation {
                return;
            }
            slot.session.take()
        };
        if let Some(mut session) = session {
            if !session.shutdown() {
                eprintln!("[LOGGER WARNING] Logging shutdown at exit timed out");
            }
        }
    }
}

/// Configure (or reconfigure) the process-wide session
pub fn configure_logging(settings: LogSettings) -> Result<LoggingGuard> {
    configure_logging_with(settings, SessionOptions::default())
}

pub fn configure_logging_with(settings: LogSettings, options: SessionOptions) -> Result<LoggingGuard> {
    let global = global();
    let mut guard = global.slot.lock();
    let slot = &mut *guard;

    match slot.session {
        Some(ref mut session) => {
            session.options = options;
            session.reconfigure(settings)?;
        }
        None => {
            slot.session = Some(LoggingSession::start_on(
                Arc::clone(&global.core),
                settings,
                options,
            )?);
        }
    }

    slot.generation += 1;
    Ok(LoggingGuard {
        generation: slot.generation,
    })
}

/// Logger bound to the process-wide session
///
/// Handles may be obtained before configuration; events logged while no
/// session is configured are discarded.
pub fn get_logger(name: &str) -> Logger {
    Logger::new(name, Arc::clone(&global().core))
}

/// Shut down the process-wide session; returns `true` if nothing was
/// configured or the drain completed in time
pub fn shutdown_logging() -> bool {
    let session = global().slot.lock().session.take();
    match session {
        Some(mut session) => session.shutdown(),
        None => true,
    }
}

/// State of the process-wide session
pub fn logging_state() -> SessionState {
    match global().slot.lock().session.as_ref() {
        Some(session) => session.state(),
        None => SessionState::Unconfigured,
    }
}
