//! Logging facade
//!
//! A [`Logger`] is a cheap, cloneable handle bound to a session. Each call
//! checks the session level, merges static attributes, call-site extras and
//! the current context frame (later sources win), attaches trace correlation
//! when available, and hands the event to the session's pipeline.

use super::attributes::Attributes;
use super::dispatcher::{Dispatcher, SinkSet};
use super::log_context::current_context;
use super::log_event::{ExceptionInfo, LogEvent};
use super::log_level::LogLevel;
use super::metrics::LoggerMetrics;
use super::overflow_policy::OverflowCallback;
use super::queue::{DispatchQueue, PushOutcome};
use super::trace_context::{query_provider, SharedTraceProvider, TraceContext};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::error::Error;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Level value meaning "no pipeline installed"
const LEVEL_OFF: u8 = u8::MAX;

/// How events reach the sinks
pub(crate) enum Delivery {
    /// Caller thread formats and writes
    Sync(Mutex<SinkSet>),
    /// Caller thread enqueues; the dispatcher thread writes
    Async {
        queue: DispatchQueue<LogEvent>,
        dispatcher: Dispatcher,
    },
}

/// Everything one configuration installs
pub(crate) struct Pipeline {
    pub(crate) delivery: Delivery,
    pub(crate) min_level: LogLevel,
    pub(crate) static_attributes: Attributes,
    pub(crate) trace_provider: Option<SharedTraceProvider>,
    pub(crate) on_overflow: Option<OverflowCallback>,
}

/// State shared by a session and every logger handle it gave out
pub(crate) struct SessionCore {
    pipeline: RwLock<Option<Pipeline>>,
    min_level: AtomicU8,
    metrics: Arc<LoggerMetrics>,
}

impl SessionCore {
    pub(crate) fn new() -> Self {
        Self {
            pipeline: RwLock::new(None),
            min_level: AtomicU8::new(LEVEL_OFF),
            metrics: Arc::new(LoggerMetrics::new()),
        }
    }

    pub(crate) fn metrics(&self) -> &Arc<LoggerMetrics> {
        &self.metrics
    }

    pub(crate) fn install(&self, pipeline: Pipeline) {
        let mut slot = self.pipeline.write();
        self.min_level
            .store(pipeline.min_level as u8, Ordering::Release);
        *slot = Some(pipeline);
    }

    /// Remove the installed pipeline; later events are discarded
    pub(crate) fn take(&self) -> Option<Pipeline> {
        let mut slot = self.pipeline.write();
        self.min_level.store(LEVEL_OFF, Ordering::Release);
        slot.take()
    }

    pub(crate) fn is_async(&self) -> Option<bool> {
        self.pipeline
            .read()
            .as_ref()
            .map(|p| matches!(p.delivery, Delivery::Async { .. }))
    }

    pub(crate) fn queue_len(&self) -> usize {
        match self.pipeline.read().as_ref().map(|p| &p.delivery) {
            Some(Delivery::Async { queue, .. }) => queue.len(),
            _ => 0,
        }
    }

    #[inline]
    fn is_enabled(&self, level: LogLevel) -> bool {
        let min = self.min_level.load(Ordering::Acquire);
        min != LEVEL_OFF && level as u8 >= min
    }

    fn submit(&self, mut event: LogEvent) {
        let guard = self.pipeline.read();
        let Some(pipeline) = guard.as_ref() else {
            // Not configured or already stopped: drop silently
            return;
        };
        if event.level < pipeline.min_level {
            return;
        }

        // Static < call-site extras < context frame
        let context = current_context();
        let mut attributes = pipeline.static_attributes.clone();
        attributes.extend_from(&event.attributes);
        attributes.extend_from(&context);
        event.attributes = attributes;

        if event.trace.is_none() {
            if let Some(ref provider) = pipeline.trace_provider {
                event.trace = query_provider(provider.as_ref());
            }
        }

        let overflow = match pipeline.delivery {
            Delivery::Sync(ref sinks) => {
                self.metrics.record_submitted();
                self.metrics.record_enqueued();
                let mut sinks = sinks.lock();
                sinks.deliver(&event);
                sinks.flush_all();
                None
            }
            Delivery::Async { ref queue, .. } => {
                let outcome = queue.push(event);
                if !matches!(outcome, PushOutcome::Closed) {
                    self.metrics.record_submitted();
                }
                if !matches!(outcome, PushOutcome::Rejected(_) | PushOutcome::Closed) {
                    self.metrics.record_enqueued();
                }
                if outcome.was_full() {
                    Some((outcome, pipeline.on_overflow.clone()))
                } else {
                    None
                }
            }
        };

        // The overflow callback may log; it must not run under the pipeline lock
        drop(guard);
        if let Some((outcome, on_overflow)) = overflow {
            self.handle_overflow(outcome, on_overflow.as_ref());
        }
    }

    /// Count drops and alert on the first one and every 1000th after
    fn handle_overflow(&self, outcome: PushOutcome, on_overflow: Option<&OverflowCallback>) {
        self.metrics.record_queue_full();

        for _ in 0..outcome.dropped() {
            let dropped_count = self.metrics.record_dropped();
            if dropped_count == 1 || dropped_count % 1000 == 0 {
                eprintln!(
                    "[LOGGER WARNING] Queue full, {} logs dropped. \
                     Consider increasing the queue capacity.",
                    dropped_count
                );
                if let Some(callback) = on_overflow {
                    callback(dropped_count);
                }
            }
        }
    }
}

/// Named logging handle
///
/// # Example
///
/// ```
/// use otel_logger_system::{Attributes, LogSettings, LoggingSession};
///
/// let session = LoggingSession::start(LogSettings::new("demo").with_async(false)).unwrap();
/// let logger = session.logger("demo.orders");
///
/// logger.info("order placed");
/// logger
///     .event(otel_logger_system::LogLevel::Warn, "retrying {} of {}")
///     .arg(2)
///     .arg(5)
///     .attr("order_id", "o-17")
///     .emit();
/// ```
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    core: Arc<SessionCore>,
}

impl Logger {
    pub(crate) fn new(name: &str, core: Arc<SessionCore>) -> Self {
        Self {
            name: Arc::from(name),
            core,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether an event at `level` would currently be accepted
    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.core.is_enabled(level)
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.core.metrics
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if !self.is_enabled(level) {
            return;
        }
        self.log_event(LogEvent::new(level, message));
    }

    /// Log with call-site extra attributes
    pub fn log_with(&self, level: LogLevel, message: impl Into<String>, extras: Attributes) {
        if !self.is_enabled(level) {
            return;
        }
        self.log_event(LogEvent::new(level, message).with_attributes(extras));
    }

    /// Submit a fully built event under this logger's name
    pub fn log_event(&self, mut event: LogEvent) {
        if event.logger_name.is_none() {
            event.logger_name = Some(self.name.to_string());
        }
        self.core.submit(event);
    }

    /// Start building an event; nothing is captured if `level` is disabled
    pub fn event(&self, level: LogLevel, message: impl Into<String>) -> EventBuilder<'_> {
        let event = self
            .is_enabled(level)
            .then(|| LogEvent::new(level, message));
        EventBuilder {
            logger: self,
            event,
        }
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(LogLevel::Fatal, message);
    }

    /// Log an error value at ERROR level with its cause chain attached
    pub fn exception<E: Error + 'static>(&self, message: impl Into<String>, error: &E) {
        self.event(LogLevel::Error, message).error(error).emit();
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").field("name", &self.name).finish()
    }
}

/// Builder for a single event
#[must_use = "call .emit() to log the event"]
pub struct EventBuilder<'a> {
    logger: &'a Logger,
    event: Option<LogEvent>,
}

impl<'a> EventBuilder<'a> {
    fn map(mut self, f: impl FnOnce(LogEvent) -> LogEvent) -> Self {
        self.event = self.event.map(f);
        self
    }

    /// Next positional argument for a `{}` placeholder
    pub fn arg<V: Into<Value>>(mut self, value: V) -> Self {
        if let Some(ref mut event) = self.event {
            event.args.push(value.into());
        }
        self
    }

    /// Extra attribute for this event only
    pub fn attr<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        if let Some(ref mut event) = self.event {
            event.attributes.insert(key, value);
        }
        self
    }

    pub fn attrs(mut self, extras: Attributes) -> Self {
        if let Some(ref mut event) = self.event {
            event.attributes.extend_from(&extras);
        }
        self
    }

    pub fn error<E: Error + 'static>(self, error: &E) -> Self {
        self.map(|e| e.with_error(error))
    }

    pub fn exception(self, exception: ExceptionInfo) -> Self {
        self.map(|e| e.with_exception(exception))
    }

    /// Capture the current call stack
    pub fn stack(self) -> Self {
        self.map(LogEvent::with_stack)
    }

    pub fn location(self, file: &str, line: u32, function: &str) -> Self {
        self.map(|e| e.with_location(file, line, function))
    }

    /// Explicit trace correlation; skips the ambient provider
    pub fn trace(self, trace: TraceContext) -> Self {
        self.map(|e| e.with_trace(trace))
    }

    pub fn emit(self) {
        if let Some(event) = self.event {
            self.logger.log_event(event);
        }
    }
}

/// What [`stop_pipeline`] does when the dispatcher outlives the timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopMode {
    /// Leave the dispatcher draining in the background
    Detach,
    /// Keep waiting until every queued event is delivered and sinks are closed
    Wait,
}

/// Stop a pipeline: drain the queue, close sinks, wait up to `timeout`
///
/// Returns `true` if everything finished in time. With [`StopMode::Wait`]
/// the call returns only once the dispatcher has exited.
pub(crate) fn stop_pipeline(
    pipeline: Pipeline,
    timeout: Duration,
    mode: StopMode,
    metrics: &LoggerMetrics,
) -> bool {
    let completed = match pipeline.delivery {
        Delivery::Sync(sinks) => {
            let mut sinks = sinks.into_inner();
            sinks.flush_all();
            sinks.close_all();
            true
        }
        Delivery::Async {
            queue,
            mut dispatcher,
        } => {
            // Disconnect producers so the dispatcher drains and exits
            drop(queue);
            let finished = dispatcher.join_with_timeout(timeout);
            if !finished && mode == StopMode::Wait {
                dispatcher.join();
            }
            finished
        }
    };

    let dropped = metrics.dropped_count();
    if dropped > 0 {
        eprintln!(
            "[LOGGER WARNING] Logging pipeline stopped with {} dropped logs (drop rate: {:.2}%)",
            dropped,
            metrics.drop_rate()
        );
    }

    completed
}
