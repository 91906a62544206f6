//! Delivery of events to sinks
//!
//! [`SinkSet`] formats each event once and offers it to every sink whose
//! level admits it. Each sink call is isolated: an error or a panic in one
//! sink is reported on stderr and counted, and the remaining sinks still
//! receive the event.
//!
//! [`Dispatcher`] owns a `SinkSet` on a dedicated thread and drains the
//! dispatch queue in batches until every producer is gone.

use super::error::{LoggerError, Result};
use super::log_event::LogEvent;
use super::metrics::LoggerMetrics;
use super::output_format::{FormattedRecord, RecordFormatter};
use super::queue::QueueReceiver;
use super::sink::Sink;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Maximum events pulled off the queue before sinks are flushed
const BATCH_SIZE: usize = 64;

/// Name of the dispatcher thread
pub const DISPATCHER_THREAD_NAME: &str = "log-dispatcher";

/// Sinks plus the formatter feeding them
pub struct SinkSet {
    sinks: Vec<Box<dyn Sink>>,
    formatter: Arc<RecordFormatter>,
    metrics: Arc<LoggerMetrics>,
}

impl SinkSet {
    pub fn new(
        sinks: Vec<Box<dyn Sink>>,
        formatter: Arc<RecordFormatter>,
        metrics: Arc<LoggerMetrics>,
    ) -> Self {
        Self {
            sinks,
            formatter,
            metrics,
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.name().to_string()).collect()
    }

    /// Offer one event to every sink
    ///
    /// Returns `true` when no sink failed.
    pub fn deliver(&mut self, event: &LogEvent) -> bool {
        let record = FormattedRecord::new(event, &self.formatter);
        let mut ok = true;

        for sink in self.sinks.iter_mut() {
            if event.level < sink.min_level() {
                continue;
            }

            let result = catch_unwind(AssertUnwindSafe(|| sink.emit(&record)));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!("[LOGGER ERROR] Sink '{}' failed: {}", sink.name(), e);
                    self.metrics.record_sink_failure();
                    ok = false;
                }
                Err(panic_info) => {
                    eprintln!(
                        "[LOGGER CRITICAL] Sink '{}' panicked: {}. \
                         Other sinks continue to function.",
                        sink.name(),
                        panic_message(&panic_info)
                    );
                    self.metrics.record_sink_failure();
                    ok = false;
                }
            }
        }

        self.metrics.record_delivered();
        ok
    }

    pub fn flush_all(&mut self) {
        self.for_each_sink("flush", |sink| sink.flush());
    }

    /// Close every sink; each sink is closed exactly once per pipeline
    pub fn close_all(&mut self) {
        self.for_each_sink("close", |sink| sink.close());
    }

    fn for_each_sink<F>(&mut self, action: &str, mut f: F)
    where
        F: FnMut(&mut Box<dyn Sink>) -> Result<()>,
    {
        for sink in self.sinks.iter_mut() {
            match catch_unwind(AssertUnwindSafe(|| f(sink))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!("[LOGGER ERROR] Sink '{}' {} failed: {}", sink.name(), action, e);
                    self.metrics.record_sink_failure();
                }
                Err(panic_info) => {
                    eprintln!(
                        "[LOGGER CRITICAL] Sink '{}' panicked during {}: {}. \
                         Other sinks continue to function.",
                        sink.name(),
                        action,
                        panic_message(&panic_info)
                    );
                    self.metrics.record_sink_failure();
                }
            }
        }
    }
}

pub(crate) fn panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Background thread draining the dispatch queue
pub struct Dispatcher {
    handle: Option<thread::JoinHandle<()>>,
}

impl Dispatcher {
    /// Start the dispatcher thread
    ///
    /// The thread exits after the last producer handle is dropped and every
    /// queued event has been delivered, then closes its sinks.
    pub fn spawn(receiver: QueueReceiver<LogEvent>, mut sinks: SinkSet) -> Result<Self> {
        let handle = thread::Builder::new()
            .name(DISPATCHER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut batch = Vec::with_capacity(BATCH_SIZE);

                while let Some(event) = receiver.recv() {
                    batch.push(event);
                    receiver.drain_into(&mut batch, BATCH_SIZE - 1);

                    for event in batch.drain(..) {
                        sinks.deliver(&event);
                    }

                    // Flush after each batch to ensure timely writes
                    sinks.flush_all();
                }

                sinks.close_all();
            })
            .map_err(|e| LoggerError::Spawn(e.to_string()))?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the dispatcher to finish draining
    ///
    /// Producers must already be disconnected. Returns `false` if the thread
    /// is still running when `timeout` expires. The handle is kept, so a
    /// later [`join`](Self::join) can still wait for it; dropping the
    /// dispatcher instead leaves the thread draining in the background.
    pub fn join_with_timeout(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                return join_handle(handle);
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Dispatcher thread did not finish within {:?}.",
                    timeout
                );
                self.handle = Some(handle);
                return false;
            }

            // Small sleep to avoid busy-waiting
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Block until the dispatcher has drained and closed its sinks
    pub fn join(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => join_handle(handle),
            None => true,
        }
    }
}

fn join_handle(handle: thread::JoinHandle<()>) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(e) => {
            eprintln!(
                "[LOGGER ERROR] Dispatcher thread panicked during shutdown: {}",
                panic_message(&e)
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::StaticMetadata;
    use crate::core::output_format::FormatOptions;
    use crate::core::overflow_policy::OverflowPolicy;
    use crate::core::queue::dispatch_queue;
    use crate::core::redaction::Redactor;
    use crate::core::LogLevel;
    use parking_lot::Mutex;

    struct Collect {
        lines: Arc<Mutex<Vec<String>>>,
        level: LogLevel,
        closed: Arc<Mutex<u32>>,
    }

    impl Sink for Collect {
        fn emit(&mut self, record: &FormattedRecord<'_>) -> Result<()> {
            self.lines.lock().push(record.event().body());
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            *self.closed.lock() += 1;
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            self.level
        }

        fn name(&self) -> &str {
            "collect"
        }
    }

    struct Failing {
        panic: bool,
    }

    impl Sink for Failing {
        fn emit(&mut self, _record: &FormattedRecord<'_>) -> Result<()> {
            if self.panic {
                panic!("sink exploded");
            }
            Err(LoggerError::sink("failing", "disk full"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn formatter() -> Arc<RecordFormatter> {
        Arc::new(RecordFormatter::new(
            Arc::new(StaticMetadata::new("test")),
            FormatOptions::default(),
            Arc::new(Redactor::disabled()),
        ))
    }

    fn collector(level: LogLevel) -> (Collect, Arc<Mutex<Vec<String>>>, Arc<Mutex<u32>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(0));
        (
            Collect {
                lines: Arc::clone(&lines),
                level,
                closed: Arc::clone(&closed),
            },
            lines,
            closed,
        )
    }

    #[test]
    fn test_per_sink_level_filtering() {
        let (info, info_lines, _) = collector(LogLevel::Info);
        let (error, error_lines, _) = collector(LogLevel::Error);
        let mut set = SinkSet::new(
            vec![Box::new(info), Box::new(error)],
            formatter(),
            Arc::new(LoggerMetrics::new()),
        );

        set.deliver(&LogEvent::new(LogLevel::Warn, "warned"));
        set.deliver(&LogEvent::new(LogLevel::Error, "failed"));

        assert_eq!(*info_lines.lock(), vec!["warned", "failed"]);
        assert_eq!(*error_lines.lock(), vec!["failed"]);
    }

    #[test]
    fn test_failing_sinks_isolated() {
        let (good, lines, _) = collector(LogLevel::Trace);
        let metrics = Arc::new(LoggerMetrics::new());
        let mut set = SinkSet::new(
            vec![
                Box::new(Failing { panic: false }),
                Box::new(Failing { panic: true }),
                Box::new(good),
            ],
            formatter(),
            Arc::clone(&metrics),
        );

        assert!(!set.deliver(&LogEvent::new(LogLevel::Info, "still here")));
        assert_eq!(*lines.lock(), vec!["still here"]);
        assert_eq!(metrics.sink_failures(), 2);
        assert_eq!(metrics.delivered_count(), 1);
    }

    #[test]
    fn test_dispatcher_drains_then_closes() {
        let (sink, lines, closed) = collector(LogLevel::Trace);
        let metrics = Arc::new(LoggerMetrics::new());
        let (queue, receiver) = dispatch_queue(0, OverflowPolicy::DropOldest);
        let mut dispatcher = Dispatcher::spawn(
            receiver,
            SinkSet::new(vec![Box::new(sink)], formatter(), Arc::clone(&metrics)),
        )
        .unwrap();

        for i in 0..500 {
            queue.push(LogEvent::new(LogLevel::Info, format!("event {}", i)));
        }
        drop(queue);

        assert!(dispatcher.join_with_timeout(Duration::from_secs(5)));
        assert!(dispatcher.is_finished());

        let lines = lines.lock();
        assert_eq!(lines.len(), 500);
        assert_eq!(lines[0], "event 0");
        assert_eq!(lines[499], "event 499");
        assert_eq!(*closed.lock(), 1);
        assert_eq!(metrics.delivered_count(), 500);
    }

    struct Slow {
        delivered: Arc<Mutex<u32>>,
    }

    impl Sink for Slow {
        fn emit(&mut self, _record: &FormattedRecord<'_>) -> Result<()> {
            thread::sleep(Duration::from_millis(20));
            *self.delivered.lock() += 1;
            Ok(())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[test]
    fn test_join_after_timeout_waits_for_drain() {
        let delivered = Arc::new(Mutex::new(0));
        let (queue, receiver) = dispatch_queue(0, OverflowPolicy::DropOldest);
        let mut dispatcher = Dispatcher::spawn(
            receiver,
            SinkSet::new(
                vec![Box::new(Slow {
                    delivered: Arc::clone(&delivered),
                })],
                formatter(),
                Arc::new(LoggerMetrics::new()),
            ),
        )
        .unwrap();

        for i in 0..10 {
            queue.push(LogEvent::new(LogLevel::Info, format!("slow {}", i)));
        }
        drop(queue);

        assert!(!dispatcher.join_with_timeout(Duration::from_millis(1)));
        assert!(dispatcher.join());
        assert!(dispatcher.is_finished());
        assert_eq!(*delivered.lock(), 10);
    }
}
