//! Sink trait for log output destinations

use super::{error::Result, log_level::LogLevel, output_format::FormattedRecord};

/// A destination for formatted records
///
/// Sinks are owned by exactly one dispatcher (or, in synchronous mode, by a
/// mutex), so methods take `&mut self` and implementations need no interior
/// locking. A sink only sees events at or above its own [`min_level`].
///
/// [`min_level`]: Sink::min_level
pub trait Sink: Send {
    fn emit(&mut self, record: &FormattedRecord<'_>) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release resources; called once when the pipeline stops
    fn close(&mut self) -> Result<()> {
        self.flush()
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Trace
    }

    fn name(&self) -> &str;
}
