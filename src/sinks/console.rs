//! Console sink implementation

use crate::core::error::{LoggerError, Result};
use crate::core::log_level::LogLevel;
use crate::core::output_format::{FormattedRecord, OutputFormat};
use crate::core::settings::ConsoleMode;
use crate::core::sink::Sink;
use std::io::{self, IsTerminal, Stdout, Write};

/// Writes one record per line to standard output (or any writer)
pub struct ConsoleSink<W: Write + Send = Stdout> {
    writer: W,
    output_format: OutputFormat,
    use_colors: bool,
    level: LogLevel,
}

impl ConsoleSink<Stdout> {
    /// Console sink on stdout
    ///
    /// In [`ConsoleMode::Auto`], output is human-readable and colored only
    /// when `dev_color` is set and stdout is an interactive terminal;
    /// otherwise it is JSON.
    pub fn stdout(mode: ConsoleMode, dev_color: bool) -> Self {
        let is_tty = io::stdout().is_terminal();
        let (output_format, use_colors) = resolve_mode(mode, dev_color, is_tty);
        Self {
            writer: io::stdout(),
            output_format,
            use_colors,
            level: LogLevel::Trace,
        }
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    /// Console sink on an arbitrary writer
    ///
    /// # Example
    ///
    /// ```
    /// use otel_logger_system::sinks::ConsoleSink;
    /// use otel_logger_system::OutputFormat;
    ///
    /// let sink = ConsoleSink::with_writer(Vec::new(), OutputFormat::Human, false);
    /// ```
    pub fn with_writer(writer: W, output_format: OutputFormat, use_colors: bool) -> Self {
        Self {
            writer,
            output_format,
            use_colors,
            level: LogLevel::Trace,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn uses_colors(&self) -> bool {
        self.use_colors
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn resolve_mode(mode: ConsoleMode, dev_color: bool, is_tty: bool) -> (OutputFormat, bool) {
    let colorize = dev_color && is_tty;
    match mode {
        ConsoleMode::Json => (OutputFormat::Json, false),
        ConsoleMode::Human => (OutputFormat::Human, colorize),
        ConsoleMode::Auto if colorize => (OutputFormat::Human, true),
        ConsoleMode::Auto => (OutputFormat::Json, false),
    }
}

impl<W: Write + Send> Sink for ConsoleSink<W> {
    fn emit(&mut self, record: &FormattedRecord<'_>) -> Result<()> {
        let line = record.render(self.output_format, self.use_colors);
        writeln!(self.writer, "{}", line)
            .map_err(|e| LoggerError::sink("console", e.to_string()))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.level
    }

    fn name(&self) -> &str {
        "console"
    }
}
