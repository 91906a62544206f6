//! Sink implementations

pub mod console;
pub mod remote;
pub mod rotating_file;

pub use console::ConsoleSink;
pub use remote::{
    ExporterConfig, ExporterFactory, InMemoryExporter, LogExporter, RemoteSink,
    SharedExporterFactory,
};
pub use rotating_file::{RotatingFileSink, RotationPolicy};

pub use crate::core::Sink;

use crate::core::error::{LoggerError, Result};
use crate::core::metadata::StaticMetadata;
use crate::core::settings::{resolve_sink_level, LogSettings};

/// Open every sink enabled in `settings`, in console, file, remote order
///
/// Any failure closes the sinks already opened and is returned as-is.
pub(crate) fn build_sinks(
    settings: &LogSettings,
    metadata: &StaticMetadata,
    exporter_factory: Option<&dyn ExporterFactory>,
) -> Result<Vec<Box<dyn Sink>>> {
    let mut sinks: Vec<Box<dyn Sink>> = Vec::new();

    let result = open_into(&mut sinks, settings, metadata, exporter_factory);
    if let Err(e) = result {
        for sink in sinks.iter_mut() {
            let _ = sink.close();
        }
        return Err(e);
    }

    Ok(sinks)
}

fn open_into(
    sinks: &mut Vec<Box<dyn Sink>>,
    settings: &LogSettings,
    metadata: &StaticMetadata,
    exporter_factory: Option<&dyn ExporterFactory>,
) -> Result<()> {
    if let Some(ref console) = settings.console {
        let level = resolve_sink_level(console.level.as_deref())?;
        sinks.push(Box::new(
            ConsoleSink::stdout(console.mode, settings.dev_color).with_level(level),
        ));
    }

    if let Some(ref file) = settings.file {
        let level = resolve_sink_level(file.level.as_deref())?;
        let policy = RotationPolicy::new()
            .with_max_size(file.rotate_bytes.unwrap_or(0))
            .with_max_backups(file.rotate_backups)
            .with_compression(file.compress);
        sinks.push(Box::new(
            RotatingFileSink::open(&file.path, policy)?.with_level(level),
        ));
    }

    if let Some(ref remote) = settings.remote {
        let level = resolve_sink_level(remote.level.as_deref())?;
        let factory = exporter_factory.ok_or_else(|| {
            LoggerError::config(
                "remote",
                "a remote sink is configured but no exporter factory was supplied",
            )
        })?;
        sinks.push(Box::new(
            RemoteSink::from_settings(remote, metadata, factory)?.with_level(level),
        ));
    }

    Ok(())
}
