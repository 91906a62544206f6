//! Remote exporter sink
//!
//! The wire protocol to a collector is not implemented here. A
//! [`LogExporter`] is an opaque object that accepts one structured record at
//! a time and can be shut down; an [`ExporterFactory`] supplied by the caller
//! builds it from the resolved [`ExporterConfig`].

use crate::core::attributes::Attributes;
use crate::core::error::{LoggerError, Result};
use crate::core::log_level::LogLevel;
use crate::core::metadata::StaticMetadata;
use crate::core::output_format::FormattedRecord;
use crate::core::settings::RemoteSettings;
use crate::core::sink::Sink;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Client for a remote log collector
pub trait LogExporter: Send {
    /// Ship one structured record
    fn export(&mut self, record: &Map<String, Value>) -> Result<()>;

    fn force_flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Flush pending records and release the transport
    fn shutdown(&mut self) -> Result<()>;
}

/// Fully resolved exporter parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    /// `http/protobuf` or `grpc`
    pub protocol: &'static str,
    pub endpoint: String,
    pub insecure: bool,
    pub headers: BTreeMap<String, String>,
    pub compression: Option<String>,
    pub timeout: Option<Duration>,
    /// service.name, service.version, deployment.environment plus the
    /// configured resource attributes
    pub resource: Attributes,
}

impl ExporterConfig {
    /// Resolve remote settings against service identity and the environment
    pub fn resolve(settings: &RemoteSettings, metadata: &StaticMetadata) -> Result<Self> {
        let protocol = settings.normalized_protocol()?;
        let endpoint = settings.resolved_endpoint()?;

        let mut resource = metadata.resource_attributes();
        resource.extend_from(&settings.resource_attributes);

        Ok(Self {
            protocol,
            endpoint,
            insecure: settings.insecure,
            headers: settings.headers.clone(),
            compression: settings.compression.clone(),
            timeout: settings.timeout,
            resource,
        })
    }
}

/// Builds the exporter for a session's remote sink
pub trait ExporterFactory: Send + Sync {
    fn create(&self, config: &ExporterConfig) -> Result<Box<dyn LogExporter>>;
}

impl<F> ExporterFactory for F
where
    F: Fn(&ExporterConfig) -> Result<Box<dyn LogExporter>> + Send + Sync,
{
    fn create(&self, config: &ExporterConfig) -> Result<Box<dyn LogExporter>> {
        self(config)
    }
}

pub type SharedExporterFactory = Arc<dyn ExporterFactory>;

/// Sink forwarding structured records to a [`LogExporter`]
pub struct RemoteSink {
    exporter: Box<dyn LogExporter>,
    config: ExporterConfig,
    level: LogLevel,
    shut_down: bool,
}

impl RemoteSink {
    pub fn new(exporter: Box<dyn LogExporter>, config: ExporterConfig) -> Self {
        Self {
            exporter,
            config,
            level: LogLevel::Trace,
            shut_down: false,
        }
    }

    /// Resolve the settings and build the exporter through `factory`
    pub fn from_settings(
        settings: &RemoteSettings,
        metadata: &StaticMetadata,
        factory: &dyn ExporterFactory,
    ) -> Result<Self> {
        let config = ExporterConfig::resolve(settings, metadata)?;
        let exporter = factory.create(&config)?;
        Ok(Self::new(exporter, config))
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }
}

impl Sink for RemoteSink {
    fn emit(&mut self, record: &FormattedRecord<'_>) -> Result<()> {
        if self.shut_down {
            return Err(LoggerError::export("exporter already shut down"));
        }
        self.exporter.export(record.structured())
    }

    fn flush(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.exporter.force_flush()
    }

    fn close(&mut self) -> Result<()> {
        if std::mem::replace(&mut self.shut_down, true) {
            return Ok(());
        }
        self.exporter.shutdown()
    }

    fn min_level(&self) -> LogLevel {
        self.level
    }

    fn name(&self) -> &str {
        "remote"
    }
}

/// Exporter that keeps records in memory
///
/// Clones share the same buffer, so a handle kept by the caller observes
/// what the session exported. Useful for tests and in-process collection.
///
/// # Example
///
/// ```
/// use otel_logger_system::sinks::InMemoryExporter;
///
/// let exporter = InMemoryExporter::new();
/// let handle = exporter.clone();
/// assert!(handle.records().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryExporter {
    records: Arc<Mutex<Vec<Map<String, Value>>>>,
    shutdowns: Arc<Mutex<usize>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.records.lock().clone()
    }

    pub fn shutdown_count(&self) -> usize {
        *self.shutdowns.lock()
    }

    /// Factory handing out clones of this exporter
    pub fn factory(&self) -> SharedExporterFactory {
        let exporter = self.clone();
        Arc::new(move |_: &ExporterConfig| -> Result<Box<dyn LogExporter>> {
            Ok(Box::new(exporter.clone()))
        })
    }
}

impl LogExporter for InMemoryExporter {
    fn export(&mut self, record: &Map<String, Value>) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        *self.shutdowns.lock() += 1;
        Ok(())
    }
}
