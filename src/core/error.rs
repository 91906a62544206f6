//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Severity name or number that does not resolve to a level
    #[error("Unknown log level: '{0}'")]
    UnknownLevel(String),

    /// Remote exporter protocol outside the supported set
    #[error("Unsupported OTLP protocol '{0}'. Expected 'http/protobuf' or 'grpc'.")]
    UnsupportedProtocol(String),

    /// Parent directory of a file sink could not be created
    #[error("Unable to create log directory '{path}': {source}")]
    DirectoryCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A sink failed while writing a record
    #[error("Sink '{sink}' failed: {message}")]
    SinkWrite { sink: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Remote exporter rejected or failed to ship a record
    #[error("Export failed: {0}")]
    Export(String),

    /// Dispatcher thread could not be started
    #[error("Failed to spawn dispatcher thread: {0}")]
    Spawn(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn unknown_level(level: impl Into<String>) -> Self {
        LoggerError::UnknownLevel(level.into())
    }

    pub fn unsupported_protocol(protocol: impl Into<String>) -> Self {
        LoggerError::UnsupportedProtocol(protocol.into())
    }

    /// Create a directory creation error
    pub fn directory_creation(path: impl Into<String>, source: std::io::Error) -> Self {
        LoggerError::DirectoryCreation {
            path: path.into(),
            source,
        }
    }

    /// Create a sink write error
    pub fn sink(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkWrite {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn export<S: Into<String>>(msg: S) -> Self {
        LoggerError::Export(msg.into())
    }

    /// Whether this error belongs to the configure-time (fatal) class
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LoggerError::InvalidConfiguration { .. }
                | LoggerError::UnknownLevel(_)
                | LoggerError::UnsupportedProtocol(_)
                | LoggerError::DirectoryCreation { .. }
        )
    }
}
