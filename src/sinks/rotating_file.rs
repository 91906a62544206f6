//! Rotating file sink
//!
//! Appends one JSON record per line to a file. When a write would make the
//! active file reach the configured size, the file is rotated first:
//! `app.log` becomes `app.log.1`, `app.log.1` becomes `app.log.2`, and so on
//! up to the backup count; the oldest backup is discarded. With compression
//! enabled, rotated backups are gzipped to `app.log.N.gz`.

use crate::core::error::{LoggerError, Result};
use crate::core::log_level::LogLevel;
use crate::core::output_format::FormattedRecord;
use crate::core::sink::Sink;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Consecutive failed deletions of the oldest backup before rotation gives up
const MAX_DELETION_FAILURES: usize = 5;

/// Size-based rotation settings
///
/// # Examples
///
/// ```
/// use otel_logger_system::sinks::RotationPolicy;
///
/// // Rotate at 50 MB, keep 7 gzipped backups
/// let policy = RotationPolicy::new()
///     .with_max_size(50 * 1024 * 1024)
///     .with_max_backups(7)
///     .with_compression(true);
/// assert_eq!(policy.max_bytes, Some(50 * 1024 * 1024));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotation threshold; `None` disables rotation
    pub max_bytes: Option<u64>,
    /// Number of rotated files to keep alongside the active one
    pub max_backups: usize,
    /// Whether to gzip rotated files
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: None,
            max_backups: 5,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rotate before the file would reach `size` bytes; 0 disables rotation
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, size: u64) -> Self {
        self.max_bytes = (size > 0).then_some(size);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

/// Paths currently held open by a live file sink
fn open_paths() -> &'static Mutex<HashSet<PathBuf>> {
    static OPEN_PATHS: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    OPEN_PATHS.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Exclusive claim on a log file path, released on drop
#[derive(Debug)]
struct PathClaim {
    path: PathBuf,
}

impl PathClaim {
    fn acquire(path: &Path) -> Result<Self> {
        let key = claim_key(path);
        let mut paths = open_paths().lock();
        if !paths.insert(key.clone()) {
            return Err(LoggerError::config(
                "file",
                format!(
                    "'{}' is already open in another logging session; shut it down first",
                    path.display()
                ),
            ));
        }
        Ok(Self { path: key })
    }
}

impl Drop for PathClaim {
    fn drop(&mut self) {
        open_paths().lock().remove(&self.path);
    }
}

/// Canonical parent directory plus file name; the file itself may not exist
fn claim_key(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            fs::canonicalize(parent)
                .map(|p| p.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

/// `<path>.<index>`, or `<path>.<index>.gz`
fn backup_path(base: &Path, index: usize, compressed: bool) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!(".{}", index));
    if compressed {
        name.push(".gz");
    }
    PathBuf::from(name)
}

/// File sink with size-based rotation
///
/// # Examples
///
/// ```no_run
/// use otel_logger_system::sinks::{RotatingFileSink, RotationPolicy};
///
/// let policy = RotationPolicy::new().with_max_size(10 * 1024 * 1024).with_max_backups(3);
/// let sink = RotatingFileSink::open("/var/log/app.jsonl", policy).unwrap();
/// ```
pub struct RotatingFileSink {
    base_path: PathBuf,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    level: LogLevel,
    /// Counter for consecutive deletion failures (reset on successful deletion)
    deletion_failure_count: usize,
    claim: Option<PathClaim>,
}

impl RotatingFileSink {
    /// Open (or create) the log file, creating parent directories
    ///
    /// # Errors
    ///
    /// `DirectoryCreation` when the parent directory cannot be created;
    /// `InvalidConfiguration` when another live sink already owns the path.
    pub fn open<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        if let Some(parent) = base_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::directory_creation(parent.display().to_string(), e)
                })?;
            }
        }

        let claim = PathClaim::acquire(&base_path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&base_path)
            .map_err(|e| {
                LoggerError::io_operation(
                    "open log file",
                    format!("Failed to open '{}'", base_path.display()),
                    e,
                )
            })?;

        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            base_path,
            policy,
            writer: Some(BufWriter::new(file)),
            current_size,
            level: LogLevel::Trace,
            deletion_failure_count: 0,
            claim: Some(claim),
        })
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Check if writing `incoming` bytes should rotate first
    fn should_rotate(&self, incoming: u64) -> bool {
        match self.policy.max_bytes {
            Some(max_bytes) => self.current_size > 0 && self.current_size + incoming >= max_bytes,
            None => false,
        }
    }

    /// Perform log rotation
    fn rotate(&mut self) -> Result<()> {
        // Explicitly drop writer to release file handle before renaming
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        if self.policy.max_backups == 0 {
            // No history kept: start the active file over
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.base_path)
                .map_err(|e| {
                    LoggerError::file_rotation(
                        self.base_path.display().to_string(),
                        format!("Failed to truncate log file: {}", e),
                    )
                })?;
            self.writer = Some(BufWriter::new(file));
            self.current_size = 0;
            return Ok(());
        }

        self.remove_oldest_backup()?;

        for i in (1..self.policy.max_backups).rev() {
            for compressed in [true, false] {
                let old_path = backup_path(&self.base_path, i, compressed);
                if !old_path.exists() {
                    continue;
                }
                let new_path = backup_path(&self.base_path, i + 1, compressed);
                if fs::rename(&old_path, &new_path).is_err() {
                    // On some platforms, rename fails if destination exists
                    let _ = fs::remove_file(&new_path);
                    fs::rename(&old_path, &new_path).map_err(|e| {
                        LoggerError::file_rotation(
                            old_path.display().to_string(),
                            format!("Failed to rotate backup files: {}", e),
                        )
                    })?;
                }
            }
        }

        let first_backup = backup_path(&self.base_path, 1, false);
        if self.base_path.exists() {
            fs::rename(&self.base_path, &first_backup).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to rotate current log file: {}", e),
                )
            })?;

            if self.policy.compress {
                compress_file(&first_backup, &backup_path(&self.base_path, 1, true))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.base_path)
            .map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to create new log file: {}", e),
                )
            })?;

        self.writer = Some(BufWriter::new(file));
        self.current_size = 0;
        Ok(())
    }

    /// Delete the backup that would fall off the end of the history
    fn remove_oldest_backup(&mut self) -> Result<()> {
        let mut deletion_failed = false;

        for compressed in [true, false] {
            let oldest = backup_path(&self.base_path, self.policy.max_backups, compressed);
            if oldest.exists() {
                if let Err(e) = fs::remove_file(&oldest) {
                    deletion_failed = true;
                    eprintln!(
                        "[LOGGER WARNING] Failed to remove oldest backup {}: {} (failure #{}/{})",
                        oldest.display(),
                        e,
                        self.deletion_failure_count + 1,
                        MAX_DELETION_FAILURES
                    );
                }
            }
        }

        if !deletion_failed {
            self.deletion_failure_count = 0;
            return Ok(());
        }

        self.deletion_failure_count += 1;
        if self.deletion_failure_count >= MAX_DELETION_FAILURES {
            return Err(LoggerError::file_rotation(
                self.base_path.display().to_string(),
                format!(
                    "Rotation aborted: failed to delete old backup files {} consecutive times",
                    self.deletion_failure_count
                ),
            ));
        }
        Ok(())
    }

    /// Reopen the active file after a failed rotation
    fn reopen(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.base_path)
            .map_err(|e| {
                LoggerError::io_operation(
                    "reopen log file",
                    format!("Failed to reopen '{}' after rotation failure", self.base_path.display()),
                    e,
                )
            })?;
        self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Write one line, rotating first if needed
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let bytes_needed = line.len() as u64 + 1;

        if self.should_rotate(bytes_needed) {
            if let Err(e) = self.rotate() {
                eprintln!(
                    "[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.",
                    e
                );
                if self.writer.is_none() {
                    if let Err(reopen_err) = self.reopen() {
                        eprintln!(
                            "[LOGGER ERROR] Failed to reopen log file after rotation failure: {}",
                            reopen_err
                        );
                        return Err(e);
                    }
                }
                // Prevent a rotation attempt on every write; the file may
                // now grow past the limit until the next successful rotation
                self.current_size = 0;
            }
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::sink("file", "log file is closed"))?;

        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .map_err(|e| {
                LoggerError::sink(
                    "file",
                    format!("Failed to write to '{}': {}", self.base_path.display(), e),
                )
            })?;
        self.current_size += bytes_needed;
        Ok(())
    }
}

/// Gzip `source` into `target`, removing `source` only on success
///
/// Streams through a temporary file so a failure never loses the backup.
fn compress_file(source: &Path, target: &Path) -> Result<()> {
    use std::io::{BufReader, Read};

    let mut temp_name = OsString::from(target.as_os_str());
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let input = File::open(source).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to open file for compression: {}", source.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to create temporary compressed file: {}", temp_path.display()),
            e,
        )
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let mut buffer = vec![0u8; 64 * 1024];
    let streamed: std::io::Result<()> = (|| {
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            encoder.write_all(&buffer[..bytes_read])?;
        }
        encoder.finish()?.flush()
    })();

    if let Err(e) = streamed {
        let _ = fs::remove_file(&temp_path);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress '{}'", source.display()),
            e,
        ));
    }

    fs::rename(&temp_path, target).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to rename compressed file to: {}", target.display()),
            e,
        )
    })?;

    if let Err(e) = fs::remove_file(source) {
        eprintln!(
            "[LOGGER WARNING] Compression succeeded but failed to remove original file {}: {}",
            source.display(),
            e
        );
    }

    Ok(())
}

impl Sink for RotatingFileSink {
    fn emit(&mut self, record: &FormattedRecord<'_>) -> Result<()> {
        self.write_line(record.json())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::sink(
                    "file",
                    format!("Failed to flush '{}': {}", self.base_path.display(), e),
                )
            })?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let result = self.flush();
        self.writer = None;
        self.claim = None;
        result
    }

    fn min_level(&self) -> LogLevel {
        self.level
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            // Best effort flush - ignore errors during drop
            let _ = writer.flush();
        }
    }
}
