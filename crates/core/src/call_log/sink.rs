//! Line sinks for the call log.

use std::ffi::OsString;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};

/// Destination for formatted call-log lines. Implementations serialize
/// concurrent writers themselves.
pub trait LogSink: Send + Sync {
    /// Append one line; the sink adds the terminator.
    fn write_line(&self, line: &str) -> io::Result<()>;

    fn describe(&self) -> String;
}

/// Size-bounded append-only file.
///
/// Once the file has grown past `max_bytes`, the next line starts a fresh
/// file and the full one becomes `<file>.1`, shifting older segments up to
/// `<file>.<backup_count>` and dropping the oldest. Lines are never split
/// across segments. `max_bytes == 0` disables rotation.
pub struct RotatingFileSink {
    path: PathBuf,
    writer: Mutex<FileRotate<AppendCount>>,
}

impl RotatingFileSink {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backup_count: usize) -> io::Result<Self> {
        let path = path.into();
        // Fail here, not on the first call, when the location is unusable.
        OpenOptions::new().create(true).append(true).open(&path)?;

        let limit = match max_bytes {
            0 => ContentLimit::None,
            bytes => ContentLimit::BytesSurpassed(usize::try_from(bytes).unwrap_or(usize::MAX)),
        };
        let writer = FileRotate::new(
            &path,
            AppendCount::new(backup_count),
            limit,
            Compression::None,
            #[cfg(unix)]
            None,
        );

        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<file>.<index>`; 1 is the most recent backup.
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }
}

impl fmt::Debug for RotatingFileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingFileSink")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl LogSink for RotatingFileSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');

        // One write per line, so a rotation only ever falls between lines.
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(record.as_bytes())?;
        writer.flush()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Writes lines to stderr. Used when the configured file cannot be opened.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        writeln!(handle, "{}", line)
    }

    fn describe(&self) -> String {
        "stderr".to_string()
    }
}
