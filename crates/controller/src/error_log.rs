//! Append-only failure log: one `YYYY-MM-DD HH:MM:SS - <message>` line per
//! entry. The file is never truncated or rotated from here.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;

#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry stamped with `at`. The file is opened, written,
    /// flushed and closed within this call.
    pub fn append(&self, at: OffsetDateTime, message: &str) -> io::Result<()> {
        let line = format_entry(at, message)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

/// Render a single log line, newline included. Embedded newlines in the
/// message are flattened so one entry always occupies one line.
pub fn format_entry(at: OffsetDateTime, message: &str) -> io::Result<String> {
    let ts = at
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let message = message.replace(['\r', '\n'], " ");
    Ok(format!("{ts} - {message}\n"))
}

// ===========================================================================
// Tests
// ===========================================================================
