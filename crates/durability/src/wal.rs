//! Write-ahead log
//!
//! An append-only journal of mutations, stored as newline-separated
//! self-delimiting JSON objects. Appends and truncation are serialized by
//! an internal mutex; replay happens before any append, so there are no
//! concurrent readers.
//!
//! # Corruption policy
//!
//! A malformed record during replay stops replay with an error. Entries
//! applied before the faulty record remain applied; truncation followed by
//! a fresh snapshot is the recovery path.

use hearth_core::{Error, Result, Value};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// Operation tag of a WAL entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalOp {
    /// Write a key
    Set,
    /// Delete a key. Reserved: accepted on replay, never emitted.
    Del,
}

/// One mutation in the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Operation tag
    pub op: WalOp,
    /// Key being mutated
    #[serde(rename = "k")]
    pub key: String,
    /// Value written (`Null` for deletes)
    #[serde(rename = "v")]
    pub value: Value,
    /// Absolute expiration in nanoseconds
    #[serde(rename = "e", default)]
    pub expires_at: i64,
}

impl WalEntry {
    /// Build a `set` entry.
    pub fn set(key: String, value: Value, expires_at: i64) -> Self {
        Self {
            op: WalOp::Set,
            key,
            value,
            expires_at,
        }
    }
}

/// Append-only operation journal with atomic truncate.
///
/// Holds a single append-open file handle. The mutex covers the handle
/// itself: truncation takes the handle out (closing it) before the on-disk
/// truncate, which keeps the operation safe on operating systems that
/// refuse to truncate a held file. The slot is `None` only mid-truncate
/// and after `close`.
pub struct Wal {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl Wal {
    /// Open (creating if needed) the journal at `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = Self::open_append(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    fn open_append(path: &Path) -> Result<File> {
        Ok(OpenOptions::new().create(true).append(true).open(path)?)
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize one entry and append it.
    ///
    /// Returns `Ok` only once the encode and the write have both
    /// completed; on failure the entry must be considered not applied.
    pub fn append(&self, entry: &WalEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut guard = self.file.lock();
        let file = guard
            .as_mut()
            .ok_or_else(|| Error::InvalidState("wal is closed".into()))?;
        file.write_all(&line)?;
        Ok(())
    }

    /// Atomically reset the journal to empty.
    ///
    /// Closes the handle first (Windows refuses to truncate a held file),
    /// truncates by path, then reopens for appending. If truncation fails
    /// the journal is reopened anyway so subsequent appends can proceed,
    /// and the error is surfaced.
    pub fn truncate(&self) -> Result<()> {
        let mut guard = self.file.lock();
        drop(guard.take());

        let truncated = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&self.path);

        let reopened = Self::open_append(&self.path)?;
        *guard = Some(reopened);

        truncated.map(drop).map_err(Error::from)
    }

    /// Flush, sync, and release the handle. Further appends fail.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.file.lock();
        if let Some(mut file) = guard.take() {
            file.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }

    /// Replay the journal at `path`, calling `apply` for each entry in
    /// stored order. Returns how many entries were applied.
    ///
    /// A missing file means an empty journal. A malformed record aborts
    /// replay with `Error::Corruption`; entries already handed to `apply`
    /// stay applied.
    pub fn replay<F>(path: &Path, mut apply: F) -> Result<usize>
    where
        F: FnMut(WalEntry),
    {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };

        let reader = BufReader::new(file);
        let stream = serde_json::Deserializer::from_reader(reader).into_iter::<WalEntry>();

        let mut applied = 0usize;
        for entry in stream {
            match entry {
                Ok(entry) => {
                    apply(entry);
                    applied += 1;
                }
                Err(err) => {
                    return Err(Error::Corruption(format!(
                        "wal record {} unreadable: {err}",
                        applied + 1
                    )));
                }
            }
        }
        Ok(applied)
    }
}
