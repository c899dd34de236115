//! Append-only file store for commit ids

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use txspool_core::commit_log::{CommitLog, CommitLogStats};
use txspool_core::error::{Result, SpoolError};
use txspool_core::observe;
use txspool_core::types::TxId;

/// Configuration for the file-backed commit log
#[derive(Debug, Clone)]
pub struct FileCommitLogConfig {
    /// Path the log appends to; parent directories are created on open
    pub path: PathBuf,
    /// Size of the in-process write buffer
    pub write_buffer_size: usize,
}

impl Default for FileCommitLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/txspool/commit.log"),
            write_buffer_size: 64 * 1024,
        }
    }
}

impl FileCommitLogConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }
}

// Path and writer are swapped together during rotation, so they live
// behind the same lock. `durable_len` is the file length as of the last
// successful flush; everything past it is a staged tail, and a failed
// write rewinds to it so a retained batch can be appended again without
// landing twice.
struct Writer {
    path: PathBuf,
    out: BufWriter<File>,
    durable_len: u64,
    staged_records: u64,
    staged_bytes: u64,
    needs_rewind: bool,
}

impl Writer {
    fn open(path: &Path, buffer_size: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let durable_len = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::with_capacity(buffer_size, file),
            durable_len,
            staged_records: 0,
            staged_bytes: 0,
            needs_rewind: false,
        })
    }

    fn stage(&mut self, ids: &[TxId]) -> Result<()> {
        for id in ids {
            if let Err(error) = writeln!(self.out, "{id}") {
                self.rewind_to_durable();
                return Err(error.into());
            }
            self.staged_records += 1;
            self.staged_bytes += line_len(*id);
        }
        Ok(())
    }

    // Make the staged tail durable. Returns how many records that was.
    fn commit(&mut self) -> Result<u64> {
        if let Err(error) = self.out.flush() {
            self.rewind_to_durable();
            return Err(error.into());
        }
        self.durable_len += self.staged_bytes;
        self.staged_bytes = 0;
        let records = self.staged_records;
        self.staged_records = 0;
        Ok(records)
    }

    // Drop the staged tail without flushing it and cut the file back to
    // the last durable record, covering bytes a large batch already
    // spilled past the buffer.
    fn rewind_to_durable(&mut self) {
        self.needs_rewind = true;
        self.staged_records = 0;
        self.staged_bytes = 0;
        match self.discard_and_truncate() {
            Ok(()) => self.needs_rewind = false,
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    path = %self.path.display(),
                    "commit log rewind failed; retrying before the next write"
                );
            }
        }
    }

    fn discard_and_truncate(&mut self) -> std::io::Result<()> {
        let capacity = self.out.capacity();
        let fresh = self.out.get_ref().try_clone()?;
        // into_parts drops the buffered tail without writing it out.
        let old = std::mem::replace(&mut self.out, BufWriter::with_capacity(capacity, fresh));
        let _ = old.into_parts();
        self.out.get_ref().set_len(self.durable_len)?;
        Ok(())
    }

    fn ensure_clean(&mut self) -> Result<()> {
        if self.needs_rewind {
            self.discard_and_truncate()?;
            self.needs_rewind = false;
        }
        Ok(())
    }
}

// Bytes one record occupies: decimal digits plus the newline.
fn line_len(id: TxId) -> u64 {
    let mut digits = 1u64;
    let mut rest = id;
    while rest >= 10 {
        rest /= 10;
        digits += 1;
    }
    digits + 1
}

/// File-backed commit log
///
/// One decimal id per `\n`-terminated line, append order preserved. All
/// writes and rotations go through a single writer lock, which is what
/// makes batch appends atomic with respect to rotation. A failed append
/// or flush rewinds the file to its last durable record, so a retried
/// batch never writes a record twice.
pub struct FileCommitLog {
    config: FileCommitLogConfig,
    inner: Mutex<Writer>,
    records: AtomicU64,
    rotations: AtomicU64,
}

impl FileCommitLog {
    /// Open the log file for appending, creating it and any parent
    /// directories if needed.
    pub fn open(config: FileCommitLogConfig) -> Result<Self> {
        let inner = Writer::open(&config.path, config.write_buffer_size)?;
        tracing::debug!(path = %config.path.display(), "commit log opened");
        Ok(Self {
            config,
            inner: Mutex::new(inner),
            records: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
        })
    }

    /// Path currently being appended to.
    pub fn path(&self) -> PathBuf {
        self.inner.lock().path.clone()
    }

    /// Iterate the ids in the current file, oldest first.
    ///
    /// Flushes first so every accepted append is visible to the reader.
    pub fn iter(&self) -> Result<FileCommitLogIter> {
        self.flush()?;
        FileCommitLogIter::open(&self.path())
    }
}

impl CommitLog for FileCommitLog {
    fn append_batch(&self, ids: &[TxId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock();
        inner.ensure_clean()?;
        inner.stage(ids)
    }

    fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_clean()?;
        let records = inner.commit()?;
        self.records.fetch_add(records, Ordering::Relaxed);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_clean()?;
        let records = inner.commit()?;
        self.records.fetch_add(records, Ordering::Relaxed);
        inner.out.get_ref().sync_all()?;
        Ok(())
    }

    fn rotate(&self, new_path: Option<&Path>) -> Result<PathBuf> {
        let old_path = {
            let mut inner = self.inner.lock();
            inner.ensure_clean()?;
            let records = inner.commit()?;
            self.records.fetch_add(records, Ordering::Relaxed);

            let old_path = inner.path.clone();
            let next_path = match new_path {
                Some(p) => p.to_path_buf(),
                None => old_path.clone(),
            };
            // Open the replacement before swapping so a failure leaves the
            // current writer untouched.
            *inner = Writer::open(&next_path, self.config.write_buffer_size)?;
            old_path
        };

        self.rotations.fetch_add(1, Ordering::Relaxed);
        observe::record_rotation();
        tracing::info!(
            from = %old_path.display(),
            to = %self.path().display(),
            "commit log rotated"
        );
        Ok(old_path)
    }

    fn stats(&self) -> Result<CommitLogStats> {
        let path = self.path();
        // A missing file (moved aside by an external rotation) reads as
        // zero bytes rather than an error.
        let file_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Ok(CommitLogStats {
            records_written: self.records.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            path,
            file_bytes,
        })
    }
}

impl Drop for FileCommitLog {
    fn drop(&mut self) {
        // Last-chance flush; the error can only be logged, not returned.
        let mut inner = self.inner.lock();
        if let Err(error) = inner.out.flush() {
            tracing::warn!(
                error = %error,
                path = %inner.path.display(),
                "commit log flush failed on drop"
            );
        }
    }
}

/// Iterator over the ids recorded in a commit log file.
pub struct FileCommitLogIter {
    lines: Lines<BufReader<File>>,
}

impl FileCommitLogIter {
    /// Open a log file for reading, e.g. one rotated away earlier.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
        })
    }
}

impl Iterator for FileCommitLogIter {
    type Item = Result<TxId>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => return Some(Err(e.into())),
        };
        Some(
            line.trim()
                .parse::<TxId>()
                .map_err(|e| SpoolError::Decode(format!("bad commit record {line:?}: {e}"))),
        )
    }
}
