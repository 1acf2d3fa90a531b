//! Single-file archive writer
//!
//! Owns the end-to-end lifecycle of producing one packed archive: reserve
//! the target path, stage streams in a working directory, and on `finish`
//! pack every stream plus a table of contents into the target file.
//!
//! The writer is an explicit two-state machine. While *Open* it delegates
//! stream operations to the staging layer; once *Finished* every mutating
//! call fails with a typed error and the queries degrade to `false`.

use crate::error::{ArchiveError, Result};
use crate::sorter::{CreationOrderSorter, StreamRecord, StreamSorter};
use crate::staging::StagingWriter;
use crate::stream::RandomAccessStream;
use crate::util;
use fs4::FileExt;
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Fixed suffix appended to the target path to derive the staging directory.
///
/// Deterministic so a crashed run's staging area is found and purged by the
/// next `open` against the same path.
pub const STAGING_SUFFIX: &str = ".staging";

/// Opaque token from [`ArchiveWriter::lock_stream`].
///
/// Single-file mode performs no real locking; see
/// [`ArchiveWriter::supports_progressive_locking`].
#[derive(Debug)]
pub struct LockHandle {
    name: String,
}

impl LockHandle {
    pub fn stream_name(&self) -> &str {
        &self.name
    }
}

struct OpenWriter {
    /// Reserved target handle, held (and exclusively locked) until finish
    target: File,
    staging: StagingWriter,
    initialized: bool,
}

enum WriterState {
    Open(OpenWriter),
    Finished,
}

/// Writes a multi-stream archive to a single file.
///
/// Streams are staged in a working directory next to the target and packed
/// on [`finish`](ArchiveWriter::finish). Until then the target path holds a
/// zero-length reservation, so observers only ever see an absent file, an
/// empty reservation, or a fully valid archive.
///
/// # Examples
///
/// ```no_run
/// use rptdoc::ArchiveWriter;
///
/// # fn main() -> rptdoc::Result<()> {
/// let mut writer = ArchiveWriter::open("report.rptdocument")?;
/// writer.initialize()?;
///
/// let mut content = writer.create_stream("content/0")?;
/// content.write(b"page bytes")?;
///
/// writer.finish()?;
/// # Ok(())
/// # }
/// ```
pub struct ArchiveWriter {
    path: PathBuf,
    staging_path: PathBuf,
    sorter: Box<dyn StreamSorter>,
    state: WriterState,
}

impl ArchiveWriter {
    /// Open a writer bound to `path`, reserving the target and creating a
    /// fresh staging area.
    ///
    /// Fails with [`ArchiveError::InvalidPath`] on an empty path before any
    /// filesystem access. A second open against a path whose writer is still
    /// live fails with an I/O error from the exclusive lock. A stale staging
    /// directory left by a crashed run is deleted first; if it cannot be
    /// fully removed the open fails rather than risk packing leftover bytes.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = path.as_ref();
        if raw.as_os_str().is_empty() {
            return Err(ArchiveError::InvalidPath(
                "archive path is empty".to_string(),
            ));
        }

        let path = util::canonical_target_path(raw)?;

        // Reserve the target. The advisory lock is taken before truncation
        // so a losing second writer cannot clobber a live reservation.
        let target = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        target.try_lock_exclusive().map_err(|err| {
            ArchiveError::Io(io::Error::new(
                err.kind(),
                format!("archive file is already in use: {}", path.display()),
            ))
        })?;
        target.set_len(0)?;

        let mut staging_os = path.clone().into_os_string();
        staging_os.push(STAGING_SUFFIX);
        let staging_path = PathBuf::from(staging_os);

        if staging_path.exists() {
            tracing::warn!(
                "removing stale staging area from a previous run: {}",
                staging_path.display()
            );
            util::remove_dir_recursive(&staging_path)?;
            if staging_path.exists() {
                return Err(ArchiveError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    format!(
                        "stale staging area could not be removed: {}",
                        staging_path.display()
                    ),
                )));
            }
        }
        util::ensure_dir(&staging_path)?;

        tracing::debug!("opened archive writer at {}", path.display());

        Ok(ArchiveWriter {
            staging_path: staging_path.clone(),
            path,
            sorter: Box::new(CreationOrderSorter),
            state: WriterState::Open(OpenWriter {
                target,
                staging: StagingWriter::new(staging_path),
                initialized: false,
            }),
        })
    }

    /// Canonical target path of this archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the staging directory backing this writer.
    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, WriterState::Finished)
    }

    /// Prepare the staging layer for stream creation. Idempotent; a no-op
    /// once the writer is finished.
    pub fn initialize(&mut self) -> Result<()> {
        if let WriterState::Open(open) = &mut self.state {
            if !open.initialized {
                util::ensure_dir(open.staging.root())?;
                open.initialized = true;
            }
        }
        Ok(())
    }

    fn staging_mut(&mut self) -> Result<&mut StagingWriter> {
        match &mut self.state {
            WriterState::Finished => Err(ArchiveError::AlreadyFinished),
            WriterState::Open(open) if !open.initialized => Err(ArchiveError::NotInitialized),
            WriterState::Open(open) => Ok(&mut open.staging),
        }
    }

    /// Create a stream, truncating any bytes already staged under the name.
    pub fn create_stream(&mut self, name: &str) -> Result<RandomAccessStream> {
        self.staging_mut()?.create_stream(name)
    }

    /// Open a stream, creating it when absent. Existing staged bytes are
    /// kept, supporting the write-forward/patch-back producer pattern.
    pub fn open_stream(&mut self, name: &str) -> Result<RandomAccessStream> {
        self.staging_mut()?.open_stream(name)
    }

    /// Whether a stream is currently staged. Always false once finished.
    pub fn stream_exists(&self, name: &str) -> bool {
        match &self.state {
            WriterState::Open(open) => open.staging.exists(name),
            WriterState::Finished => false,
        }
    }

    /// Remove a staged stream. Returns false for unknown names, before
    /// initialization, and after finish; never errors.
    pub fn drop_stream(&mut self, name: &str) -> bool {
        match &mut self.state {
            WriterState::Open(open) if open.initialized => open.staging.drop_stream(name),
            _ => false,
        }
    }

    /// Install the packing-order policy. Takes effect at the next `finish`.
    pub fn set_stream_sorter(&mut self, sorter: Box<dyn StreamSorter>) {
        self.sorter = sorter;
    }

    /// Force staged bytes (and the stream registry) to durable storage
    /// without packing.
    pub fn flush(&mut self) -> Result<()> {
        match &mut self.state {
            WriterState::Finished => Err(ArchiveError::AlreadyFinished),
            WriterState::Open(open) => {
                if open.initialized {
                    open.staging.flush()?;
                }
                Ok(())
            }
        }
    }

    /// Pack every staged stream into the target file and discard the
    /// staging area.
    ///
    /// Idempotent: a second call on a finished writer is a no-op. On error
    /// the writer stays open with its streams sealed; the caller may retry,
    /// which rewrites the target from scratch, or abandon the writer.
    pub fn finish(&mut self) -> Result<()> {
        let open = match &mut self.state {
            WriterState::Finished => return Ok(()),
            WriterState::Open(open) => open,
        };

        open.staging.flush()?;
        open.staging.seal_all();

        let records = open.staging.records();
        let order = normalize_order(self.sorter.sort(records.clone()), &records);

        open.target.set_len(0)?;
        open.target.seek(SeekFrom::Start(0))?;
        let toc = open.staging.pack_into(&mut open.target, &order)?;
        toc.write_to(&mut open.target)?;
        open.target.sync_all()?;

        // The archive is valid from here on; cleanup failures only warn.
        if let Err(err) = util::remove_dir_recursive(&self.staging_path) {
            tracing::warn!(
                "failed to remove staging area {}: {}",
                self.staging_path.display(),
                err
            );
        }

        tracing::debug!(
            "packed {} streams into {}",
            toc.len(),
            self.path.display()
        );

        // Dropping the target handle releases the exclusive reservation
        self.state = WriterState::Finished;
        Ok(())
    }

    /// Whether this writer supports progressive locking of individual
    /// streams. Single-file mode packs on `finish`, so concurrent readers
    /// wait for the packed file and this is always false.
    pub fn supports_progressive_locking(&self) -> bool {
        false
    }

    /// Reserve a stream for progressive readers. Single-file mode hands
    /// back a token without taking any lock.
    pub fn lock_stream(&self, name: &str) -> LockHandle {
        LockHandle {
            name: name.to_string(),
        }
    }

    /// Release a token from [`lock_stream`](ArchiveWriter::lock_stream).
    pub fn unlock_stream(&self, _handle: LockHandle) {}
}

impl Drop for ArchiveWriter {
    fn drop(&mut self) {
        if let WriterState::Open(open) = &mut self.state {
            // Abandoned without finish: leave the reserved target empty as
            // the failure signal and discard staged streams.
            let _ = open.target.set_len(0);
            if let Err(err) = util::remove_dir_recursive(&self.staging_path) {
                tracing::warn!(
                    "failed to remove staging area {} for abandoned archive {}: {}",
                    self.staging_path.display(),
                    self.path.display(),
                    err
                );
            }
        }
    }
}

/// Repair a sorter's output so the commit packs exactly the staged set:
/// duplicates collapse to their first occurrence, unknown names are dropped,
/// and omitted streams are appended in creation order.
fn normalize_order(sorted: Vec<StreamRecord>, all: &[StreamRecord]) -> Vec<StreamRecord> {
    let known: HashMap<&str, &StreamRecord> =
        all.iter().map(|record| (record.name.as_str(), record)).collect();

    let mut seen = HashSet::new();
    let mut order = Vec::with_capacity(all.len());
    for record in sorted {
        if known.contains_key(record.name.as_str()) && seen.insert(record.name.clone()) {
            order.push(record);
        }
    }

    let mut omitted: Vec<StreamRecord> = all
        .iter()
        .filter(|record| !seen.contains(&record.name))
        .cloned()
        .collect();
    omitted.sort_by_key(|record| record.sequence);
    order.extend(omitted);

    order
}
