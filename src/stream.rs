//! Random-access cursors over staged logical streams
//!
//! Every staged stream is backed by one file in the staging area. All open
//! cursors on the same stream share that backing, so the report-layout
//! pattern of writing forward while re-reading earlier offsets (size
//! patch-backs) observes a single byte sequence.

use crate::error::{ArchiveError, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Why a staged stream can no longer serve cursor I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detach {
    /// Removed via `drop_stream`
    Dropped,
    /// Sealed by the commit protocol
    Sealed,
}

struct BackingState {
    file: File,
    len: u64,
    detached: Option<Detach>,
}

/// Shared backing storage for one logical stream.
///
/// Owned by the stream table; cursors hold an `Arc` to it so dropping the
/// table entry invalidates live cursors instead of leaving them dangling.
pub(crate) struct StreamBacking {
    name: String,
    path: PathBuf,
    state: Mutex<BackingState>,
}

impl StreamBacking {
    /// Create (or truncate) the staged file for a stream.
    pub(crate) fn create(name: String, path: PathBuf) -> Result<Arc<Self>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        Ok(Arc::new(StreamBacking {
            name,
            path,
            state: Mutex::new(BackingState {
                file,
                len: 0,
                detached: None,
            }),
        }))
    }

    /// Open a fresh cursor positioned at offset zero.
    pub(crate) fn cursor(self: &Arc<Self>) -> RandomAccessStream {
        RandomAccessStream {
            backing: Arc::clone(self),
            pos: 0,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn staged_path(&self) -> &Path {
        &self.path
    }

    /// Current stream length, without the detach check (registry use).
    pub(crate) fn len(&self) -> u64 {
        self.state.lock().len
    }

    /// Discard all staged bytes (recreate semantics).
    pub(crate) fn truncate(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.check_attached(&state)?;
        state.file.set_len(0)?;
        state.len = 0;
        Ok(())
    }

    /// Force staged bytes to durable storage.
    pub(crate) fn flush(&self) -> Result<()> {
        let state = self.state.lock();
        if state.detached.is_some() {
            return Ok(());
        }
        state.file.sync_data()?;
        Ok(())
    }

    /// Reject further cursor I/O; the bytes stay readable for packing.
    pub(crate) fn seal(&self) {
        let mut state = self.state.lock();
        if state.detached.is_none() {
            state.detached = Some(Detach::Sealed);
        }
    }

    pub(crate) fn mark_dropped(&self) {
        self.state.lock().detached = Some(Detach::Dropped);
    }

    /// Copy the full staged byte sequence into `target`.
    ///
    /// Used by the commit protocol; works on sealed streams.
    pub(crate) fn copy_into(&self, target: &mut File) -> Result<u64> {
        let mut state = self.state.lock();
        state.file.seek(SeekFrom::Start(0))?;
        let copied = io::copy(&mut state.file, target)?;
        Ok(copied)
    }

    fn check_attached(&self, state: &BackingState) -> Result<()> {
        match state.detached {
            None => Ok(()),
            Some(Detach::Sealed) => Err(ArchiveError::AlreadyFinished),
            Some(Detach::Dropped) => Err(ArchiveError::StreamDetached(self.name.clone())),
        }
    }
}

/// Seekable read/write cursor over one logical stream.
///
/// Each cursor keeps its own position; the bytes are shared with every other
/// cursor on the same stream. Writing past the current length extends the
/// stream, zero-filling any gap left by an earlier seek.
///
/// All operations fail with [`ArchiveError::AlreadyFinished`] once the
/// archive is packed and with [`ArchiveError::StreamDetached`] once the
/// stream is dropped.
pub struct RandomAccessStream {
    backing: Arc<StreamBacking>,
    pos: u64,
}

impl RandomAccessStream {
    /// Name of the logical stream this cursor addresses.
    pub fn name(&self) -> &str {
        self.backing.name()
    }

    /// Current cursor offset.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Current stream length in bytes.
    pub fn len(&self) -> Result<u64> {
        let state = self.backing.state.lock();
        self.backing.check_attached(&state)?;
        Ok(state.len)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Read up to `buf.len()` bytes at the cursor, returning the count.
    ///
    /// Returns 0 at or past end of stream.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.backing.state.lock();
        self.backing.check_attached(&state)?;

        if self.pos >= state.len {
            return Ok(0);
        }

        state.file.seek(SeekFrom::Start(self.pos))?;
        let read = state.file.read(buf)?;
        self.pos += read as u64;
        Ok(read)
    }

    /// Read exactly `buf.len()` bytes or fail without advancing.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut state = self.backing.state.lock();
        self.backing.check_attached(&state)?;

        state.file.seek(SeekFrom::Start(self.pos))?;
        state.file.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Write all of `data` at the cursor, extending the stream as needed.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.backing.state.lock();
        self.backing.check_attached(&state)?;

        state.file.seek(SeekFrom::Start(self.pos))?;
        state.file.write_all(data)?;
        self.pos += data.len() as u64;
        if self.pos > state.len {
            state.len = self.pos;
        }
        Ok(())
    }

    /// Move the cursor. Seeking beyond the end is allowed; the gap is
    /// zero-filled by the next write.
    pub fn seek(&mut self, from: SeekFrom) -> Result<u64> {
        let state = self.backing.state.lock();
        self.backing.check_attached(&state)?;

        let (base, delta) = match from {
            SeekFrom::Start(offset) => {
                self.pos = offset;
                return Ok(self.pos);
            }
            SeekFrom::Current(delta) => (self.pos, delta),
            SeekFrom::End(delta) => (state.len, delta),
        };

        let new_pos = if delta >= 0 {
            base.checked_add(delta as u64)
        } else {
            base.checked_sub(delta.unsigned_abs())
        };

        match new_pos {
            Some(pos) => {
                self.pos = pos;
                Ok(pos)
            }
            None => Err(ArchiveError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of stream",
            ))),
        }
    }

    /// Flush staged bytes for this stream and release the cursor.
    pub fn close(self) -> Result<()> {
        self.backing.flush()
    }
}
