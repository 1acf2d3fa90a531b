//! Staged storage for logical streams
//!
//! While the archive is open, every logical stream is one file inside a
//! staging directory, named after the stream so a crashed run can be
//! inspected and cleaned up by hand. `flush` additionally serializes the
//! stream registry into a JSON sidecar at the staging root.

use crate::error::{ArchiveError, Result};
use crate::sorter::StreamRecord;
use crate::stream::{RandomAccessStream, StreamBacking};
use crate::table::StreamTable;
use crate::toc::{TableOfContents, TocEntry};
use crate::util;
use crate::validation::normalize_stream_name;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Seek;
use std::path::{Path, PathBuf};

/// Registry sidecar written into the staging area on flush.
pub(crate) const STAGING_MANIFEST_NAME: &str = ".staging.json";

#[derive(Debug, Serialize, Deserialize)]
struct StagingManifest {
    streams: Vec<StagingManifestEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StagingManifestEntry {
    name: String,
    sequence: u64,
    size: u64,
}

/// Manages one staged file per logical stream inside a staging directory.
pub struct StagingWriter {
    root: PathBuf,
    table: StreamTable,
}

impl StagingWriter {
    /// Wrap an existing staging directory.
    pub(crate) fn new(root: PathBuf) -> Self {
        StagingWriter {
            root,
            table: StreamTable::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stream_count(&self) -> usize {
        self.table.len()
    }

    fn resolve_name(name: &str) -> Result<String> {
        let normalized = normalize_stream_name(name)?;
        if normalized == STAGING_MANIFEST_NAME {
            return Err(ArchiveError::InvalidStreamName(format!(
                "'{}' is reserved",
                normalized
            )));
        }
        Ok(normalized)
    }

    /// Create a stream, truncating any bytes already staged under the name.
    pub fn create_stream(&mut self, name: &str) -> Result<RandomAccessStream> {
        let name = Self::resolve_name(name)?;
        if let Some(backing) = self.table.get(&name) {
            backing.truncate()?;
            return Ok(backing.cursor());
        }
        self.new_backing(name)
    }

    /// Open a stream, creating it when absent. Existing staged bytes are kept.
    pub fn open_stream(&mut self, name: &str) -> Result<RandomAccessStream> {
        let name = Self::resolve_name(name)?;
        if let Some(backing) = self.table.get(&name) {
            return Ok(backing.cursor());
        }
        self.new_backing(name)
    }

    fn new_backing(&mut self, name: String) -> Result<RandomAccessStream> {
        let path = self.root.join(&name);
        if let Some(parent) = path.parent() {
            util::ensure_dir(parent)?;
        }
        let backing = StreamBacking::create(name.clone(), path)?;
        let cursor = backing.cursor();
        self.table.insert(name, backing);
        Ok(cursor)
    }

    /// Whether a stream with this name is currently staged.
    ///
    /// Invalid names are reported as absent rather than as errors.
    pub fn exists(&self, name: &str) -> bool {
        match Self::resolve_name(name) {
            Ok(name) => self.table.contains(&name),
            Err(_) => false,
        }
    }

    /// Remove a staged stream. Returns false when the name was never created.
    ///
    /// Live cursors on the stream fail from this point on.
    pub fn drop_stream(&mut self, name: &str) -> bool {
        let Ok(name) = Self::resolve_name(name) else {
            return false;
        };
        match self.table.remove(&name) {
            Some(backing) => {
                backing.mark_dropped();
                if let Err(err) = fs::remove_file(backing.staged_path()) {
                    tracing::warn!("failed to remove staged file for '{}': {}", name, err);
                }
                true
            }
            None => false,
        }
    }

    /// Flush every staged stream and the registry sidecar to durable storage.
    pub fn flush(&mut self) -> Result<()> {
        for backing in self.table.backings() {
            backing.flush()?;
        }

        let manifest = StagingManifest {
            streams: self
                .table
                .records()
                .into_iter()
                .map(|record| StagingManifestEntry {
                    name: record.name,
                    sequence: record.sequence,
                    size: record.size,
                })
                .collect(),
        };
        let data = serde_json::to_vec_pretty(&manifest)?;
        fs::write(self.root.join(STAGING_MANIFEST_NAME), data)?;

        Ok(())
    }

    /// Seal every staged stream: open cursors reject further reads and writes.
    pub(crate) fn seal_all(&self) {
        for backing in self.table.backings() {
            backing.seal();
        }
    }

    /// Snapshot of staged streams in creation order.
    pub fn records(&self) -> Vec<StreamRecord> {
        self.table.records()
    }

    /// Copy staged streams into `target` in the given order, recording each
    /// stream's offset and length in the returned table of contents.
    pub(crate) fn pack_into(
        &self,
        target: &mut File,
        order: &[StreamRecord],
    ) -> Result<TableOfContents> {
        let mut toc = TableOfContents::new();

        for record in order {
            let backing = self
                .table
                .get(&record.name)
                .ok_or_else(|| ArchiveError::NotFound(record.name.clone()))?;
            let offset = target.stream_position()?;
            let length = backing.copy_into(target)?;
            toc.push(TocEntry {
                name: record.name.clone(),
                offset,
                length,
            });
        }

        Ok(toc)
    }
}
