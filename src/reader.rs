//! Read-only access to a packed archive
//!
//! The reader validates the trailer and loads the table of contents once at
//! open, then serves stream reads by seeking to recorded offsets. It shares
//! the file handle behind a mutex so concurrent lookups through `&self` are
//! safe.

use crate::error::{ArchiveError, Result};
use crate::toc::{TableOfContents, TocEntry};
use crate::validation::normalize_stream_name;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Reads streams back out of a packed archive file.
pub struct ArchiveReader {
    path: PathBuf,
    file: Mutex<File>,
    toc: TableOfContents,
    index: HashMap<String, usize>,
}

impl ArchiveReader {
    /// Open a packed archive, validating its trailer and table of contents.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = path.as_ref();
        if raw.as_os_str().is_empty() {
            return Err(ArchiveError::InvalidPath(
                "archive path is empty".to_string(),
            ));
        }

        let mut file = File::open(raw)?;
        let toc = TableOfContents::read_from(&mut file)?;
        let index = toc
            .entries()
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.name.clone(), position))
            .collect();

        Ok(ArchiveReader {
            path: raw.to_path_buf(),
            file: Mutex::new(file),
            toc,
            index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn toc(&self) -> &TableOfContents {
        &self.toc
    }

    /// Stream names in packed (physical) order.
    pub fn stream_names(&self) -> Vec<&str> {
        self.toc
            .entries()
            .iter()
            .map(|entry| entry.name.as_str())
            .collect()
    }

    pub fn stream_exists(&self, name: &str) -> bool {
        match normalize_stream_name(name) {
            Ok(name) => self.index.contains_key(&name),
            Err(_) => false,
        }
    }

    /// Length of a stream without reading its bytes.
    pub fn stream_len(&self, name: &str) -> Result<u64> {
        Ok(self.entry(name)?.length)
    }

    /// Read a whole stream into memory.
    pub fn read_stream(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self.entry(name)?;
        let length = usize::try_from(entry.length)
            .map_err(|_| ArchiveError::CorruptToc(format!("stream too large: {}", entry.name)))?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(entry.offset))?;
        let mut buf = vec![0u8; length];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn entry(&self, name: &str) -> Result<&TocEntry> {
        let name = normalize_stream_name(name)?;
        self.index
            .get(&name)
            .map(|&position| &self.toc.entries()[position])
            .ok_or(ArchiveError::NotFound(name))
    }
}
