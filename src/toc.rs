//! Packed-file table of contents and trailer
//!
//! A packed archive is the concatenated payload of every stream followed by
//! the table of contents and a fixed-size trailer:
//!
//! ```text
//! ┌─────────────────────────────┐
//! │ stream 0 bytes              │
//! │ stream 1 bytes              │
//! │ ...                         │
//! ├─────────────────────────────┤
//! │ TOC                         │
//! │   entry count (u32)         │
//! │   per entry:                │
//! │     name length (u32)       │
//! │     name bytes (UTF-8)      │
//! │     offset (u64)            │
//! │     length (u64)            │
//! ├─────────────────────────────┤
//! │ Trailer (32 bytes)          │
//! │   TOC offset (u64)          │
//! │   TOC length (u64)          │
//! │   TOC CRC32 (u32)           │
//! │   version major/minor (u16) │
//! │   magic (8 bytes)           │
//! └─────────────────────────────┘
//! ```
//!
//! All integers are little-endian. Readers locate the TOC from the trailer
//! at end-of-file, so writers can stream payloads sequentially without
//! patching a header.

use crate::error::{ArchiveError, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

pub const MAGIC: [u8; 8] = *b"RPTD\x00\x01\x00\x00";
pub const VERSION_MAJOR: u16 = 1;
pub const VERSION_MINOR: u16 = 0;

/// Trailer size: TOC offset + TOC length + CRC32 + version + magic
pub const TRAILER_LEN: usize = 8 + 8 + 4 + 2 + 2 + 8;

/// One stream's placement inside the packed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub name: String,
    pub offset: u64,
    pub length: u64,
}

/// Ordered index of every stream in a packed archive.
///
/// Entry order is the physical payload order chosen by the stream sorter.
#[derive(Debug, Clone, Default)]
pub struct TableOfContents {
    entries: Vec<TocEntry>,
}

impl TableOfContents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TocEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by stream name.
    pub fn get(&self, name: &str) -> Option<&TocEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Total payload bytes covered by all entries.
    pub fn payload_len(&self) -> u64 {
        self.entries.iter().map(|entry| entry.length).sum()
    }

    /// Serialize the TOC body to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        bytes.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for entry in &self.entries {
            bytes.extend_from_slice(&(entry.name.len() as u32).to_le_bytes());
            bytes.extend_from_slice(entry.name.as_bytes());
            bytes.extend_from_slice(&entry.offset.to_le_bytes());
            bytes.extend_from_slice(&entry.length.to_le_bytes());
        }

        bytes
    }

    /// Deserialize a TOC body.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut offset = 0usize;

        let entry_count = read_u32(bytes, &mut offset)? as usize;
        let mut entries = Vec::with_capacity(entry_count.min(1024));
        let mut seen = std::collections::HashSet::new();

        for _ in 0..entry_count {
            let name_len = read_u32(bytes, &mut offset)? as usize;
            if bytes.len() - offset < name_len {
                return Err(ArchiveError::CorruptToc(
                    "truncated stream name".to_string(),
                ));
            }
            let name = std::str::from_utf8(&bytes[offset..offset + name_len])
                .map_err(|_| ArchiveError::CorruptToc("stream name is not UTF-8".to_string()))?
                .to_string();
            offset += name_len;

            if !seen.insert(name.clone()) {
                return Err(ArchiveError::CorruptToc(format!(
                    "duplicate stream name: {}",
                    name
                )));
            }

            let stream_offset = read_u64(bytes, &mut offset)?;
            let length = read_u64(bytes, &mut offset)?;

            entries.push(TocEntry {
                name,
                offset: stream_offset,
                length,
            });
        }

        if offset != bytes.len() {
            return Err(ArchiveError::CorruptToc(
                "trailing bytes after last entry".to_string(),
            ));
        }

        Ok(TableOfContents { entries })
    }

    /// Append the TOC and trailer to the packed file.
    ///
    /// `file` must be positioned at the end of the stream payload.
    pub fn write_to(&self, file: &mut File) -> Result<()> {
        let toc_offset = file.stream_position()?;
        let toc_bytes = self.to_bytes();

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&toc_bytes);
        let crc = hasher.finalize();

        file.write_all(&toc_bytes)?;

        let mut trailer = [0u8; TRAILER_LEN];
        trailer[0..8].copy_from_slice(&toc_offset.to_le_bytes());
        trailer[8..16].copy_from_slice(&(toc_bytes.len() as u64).to_le_bytes());
        trailer[16..20].copy_from_slice(&crc.to_le_bytes());
        trailer[20..22].copy_from_slice(&VERSION_MAJOR.to_le_bytes());
        trailer[22..24].copy_from_slice(&VERSION_MINOR.to_le_bytes());
        trailer[24..32].copy_from_slice(&MAGIC);
        file.write_all(&trailer)?;

        Ok(())
    }

    /// Load the TOC from a packed file by walking back from the trailer.
    pub fn read_from(file: &mut File) -> Result<Self> {
        let file_len = file.seek(SeekFrom::End(0))?;
        if file_len < TRAILER_LEN as u64 {
            return Err(ArchiveError::CorruptToc(
                "file too short for trailer".to_string(),
            ));
        }

        file.seek(SeekFrom::End(-(TRAILER_LEN as i64)))?;
        let mut trailer = [0u8; TRAILER_LEN];
        file.read_exact(&mut trailer)?;

        if trailer[24..32] != MAGIC {
            return Err(ArchiveError::InvalidMagic);
        }

        let major = u16::from_le_bytes([trailer[20], trailer[21]]);
        let minor = u16::from_le_bytes([trailer[22], trailer[23]]);
        if major != VERSION_MAJOR {
            return Err(ArchiveError::UnsupportedVersion { major, minor });
        }

        let mut cursor = 0usize;
        let toc_offset = read_u64(&trailer, &mut cursor)?;
        let toc_len = read_u64(&trailer, &mut cursor)?;
        let crc = read_u32(&trailer, &mut cursor)?;

        let expected_end = toc_offset
            .checked_add(toc_len)
            .and_then(|end| end.checked_add(TRAILER_LEN as u64));
        if expected_end != Some(file_len) {
            return Err(ArchiveError::CorruptToc(
                "trailer does not cover the file".to_string(),
            ));
        }

        let toc_len = usize::try_from(toc_len)
            .map_err(|_| ArchiveError::CorruptToc("table of contents too large".to_string()))?;

        file.seek(SeekFrom::Start(toc_offset))?;
        let mut toc_bytes = vec![0u8; toc_len];
        file.read_exact(&mut toc_bytes)?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&toc_bytes);
        if hasher.finalize() != crc {
            return Err(ArchiveError::ChecksumMismatch);
        }

        Self::from_bytes(&toc_bytes)
    }
}

fn read_u32(bytes: &[u8], offset: &mut usize) -> Result<u32> {
    if bytes.len() - *offset < 4 {
        return Err(ArchiveError::CorruptToc(
            "truncated table of contents".to_string(),
        ));
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[*offset..*offset + 4]);
    *offset += 4;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(bytes: &[u8], offset: &mut usize) -> Result<u64> {
    if bytes.len() - *offset < 8 {
        return Err(ArchiveError::CorruptToc(
            "truncated table of contents".to_string(),
        ));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[*offset..*offset + 8]);
    *offset += 8;
    Ok(u64::from_le_bytes(buf))
}
