//! Report Document Archive Format
//!
//! A single-file container for report documents: many independently
//! addressable, independently growable named byte streams (page content,
//! styles, bookmarks, table-of-contents data, images) packed into one
//! portable file.
//!
//! ## How it works
//!
//! While an archive is open, every logical stream is staged as its own file
//! in a working directory next to the target, so producers can create,
//! write, seek, and re-read streams freely before the final size of
//! anything is known. `finish` packs the staged streams, in an order chosen
//! by a pluggable [`StreamSorter`], into the target file together with a
//! table of contents, then removes the staging area. The target path is
//! reserved (zero length, exclusively locked) for the whole staging phase,
//! so observers only ever see an absent file, an empty reservation, or a
//! fully valid archive.
//!
//! - [`error`] - Error types for archive operations
//! - [`writer`] - [`ArchiveWriter`], the staging-and-pack lifecycle
//! - [`staging`] - [`StagingWriter`], one staged file per logical stream
//! - [`stream`] - [`RandomAccessStream`], seekable read/write cursors
//! - [`table`] - [`StreamTable`], the in-memory stream registry
//! - [`sorter`] - [`StreamSorter`] packing-order policies
//! - [`toc`] - [`TableOfContents`] binary format and trailer
//! - [`reader`] - [`ArchiveReader`], seek-based access to packed files
//! - [`validation`] - stream-name rules
//! - [`util`] - filesystem helpers
//!
//! ## Example
//!
//! ```rust,no_run
//! use rptdoc::{ArchiveReader, ArchiveWriter};
//!
//! # fn main() -> rptdoc::Result<()> {
//! let mut writer = ArchiveWriter::open("report.rptdocument")?;
//! writer.initialize()?;
//!
//! let mut content = writer.create_stream("content/0")?;
//! content.write(b"rendered page bytes")?;
//!
//! // Patch an earlier offset while writing forward
//! let mut index = writer.open_stream("content/0")?;
//! index.write(b"R")?;
//!
//! writer.finish()?;
//!
//! let reader = ArchiveReader::open("report.rptdocument")?;
//! let bytes = reader.read_stream("content/0")?;
//! assert_eq!(&bytes[1..], b"endered page bytes");
//! # Ok(())
//! # }
//! ```
//!
//! ## Packed layout
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ stream payloads, in order    │
//! ├──────────────────────────────┤
//! │ table of contents            │
//! │   {name, offset, length}*    │
//! ├──────────────────────────────┤
//! │ 32-byte trailer              │
//! │   TOC locator + CRC + magic  │
//! └──────────────────────────────┘
//! ```
//!
//! Single-writer, single-process semantics: one writer owns one target path
//! and its staging area; a concurrent open of the same path fails at the
//! reservation step.

pub mod error;
pub mod reader;
pub mod sorter;
pub mod staging;
pub mod stream;
pub mod table;
pub mod toc;
pub mod util;
pub mod validation;
pub mod writer;

// Re-export commonly used types
pub use error::{ArchiveError, Result};
pub use reader::ArchiveReader;
pub use sorter::{CreationOrderSorter, NameOrderSorter, StreamRecord, StreamSorter};
pub use staging::StagingWriter;
pub use stream::RandomAccessStream;
pub use table::StreamTable;
pub use toc::{TableOfContents, TocEntry};
pub use writer::{ArchiveWriter, LockHandle, STAGING_SUFFIX};

/// Archive format version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Packed-file magic number
pub const MAGIC: &[u8; 8] = &toc::MAGIC;
