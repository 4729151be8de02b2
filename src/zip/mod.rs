//! ZIP archive encoding, parsing and extraction.
//!
//! ## Architecture
//!
//! - [`structures`]: on-disk records (local header, central directory header, EOCD)
//!   and the packed DOS timestamp
//! - [`writer`]: offset bookkeeping shared by every archive producer, and the
//!   stored (uncompressed) writer
//! - [`parser`]: low-level parsing of ZIP structures from raw bytes
//! - [`extractor`]: reading entries back, used to verify what was written
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! ## Limitations
//!
//! - No zip64: every entry and the archive itself must stay below 4 GiB,
//!   and an archive holds at most 65535 entries
//! - No encryption, no multi-disk archives
//! - Only STORED and DEFLATE methods

mod extractor;
mod parser;
mod structures;
mod writer;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
pub use writer::{ArchiveAssembler, MAX_ENTRIES, ZipArchiveWriter, checked_size, crc32};
pub(crate) use writer::pack_entries;
