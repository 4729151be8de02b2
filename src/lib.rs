//! # zipdrop
//!
//! Packages in-memory files (rendered frames, previews, metadata) into a single
//! ZIP archive and hands it to the user, degrading gracefully when compression
//! is unavailable or an archive cannot be built.
//!
//! ## Features
//!
//! - From-scratch ZIP encoder (store method, real CRC32, DOS timestamps)
//! - Optional DEFLATE backend built on `flate2`
//! - Per-file delivery fallback with user confirmation and pacing
//! - Cooperative cancellation through [`CancellationToken`]
//! - Reader side for verifying and listing archives
//!
//! ## Limitations
//!
//! No zip64: entries and archives must stay below 4 GiB and hold at most
//! 65535 entries.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zipdrop::{
//!     ArchiveExportOrchestrator, AutoConfirm, CancellationToken, DeflateBackend, DirectorySink,
//!     FileEntry, NoProgress,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let sink = Arc::new(DirectorySink::new("out"));
//!     let mut exporter = ArchiveExportOrchestrator::new(sink, Arc::new(AutoConfirm))
//!         .with_backend(Arc::new(DeflateBackend::default()));
//!
//!     let entries = vec![
//!         FileEntry::new("frame_001.png", vec![0u8; 1024]),
//!         FileEntry::new("info.txt", b"rendered at 2x".to_vec()),
//!     ];
//!     let result = exporter
//!         .export_archive(&entries, "frames.zip", &NoProgress, &CancellationToken::new())
//!         .await;
//!     println!("{}: {:?}", result.method, result.filename);
//! }
//! ```

pub mod cli;
pub mod error;
pub mod export;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{ExportError, Result};
pub use export::{
    ArchiveExportOrchestrator, AutoConfirm, AutoDecline, CancellationToken, CompressionBackend,
    DeflateBackend, DirectorySink, DownloadSink, EntryData, ExportMethod, ExportOptions,
    ExportResult, FileEntry, MemorySink, NoProgress, Progress, ProgressReporter, UserPrompt,
    sanitize,
};
pub use io::{LocalFileReader, MemoryReader, ReadAt};
pub use crate::zip::{ZipArchiveWriter, ZipExtractor, ZipFileEntry};
