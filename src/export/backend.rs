//! Compressing archive backends.
//!
//! The orchestrator never probes for compression support. It is handed an
//! optional [`CompressionBackend`]; `None`, or a backend whose
//! [`is_available`](CompressionBackend::is_available) returns false, simply
//! means the compressed tier is skipped.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

use super::{CancellationToken, FileEntry, ProgressReporter};
use crate::error::ExportError;
use crate::zip::{CompressionMethod, DosDateTime, EntryRecord, checked_size, crc32};

/// Something that can turn entries into a compressed archive.
#[async_trait]
pub trait CompressionBackend: Send + Sync {
    /// Whether the backend can be used right now.
    fn is_available(&self) -> bool {
        true
    }

    /// Build a complete archive named `archive_name` from `entries`.
    ///
    /// A cancellation must surface as [`ExportError::Cancelled`] somewhere in
    /// the returned error chain.
    async fn build(
        &self,
        entries: &[FileEntry],
        archive_name: &str,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<u8>>;
}

/// DEFLATE backend built on `flate2`.
///
/// Entries that do not shrink are stored instead.
#[derive(Debug, Clone, Default)]
pub struct DeflateBackend {
    modified: Option<DosDateTime>,
}

impl DeflateBackend {
    pub fn with_timestamp(mut self, modified: DosDateTime) -> Self {
        self.modified = Some(modified);
        self
    }

    fn encode(
        &self,
        name: String,
        data: Bytes,
        modified: DosDateTime,
    ) -> crate::Result<(EntryRecord, Bytes)> {
        let io_error = |source: std::io::Error| ExportError::Io {
            name: name.clone(),
            source,
        };
        let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
        encoder.write_all(&data).map_err(io_error)?;
        let compressed = encoder.finish().map_err(io_error)?;

        if compressed.len() >= data.len() {
            let record = EntryRecord::stored(name, &data, modified)?;
            return Ok((record, data));
        }

        let record = EntryRecord::new(
            name.clone(),
            CompressionMethod::Deflate,
            modified,
            crc32(&data),
            checked_size(&name, compressed.len())?,
            checked_size(&name, data.len())?,
        )?;
        Ok((record, Bytes::from(compressed)))
    }
}

#[async_trait]
impl CompressionBackend for DeflateBackend {
    async fn build(
        &self,
        entries: &[FileEntry],
        archive_name: &str,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<u8>> {
        tracing::debug!(archive_name, entries = entries.len(), "deflating archive");
        let modified = self.modified.unwrap_or_else(DosDateTime::now);
        let archive = crate::zip::pack_entries(entries, cancel, progress, |name, data| {
            self.encode(name, data, modified)
        })
        .await?;
        Ok(archive)
    }
}
