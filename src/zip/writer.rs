//! ZIP archive encoding.
//!
//! [`ArchiveAssembler`] does the format bookkeeping: it appends local headers and
//! payloads, remembers where each entry starts, and closes the archive with the
//! central directory and the EOCD record. It does not care how payloads were
//! encoded, so both the stored writer below and the DEFLATE backend use it.
//!
//! [`ZipArchiveWriter`] is the dependency-free tier: every entry is stored
//! verbatim (method 0) with a real CRC32.

use bytes::Bytes;
use std::io;

use tracing::{debug, warn};

use super::structures::{
    CentralDirectoryHeader, CompressionMethod, DosDateTime, EndOfCentralDirectory, EntryRecord,
    LocalFileHeader,
};
use crate::error::{ExportError, Result};
use crate::export::{
    CancellationToken, FileEntry, Progress, ProgressReporter, UniqueNames, report, sanitize,
};

/// Largest number of entries the 16-bit EOCD counters can describe.
pub const MAX_ENTRIES: usize = u16::MAX as usize;

/// CRC-32 (IEEE) of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

impl EntryRecord {
    /// Describe an entry whose payload is `data` stored as-is.
    pub fn stored(file_name: String, data: &[u8], modified: DosDateTime) -> Result<Self> {
        let size = checked_size(&file_name, data.len())?;
        Self::new(
            file_name,
            CompressionMethod::Stored,
            modified,
            crc32(data),
            size,
            size,
        )
    }

    /// Validate the encodable fields of a record.
    pub fn new(
        file_name: String,
        method: CompressionMethod,
        modified: DosDateTime,
        crc32: u32,
        compressed_size: u32,
        uncompressed_size: u32,
    ) -> Result<Self> {
        if file_name.is_empty() {
            return Err(ExportError::format(file_name, "entry name is empty"));
        }
        if file_name.len() > u16::MAX as usize {
            let reason = format!("name is {} bytes, the limit is 65535", file_name.len());
            return Err(ExportError::format(file_name, reason));
        }
        Ok(Self {
            file_name,
            method,
            modified,
            crc32,
            compressed_size,
            uncompressed_size,
        })
    }
}

/// Convert a byte length into a 32-bit size field.
pub fn checked_size(name: &str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        ExportError::format(name, format!("{len} bytes exceed the 4 GiB limit (no zip64)"))
    })
}

/// Incremental builder for a single-disk archive held in memory.
#[derive(Debug, Default)]
pub struct ArchiveAssembler {
    buf: Vec<u8>,
    central: Vec<(EntryRecord, u32)>,
}

impl ArchiveAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries written so far.
    pub fn entry_count(&self) -> usize {
        self.central.len()
    }

    /// Bytes written so far (local headers and payloads).
    pub fn written(&self) -> usize {
        self.buf.len()
    }

    /// Append one entry. `payload` must already be encoded with `record.method`.
    ///
    /// Nothing is written when this fails.
    pub fn push(&mut self, record: EntryRecord, payload: &[u8]) -> Result<()> {
        if self.central.len() >= MAX_ENTRIES {
            return Err(ExportError::format(
                record.file_name,
                "archive already holds 65535 entries (no zip64)",
            ));
        }
        if payload.len() != record.compressed_size as usize {
            let reason = format!(
                "payload is {} bytes but the header declares {}",
                payload.len(),
                record.compressed_size
            );
            return Err(ExportError::format(record.file_name, reason));
        }
        let offset = u32::try_from(self.buf.len()).map_err(|_| {
            ExportError::format(&record.file_name, "entry starts beyond the 4 GiB offset limit")
        })?;

        let header = LocalFileHeader { record: &record };
        self.buf.reserve(header.len() + payload.len());
        header
            .write_to(&mut self.buf)
            .map_err(|e| encode_error(&record.file_name, e))?;
        self.buf.extend_from_slice(payload);

        debug!(name = %record.file_name, offset, size = payload.len(), "wrote entry");
        self.central.push((record, offset));
        Ok(())
    }

    /// Append the central directory and the EOCD record and return the archive.
    pub fn finish(self) -> Result<Vec<u8>> {
        let Self { mut buf, central } = self;

        let cd_offset = u32::try_from(buf.len()).map_err(|_| {
            ExportError::format("archive", "central directory offset exceeds 4 GiB (no zip64)")
        })?;

        for (record, offset) in &central {
            let header = CentralDirectoryHeader {
                record,
                local_header_offset: *offset,
            };
            header
                .write_to(&mut buf)
                .map_err(|e| encode_error(&record.file_name, e))?;
        }

        let cd_size = u32::try_from(buf.len() - cd_offset as usize).map_err(|_| {
            ExportError::format("archive", "central directory exceeds 4 GiB (no zip64)")
        })?;

        // push() caps the entry count at u16::MAX
        let eocd = EndOfCentralDirectory::new(central.len() as u16, cd_size, cd_offset);
        eocd.write_to(&mut buf)
            .map_err(|e| encode_error("archive", e))?;

        Ok(buf)
    }
}

fn encode_error(name: &str, source: io::Error) -> ExportError {
    ExportError::Io {
        name: name.to_string(),
        source,
    }
}

/// Writes every entry uncompressed into a complete archive.
#[derive(Debug, Clone, Default)]
pub struct ZipArchiveWriter {
    modified: Option<DosDateTime>,
}

impl ZipArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp entries with a fixed time instead of "now".
    pub fn with_timestamp(mut self, modified: DosDateTime) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Encode `entries`, in order, into an archive buffer.
    ///
    /// Malformed, unreadable or unencodable entries are logged and skipped.
    /// Fails with [`ExportError::Validation`] when nothing usable remains and
    /// with [`ExportError::Cancelled`] as soon as `cancel` fires.
    pub async fn finalize(
        &self,
        entries: &[FileEntry],
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<u8>> {
        let modified = self.modified.unwrap_or_else(DosDateTime::now);
        pack_entries(entries, cancel, progress, |name, data| {
            let record = EntryRecord::stored(name, &data, modified)?;
            Ok((record, data))
        })
        .await
    }
}

/// Run every entry through `encode` and assemble the results, in input order.
///
/// `encode` receives the sanitized, de-duplicated name and the entry bytes and
/// returns the header record together with the payload to write. Per-entry
/// failures skip the entry; cancellation and archive-level limits abort.
pub(crate) async fn pack_entries<F>(
    entries: &[FileEntry],
    cancel: &CancellationToken,
    progress: &dyn ProgressReporter,
    encode: F,
) -> Result<Vec<u8>>
where
    F: Fn(String, Bytes) -> Result<(EntryRecord, Bytes)>,
{
    if entries.is_empty() {
        return Err(ExportError::Validation("no entries supplied".to_string()));
    }

    let mut assembler = ArchiveAssembler::new();
    let mut names = UniqueNames::default();
    let total = entries.len();

    for (index, entry) in entries.iter().enumerate() {
        cancel.check()?;

        if entry.is_malformed() {
            warn!(index, "skipping entry without a name");
            continue;
        }

        let data = match entry.load().await {
            Ok(data) => data,
            Err(err) => {
                warn!(%err, "skipping unreadable entry");
                continue;
            }
        };

        let name = names.claim(sanitize(&entry.name));
        let (record, payload) = match encode(name, data) {
            Ok(encoded) => encoded,
            Err(ExportError::Cancelled) => return Err(ExportError::Cancelled),
            Err(err) => {
                warn!(%err, "skipping entry");
                continue;
            }
        };
        assembler.push(record, &payload)?;

        report(progress, Progress::Percent(((index + 1) * 100 / total) as u8));
    }

    cancel.check()?;

    if assembler.entry_count() == 0 {
        return Err(ExportError::Validation(format!(
            "none of the {total} entries could be encoded"
        )));
    }

    assembler.finish()
}
