//! Tiered archive export.
//!
//! An export walks through up to three tiers and stops at the first one
//! that succeeds:
//!
//! 1. **compressed**: the injected [`CompressionBackend`], if any and available
//! 2. **stored**: the built-in [`ZipArchiveWriter`]
//! 3. **direct**: every file handed to the [`DownloadSink`] on its own
//!
//! A cancellation observed anywhere ends the export at once; any other
//! failure only ends its own tier.

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    CancellationToken, CompressionBackend, DownloadSink, FileEntry, Progress, ProgressReporter,
    UniqueNames, UserPrompt, archive_file_name, report, sanitize, split_extension,
};
use crate::error::{ExportError, Result};
use crate::io::MemoryReader;
use crate::zip::{DosDateTime, EndOfCentralDirectory, ZipArchiveWriter, ZipParser};

/// Extensions of human-readable companion files, delivered first by the direct tier.
const COMPANION_EXTENSIONS: &[&str] = &["txt", "md", "html", "htm", "json", "pdf"];
const COMPANION_STEMS: &[&str] = &["preview", "info", "readme"];

/// Knobs for [`ArchiveExportOrchestrator`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Direct delivery of more files than this asks the user first.
    pub confirm_threshold: usize,
    /// Pause between two direct deliveries.
    pub pacing_delay: Duration,
    /// Archives smaller than this are treated as failed builds.
    pub min_archive_size: usize,
    /// Read every built archive back before delivering it.
    pub verify_archives: bool,
    /// Timestamp for archive entries; "now" when unset.
    pub timestamp: Option<DosDateTime>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            confirm_threshold: 10,
            pacing_delay: Duration::from_millis(300),
            min_archive_size: EndOfCentralDirectory::SIZE + 1,
            verify_archives: true,
            timestamp: None,
        }
    }
}

impl ExportOptions {
    pub fn confirm_threshold(mut self, threshold: usize) -> Self {
        self.confirm_threshold = threshold;
        self
    }

    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    pub fn min_archive_size(mut self, size: usize) -> Self {
        self.min_archive_size = size;
        self
    }

    pub fn verify_archives(mut self, verify: bool) -> Self {
        self.verify_archives = verify;
        self
    }

    pub fn timestamp(mut self, timestamp: DosDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// How an export ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMethod {
    Compressed,
    Stored,
    Direct,
    Cancelled,
    Failed,
}

impl fmt::Display for ExportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportMethod::Compressed => "compressed",
            ExportMethod::Stored => "stored",
            ExportMethod::Direct => "direct",
            ExportMethod::Cancelled => "cancelled",
            ExportMethod::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one [`ArchiveExportOrchestrator::export_archive`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub success: bool,
    pub method: ExportMethod,
    /// Name of the delivered archive, for the archive tiers.
    pub filename: Option<String>,
    /// Failure message, or a note about skipped files on partial success.
    pub error: Option<String>,
    /// Number of buffers handed to the sink.
    pub delivered: usize,
}

impl ExportResult {
    fn archive(method: ExportMethod, filename: &str) -> Self {
        Self {
            success: true,
            method,
            filename: Some(filename.to_string()),
            error: None,
            delivered: 1,
        }
    }

    fn cancelled(delivered: usize) -> Self {
        Self {
            success: false,
            method: ExportMethod::Cancelled,
            filename: None,
            error: None,
            delivered,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            method: ExportMethod::Failed,
            filename: None,
            error: Some(error.into()),
            delivered: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Compressed,
    Stored,
    Direct,
}

impl Tier {
    fn next(self) -> Option<Self> {
        match self {
            Tier::Compressed => Some(Tier::Stored),
            Tier::Stored => Some(Tier::Direct),
            Tier::Direct => None,
        }
    }
}

/// Packages files for the user, falling back tier by tier.
pub struct ArchiveExportOrchestrator {
    backend: Option<Arc<dyn CompressionBackend>>,
    sink: Arc<dyn DownloadSink>,
    prompt: Arc<dyn UserPrompt>,
    options: ExportOptions,
}

impl ArchiveExportOrchestrator {
    pub fn new(sink: Arc<dyn DownloadSink>, prompt: Arc<dyn UserPrompt>) -> Self {
        Self {
            backend: None,
            sink,
            prompt,
            options: ExportOptions::default(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn CompressionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Export `entries` as an archive called `archive_name`.
    ///
    /// Takes `&mut self` so that a single orchestrator runs one export at a time.
    /// Never fails: the outcome, including cancellation, is in the returned
    /// [`ExportResult`].
    pub async fn export_archive(
        &mut self,
        entries: &[FileEntry],
        archive_name: &str,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> ExportResult {
        if entries.is_empty() {
            return ExportResult::failed("no files to export");
        }

        let filename = archive_file_name(archive_name);
        info!(archive = %filename, entries = entries.len(), "starting export");

        let mut tier = Tier::Compressed;
        loop {
            let attempt = match tier {
                Tier::Compressed => self.try_compressed(entries, &filename, progress, cancel).await,
                Tier::Stored => self.try_stored(entries, &filename, progress, cancel).await,
                Tier::Direct => self.try_direct(entries, progress, cancel).await,
            };

            let error = match attempt {
                Ok(Some(result)) => {
                    info!(method = %result.method, delivered = result.delivered, "export finished");
                    return result;
                }
                Ok(None) => None,
                Err(ExportError::Cancelled) => {
                    info!(?tier, "export cancelled");
                    report(progress, Progress::status("Export cancelled"));
                    return ExportResult::cancelled(0);
                }
                Err(err) => {
                    warn!(?tier, %err, "export tier failed");
                    Some(err)
                }
            };

            match tier.next() {
                Some(next) => tier = next,
                None => {
                    let message = error
                        .map(|err| format!("export failed: {err}"))
                        .unwrap_or_else(|| "export failed".to_string());
                    report(progress, Progress::status(message.clone()));
                    return ExportResult::failed(message);
                }
            }
        }
    }

    /// `Ok(None)` when no usable backend was injected.
    async fn try_compressed(
        &self,
        entries: &[FileEntry],
        filename: &str,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Option<ExportResult>> {
        let Some(backend) = self.backend.as_deref().filter(|b| b.is_available()) else {
            debug!("no compression backend, skipping compressed tier");
            return Ok(None);
        };

        cancel.check()?;
        report(progress, Progress::status("Compressing files"));

        let archive = match backend.build(entries, filename, cancel, progress).await {
            Ok(archive) => archive,
            Err(err) if ExportError::is_cancellation(&err) => return Err(ExportError::Cancelled),
            Err(err) => return Err(ExportError::Backend(err)),
        };

        self.deliver_archive(archive, filename, ExportMethod::Compressed, progress, cancel)
            .await
            .map(Some)
    }

    async fn try_stored(
        &self,
        entries: &[FileEntry],
        filename: &str,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Option<ExportResult>> {
        cancel.check()?;
        report(progress, Progress::status("Creating archive"));

        let mut writer = ZipArchiveWriter::new();
        if let Some(timestamp) = self.options.timestamp {
            writer = writer.with_timestamp(timestamp);
        }
        let archive = writer.finalize(entries, cancel, progress).await?;

        self.deliver_archive(archive, filename, ExportMethod::Stored, progress, cancel)
            .await
            .map(Some)
    }

    async fn deliver_archive(
        &self,
        archive: Vec<u8>,
        filename: &str,
        method: ExportMethod,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ExportResult> {
        if archive.len() < self.options.min_archive_size {
            return Err(ExportError::format(
                filename,
                format!("archive is only {} bytes", archive.len()),
            ));
        }

        let archive = Bytes::from(archive);
        if self.options.verify_archives {
            verify_archive(archive.clone()).await?;
        }

        cancel.check()?;
        report(progress, Progress::status(format!("Saving {filename}")));
        self.sink.deliver(archive, filename).await?;
        report(progress, Progress::Percent(100));

        Ok(ExportResult::archive(method, filename))
    }

    async fn try_direct(
        &self,
        entries: &[FileEntry],
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Option<ExportResult>> {
        let mut ordered: Vec<&FileEntry> = entries.iter().filter(|e| !e.is_malformed()).collect();
        if ordered.is_empty() {
            return Err(ExportError::Validation("no entry has a name".to_string()));
        }
        ordered.sort_by_key(|entry| !is_companion(&entry.name));

        let total = ordered.len();
        if total > self.options.confirm_threshold
            && !self.prompt.confirm_direct_delivery(total).await
        {
            info!(total, "direct delivery declined");
            return Ok(Some(ExportResult::failed(
                "archive could not be created and individual downloads were declined",
            )));
        }

        report(progress, Progress::status(format!("Downloading {total} files individually")));

        let mut names = UniqueNames::default();
        let mut delivered = 0;

        for (index, entry) in ordered.into_iter().enumerate() {
            let paced = if index > 0 && !self.options.pacing_delay.is_zero() {
                cancel.sleep(self.options.pacing_delay).await
            } else {
                cancel.check()
            };
            if paced.is_err() {
                info!(delivered, "direct delivery cancelled");
                return Ok(Some(ExportResult::cancelled(delivered)));
            }

            let name = names.claim(sanitize(&entry.name));
            report(
                progress,
                Progress::status(format!("Downloading {}/{}: {}", index + 1, total, name)),
            );

            let outcome = match entry.load().await {
                Ok(data) => self.sink.deliver(data, &name).await,
                Err(err) => Err(err),
            };

            match outcome {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(file = %name, %err, "direct delivery failed");
                    if !self.prompt.continue_after_failure(&name, &err).await {
                        break;
                    }
                }
            }

            report(progress, Progress::Percent(((index + 1) * 100 / total) as u8));
        }

        if delivered == 0 {
            return Ok(Some(ExportResult::failed("none of the files could be downloaded")));
        }

        let missing = total - delivered;
        Ok(Some(ExportResult {
            success: true,
            method: ExportMethod::Direct,
            filename: None,
            error: (missing > 0).then(|| format!("{missing} of {total} files were not downloaded")),
            delivered,
        }))
    }
}

/// Whether `name` looks like a human-readable companion file.
fn is_companion(name: &str) -> bool {
    let name = name.to_lowercase();
    let file = name.rsplit(['/', '\\']).next().unwrap_or(&name);
    let (stem, ext) = split_extension(file);
    let ext = ext.trim_start_matches('.');

    COMPANION_EXTENSIONS.contains(&ext) || COMPANION_STEMS.iter().any(|s| stem.contains(s))
}

/// Read `archive` back and make sure it lists at least one entry.
async fn verify_archive(archive: Bytes) -> Result<()> {
    let parser = ZipParser::new(Arc::new(MemoryReader::new(archive)));
    let entries = parser
        .list_files()
        .await
        .map_err(|err| ExportError::Archive(format!("{err:#}")))?;
    if entries.is_empty() {
        return Err(ExportError::Archive("archive lists no entries".to_string()));
    }
    debug!(entries = entries.len(), "archive verified");
    Ok(())
}
