//! Archive export pipeline.
//!
//! [`ArchiveExportOrchestrator`] takes a list of [`FileEntry`] values and gets
//! them to the user, preferring a compressed archive, then a stored archive,
//! then one download per file. The pieces it is assembled from are injected:
//! an optional [`CompressionBackend`], a [`DownloadSink`] and a [`UserPrompt`].

mod backend;
mod cancel;
mod entry;
mod names;
mod orchestrator;
mod progress;
mod prompt;
mod sink;

pub use backend::{CompressionBackend, DeflateBackend};
pub use cancel::CancellationToken;
pub use entry::{EntryData, FileEntry};
pub use names::{DEFAULT_NAME, MAX_NAME_BYTES, UniqueNames, archive_file_name, sanitize};
pub use orchestrator::{ArchiveExportOrchestrator, ExportMethod, ExportOptions, ExportResult};
pub use progress::{NoProgress, Progress, ProgressReporter, report};
pub use prompt::{AutoConfirm, AutoDecline, UserPrompt};
pub use sink::{DirectorySink, DownloadSink, MemorySink};

pub(crate) use names::split_extension;
