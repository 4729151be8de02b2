use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{ExportError, Result};

/// Hands finished buffers to the user.
///
/// Each platform supplies its own: a file write, a save dialog, a browser download.
/// Failures are reported as [`ExportError::Download`]. The export never retries on
/// its own.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn deliver(&self, data: Bytes, filename: &str) -> Result<()>;
}

/// Writes deliveries into a directory.
pub struct DirectorySink {
    dir: PathBuf,
    overwrite: bool,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            overwrite: false,
        }
    }

    /// Replace files that already exist instead of refusing them.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    async fn write(&self, data: &[u8], path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = fs::File::create(path).await?;
        file.write_all(data).await?;
        file.flush().await
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn deliver(&self, data: Bytes, filename: &str) -> Result<()> {
        let path = self.dir.join(filename);

        if !self.overwrite && fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ExportError::download(
                filename,
                format!("{} already exists", path.display()),
            ));
        }

        self.write(&data, &path)
            .await
            .map_err(|err| ExportError::download(filename, err))?;

        tracing::info!(path = %path.display(), bytes = data.len(), "saved");
        Ok(())
    }
}

/// Keeps deliveries in memory, in order.
#[derive(Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<(String, Bytes)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far as (filename, bytes).
    pub fn deliveries(&self) -> Vec<(String, Bytes)> {
        self.delivered
            .lock()
            .map(|delivered| delivered.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DownloadSink for MemorySink {
    async fn deliver(&self, data: Bytes, filename: &str) -> Result<()> {
        self.delivered
            .lock()
            .map_err(|_| ExportError::download(filename, "sink state poisoned"))?
            .push((filename.to_string(), data));
        Ok(())
    }
}
