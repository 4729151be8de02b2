use super::ReadAt;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;

/// Random access over an archive on the local filesystem
pub struct LocalFileReader {
    file: Mutex<std::fs::File>,
    size: u64,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            size,
        })
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("File handle poisoned"))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            file.read_exact_at(buf, offset)?;
        }

        #[cfg(not(unix))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let mut handle: &std::fs::File = &file;
            handle.seek(SeekFrom::Start(offset))?;
            handle.read_exact(buf)?;
        }

        Ok(buf.len())
    }

    fn size(&self) -> u64 {
        self.size
    }
}
