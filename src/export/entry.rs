use bytes::Bytes;
use std::path::PathBuf;

use crate::error::{ExportError, Result};

/// Where the bytes of an entry come from.
#[derive(Debug, Clone)]
pub enum EntryData {
    /// Already in memory.
    Memory(Bytes),
    /// Read from disk when the entry is packed.
    File(PathBuf),
}

/// One file to export. Never mutated by the export.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub data: EntryData,
    /// Declared size in bytes. For file-backed entries this is 0 until known.
    pub size: u64,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            data: EntryData::Memory(data),
        }
    }

    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            data: EntryData::File(path.into()),
            size: 0,
        }
    }

    /// Entries without a usable name are dropped before encoding.
    pub fn is_malformed(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// Fetch the entry's bytes.
    pub async fn load(&self) -> Result<Bytes> {
        match &self.data {
            EntryData::Memory(bytes) => Ok(bytes.clone()),
            EntryData::File(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|source| ExportError::Io {
                    name: self.name.clone(),
                    source,
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_backed_entries_load_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        std::fs::write(&path, [7u8; 4]).unwrap();

        let entry = FileEntry::from_path("frame.png", &path);
        assert_eq!(entry.load().await.unwrap().as_ref(), &[7u8; 4]);

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(entry.load().await, Err(ExportError::Io { .. })));
    }

    #[test]
    fn blank_names_are_malformed() {
        assert!(FileEntry::new(" \t", Vec::<u8>::new()).is_malformed());
        assert!(!FileEntry::new("a", Vec::<u8>::new()).is_malformed());
        assert_eq!(FileEntry::new("a", vec![0u8; 3]).size, 3);
    }
}
