use super::ReadAt;
use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;

/// Random access over an archive that is already in memory
pub struct MemoryReader {
    data: Bytes,
}

impl MemoryReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl ReadAt for MemoryReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let len = self.data.len() as u64;
        let end = offset + buf.len() as u64;
        if end > len {
            bail!("Read of {} bytes at {} is past the end ({} bytes)", buf.len(), offset, len);
        }
        buf.copy_from_slice(&self.data[offset as usize..end as usize]);
        Ok(buf.len())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_inside_bounds_only() {
        let reader = MemoryReader::new(vec![1u8, 2, 3, 4]);
        let mut buf = [0u8; 2];
        assert_eq!(reader.read_at(2, &mut buf).await.unwrap(), 2);
        assert_eq!(buf, [3, 4]);
        assert!(reader.read_at(3, &mut buf).await.is_err());
    }
}
