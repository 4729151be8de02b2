use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use std::io::{self, Cursor, Write};

use anyhow::{Result, bail};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }

    /// Minimum reader version (APPNOTE 4.4.3) needed to extract an entry using this method.
    pub fn version_needed(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 10,
            _ => 20,
        }
    }
}

/// Version-made-by value written into every central directory header (MS-DOS, APPNOTE 2.0).
pub const VERSION_MADE_BY: u16 = 20;

/// Packed MS-DOS timestamp as stored in ZIP headers.
///
/// `time = hour << 11 | minute << 5 | second / 2`
/// `date = (year - 1980) << 9 | month << 5 | day`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable instant.
    pub const EPOCH: Self = Self {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// 2107-12-31 23:59:58, the latest representable instant.
    pub const MAX: Self = Self {
        time: (23 << 11) | (59 << 5) | 29,
        date: (127 << 9) | (12 << 5) | 31,
    };

    pub fn from_naive(dt: NaiveDateTime) -> Self {
        let year = dt.year();
        if year < 1980 {
            return Self::EPOCH;
        }
        if year > 2107 {
            return Self::MAX;
        }

        let time = ((dt.hour() as u16) << 11) | ((dt.minute() as u16) << 5) | (dt.second() as u16 / 2);
        let date = (((year - 1980) as u16) << 9) | ((dt.month() as u16) << 5) | dt.day() as u16;
        Self { time, date }
    }

    /// Current local wall-clock time.
    pub fn now() -> Self {
        Self::from_naive(Local::now().naive_local())
    }

    /// Decode to (year, month, day)
    pub fn ymd(&self) -> (u16, u8, u8) {
        let day = (self.date & 0x1F) as u8;
        let month = ((self.date >> 5) & 0x0F) as u8;
        let year = ((self.date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Decode to (hour, minute, second)
    pub fn hms(&self) -> (u8, u8, u8) {
        let second = ((self.time & 0x1F) * 2) as u8;
        let minute = ((self.time >> 5) & 0x3F) as u8;
        let hour = ((self.time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u16::<LittleEndian>(self.time)?;
        w.write_u16::<LittleEndian>(self.date)
    }
}

/// Per-entry fields shared by the local and central headers.
#[derive(Debug, Clone)]
pub struct EntryRecord {
    pub file_name: String,
    pub method: CompressionMethod,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

/// Local File Header (LFH) - 30 bytes plus the file name
pub struct LocalFileHeader<'a> {
    pub record: &'a EntryRecord,
}

impl LocalFileHeader<'_> {
    pub const SIGNATURE: &'static [u8] = b"PK\x03\x04";
    pub const SIZE: usize = 30;

    pub fn len(&self) -> usize {
        Self::SIZE + self.record.file_name.len()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let r = self.record;
        w.write_all(Self::SIGNATURE)?;
        w.write_u16::<LittleEndian>(r.method.version_needed())?;
        w.write_u16::<LittleEndian>(0)?; // flags
        w.write_u16::<LittleEndian>(r.method.as_u16())?;
        r.modified.write_to(w)?;
        w.write_u32::<LittleEndian>(r.crc32)?;
        w.write_u32::<LittleEndian>(r.compressed_size)?;
        w.write_u32::<LittleEndian>(r.uncompressed_size)?;
        w.write_u16::<LittleEndian>(r.file_name.len() as u16)?;
        w.write_u16::<LittleEndian>(0)?; // extra field length
        w.write_all(r.file_name.as_bytes())
    }
}

/// Central Directory File Header (CDFH) - 46 bytes plus the file name
pub struct CentralDirectoryHeader<'a> {
    pub record: &'a EntryRecord,
    pub local_header_offset: u32,
}

impl CentralDirectoryHeader<'_> {
    pub const SIGNATURE: &'static [u8] = b"PK\x01\x02";
    pub const SIZE: usize = 46;

    pub fn len(&self) -> usize {
        Self::SIZE + self.record.file_name.len()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let r = self.record;
        w.write_all(Self::SIGNATURE)?;
        w.write_u16::<LittleEndian>(VERSION_MADE_BY)?;
        w.write_u16::<LittleEndian>(r.method.version_needed())?;
        w.write_u16::<LittleEndian>(0)?; // flags
        w.write_u16::<LittleEndian>(r.method.as_u16())?;
        r.modified.write_to(w)?;
        w.write_u32::<LittleEndian>(r.crc32)?;
        w.write_u32::<LittleEndian>(r.compressed_size)?;
        w.write_u32::<LittleEndian>(r.uncompressed_size)?;
        w.write_u16::<LittleEndian>(r.file_name.len() as u16)?;
        w.write_u16::<LittleEndian>(0)?; // extra field length
        w.write_u16::<LittleEndian>(0)?; // file comment length
        w.write_u16::<LittleEndian>(0)?; // disk number start
        w.write_u16::<LittleEndian>(0)?; // internal attributes
        w.write_u32::<LittleEndian>(0)?; // external attributes
        w.write_u32::<LittleEndian>(self.local_header_offset)?;
        w.write_all(r.file_name.as_bytes())
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    /// Trailer for a single-disk archive without comment.
    pub fn new(entries: u16, cd_size: u32, cd_offset: u32) -> Self {
        Self {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: entries,
            total_entries: entries,
            cd_size,
            cd_offset,
            comment_len: 0,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            bail!("Invalid End of Central Directory");
        }

        // Verify signature
        if &data[0..4] != Self::SIGNATURE {
            bail!("Invalid End of Central Directory");
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE)?;
        w.write_u16::<LittleEndian>(self.disk_number)?;
        w.write_u16::<LittleEndian>(self.disk_with_cd)?;
        w.write_u16::<LittleEndian>(self.disk_entries)?;
        w.write_u16::<LittleEndian>(self.total_entries)?;
        w.write_u32::<LittleEndian>(self.cd_size)?;
        w.write_u32::<LittleEndian>(self.cd_offset)?;
        w.write_u16::<LittleEndian>(self.comment_len)
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// Parsed ZIP file entry information
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub modified: DosDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn dos_time_packs_fields() {
        let dos = DosDateTime::from_naive(at(2024, 3, 15, 13, 45, 31));
        assert_eq!(dos.time, (13 << 11) | (45 << 5) | 15);
        assert_eq!(dos.date, (44 << 9) | (3 << 5) | 15);
        assert_eq!(dos.ymd(), (2024, 3, 15));
        assert_eq!(dos.hms(), (13, 45, 30));
    }

    #[test]
    fn dos_time_clamps_out_of_range_years() {
        assert_eq!(DosDateTime::from_naive(at(1970, 6, 1, 12, 0, 0)), DosDateTime::EPOCH);
        assert_eq!(DosDateTime::EPOCH.ymd(), (1980, 1, 1));
        assert_eq!(DosDateTime::from_naive(at(2200, 1, 1, 0, 0, 0)), DosDateTime::MAX);
        assert_eq!(DosDateTime::MAX.ymd(), (2107, 12, 31));
    }

    #[test]
    fn local_header_layout() {
        let record = EntryRecord {
            file_name: "a.png".to_string(),
            method: CompressionMethod::Stored,
            modified: DosDateTime::EPOCH,
            crc32: 0xDEADBEEF,
            compressed_size: 10,
            uncompressed_size: 10,
        };
        let header = LocalFileHeader { record: &record };
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();

        assert_eq!(buf.len(), header.len());
        assert_eq!(u32::from_le_bytes(buf[0..4].try_into().unwrap()), 0x04034b50);
        assert_eq!(u16::from_le_bytes([buf[4], buf[5]]), 10);
        assert_eq!(u16::from_le_bytes([buf[8], buf[9]]), 0);
        assert_eq!(u32::from_le_bytes(buf[14..18].try_into().unwrap()), 0xDEADBEEF);
        assert_eq!(u32::from_le_bytes(buf[18..22].try_into().unwrap()), 10);
        assert_eq!(u32::from_le_bytes(buf[22..26].try_into().unwrap()), 10);
        assert_eq!(u16::from_le_bytes([buf[26], buf[27]]), 5);
        assert_eq!(&buf[30..], b"a.png");
    }

    #[test]
    fn central_header_records_offset() {
        let record = EntryRecord {
            file_name: "b".to_string(),
            method: CompressionMethod::Deflate,
            modified: DosDateTime::EPOCH,
            crc32: 1,
            compressed_size: 3,
            uncompressed_size: 7,
        };
        let header = CentralDirectoryHeader {
            record: &record,
            local_header_offset: 0x1234,
        };
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();

        assert_eq!(buf.len(), 47);
        assert_eq!(u32::from_le_bytes(buf[0..4].try_into().unwrap()), 0x02014b50);
        assert_eq!(u16::from_le_bytes([buf[6], buf[7]]), 20);
        assert_eq!(u16::from_le_bytes([buf[10], buf[11]]), 8);
        assert_eq!(u32::from_le_bytes(buf[42..46].try_into().unwrap()), 0x1234);
    }

    #[test]
    fn eocd_round_trips() {
        let eocd = EndOfCentralDirectory::new(2, 100, 345);
        let mut buf = Vec::new();
        eocd.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), EndOfCentralDirectory::SIZE);
        assert_eq!(EndOfCentralDirectory::from_bytes(&buf).unwrap(), eocd);
        assert!(!eocd.is_zip64());
    }
}
