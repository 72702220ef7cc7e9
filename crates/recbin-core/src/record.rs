//! `$I` index record parsing
//!
//! Every item moved to the recycle bin gets a small `$I<id>` control file
//! next to its `$R<id>` content. All versions share a 24-byte header:
//! - 0x00: format version (i64)
//! - 0x08: original size in bytes (u64)
//! - 0x10: deletion time as FILETIME (i64)
//!
//! Version 2 (Windows 10+) follows with a character count and a
//! variable-length UTF-16LE path. Older versions store the path in a fixed
//! 520-byte (MAX_PATH) UTF-16LE block.

use std::io::{Cursor, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use encoding_rs::UTF_16LE;
use serde::Serialize;

use crate::error::{RecbinError, Result};
use crate::format;

/// Version number written by Windows 10 and later
pub const CURRENT_FORMAT_VERSION: i64 = 2;

/// Header shared by every format version
pub const COMMON_HEADER_SIZE: usize = 24;

/// Common header plus the version 2 name length field
pub const CURRENT_HEADER_SIZE: usize = COMMON_HEADER_SIZE + 4;

/// Fixed UTF-16 name block of legacy records (260 code units)
pub const LEGACY_NAME_SIZE: usize = 520;

pub const LEGACY_RECORD_SIZE: usize = COMMON_HEADER_SIZE + LEGACY_NAME_SIZE;

/// On-disk layout of an index record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordFormat {
    /// Fixed-size name block (Vista through 8.1)
    Legacy { version: i64 },
    /// Length-prefixed name (Windows 10+)
    Current,
}

impl RecordFormat {
    pub fn from_version(version: i64) -> Self {
        if version == CURRENT_FORMAT_VERSION {
            RecordFormat::Current
        } else {
            RecordFormat::Legacy { version }
        }
    }

    pub fn version(&self) -> i64 {
        match self {
            RecordFormat::Legacy { version } => *version,
            RecordFormat::Current => CURRENT_FORMAT_VERSION,
        }
    }

    /// Smallest buffer that can hold this format's fixed fields
    pub fn min_size(&self) -> usize {
        match self {
            RecordFormat::Legacy { .. } => LEGACY_RECORD_SIZE,
            RecordFormat::Current => CURRENT_HEADER_SIZE,
        }
    }
}

impl std::fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordFormat::Legacy { version } => write!(f, "legacy (v{})", version),
            RecordFormat::Current => write!(f, "current (v{})", CURRENT_FORMAT_VERSION),
        }
    }
}

/// Decoded `$I` index record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRecord {
    pub format: RecordFormat,
    /// Size of the deleted item in bytes
    pub size_bytes: u64,
    /// Deletion time, 100ns ticks since 1601-01-01 UTC
    pub delete_timestamp_raw: i64,
    /// Full path the item was deleted from, with `\` separators
    pub original_path: String,
}

impl IndexRecord {
    /// Parse an index record from the full contents of a `$I` file
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < COMMON_HEADER_SIZE {
            return Err(RecbinError::malformed(format!(
                "{} bytes is shorter than the {}-byte header",
                data.len(),
                COMMON_HEADER_SIZE
            )));
        }

        let mut cursor = Cursor::new(data);
        let version = cursor.read_i64::<LittleEndian>()?;
        let size_bytes = cursor.read_u64::<LittleEndian>()?;
        let delete_timestamp_raw = cursor.read_i64::<LittleEndian>()?;

        let format = RecordFormat::from_version(version);
        if data.len() < format.min_size() {
            return Err(RecbinError::malformed(format!(
                "{} bytes is shorter than the {}-byte {} header",
                data.len(),
                format.min_size(),
                format
            )));
        }

        let name_bytes = match format {
            RecordFormat::Current => {
                let name_length = cursor.read_i32::<LittleEndian>()?;
                let name_length = usize::try_from(name_length).map_err(|_| {
                    RecbinError::malformed(format!("negative name length {}", name_length))
                })?;

                let end = name_length
                    .checked_mul(2)
                    .and_then(|len| len.checked_add(CURRENT_HEADER_SIZE))
                    .filter(|&end| end <= data.len())
                    .ok_or_else(|| {
                        RecbinError::malformed(format!(
                            "name of {} characters overruns {}-byte record",
                            name_length,
                            data.len()
                        ))
                    })?;

                &data[CURRENT_HEADER_SIZE..end]
            }
            RecordFormat::Legacy { .. } => &data[COMMON_HEADER_SIZE..LEGACY_RECORD_SIZE],
        };

        let original_path = decode_utf16_path(name_bytes)?;

        Ok(IndexRecord {
            format,
            size_bytes,
            delete_timestamp_raw,
            original_path,
        })
    }

    /// Read and parse a `$I` file
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::parse(&data)
    }

    /// Encode the record back into its on-disk layout.
    ///
    /// Names longer than the legacy block are truncated to fit.
    pub fn to_bytes(&self) -> Vec<u8> {
        let name: Vec<u16> = self.original_path.encode_utf16().chain(Some(0)).collect();
        let mut buffer = Vec::with_capacity(CURRENT_HEADER_SIZE + name.len() * 2);

        // Writes into a Vec cannot fail
        let _ = self.write_header(&mut buffer);

        match self.format {
            RecordFormat::Current => {
                let _ = buffer.write_i32::<LittleEndian>(name.len() as i32);
                for unit in &name {
                    let _ = buffer.write_u16::<LittleEndian>(*unit);
                }
            }
            RecordFormat::Legacy { .. } => {
                let mut block = [0u16; LEGACY_NAME_SIZE / 2];
                let keep = name.len().min(block.len() - 1);
                block[..keep].copy_from_slice(&name[..keep]);
                for unit in block {
                    let _ = buffer.write_u16::<LittleEndian>(unit);
                }
            }
        }

        buffer
    }

    fn write_header(&self, out: &mut impl Write) -> std::io::Result<()> {
        out.write_i64::<LittleEndian>(self.format.version())?;
        out.write_u64::<LittleEndian>(self.size_bytes)?;
        out.write_i64::<LittleEndian>(self.delete_timestamp_raw)
    }

    /// File name component of the original path
    pub fn name(&self) -> &str {
        self.original_path
            .rsplit_once('\\')
            .map(|(_, name)| name)
            .unwrap_or(&self.original_path)
    }

    /// Original path without its final component
    pub fn parent_path(&self) -> &str {
        self.original_path
            .rsplit_once('\\')
            .map(|(parent, _)| parent)
            .unwrap_or(&self.original_path)
    }

    /// Size as displayed to users, e.g. `5 KB`
    pub fn size_display(&self) -> String {
        format::format_size_kb(self.size_bytes)
    }

    /// Deletion time, or `None` if the stored value cannot be converted
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        let seconds = format::filetime_to_unix_seconds(self.delete_timestamp_raw);
        format::unix_seconds_to_datetime(seconds).ok()
    }

    /// Deletion time rendered as `YYYY-MM-DD HH:MM:SS`
    pub fn delete_time_display(&self) -> String {
        format::format_delete_time(self.delete_timestamp_raw)
    }
}

/// Decode a UTF-16LE path, dropping trailing NUL padding
fn decode_utf16_path(data: &[u8]) -> Result<String> {
    let decoded = UTF_16LE
        .decode_without_bom_handling_and_without_replacement(data)
        .ok_or_else(|| RecbinError::malformed("original path is not valid UTF-16"))?;

    Ok(decoded.trim_end_matches('\u{0}').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELETED_AT: i64 = 13_281_793_500_000_000;

    fn current(path: &str, size: u64) -> IndexRecord {
        IndexRecord {
            format: RecordFormat::Current,
            size_bytes: size,
            delete_timestamp_raw: DELETED_AT,
            original_path: path.to_string(),
        }
    }

    #[test]
    fn test_parse_current_record() {
        let mut data = Vec::new();
        data.extend_from_slice(&2i64.to_le_bytes());
        data.extend_from_slice(&4096u64.to_le_bytes());
        data.extend_from_slice(&DELETED_AT.to_le_bytes());
        data.extend_from_slice(&4i32.to_le_bytes());
        // "C:\a" without a terminator
        data.extend_from_slice(&[0x43, 0x00, 0x3A, 0x00, 0x5C, 0x00, 0x61, 0x00]);

        let record = IndexRecord::parse(&data).unwrap();
        assert_eq!(record.format, RecordFormat::Current);
        assert_eq!(record.size_bytes, 4096);
        assert_eq!(record.delete_timestamp_raw, DELETED_AT);
        assert_eq!(record.original_path, "C:\\a");
    }

    #[test]
    fn test_current_round_trip() {
        let record = current("C:\\Users\\A\\Docs\\report.docx", 4096);
        let parsed = IndexRecord::parse(&record.to_bytes()).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_current_round_trip_non_ascii() {
        let record = current("C:\\Users\\Zoë\\OneDrive\\报告 🚀.txt", u64::MAX);
        let parsed = IndexRecord::parse(&record.to_bytes()).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_legacy_round_trip() {
        let record = IndexRecord {
            format: RecordFormat::Legacy { version: 1 },
            size_bytes: 12,
            delete_timestamp_raw: DELETED_AT,
            original_path: "C:\\Users\\B\\OneDrive\\notes.txt".to_string(),
        };

        let bytes = record.to_bytes();
        assert_eq!(bytes.len(), LEGACY_RECORD_SIZE);
        assert_eq!(IndexRecord::parse(&bytes).unwrap(), record);
    }

    #[test]
    fn test_short_buffers_are_malformed() {
        let full = current("C:\\x\\y.txt", 1).to_bytes();
        for len in 0..CURRENT_HEADER_SIZE {
            let result = IndexRecord::parse(&full[..len]);
            assert!(
                matches!(result, Err(RecbinError::MalformedRecord { .. })),
                "length {} should be malformed",
                len
            );
        }
    }

    #[test]
    fn test_truncated_name_is_malformed() {
        let full = current("C:\\x\\y.txt", 1).to_bytes();
        let result = IndexRecord::parse(&full[..full.len() - 2]);
        assert!(matches!(result, Err(RecbinError::MalformedRecord { .. })));
    }

    #[test]
    fn test_negative_name_length_is_malformed() {
        let mut data = current("C:\\x", 1).to_bytes();
        data[24..28].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            IndexRecord::parse(&data),
            Err(RecbinError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_short_legacy_record_is_malformed() {
        let mut data = vec![0u8; LEGACY_RECORD_SIZE - 1];
        data[..8].copy_from_slice(&1i64.to_le_bytes());
        assert!(matches!(
            IndexRecord::parse(&data),
            Err(RecbinError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_unpaired_surrogate_is_malformed() {
        let mut data = Vec::new();
        data.extend_from_slice(&2i64.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        data.extend_from_slice(&0i64.to_le_bytes());
        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&0xD800u16.to_le_bytes());

        assert!(matches!(
            IndexRecord::parse(&data),
            Err(RecbinError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_name_and_parent() {
        let record = current("C:\\Users\\A\\Docs\\report.docx", 0);
        assert_eq!(record.name(), "report.docx");
        assert_eq!(record.parent_path(), "C:\\Users\\A\\Docs");

        let bare = current("report.docx", 0);
        assert_eq!(bare.name(), "report.docx");
        assert_eq!(bare.parent_path(), "report.docx");
    }

    #[test]
    fn test_display_helpers() {
        let record = current("C:\\a.txt", 4096);
        assert_eq!(record.size_display(), "5 KB");
        assert_eq!(record.delete_time_display(), "2021-11-19 11:05:00");
        assert!(record.deleted_at().is_some());
    }
}
