//! Package archive assembly.
//!
//! Collects resource blobs, the code stub, and the signature entries into a
//! ZIP-family archive held entirely in memory. Binary resources are stored
//! uncompressed; signature text entries are deflated. Signature entries are
//! appended after every content entry, matching the order signature
//! computation requires, and the archive is only handed out once the
//! end-of-central-directory record is written.

use crate::bundler::error::{Error, Result};
use flate2::Crc;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Per-entry compression mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    /// Entry bytes stored as-is.
    Stored,
    /// Entry bytes deflated.
    Deflated,
}

/// One archive entry: name, raw bytes, compression mode, and the CRC32 of
/// the uncompressed bytes.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Entry name, unique within the archive.
    pub name: String,
    /// Uncompressed entry bytes.
    pub bytes: Vec<u8>,
    /// Compression mode the container records.
    pub mode: CompressionMode,
    /// CRC32 of `bytes`.
    pub crc32: u32,
}

/// Ordered archive entry list with unique-name enforcement.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<ArchiveEntry>,
    names: HashSet<String>,
}

impl ArchiveBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, computing its CRC32. Entry names must be unique.
    pub fn append(&mut self, name: &str, bytes: Vec<u8>, mode: CompressionMode) -> Result<()> {
        if !self.names.insert(name.to_string()) {
            return Err(crate::bundler::error::EncodingError::DuplicateResource {
                name: name.to_string(),
            }
            .into());
        }

        let mut crc = Crc::new();
        crc.update(&bytes);
        self.entries.push(ArchiveEntry {
            name: name.to_string(),
            bytes,
            mode,
            crc32: crc.sum(),
        });
        Ok(())
    }

    /// Entries in append order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Serializes the archive: one local header and one central-directory
    /// record per entry, terminated by the end-of-central-directory record.
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in &self.entries {
            let method = match entry.mode {
                CompressionMode::Stored => CompressionMethod::Stored,
                CompressionMode::Deflated => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default()
                .compression_method(method)
                .last_modified_time(zip::DateTime::default());
            writer.start_file(entry.name.as_str(), options)?;
            writer.write_all(&entry.bytes)?;
        }
        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}

const LOCAL_HEADER_SIG: u32 = 0x0403_4B50;
const CENTRAL_DIR_SIG: u32 = 0x0201_4B50;
const EOCD_SIG: u32 = 0x0605_4B50;
const EOCD_MIN_LEN: usize = 22;
const CENTRAL_DIR_RECORD_LEN: usize = 46;

/// Local-header and central-directory record counts of a serialized archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryCounts {
    /// Entries reachable through local file headers.
    pub local_headers: usize,
    /// Central-directory records, per the end-of-central-directory record.
    pub central_records: usize,
}

/// Walks a serialized archive's central directory and counts records,
/// checking that each one points at a real local file header.
pub fn entry_counts(bytes: &[u8]) -> Result<EntryCounts> {
    let eocd = find_eocd(bytes)?;
    let central_records = read_u16_le(bytes, eocd + 10)? as usize;
    let cd_offset = read_u32_le(bytes, eocd + 16)? as usize;

    let mut pos = cd_offset;
    let mut local_headers = 0;
    for _ in 0..central_records {
        if read_u32_le(bytes, pos)? != CENTRAL_DIR_SIG {
            crate::bail!("central directory record missing at offset {pos}");
        }
        let name_len = read_u16_le(bytes, pos + 28)? as usize;
        let extra_len = read_u16_le(bytes, pos + 30)? as usize;
        let comment_len = read_u16_le(bytes, pos + 32)? as usize;
        let local_offset = read_u32_le(bytes, pos + 42)? as usize;

        if read_u32_le(bytes, local_offset)? != LOCAL_HEADER_SIG {
            crate::bail!("central directory points at offset {local_offset} with no local header");
        }
        local_headers += 1;
        pos += CENTRAL_DIR_RECORD_LEN + name_len + extra_len + comment_len;
    }

    Ok(EntryCounts {
        local_headers,
        central_records,
    })
}

/// Finds the end-of-central-directory record, scanning back over a possible
/// trailing comment.
fn find_eocd(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < EOCD_MIN_LEN {
        return Err(Error::GenericError(
            "archive too short for an end-of-central-directory record".to_string(),
        ));
    }
    let mut pos = bytes.len() - EOCD_MIN_LEN;
    loop {
        if read_u32_le(bytes, pos)? == EOCD_SIG {
            return Ok(pos);
        }
        if pos == 0 {
            return Err(Error::GenericError(
                "no end-of-central-directory record found".to_string(),
            ));
        }
        pos -= 1;
    }
}

fn read_u16_le(bytes: &[u8], pos: usize) -> Result<u16> {
    bytes
        .get(pos..pos + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| Error::GenericError(format!("archive truncated at offset {pos}")))
}

fn read_u32_le(bytes: &[u8], pos: usize) -> Result<u32> {
    bytes
        .get(pos..pos + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| Error::GenericError(format!("archive truncated at offset {pos}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn sample() -> ArchiveBuilder {
        let mut builder = ArchiveBuilder::new();
        builder
            .append("manifest.bin", vec![1, 2, 3, 4], CompressionMode::Stored)
            .expect("append");
        builder
            .append(
                "META-INF/MANIFEST.MF",
                b"Manifest-Version: 1.0\r\n".to_vec(),
                CompressionMode::Deflated,
            )
            .expect("append");
        builder
    }

    #[test]
    fn counts_match_after_write() {
        let bytes = sample().write().expect("write");
        let counts = entry_counts(&bytes).expect("counts");
        assert_eq!(counts.local_headers, 2);
        assert_eq!(counts.central_records, 2);
    }

    #[test]
    fn recorded_crc_is_true_crc_of_content() {
        let builder = sample();
        let bytes = builder.write().expect("write");

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open");
        for entry in builder.entries() {
            let mut file = archive.by_name(&entry.name).expect("entry");
            let mut content = Vec::new();
            file.read_to_end(&mut content).expect("read");
            assert_eq!(content, entry.bytes);
            assert_eq!(file.crc32(), entry.crc32, "{}", entry.name);

            let mut crc = Crc::new();
            crc.update(&content);
            assert_eq!(crc.sum(), entry.crc32);
        }
    }

    #[test]
    fn duplicate_entry_names_are_rejected() {
        let mut builder = sample();
        let err = builder
            .append("manifest.bin", vec![9], CompressionMode::Stored)
            .expect_err("duplicate");
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn entries_preserve_append_order() {
        let bytes = sample().write().expect("write");
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open");
        let first = archive.by_index(0).expect("first").name().to_string();
        assert_eq!(first, "manifest.bin");
    }
}
