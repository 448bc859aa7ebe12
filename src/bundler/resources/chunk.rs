//! Chunked binary format core.
//!
//! Every binary resource in the package is built from self-describing
//! chunks: a `u16` type tag, a `u16` header size, and a `u32` total size
//! (little-endian), followed by the payload. Declared sizes always equal
//! the actual serialized length, so a conformant parser can skip chunks it
//! does not understand.
//!
//! All encoders here have paired decoders; round-trip fidelity is the
//! correctness contract and is exercised by the unit tests below.

use crate::bundler::error::EncodingError;
use bytes::{Buf, BufMut, BytesMut};
use std::collections::HashMap;

/// Fixed chunk header length: tag, header size, total size.
pub const CHUNK_HEADER_LEN: usize = 8;

/// Wire tags for every chunk kind in the package format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    /// Deduplicated string pool.
    StringPool,
    /// Package manifest.
    Manifest,
    /// Resource table package block.
    ResourceTable,
    /// Typed resource block nested in a resource table.
    TypeBlock,
    /// Serialized layout view tree.
    Layout,
}

impl ChunkType {
    /// Wire tag for this chunk kind.
    pub fn tag(self) -> u16 {
        match self {
            ChunkType::StringPool => 0x0001,
            ChunkType::Manifest => 0x0100,
            ChunkType::ResourceTable => 0x0200,
            ChunkType::TypeBlock => 0x0201,
            ChunkType::Layout => 0x0300,
        }
    }

    /// Chunk kind for a wire tag.
    pub fn from_tag(tag: u16) -> Result<Self, EncodingError> {
        match tag {
            0x0001 => Ok(ChunkType::StringPool),
            0x0100 => Ok(ChunkType::Manifest),
            0x0200 => Ok(ChunkType::ResourceTable),
            0x0201 => Ok(ChunkType::TypeBlock),
            0x0300 => Ok(ChunkType::Layout),
            _ => Err(EncodingError::UnknownChunkTag { tag }),
        }
    }

    /// Human-readable kind name, used in decode errors.
    pub fn name(self) -> &'static str {
        match self {
            ChunkType::StringPool => "string-pool",
            ChunkType::Manifest => "manifest",
            ChunkType::ResourceTable => "resource-table",
            ChunkType::TypeBlock => "type-block",
            ChunkType::Layout => "layout",
        }
    }
}

/// Appends a complete chunk (header plus payload) to `out`.
pub fn write_chunk(
    out: &mut BytesMut,
    ty: ChunkType,
    payload: &[u8],
) -> Result<(), EncodingError> {
    let total = CHUNK_HEADER_LEN
        .checked_add(payload.len())
        .filter(|&len| len <= u32::MAX as usize)
        .ok_or(EncodingError::ChunkTooLarge { len: payload.len() })?;

    out.put_u16_le(ty.tag());
    out.put_u16_le(CHUNK_HEADER_LEN as u16);
    out.put_u32_le(total as u32);
    out.put_slice(payload);
    Ok(())
}

/// A decoded chunk borrowing its payload from the input buffer.
#[derive(Debug)]
pub struct Chunk<'a> {
    /// Chunk kind.
    pub ty: ChunkType,
    /// Payload bytes, header excluded.
    pub payload: &'a [u8],
}

/// Reads one chunk from the front of `input`, advancing past it.
pub fn read_chunk<'a>(input: &mut &'a [u8]) -> Result<Chunk<'a>, EncodingError> {
    if input.len() < CHUNK_HEADER_LEN {
        return Err(EncodingError::Truncated {
            what: "chunk header",
            needed: CHUNK_HEADER_LEN,
            remaining: input.len(),
        });
    }

    let mut header = &input[..CHUNK_HEADER_LEN];
    let ty = ChunkType::from_tag(header.get_u16_le())?;
    let header_size = header.get_u16_le() as usize;
    let total_size = header.get_u32_le() as usize;

    if header_size != CHUNK_HEADER_LEN || total_size < CHUNK_HEADER_LEN {
        return Err(EncodingError::Truncated {
            what: "chunk header",
            needed: CHUNK_HEADER_LEN,
            remaining: header_size.min(total_size),
        });
    }
    if input.len() < total_size {
        return Err(EncodingError::Truncated {
            what: "chunk payload",
            needed: total_size,
            remaining: input.len(),
        });
    }

    let payload = &input[CHUNK_HEADER_LEN..total_size];
    *input = &input[total_size..];
    Ok(Chunk { ty, payload })
}

/// Reads one chunk and requires it to be of kind `expected`.
pub fn expect_chunk<'a>(
    input: &mut &'a [u8],
    expected: ChunkType,
) -> Result<&'a [u8], EncodingError> {
    let chunk = read_chunk(input)?;
    if chunk.ty != expected {
        return Err(EncodingError::UnexpectedChunk {
            expected: expected.name(),
            found: chunk.ty.name(),
        });
    }
    Ok(chunk.payload)
}

/// Longest string record the pool can hold, in bytes.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// A deduplicated, index-referenced UTF-8 string pool.
///
/// Strings are referenced by `u16` index everywhere in the package format;
/// the pool rejects growth past that index space. Payload layout: a `u32`
/// count, a `u32` offset per string (relative to the data area), then
/// length-prefixed string records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringPool {
    strings: Vec<String>,
    index: HashMap<String, u16>,
}

impl StringPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `value`, returning its index. Repeated values share one slot.
    pub fn intern(&mut self, value: &str) -> Result<u16, EncodingError> {
        if let Some(&idx) = self.index.get(value) {
            return Ok(idx);
        }
        if value.len() > MAX_STRING_LEN {
            return Err(EncodingError::StringTooLong {
                len: value.len(),
                max: MAX_STRING_LEN,
            });
        }
        if self.strings.len() > u16::MAX as usize {
            return Err(EncodingError::StringPoolOverflow {
                count: self.strings.len() + 1,
            });
        }
        let idx = self.strings.len() as u16;
        self.strings.push(value.to_string());
        self.index.insert(value.to_string(), idx);
        Ok(idx)
    }

    /// Returns the string at `idx`.
    pub fn get(&self, idx: u16) -> Result<&str, EncodingError> {
        self.strings
            .get(idx as usize)
            .map(String::as_str)
            .ok_or(EncodingError::InvalidStringIndex {
                index: idx,
                len: self.strings.len(),
            })
    }

    /// Number of pooled strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Encodes the pool as a complete string-pool chunk appended to `out`.
    pub fn encode(&self, out: &mut BytesMut) -> Result<(), EncodingError> {
        let mut data = BytesMut::new();
        let mut offsets = Vec::with_capacity(self.strings.len());
        for s in &self.strings {
            offsets.push(data.len() as u32);
            data.put_u16_le(s.len() as u16);
            data.put_slice(s.as_bytes());
        }

        let mut payload = BytesMut::with_capacity(4 + offsets.len() * 4 + data.len());
        payload.put_u32_le(self.strings.len() as u32);
        for off in offsets {
            payload.put_u32_le(off);
        }
        payload.put_slice(&data);

        write_chunk(out, ChunkType::StringPool, &payload)
    }

    /// Decodes a string-pool chunk from the front of `input`.
    pub fn decode(input: &mut &[u8]) -> Result<Self, EncodingError> {
        let mut payload = expect_chunk(input, ChunkType::StringPool)?;
        if payload.len() < 4 {
            return Err(EncodingError::Truncated {
                what: "string pool count",
                needed: 4,
                remaining: payload.len(),
            });
        }
        let count = payload.get_u32_le() as usize;
        if count > u16::MAX as usize + 1 {
            return Err(EncodingError::StringPoolOverflow { count });
        }
        if payload.len() < count * 4 {
            return Err(EncodingError::Truncated {
                what: "string pool offsets",
                needed: count * 4,
                remaining: payload.len(),
            });
        }
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(payload.get_u32_le() as usize);
        }

        let data = payload;
        let mut pool = StringPool::new();
        for off in offsets {
            if data.len() < off + 2 {
                return Err(EncodingError::Truncated {
                    what: "string record",
                    needed: off + 2,
                    remaining: data.len(),
                });
            }
            let len = u16::from_le_bytes([data[off], data[off + 1]]) as usize;
            let start = off + 2;
            let end = start + len;
            if data.len() < end {
                return Err(EncodingError::Truncated {
                    what: "string record",
                    needed: end,
                    remaining: data.len(),
                });
            }
            let value = std::str::from_utf8(&data[start..end]).map_err(|_| {
                EncodingError::Truncated {
                    what: "utf-8 string record",
                    needed: len,
                    remaining: len,
                }
            })?;
            if pool.index.contains_key(value) {
                return Err(EncodingError::DuplicatePoolString {
                    value: value.to_string(),
                });
            }
            pool.intern(value)?;
        }
        Ok(pool)
    }
}

/// A manifest or layout attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValue {
    /// Index into the enclosing chunk's string pool.
    Str(u16),
    /// Literal unsigned integer.
    Int(u32),
    /// Literal boolean.
    Bool(bool),
}

impl AttrValue {
    const KIND_STR: u8 = 0;
    const KIND_INT: u8 = 1;
    const KIND_BOOL: u8 = 2;

    /// Appends the 5-byte wire form: a kind byte and a `u32` raw value.
    pub fn encode(self, out: &mut BytesMut) {
        match self {
            AttrValue::Str(idx) => {
                out.put_u8(Self::KIND_STR);
                out.put_u32_le(u32::from(idx));
            }
            AttrValue::Int(v) => {
                out.put_u8(Self::KIND_INT);
                out.put_u32_le(v);
            }
            AttrValue::Bool(v) => {
                out.put_u8(Self::KIND_BOOL);
                out.put_u32_le(u32::from(v));
            }
        }
    }

    /// Reads the wire form, validating string indices against `pool`.
    pub fn decode(input: &mut &[u8], pool: &StringPool) -> Result<Self, EncodingError> {
        if input.len() < 5 {
            return Err(EncodingError::Truncated {
                what: "attribute value",
                needed: 5,
                remaining: input.len(),
            });
        }
        let kind = input.get_u8();
        let raw = input.get_u32_le();
        match kind {
            Self::KIND_STR => {
                let idx = raw as u16;
                pool.get(idx)?;
                Ok(AttrValue::Str(idx))
            }
            Self::KIND_INT => Ok(AttrValue::Int(raw)),
            Self::KIND_BOOL => Ok(AttrValue::Bool(raw != 0)),
            _ => Err(EncodingError::UnknownChunkTag { tag: u16::from(kind) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_declared_size_equals_serialized_length() {
        let mut out = BytesMut::new();
        write_chunk(&mut out, ChunkType::Manifest, b"payload").expect("encode");
        assert_eq!(out.len(), CHUNK_HEADER_LEN + 7);

        let mut input = &out[..];
        let chunk = read_chunk(&mut input).expect("decode");
        assert_eq!(chunk.ty, ChunkType::Manifest);
        assert_eq!(chunk.payload, b"payload");
        assert!(input.is_empty());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut out = BytesMut::new();
        out.put_u16_le(0xBEEF);
        out.put_u16_le(CHUNK_HEADER_LEN as u16);
        out.put_u32_le(CHUNK_HEADER_LEN as u32);
        let mut input = &out[..];
        assert!(matches!(
            read_chunk(&mut input),
            Err(EncodingError::UnknownChunkTag { tag: 0xBEEF })
        ));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut out = BytesMut::new();
        write_chunk(&mut out, ChunkType::Layout, &[0u8; 16]).expect("encode");
        let mut input = &out[..out.len() - 1];
        assert!(matches!(
            read_chunk(&mut input),
            Err(EncodingError::Truncated { .. })
        ));
    }

    #[test]
    fn string_pool_round_trips_and_dedupes() {
        let mut pool = StringPool::new();
        let a = pool.intern("com.acme.shop").expect("intern");
        let b = pool.intern("My Store").expect("intern");
        let a2 = pool.intern("com.acme.shop").expect("intern");
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);

        let mut encoded = BytesMut::new();
        pool.encode(&mut encoded).expect("encode");

        let mut input = &encoded[..];
        let decoded = StringPool::decode(&mut input).expect("decode");
        assert!(input.is_empty());
        assert_eq!(decoded, pool);

        // Idempotence: re-encoding the decoded pool is byte-identical.
        let mut reencoded = BytesMut::new();
        decoded.encode(&mut reencoded).expect("re-encode");
        assert_eq!(encoded, reencoded);
    }

    #[test]
    fn string_pool_rejects_oversized_record() {
        let mut pool = StringPool::new();
        let huge = "x".repeat(MAX_STRING_LEN + 1);
        assert!(matches!(
            pool.intern(&huge),
            Err(EncodingError::StringTooLong { .. })
        ));
    }

    #[test]
    fn attr_values_round_trip() {
        let mut pool = StringPool::new();
        let idx = pool.intern("value").expect("intern");

        for value in [AttrValue::Str(idx), AttrValue::Int(1234), AttrValue::Bool(true)] {
            let mut out = BytesMut::new();
            value.encode(&mut out);
            let mut input = &out[..];
            assert_eq!(AttrValue::decode(&mut input, &pool).expect("decode"), value);
            assert!(input.is_empty());
        }
    }

    #[test]
    fn attr_value_rejects_dangling_string_index() {
        let pool = StringPool::new();
        let mut out = BytesMut::new();
        AttrValue::Str(3).encode(&mut out);
        let mut input = &out[..];
        assert!(matches!(
            AttrValue::decode(&mut input, &pool),
            Err(EncodingError::InvalidStringIndex { index: 3, .. })
        ));
    }
}
