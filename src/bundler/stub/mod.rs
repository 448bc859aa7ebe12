//! Executable code stub generation.
//!
//! Emits the minimal executable-code container the package installs: one
//! activity class, named from the package identifier, that hosts a
//! full-screen content view pointed at the store's API base URL.
//!
//! Container layout: a fixed 56-byte header (magic, SHA-1 body checksum,
//! file size, and offset/count pairs for the string, type, and method
//! sections) followed by the three sections, contiguous and in ascending
//! offset order. [`verify`] re-parses a container and checks every declared
//! invariant; [`generate`] never returns bytes that fail it.

use crate::bundler::error::EncodingError;
use crate::bundler::spec::PackageSpec;
use bytes::{Buf, BufMut, BytesMut};
use sha1::{Digest, Sha1};

/// Archive entry name of the code stub.
pub const CODE_ENTRY: &str = "classes.bin";

/// Container magic, format version included.
pub const MAGIC: [u8; 8] = *b"SFC\n001\0";

/// Fixed header length.
pub const HEADER_LEN: usize = 56;

const SHA1_LEN: usize = 20;

/// Longest string record the string section can hold.
const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Superclass of the generated activity.
const ACTIVITY_BASE: &str = "platform.app.Activity";

/// View class hosting the storefront content.
const CONTENT_VIEW: &str = "platform.widget.ContentWebView";

const OP_RETURN: u16 = 0x0000;
const OP_CONST_URL: u16 = 0x0001;
const OP_NEW_VIEW: u16 = 0x0002;
const OP_INVOKE: u16 = 0x0003;

/// Parsed summary of a verified code container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubSummary {
    /// Fully qualified activity class the container defines.
    pub activity_class: String,
    /// URL the activity's content view loads.
    pub content_url: String,
    /// Number of string records.
    pub string_count: usize,
    /// Number of method records.
    pub method_count: usize,
}

/// Generates the code container for a validated spec.
pub fn generate(spec: &PackageSpec) -> Result<Vec<u8>, EncodingError> {
    let activity = spec.activity_class();
    let url = spec.api_base_url().to_string();

    let mut strings: Vec<String> = Vec::new();
    let mut intern = |value: &str, strings: &mut Vec<String>| -> Result<u16, EncodingError> {
        if value.len() > MAX_STRING_LEN {
            return Err(EncodingError::StringTooLong {
                len: value.len(),
                max: MAX_STRING_LEN,
            });
        }
        if let Some(idx) = strings.iter().position(|s| s == value) {
            return Ok(idx as u16);
        }
        strings.push(value.to_string());
        Ok((strings.len() - 1) as u16)
    };

    let activity_idx = intern(&activity, &mut strings)?;
    let base_idx = intern(ACTIVITY_BASE, &mut strings)?;
    let view_idx = intern(CONTENT_VIEW, &mut strings)?;
    let on_create_idx = intern("onCreate", &mut strings)?;
    let load_idx = intern("loadStorefront", &mut strings)?;
    let url_idx = intern(&url, &mut strings)?;

    // Type table: activity class, its base, and the hosted view class.
    let types: Vec<u16> = vec![activity_idx, base_idx, view_idx];
    let type_activity: u16 = 0;
    let type_view: u16 = 2;

    let methods: Vec<(u16, u16, Vec<(u16, u16)>)> = vec![
        (
            type_activity,
            on_create_idx,
            vec![
                (OP_CONST_URL, url_idx),
                (OP_NEW_VIEW, type_view),
                (OP_INVOKE, 1),
                (OP_RETURN, 0),
            ],
        ),
        (type_activity, load_idx, vec![(OP_RETURN, 0)]),
    ];

    let mut body = BytesMut::new();
    let string_off = HEADER_LEN as u32;
    for s in &strings {
        body.put_u16_le(s.len() as u16);
        body.put_slice(s.as_bytes());
    }
    let type_off = HEADER_LEN as u32 + body.len() as u32;
    for &t in &types {
        body.put_u16_le(t);
    }
    let method_off = HEADER_LEN as u32 + body.len() as u32;
    for (class_idx, name_idx, insns) in &methods {
        body.put_u16_le(*class_idx);
        body.put_u16_le(*name_idx);
        body.put_u16_le(insns.len() as u16);
        for (op, operand) in insns {
            body.put_u16_le(*op);
            body.put_u16_le(*operand);
        }
    }

    let file_size = HEADER_LEN + body.len();
    let checksum = Sha1::digest(&body);

    let mut out = BytesMut::with_capacity(file_size);
    out.put_slice(&MAGIC);
    out.put_slice(checksum.as_slice());
    out.put_u32_le(file_size as u32);
    out.put_u32_le(string_off);
    out.put_u32_le(strings.len() as u32);
    out.put_u32_le(type_off);
    out.put_u32_le(types.len() as u32);
    out.put_u32_le(method_off);
    out.put_u32_le(methods.len() as u32);
    out.put_slice(&body);

    let bytes = out.to_vec();
    verify(&bytes)?;
    Ok(bytes)
}

/// Re-parses a code container and checks its declared invariants: magic,
/// body checksum, section bounds and ordering, and index validity.
pub fn verify(bytes: &[u8]) -> Result<StubSummary, EncodingError> {
    if bytes.len() < HEADER_LEN {
        return Err(EncodingError::Truncated {
            what: "code container header",
            needed: HEADER_LEN,
            remaining: bytes.len(),
        });
    }

    let mut header = &bytes[..HEADER_LEN];
    let mut magic = [0u8; 8];
    header.copy_to_slice(&mut magic);
    if magic != MAGIC {
        return Err(EncodingError::ChecksumMismatch {
            what: "code container magic",
        });
    }

    let mut declared_checksum = [0u8; SHA1_LEN];
    header.copy_to_slice(&mut declared_checksum);
    let file_size = header.get_u32_le();
    let string_off = header.get_u32_le();
    let string_count = header.get_u32_le() as usize;
    let type_off = header.get_u32_le();
    let type_count = header.get_u32_le() as usize;
    let method_off = header.get_u32_le();
    let method_count = header.get_u32_le() as usize;

    if file_size as usize != bytes.len() {
        return Err(EncodingError::SectionOutOfBounds {
            section: "file",
            offset: file_size,
            file_size: bytes.len() as u32,
        });
    }

    let actual = Sha1::digest(&bytes[HEADER_LEN..]);
    if actual.as_slice() != declared_checksum {
        return Err(EncodingError::ChecksumMismatch {
            what: "code container body",
        });
    }

    // Sections must be contiguous and ascending: strings, types, methods.
    if string_off as usize != HEADER_LEN {
        return Err(EncodingError::SectionOutOfBounds {
            section: "strings",
            offset: string_off,
            file_size,
        });
    }

    let mut cursor = &bytes[HEADER_LEN..];
    let mut strings = Vec::with_capacity(string_count);
    for _ in 0..string_count {
        if cursor.len() < 2 {
            return Err(EncodingError::Truncated {
                what: "code string record",
                needed: 2,
                remaining: cursor.len(),
            });
        }
        let len = cursor.get_u16_le() as usize;
        if cursor.len() < len {
            return Err(EncodingError::Truncated {
                what: "code string record",
                needed: len,
                remaining: cursor.len(),
            });
        }
        let value = std::str::from_utf8(&cursor[..len]).map_err(|_| {
            EncodingError::Truncated {
                what: "utf-8 code string",
                needed: len,
                remaining: len,
            }
        })?;
        strings.push(value.to_string());
        cursor.advance(len);
    }

    let strings_end = bytes.len() - cursor.len();
    if type_off as usize != strings_end {
        return Err(EncodingError::SectionOutOfBounds {
            section: "types",
            offset: type_off,
            file_size,
        });
    }
    let mut types = Vec::with_capacity(type_count);
    for _ in 0..type_count {
        if cursor.len() < 2 {
            return Err(EncodingError::Truncated {
                what: "code type record",
                needed: 2,
                remaining: cursor.len(),
            });
        }
        let idx = cursor.get_u16_le();
        if idx as usize >= strings.len() {
            return Err(EncodingError::InvalidStringIndex {
                index: idx,
                len: strings.len(),
            });
        }
        types.push(idx);
    }

    let types_end = bytes.len() - cursor.len();
    if method_off as usize != types_end {
        return Err(EncodingError::SectionOutOfBounds {
            section: "methods",
            offset: method_off,
            file_size,
        });
    }
    let mut content_url = None;
    for _ in 0..method_count {
        if cursor.len() < 6 {
            return Err(EncodingError::Truncated {
                what: "code method record",
                needed: 6,
                remaining: cursor.len(),
            });
        }
        let class_idx = cursor.get_u16_le() as usize;
        let name_idx = cursor.get_u16_le();
        let insn_count = cursor.get_u16_le() as usize;
        if class_idx >= types.len() {
            return Err(EncodingError::SectionOutOfBounds {
                section: "methods",
                offset: class_idx as u32,
                file_size,
            });
        }
        if name_idx as usize >= strings.len() {
            return Err(EncodingError::InvalidStringIndex {
                index: name_idx,
                len: strings.len(),
            });
        }
        for _ in 0..insn_count {
            if cursor.len() < 4 {
                return Err(EncodingError::Truncated {
                    what: "code instruction",
                    needed: 4,
                    remaining: cursor.len(),
                });
            }
            let op = cursor.get_u16_le();
            let operand = cursor.get_u16_le();
            let valid = match op {
                OP_RETURN => true,
                OP_CONST_URL => {
                    if (operand as usize) < strings.len() {
                        content_url = Some(strings[operand as usize].clone());
                        true
                    } else {
                        false
                    }
                }
                OP_NEW_VIEW => (operand as usize) < types.len(),
                OP_INVOKE => (operand as usize) < method_count,
                _ => false,
            };
            if !valid {
                return Err(EncodingError::SectionOutOfBounds {
                    section: "instructions",
                    offset: u32::from(operand),
                    file_size,
                });
            }
        }
    }

    if !cursor.is_empty() {
        return Err(EncodingError::SectionOutOfBounds {
            section: "trailing bytes",
            offset: (bytes.len() - cursor.len()) as u32,
            file_size,
        });
    }

    let activity_class = strings
        .get(types.first().copied().unwrap_or_default() as usize)
        .cloned()
        .unwrap_or_default();
    let content_url = content_url.ok_or(EncodingError::BadAttribute {
        name: "content_url",
        problem: "is missing",
    })?;

    Ok(StubSummary {
        activity_class,
        content_url,
        string_count: strings.len(),
        method_count,
    })
}
