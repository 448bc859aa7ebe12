//! Digest manifest document.
//!
//! Lists one SHA-256 digest per archived content entry in a JAR-style text
//! form: a version header, then one named section per entry, sections
//! separated by blank lines, CRLF endings throughout. The manifest's own
//! digest anchors the signature chain.

use super::{sha256, META_INF_PREFIX};
use crate::bundler::archive::ArchiveEntry;
use crate::bundler::error::SigningError;
use base64::Engine;

const VERSION_HEADER: &str = "Manifest-Version: 1.0";
const CREATED_BY_HEADER: &str = "Created-By: storeforge";

/// Ordered (entry name, content digest) pairs for every content entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestManifest {
    entries: Vec<(String, [u8; 32])>,
}

impl DigestManifest {
    /// Digests every content entry, skipping the signature entries
    /// themselves. Digests are recomputed from the entry bytes on every
    /// call; nothing is cached.
    pub fn from_entries(entries: &[ArchiveEntry]) -> Self {
        let entries = entries
            .iter()
            .filter(|e| !e.name.starts_with(META_INF_PREFIX))
            .map(|e| (e.name.clone(), sha256(&e.bytes)))
            .collect();
        Self { entries }
    }

    /// Entries in manifest order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u8; 32])> {
        self.entries.iter().map(|(name, d)| (name.as_str(), d))
    }

    /// Digest recorded for `name`, if present.
    pub fn entry_digest(&self, name: &str) -> Option<&[u8; 32]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
    }

    /// Number of listed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest lists no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the manifest document.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(VERSION_HEADER);
        out.push_str("\r\n");
        out.push_str(CREATED_BY_HEADER);
        out.push_str("\r\n\r\n");
        for (name, digest) in &self.entries {
            out.push_str(&section_text(name, digest));
        }
        out.into_bytes()
    }

    /// The digest-of-digests anchoring the signature: SHA-256 of the full
    /// serialized manifest.
    pub fn digest(&self) -> [u8; 32] {
        sha256(&self.to_bytes())
    }

    /// Parses a serialized manifest document.
    pub fn parse(bytes: &[u8]) -> Result<Self, SigningError> {
        let text = std::str::from_utf8(bytes).map_err(|e| SigningError::Malformed {
            what: "digest manifest",
            reason: format!("not UTF-8: {e}"),
        })?;

        let mut sections = text.split("\r\n\r\n");
        let header = sections.next().unwrap_or_default();
        if !header.starts_with(VERSION_HEADER) {
            return Err(SigningError::Malformed {
                what: "digest manifest",
                reason: "missing Manifest-Version header".to_string(),
            });
        }

        let mut entries = Vec::new();
        for section in sections.filter(|s| !s.is_empty()) {
            entries.push(parse_section(section)?);
        }
        Ok(Self { entries })
    }
}

/// One manifest section, trailing blank line included. The signature file
/// digests these bytes per entry.
pub(super) fn section_text(name: &str, digest: &[u8; 32]) -> String {
    format!(
        "Name: {name}\r\nSHA-256-Digest: {}\r\n\r\n",
        base64::engine::general_purpose::STANDARD.encode(digest)
    )
}

pub(super) fn parse_section(section: &str) -> Result<(String, [u8; 32]), SigningError> {
    let mut name = None;
    let mut digest = None;
    for line in section.split("\r\n").filter(|l| !l.is_empty()) {
        if let Some(value) = line.strip_prefix("Name: ") {
            name = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("SHA-256-Digest: ") {
            let raw = base64::engine::general_purpose::STANDARD
                .decode(value)
                .map_err(|e| SigningError::Malformed {
                    what: "digest manifest",
                    reason: format!("bad digest encoding: {e}"),
                })?;
            let raw: [u8; 32] = raw.try_into().map_err(|_| SigningError::Malformed {
                what: "digest manifest",
                reason: "digest must be 32 bytes".to_string(),
            })?;
            digest = Some(raw);
        } else {
            return Err(SigningError::Malformed {
                what: "digest manifest",
                reason: format!("unexpected line {line:?}"),
            });
        }
    }
    match (name, digest) {
        (Some(name), Some(digest)) => Ok((name, digest)),
        _ => Err(SigningError::Malformed {
            what: "digest manifest",
            reason: "section missing Name or SHA-256-Digest".to_string(),
        }),
    }
}
