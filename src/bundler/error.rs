//! Error types for the package build pipeline.
//!
//! Every pipeline component returns one of the typed failures defined here;
//! the orchestrator wraps them with the [`BuildStage`] that produced them and
//! never downgrades one class into another.

use std::path::Path;
use thiserror::Error;

use super::builder::BuildStage;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the build pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// A build-request field failed validation. Recoverable: the caller may
    /// retry with corrected input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A resource or code stub could not be represented within format
    /// constraints. Recoverable by shrinking the input.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// No usable signing identity, or signature production failed.
    /// A configuration issue; never retried automatically.
    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    /// Archive or publish I/O failure. May be transient; the caller may
    /// retry the whole build.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP container failure while assembling or reading the archive.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A component failure tagged with the pipeline stage that produced it.
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// Stage that was executing when the failure occurred.
        stage: BuildStage,
        /// The component failure, untouched.
        source: Box<Error>,
    },

    /// Generic errors that don't fit the taxonomy above.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// Whether the caller may usefully retry after this error.
    ///
    /// Validation and encoding failures are fixable by correcting the input;
    /// I/O failures may be transient. Signing failures are configuration
    /// problems and are never retried automatically.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Validation(_) | Error::Encoding(_) | Error::Io(_) | Error::Archive(_) => true,
            Error::Signing(_) | Error::GenericError(_) => false,
            Error::Stage { source, .. } => source.is_recoverable(),
        }
    }

    /// The pipeline stage recorded on this error, if any.
    pub fn stage(&self) -> Option<BuildStage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// A build-request field rejected by the request validator.
#[derive(Error, Debug)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// Name of the offending request field.
    pub field: &'static str,
    /// Human-readable rejection reason.
    pub reason: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// A value that cannot be represented within the binary format constraints.
#[derive(Error, Debug)]
pub enum EncodingError {
    /// String pool exhausted its index space.
    #[error("string pool overflow: {count} strings exceeds the u16 index space")]
    StringPoolOverflow {
        /// Number of strings the pool would need to hold.
        count: usize,
    },

    /// A single string exceeds the length-prefix limit.
    #[error("string of {len} bytes exceeds the {max}-byte record limit")]
    StringTooLong {
        /// Byte length of the offending string.
        len: usize,
        /// Maximum representable byte length.
        max: usize,
    },

    /// Chunk payload larger than the declared-size field can express.
    #[error("chunk payload of {len} bytes exceeds the u32 size field")]
    ChunkTooLarge {
        /// Payload length in bytes.
        len: usize,
    },

    /// Input ended before the declared structure was complete.
    #[error("truncated {what}: needed {needed} bytes, had {remaining}")]
    Truncated {
        /// Structure being decoded.
        what: &'static str,
        /// Bytes the structure required.
        needed: usize,
        /// Bytes actually available.
        remaining: usize,
    },

    /// Wire tag does not name a known chunk kind.
    #[error("unknown chunk tag 0x{tag:04x}")]
    UnknownChunkTag {
        /// The unrecognized tag value.
        tag: u16,
    },

    /// Chunk of the wrong kind where another was required.
    #[error("expected {expected} chunk, found {found}")]
    UnexpectedChunk {
        /// Kind the decoder required.
        expected: &'static str,
        /// Kind actually present.
        found: &'static str,
    },

    /// Attribute tag not part of the manifest grammar.
    #[error("unknown attribute id 0x{id:04x}")]
    UnknownAttribute {
        /// The unrecognized attribute id.
        id: u32,
    },

    /// A required attribute is absent or duplicated.
    #[error("manifest attribute {name} {problem}")]
    BadAttribute {
        /// Attribute name.
        name: &'static str,
        /// What is wrong with it.
        problem: &'static str,
    },

    /// String-pool index outside the pool.
    #[error("string index {index} out of range for pool of {len}")]
    InvalidStringIndex {
        /// The out-of-range index.
        index: u16,
        /// Pool length.
        len: usize,
    },

    /// Pool contains the same string twice; pools are deduplicated by
    /// construction.
    #[error("duplicate string pool entry {value:?}")]
    DuplicatePoolString {
        /// The repeated string.
        value: String,
    },

    /// Two resources registered under the same name.
    #[error("duplicate resource {name:?}")]
    DuplicateResource {
        /// The repeated resource name.
        name: String,
    },

    /// A resource the manifest or code stub references is missing from the
    /// set.
    #[error("missing required resource {name:?}")]
    MissingResource {
        /// The absent resource name.
        name: String,
    },

    /// Code container section outside the buffer or overlapping a neighbor.
    #[error("code container section {section} out of bounds: offset {offset}, file size {file_size}")]
    SectionOutOfBounds {
        /// Section name.
        section: &'static str,
        /// Declared offset.
        offset: u32,
        /// Container size.
        file_size: u32,
    },

    /// Declared checksum does not match recomputed content.
    #[error("{what} checksum mismatch")]
    ChecksumMismatch {
        /// Structure whose checksum failed.
        what: &'static str,
    },

    /// Icon rendering failure.
    #[error("icon encoding failed: {0}")]
    Icon(#[from] image::ImageError),

    /// Signed-data container could not be serialized.
    #[error("signed-data serialization failed: {0}")]
    SignedData(#[from] serde_json::Error),
}

/// Signing identity or signature production failure.
#[derive(Error, Debug)]
pub enum SigningError {
    /// No signing identity configured for this build.
    #[error("no signing identity configured")]
    MissingIdentity,

    /// Key material rejected while loading the identity.
    #[error("invalid signing key: {reason}")]
    InvalidKey {
        /// Why the key was rejected.
        reason: String,
    },

    /// Signature verification failed against the paired certificate.
    #[error("signature does not verify against certificate {subject:?}")]
    BadSignature {
        /// Certificate subject the verification used.
        subject: String,
    },

    /// An archive entry's content digest does not match the digest manifest.
    #[error("digest mismatch for entry {name:?}")]
    DigestMismatch {
        /// Entry whose recomputed digest differs.
        name: String,
    },

    /// A signature-chain entry is absent from the archive.
    #[error("archive is missing signature entry {name:?}")]
    MissingEntry {
        /// The absent entry name.
        name: String,
    },

    /// Digest manifest or signature file text could not be parsed.
    #[error("malformed {what}: {reason}")]
    Malformed {
        /// Document being parsed.
        what: &'static str,
        /// Parse failure detail.
        reason: String,
    },
}

/// Extension trait for annotating filesystem errors with the action and path.
pub trait ErrorExt<T> {
    /// Wraps an I/O error with what was being done and to which path.
    fn fs_context(self, action: &str, path: &Path) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, action: &str, path: &Path) -> Result<T> {
        self.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{action} {}: {e}", path.display()),
            ))
        })
    }
}

/// Returns early with a [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)).into())
    };
}
