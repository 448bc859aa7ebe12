//! Digest and signature engine.
//!
//! The trust boundary of the assembler: computes genuine SHA-256 content
//! digests for every archived entry, renders the digest manifest and
//! signature file, and signs the chain with a configuration-supplied
//! Ed25519 identity. A failure anywhere here aborts the build; an unsigned
//! artifact is never emitted.

pub mod digest;
mod signer;

pub use digest::DigestManifest;
pub use signer::{sign_entries, verify_archive, SignatureBlock, SignedData};

use crate::bundler::error::SigningError;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Archive entry name of the digest manifest.
pub const MANIFEST_NAME: &str = "META-INF/MANIFEST.MF";

/// Archive entry name of the signature file.
pub const SIGNATURE_FILE_NAME: &str = "META-INF/CERT.SF";

/// Archive entry name of the signed-data block.
pub const SIGNED_DATA_NAME: &str = "META-INF/CERT.SIG";

/// Prefix shared by all signature entries; content digests skip it.
pub const META_INF_PREFIX: &str = "META-INF/";

/// Signature algorithm recorded in the signed-data block.
pub const SIGNATURE_ALGORITHM: &str = "Ed25519";

pub(crate) fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Certificate naming a signing identity: subject, serial, and the Ed25519
/// public key (base64).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Subject the platform issued the certificate to.
    pub subject: String,
    /// Serial derived from the public key fingerprint.
    pub serial: String,
    /// Base64-encoded Ed25519 public key.
    pub public_key: String,
}

impl Certificate {
    /// Decodes the certified public key.
    pub fn verifying_key(&self) -> Result<VerifyingKey, SigningError> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(&self.public_key)
            .map_err(|e| SigningError::InvalidKey {
                reason: format!("certificate public key is not valid base64: {e}"),
            })?;
        let raw: [u8; 32] = raw.try_into().map_err(|_| SigningError::InvalidKey {
            reason: "certificate public key must be 32 bytes".to_string(),
        })?;
        VerifyingKey::from_bytes(&raw).map_err(|e| SigningError::InvalidKey {
            reason: format!("certificate public key rejected: {e}"),
        })
    }
}

/// A configured signing identity: Ed25519 keypair plus its certificate.
///
/// Supplied through configuration by the surrounding platform; this
/// subsystem never generates one.
pub struct SigningIdentity {
    signing_key: SigningKey,
    certificate: Certificate,
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("signing_key", &"<SigningKey>")
            .field("certificate", &self.certificate)
            .finish()
    }
}

impl SigningIdentity {
    /// Builds an identity from a raw 32-byte seed and a certificate subject.
    pub fn from_seed(seed: [u8; 32], subject: &str) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let public_key = signing_key.verifying_key().to_bytes();
        let certificate = Certificate {
            subject: subject.to_string(),
            serial: hex::encode(&public_key[..8]),
            public_key: base64::engine::general_purpose::STANDARD.encode(public_key),
        };
        Self {
            signing_key,
            certificate,
        }
    }

    /// Builds an identity from configuration: a base64-encoded seed, the
    /// way deployment environments inject certificate material.
    pub fn from_config(seed_b64: &str, subject: &str) -> Result<Self, SigningError> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(seed_b64.trim())
            .map_err(|e| SigningError::InvalidKey {
                reason: format!("signing key is not valid base64: {e}"),
            })?;
        let seed: [u8; 32] = raw.try_into().map_err(|_| SigningError::InvalidKey {
            reason: "signing key seed must be 32 bytes".to_string(),
        })?;
        Ok(Self::from_seed(seed, subject))
    }

    /// Returns the identity's certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub(crate) fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}
