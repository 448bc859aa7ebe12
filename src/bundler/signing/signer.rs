//! Signature file and signed-data block.
//!
//! The chain: every content entry is digested into the manifest
//! (`MANIFEST.MF`); the signature file (`CERT.SF`) digests the whole
//! manifest and each of its sections; the signed-data block (`CERT.SIG`)
//! carries an Ed25519 signature over the signature-file bytes together
//! with the certificate that verifies it. [`verify_archive`] walks the
//! chain in reverse and is the check the platform's install path runs.

use super::digest::{section_text, DigestManifest};
use super::{
    sha256, Certificate, SigningIdentity, MANIFEST_NAME, META_INF_PREFIX, SIGNATURE_ALGORITHM,
    SIGNATURE_FILE_NAME, SIGNED_DATA_NAME,
};
use crate::bundler::archive::ArchiveEntry;
use crate::bundler::error::{EncodingError, Error, Result, SigningError};
use base64::Engine;
use ed25519_dalek::{Signature, Verifier};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

const SF_VERSION_HEADER: &str = "Signature-Version: 1.0";
const SF_MANIFEST_DIGEST: &str = "SHA-256-Digest-Manifest: ";

/// The serialized signed-data container: certificate plus signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedData {
    /// Container format version.
    pub version: u32,
    /// Signature algorithm name.
    pub algorithm: String,
    /// Certificate naming the signer.
    pub certificate: Certificate,
    /// Base64-encoded signature over the signature-file bytes.
    pub signature: String,
}

/// The three signature entries appended to the archive.
#[derive(Debug, Clone)]
pub struct SignatureBlock {
    /// `META-INF/MANIFEST.MF` bytes.
    pub manifest: Vec<u8>,
    /// `META-INF/CERT.SF` bytes.
    pub signature_file: Vec<u8>,
    /// `META-INF/CERT.SIG` bytes.
    pub signed_data: Vec<u8>,
}

/// Digests the finalized content entries and signs the chain.
///
/// Fails with [`SigningError::MissingIdentity`] when no identity is
/// configured; the orchestrator aborts the build rather than emit an
/// unsigned artifact.
pub fn sign_entries(
    entries: &[ArchiveEntry],
    identity: Option<&SigningIdentity>,
) -> Result<SignatureBlock> {
    let identity = identity.ok_or(SigningError::MissingIdentity)?;

    let manifest = DigestManifest::from_entries(entries);
    let manifest_bytes = manifest.to_bytes();
    let signature_file = render_signature_file(&manifest);
    let signature = identity.sign(&signature_file);

    let signed = SignedData {
        version: 1,
        algorithm: SIGNATURE_ALGORITHM.to_string(),
        certificate: identity.certificate().clone(),
        signature: base64::engine::general_purpose::STANDARD.encode(signature.to_bytes()),
    };
    let signed_data = serde_json::to_vec_pretty(&signed).map_err(EncodingError::SignedData)?;

    log::debug!(
        "signed {} content entries as {}",
        manifest.len(),
        identity.certificate().subject
    );

    Ok(SignatureBlock {
        manifest: manifest_bytes,
        signature_file,
        signed_data,
    })
}

fn render_signature_file(manifest: &DigestManifest) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(SF_VERSION_HEADER);
    out.push_str("\r\n");
    out.push_str(SF_MANIFEST_DIGEST);
    out.push_str(&base64::engine::general_purpose::STANDARD.encode(manifest.digest()));
    out.push_str("\r\n\r\n");
    for (name, digest) in manifest.entries() {
        let section_digest = sha256(section_text(name, digest).as_bytes());
        out.push_str(&section_text(name, &section_digest));
    }
    out.into_bytes()
}

/// Verifies a serialized archive's full signature chain and per-entry
/// content digests, returning the signer certificate on success.
pub fn verify_archive(bytes: &[u8]) -> Result<Certificate> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut entries: Vec<(String, Vec<u8>)> = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)?;
        entries.push((file.name().to_string(), content));
    }

    let manifest_bytes = entry_bytes(&entries, MANIFEST_NAME)?;
    let signature_file = entry_bytes(&entries, SIGNATURE_FILE_NAME)?;
    let signed_data = entry_bytes(&entries, SIGNED_DATA_NAME)?;

    let signed: SignedData =
        serde_json::from_slice(signed_data).map_err(|e| SigningError::Malformed {
            what: "signed-data block",
            reason: e.to_string(),
        })?;
    let key = signed.certificate.verifying_key()?;
    let raw_signature = base64::engine::general_purpose::STANDARD
        .decode(&signed.signature)
        .map_err(|e| SigningError::Malformed {
            what: "signed-data block",
            reason: format!("bad signature encoding: {e}"),
        })?;
    let raw_signature: [u8; 64] =
        raw_signature
            .try_into()
            .map_err(|_| SigningError::Malformed {
                what: "signed-data block",
                reason: "signature must be 64 bytes".to_string(),
            })?;
    let signature = Signature::from_bytes(&raw_signature);
    key.verify(signature_file, &signature)
        .map_err(|_| SigningError::BadSignature {
            subject: signed.certificate.subject.clone(),
        })?;

    let manifest = check_signature_file(signature_file, manifest_bytes)?;

    for (name, content) in entries.iter().filter(|(n, _)| !n.starts_with(META_INF_PREFIX)) {
        let recorded = manifest
            .entry_digest(name)
            .ok_or_else(|| SigningError::Malformed {
                what: "digest manifest",
                reason: format!("entry {name:?} is not listed"),
            })?;
        if *recorded != sha256(content) {
            return Err(SigningError::DigestMismatch { name: name.clone() }.into());
        }
    }
    for (name, _) in manifest.entries() {
        if !entries.iter().any(|(n, _)| n == name) {
            return Err(SigningError::MissingEntry {
                name: name.to_string(),
            }
            .into());
        }
    }

    Ok(signed.certificate)
}

/// Checks the signature file against the manifest it claims to digest and
/// returns the parsed manifest.
fn check_signature_file(signature_file: &[u8], manifest_bytes: &[u8]) -> Result<DigestManifest> {
    let text = std::str::from_utf8(signature_file).map_err(|e| SigningError::Malformed {
        what: "signature file",
        reason: format!("not UTF-8: {e}"),
    })?;

    let mut sections = text.split("\r\n\r\n");
    let header = sections.next().unwrap_or_default();
    if !header.starts_with(SF_VERSION_HEADER) {
        return Err(SigningError::Malformed {
            what: "signature file",
            reason: "missing Signature-Version header".to_string(),
        }
        .into());
    }
    let declared = header
        .lines()
        .find_map(|l| l.strip_prefix(SF_MANIFEST_DIGEST))
        .ok_or(SigningError::Malformed {
            what: "signature file",
            reason: "missing SHA-256-Digest-Manifest".to_string(),
        })?;
    let declared = base64::engine::general_purpose::STANDARD
        .decode(declared.trim_end())
        .map_err(|e| SigningError::Malformed {
            what: "signature file",
            reason: format!("bad manifest digest encoding: {e}"),
        })?;
    if declared != sha256(manifest_bytes) {
        return Err(SigningError::DigestMismatch {
            name: MANIFEST_NAME.to_string(),
        }
        .into());
    }

    let manifest = DigestManifest::parse(manifest_bytes)?;
    for section in sections.filter(|s| !s.is_empty()) {
        let (name, sf_digest) = super::digest::parse_section(section)?;
        let recorded = manifest
            .entry_digest(&name)
            .ok_or_else(|| SigningError::Malformed {
                what: "signature file",
                reason: format!("section {name:?} has no manifest entry"),
            })?;
        if sf_digest != sha256(section_text(&name, recorded).as_bytes()) {
            return Err(SigningError::DigestMismatch { name }.into());
        }
    }
    Ok(manifest)
}

fn entry_bytes<'a>(entries: &'a [(String, Vec<u8>)], name: &str) -> Result<&'a [u8]> {
    entries
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, b)| b.as_slice())
        .ok_or_else(|| {
            Error::from(SigningError::MissingEntry {
                name: name.to_string(),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::archive::{ArchiveBuilder, CompressionMode};

    fn identity() -> SigningIdentity {
        SigningIdentity::from_seed([42u8; 32], "CN=Acme Storefront")
    }

    fn signed_archive() -> Vec<u8> {
        let mut builder = ArchiveBuilder::new();
        builder
            .append("manifest.bin", vec![1, 2, 3], CompressionMode::Stored)
            .expect("append");
        builder
            .append("classes.bin", vec![4, 5, 6], CompressionMode::Stored)
            .expect("append");

        let block = sign_entries(builder.entries(), Some(&identity())).expect("sign");
        builder
            .append(MANIFEST_NAME, block.manifest, CompressionMode::Deflated)
            .expect("append");
        builder
            .append(SIGNATURE_FILE_NAME, block.signature_file, CompressionMode::Deflated)
            .expect("append");
        builder
            .append(SIGNED_DATA_NAME, block.signed_data, CompressionMode::Deflated)
            .expect("append");
        builder.write().expect("write")
    }

    #[test]
    fn missing_identity_aborts_signing() {
        let builder = ArchiveBuilder::new();
        let err = sign_entries(builder.entries(), None).expect_err("no identity");
        assert!(matches!(
            err,
            Error::Signing(SigningError::MissingIdentity)
        ));
    }

    #[test]
    fn signed_archive_verifies() {
        let bytes = signed_archive();
        let certificate = verify_archive(&bytes).expect("verify");
        assert_eq!(certificate.subject, "CN=Acme Storefront");
        assert_eq!(certificate, identity().certificate().clone());
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let mut builder = ArchiveBuilder::new();
        builder
            .append("manifest.bin", vec![1, 2, 3], CompressionMode::Stored)
            .expect("append");

        let block = sign_entries(builder.entries(), Some(&identity())).expect("sign");
        // Swap in a signed-data block produced by a different key over the
        // same signature file.
        let other = SigningIdentity::from_seed([9u8; 32], "CN=Mallory");
        let forged = SignedData {
            version: 1,
            algorithm: SIGNATURE_ALGORITHM.to_string(),
            certificate: identity().certificate().clone(),
            signature: base64::engine::general_purpose::STANDARD
                .encode(other.sign(&block.signature_file).to_bytes()),
        };

        builder
            .append(MANIFEST_NAME, block.manifest, CompressionMode::Deflated)
            .expect("append");
        builder
            .append(SIGNATURE_FILE_NAME, block.signature_file, CompressionMode::Deflated)
            .expect("append");
        builder
            .append(
                SIGNED_DATA_NAME,
                serde_json::to_vec(&forged).expect("serialize"),
                CompressionMode::Deflated,
            )
            .expect("append");

        let err = verify_archive(&builder.write().expect("write")).expect_err("forged");
        assert!(matches!(
            err,
            Error::Signing(SigningError::BadSignature { .. })
        ));
    }
}
