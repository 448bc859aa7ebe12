//! Artifact checksum calculation.

use crate::bundler::error::{ErrorExt, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Calculates the SHA-256 checksum of a published artifact file.
///
/// Reads in 8KB chunks and returns the hex-encoded digest. Computed from
/// the bytes actually on disk, after the atomic rename, so the recorded
/// checksum always describes what a caller can fetch.
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening artifact for hashing", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading artifact for hashing", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_file_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("artifact.apk");
        tokio::fs::write(&path, b"archive bytes").await.expect("write");

        let digest = calculate_sha256(&path).await.expect("hash");
        assert_eq!(digest, hex::encode(Sha256::digest(b"archive bytes")));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = calculate_sha256(Path::new("/nonexistent/artifact.apk"))
            .await
            .expect_err("missing");
        assert!(matches!(err, crate::bundler::error::Error::Io(_)));
    }
}
