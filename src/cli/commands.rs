//! CLI command execution.

use crate::bundler::{
    archive, signing, BuildRequest, InMemoryHistory, PackageBuilder, SigningIdentity,
};
use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs a build: reads the branding request, assembles and signs the
/// package, and prints the published artifact path.
///
/// Exit contract: returning `Ok` means the artifact exists at the printed
/// path.
pub async fn build(
    request_path: &Path,
    out_dir: PathBuf,
    signing_key: Option<String>,
    signing_subject: &str,
    last_version_code: Option<u32>,
) -> Result<i32> {
    let raw = tokio::fs::read_to_string(request_path)
        .await
        .map_err(|e| CliError::ExecutionFailed {
            command: "read_request".to_string(),
            reason: format!("Failed to read {}: {e}", request_path.display()),
        })?;
    let request: BuildRequest = serde_json::from_str(&raw)?;

    let history = InMemoryHistory::new();
    if let Some(last) = last_version_code {
        history.record(&request.package_id, last);
    }

    let mut builder = PackageBuilder::new(out_dir, Arc::new(history));
    if let Some(seed) = signing_key {
        let identity = SigningIdentity::from_config(&seed, signing_subject)
            .map_err(crate::bundler::Error::from)?;
        builder = builder.with_identity(identity);
    }

    let metadata = builder.build(&request).await?;
    log::info!(
        "sha256 {} ({} bytes, version code {})",
        metadata.sha256,
        metadata.size_bytes,
        metadata.version_code
    );
    println!("{}", metadata.artifact_path.display());
    Ok(0)
}

/// Verifies a published package: signature chain, per-entry digests, and
/// archive record counts.
pub async fn verify(artifact: &Path) -> Result<i32> {
    let bytes = tokio::fs::read(artifact)
        .await
        .map_err(|e| CliError::ExecutionFailed {
            command: "read_artifact".to_string(),
            reason: format!("Failed to read {}: {e}", artifact.display()),
        })?;

    let counts = archive::entry_counts(&bytes)?;
    if counts.local_headers != counts.central_records {
        return Err(CliError::ExecutionFailed {
            command: "verify".to_string(),
            reason: format!(
                "{} local headers but {} central directory records",
                counts.local_headers, counts.central_records
            ),
        }
        .into());
    }

    let certificate = signing::verify_archive(&bytes)?;
    println!(
        "OK: {} entries, signed by {}",
        counts.central_records, certificate.subject
    );
    Ok(0)
}
