//! Main build orchestration and coordination.
//!
//! This module provides the [`PackageBuilder`] orchestrator that sequences
//! validation, resource encoding, stub generation, archiving, and signing,
//! then atomically publishes the finished package.

use super::{calculate_sha256, ArtifactMetadata, BuildStage};
use crate::bundler::archive::{ArchiveBuilder, CompressionMode};
use crate::bundler::error::{Error, ErrorExt, Result};
use crate::bundler::resources::ResourceSet;
use crate::bundler::signing::{
    self, SignatureBlock, SigningIdentity, MANIFEST_NAME, SIGNATURE_FILE_NAME, SIGNED_DATA_NAME,
};
use crate::bundler::spec::{validate, BuildRequest, PackageSpec, VersionHistory};
use crate::bundler::stub;
use crate::bundler::utils::fs::TempArtifact;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Build orchestrator for branded storefront packages.
///
/// Sequences one synchronous, CPU-bound pipeline per build request:
/// `Validating -> Encoding -> Archiving -> Signing -> Publishing`. The
/// only I/O is the final atomic publish. Builds for different package
/// identifiers share no mutable state and may run concurrently; version
/// monotonicity for a single identifier is enforced through the
/// caller-owned [`VersionHistory`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use storeforge_bundler::bundler::{InMemoryHistory, PackageBuilder, SigningIdentity};
///
/// # async fn example(request: storeforge_bundler::bundler::BuildRequest)
/// # -> storeforge_bundler::bundler::Result<()> {
/// let builder = PackageBuilder::new("target/packages", Arc::new(InMemoryHistory::new()))
///     .with_identity(SigningIdentity::from_seed([7u8; 32], "CN=Acme Storefront"));
///
/// let metadata = builder.build(&request).await?;
/// println!("published {}", metadata.artifact_path.display());
/// # Ok(())
/// # }
/// ```
pub struct PackageBuilder {
    out_dir: PathBuf,
    history: Arc<dyn VersionHistory>,
    identity: Option<SigningIdentity>,
}

impl std::fmt::Debug for PackageBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageBuilder")
            .field("out_dir", &self.out_dir)
            .field("identity", &self.identity.as_ref().map(|i| i.certificate()))
            .finish()
    }
}

impl PackageBuilder {
    /// Creates an orchestrator publishing into `out_dir`, consulting
    /// `history` for the monotonic version-code invariant.
    pub fn new(out_dir: impl Into<PathBuf>, history: Arc<dyn VersionHistory>) -> Self {
        Self {
            out_dir: out_dir.into(),
            history,
            identity: None,
        }
    }

    /// Attaches the configuration-supplied signing identity.
    ///
    /// Without one, builds fail at the signing stage; an unsigned artifact
    /// is never published.
    pub fn with_identity(mut self, identity: SigningIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Runs one build request through the pipeline and publishes the
    /// artifact.
    ///
    /// On any failure the first error is surfaced verbatim, tagged with
    /// the stage that produced it, and every temporary file written so
    /// far is removed. Callers imposing a timeout can drop the future;
    /// the temporary-artifact guard runs the same cleanup path.
    pub async fn build(&self, request: &BuildRequest) -> Result<ArtifactMetadata> {
        let spec = stage(BuildStage::Validating, || {
            Ok(validate(request, self.history.as_ref())?)
        })?;
        log::info!(
            "building {} v{} ({})",
            spec.package_id(),
            spec.version_code(),
            spec.version_name()
        );

        let (resources, code) = stage(BuildStage::Encoding, || {
            let resources = ResourceSet::from_spec(&spec)?;
            let code = stub::generate(&spec)?;
            Ok((resources, code))
        })?;

        let mut archive = stage(BuildStage::Archiving, || {
            let mut archive = ArchiveBuilder::new();
            for (name, bytes) in resources.iter() {
                archive.append(name, bytes.to_vec(), CompressionMode::Stored)?;
            }
            archive.append(stub::CODE_ENTRY, code, CompressionMode::Stored)?;
            Ok(archive)
        })?;
        log::debug!("archived {} content entries", archive.entries().len());

        let bytes = stage(BuildStage::Signing, || {
            let SignatureBlock {
                manifest,
                signature_file,
                signed_data,
            } = signing::sign_entries(archive.entries(), self.identity.as_ref())?;
            archive.append(MANIFEST_NAME, manifest, CompressionMode::Deflated)?;
            archive.append(SIGNATURE_FILE_NAME, signature_file, CompressionMode::Deflated)?;
            archive.append(SIGNED_DATA_NAME, signed_data, CompressionMode::Deflated)?;
            archive.write()
        })?;

        let metadata = self
            .publish(&spec, bytes)
            .await
            .map_err(|source| Error::Stage {
                stage: BuildStage::Publishing,
                source: Box::new(source),
            })?;
        log::info!(
            "{}: published {} ({} bytes)",
            BuildStage::Done,
            metadata.artifact_path.display(),
            metadata.size_bytes
        );
        Ok(metadata)
    }

    /// Writes the archive to a temporary path in the output directory and
    /// renames it into place.
    async fn publish(&self, spec: &PackageSpec, bytes: Vec<u8>) -> Result<ArtifactMetadata> {
        tokio::fs::create_dir_all(&self.out_dir)
            .await
            .fs_context("creating output directory", &self.out_dir)?;

        let temp = TempArtifact::new(self.out_dir.join(format!(".tmp-{}", Uuid::new_v4())));
        tokio::fs::write(temp.path(), &bytes)
            .await
            .fs_context("writing temp artifact", temp.path())?;

        let artifact_path = self
            .out_dir
            .join(format!("{}-{}.apk", spec.package_id(), spec.version_code()));
        let temp_path = temp.path().to_path_buf();
        temp.persist(&artifact_path)
            .await
            .fs_context("publishing artifact", &temp_path)?;

        let sha256 = calculate_sha256(&artifact_path).await?;
        Ok(ArtifactMetadata {
            artifact_path,
            size_bytes: bytes.len() as u64,
            package_id: spec.package_id().to_string(),
            version_code: spec.version_code(),
            sha256,
            built_at: chrono::Utc::now(),
        })
    }
}

/// Runs one pipeline stage, tagging any failure with the stage name.
fn stage<T>(stage: BuildStage, f: impl FnOnce() -> Result<T>) -> Result<T> {
    log::debug!("stage: {stage}");
    f().map_err(|source| Error::Stage {
        stage,
        source: Box::new(source),
    })
}
