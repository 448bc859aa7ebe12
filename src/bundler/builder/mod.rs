//! Build orchestration.
//!
//! This module provides the [`PackageBuilder`] orchestrator that sequences
//! the pipeline stages and atomically publishes the finished artifact.

mod checksum;
mod orchestrator;

pub use checksum::calculate_sha256;
pub use orchestrator::PackageBuilder;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Pipeline stages, in execution order.
///
/// Any component failure moves the build to its terminal failed state with
/// the stage recorded on the error; there are no automatic retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildStage {
    /// Normalizing and validating the build request.
    Validating,
    /// Encoding binary resources and the code stub.
    Encoding,
    /// Assembling content entries into the archive.
    Archiving,
    /// Producing the digest manifest and signature block.
    Signing,
    /// Writing and atomically renaming the artifact.
    Publishing,
    /// Build finished and the artifact is on disk.
    Done,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::Validating => "validating",
            BuildStage::Encoding => "encoding",
            BuildStage::Archiving => "archiving",
            BuildStage::Signing => "signing",
            BuildStage::Publishing => "publishing",
            BuildStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Metadata describing a published artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactMetadata {
    /// Final artifact location.
    pub artifact_path: PathBuf,
    /// Artifact size on disk.
    pub size_bytes: u64,
    /// Package identifier the artifact installs as.
    pub package_id: String,
    /// Build number of this artifact.
    pub version_code: u32,
    /// Hex SHA-256 of the published file.
    pub sha256: String,
    /// When the build completed.
    pub built_at: DateTime<Utc>,
}
