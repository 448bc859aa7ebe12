//! File system utilities for publishing.
//!
//! The orchestrator writes every artifact to a temporary path and renames
//! it into place; [`TempArtifact`] owns the temporary path and removes it
//! on every exit path that does not reach the rename.

use std::path::{Path, PathBuf};

/// Scoped temporary artifact file.
///
/// Dropping an unpersisted guard removes the file (idempotent: a missing
/// file is not an error). [`persist`](TempArtifact::persist) renames the
/// file to its final location and disarms the cleanup.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    persisted: bool,
}

impl TempArtifact {
    /// Claims `path` as a temporary artifact location.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            persisted: false,
        }
    }

    /// The temporary path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically renames the temporary file to `dest`.
    pub async fn persist(mut self, dest: &Path) -> std::io::Result<()> {
        tokio::fs::rename(&self.path, dest).await?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("failed to remove temp artifact {}: {e}", self.path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drop_removes_unpersisted_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".tmp-abc");
        tokio::fs::write(&path, b"partial").await.expect("write");

        drop(TempArtifact::new(path.clone()));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn persist_renames_and_disarms_cleanup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".tmp-abc");
        let dest = dir.path().join("final.apk");
        tokio::fs::write(&path, b"artifact").await.expect("write");

        TempArtifact::new(path.clone())
            .persist(&dest)
            .await
            .expect("persist");
        assert!(!path.exists());
        assert_eq!(std::fs::read(&dest).expect("read"), b"artifact");
    }

    #[test]
    fn drop_is_idempotent_for_missing_files() {
        drop(TempArtifact::new(PathBuf::from("/nonexistent/.tmp-xyz")));
    }
}
