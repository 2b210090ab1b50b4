//! Temporary intake store: raw upload bytes at rest for one request.
//!
//! Each upload lands in `intake_dir` under a fresh UUID name, never under the
//! client's file name, so concurrent uploads of `photo.png` cannot collide.
//! The file's removal is armed before it is created (see
//! [`crate::pipeline::cleanup`]), which means a failed or partial write is
//! cleaned up by the same mechanism as a successful one.

use crate::error::ConvertError;
use crate::pipeline::cleanup::{CleanupOutcome, ReleaseGuard};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

/// Directory-backed store for raw uploads.
#[derive(Debug, Clone)]
pub struct IntakeStore {
    dir: PathBuf,
}

impl IntakeStore {
    /// Open (creating if needed) the intake directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, ConvertError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ConvertError::IntakeFailed {
                path: dir.clone(),
                source: e,
            })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Durably write `data` and hand back the artifact that owns its removal.
    pub async fn store(&self, data: Bytes) -> Result<IntakeArtifact, ConvertError> {
        let id = Uuid::new_v4();
        let path = self.dir.join(format!("{}.upload", id.simple()));
        let guard = ReleaseGuard::arm(&path);

        let write = async {
            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await?;
            file.write_all(&data).await?;
            file.sync_all().await
        };
        write.await.map_err(|e| ConvertError::IntakeFailed {
            path: path.clone(),
            source: e,
        })?;

        debug!("Stored {} upload bytes at {}", data.len(), path.display());
        Ok(IntakeArtifact {
            id,
            size: data.len() as u64,
            guard,
        })
    }
}

/// A raw upload at rest. Dropping it deletes the file.
#[derive(Debug)]
pub struct IntakeArtifact {
    id: Uuid,
    size: u64,
    guard: ReleaseGuard,
}

impl IntakeArtifact {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        self.guard.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the stored bytes back.
    pub async fn read(&self) -> Result<Vec<u8>, ConvertError> {
        tokio::fs::read(self.path())
            .await
            .map_err(|e| ConvertError::IntakeFailed {
                path: self.path().to_path_buf(),
                source: e,
            })
    }

    /// Delete the stored bytes now. Consumes the artifact so it runs once.
    pub fn release(self) -> CleanupOutcome {
        self.guard.release()
    }
}
