//! Artifact publishing: put converted bytes at a stable, servable location.
//!
//! Output names are `<token>.<ext>` where the token is a fresh UUID, so two
//! requests converting the same `photo.png` at the same instant still get
//! distinct artifacts. The client's file name plays no part in the name.
//!
//! Writes are atomic: bytes go to a temp file in `output_dir/.staging`, are
//! fsynced, and are then linked into place with a no-clobber rename. The
//! staging directory sits on the same filesystem as the artifacts, and its
//! dot-name keeps it out of the HTTP artifact route. A
//! reader of `<token>.<ext>` therefore sees either nothing or the complete
//! file. Should the target name already exist, a new token is drawn, up to
//! `publish_attempts` times.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::format::TargetFormat;
use crate::request::OutputArtifact;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Hidden subdirectory of the output directory holding in-flight writes.
pub const STAGING_DIR: &str = ".staging";

fn uuid_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Stores converted images under collision-free names.
#[derive(Debug, Clone)]
pub struct ArtifactPublisher {
    dir: PathBuf,
    public_prefix: String,
    attempts: u32,
    next_token: fn() -> String,
}

impl ArtifactPublisher {
    /// Open (creating if needed) the output directory described by `config`.
    pub async fn open(config: &ConversionConfig) -> Result<Self, ConvertError> {
        let dir = config.output_dir.clone();
        let staging = dir.join(STAGING_DIR);
        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(|e| ConvertError::PublishError {
                path: staging.clone(),
                detail: e.to_string(),
            })?;
        Ok(Self {
            dir,
            public_prefix: config.public_prefix.clone(),
            attempts: config.publish_attempts.max(1),
            next_token: uuid_token,
        })
    }

    /// Replace the token source. Tests use this to force name collisions.
    pub fn with_token_generator(mut self, next_token: fn() -> String) -> Self {
        self.next_token = next_token;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.dir.join(STAGING_DIR)
    }

    /// Durably store `bytes` and return the artifact reference.
    pub async fn publish(
        &self,
        bytes: Vec<u8>,
        format: TargetFormat,
    ) -> Result<OutputArtifact, ConvertError> {
        let dir = self.dir.clone();
        let attempts = self.attempts;
        let next_token = self.next_token;
        let size_bytes = bytes.len() as u64;

        let (token, file_name, path) = tokio::task::spawn_blocking(move || {
            publish_blocking(&dir, &bytes, format, attempts, next_token)
        })
        .await
        .map_err(|e| ConvertError::Internal(format!("Publish task panicked: {}", e)))??;

        let url = format!("{}/{}", self.public_prefix.trim_end_matches('/'), file_name);
        debug!("Published {} bytes at {}", size_bytes, path.display());

        Ok(OutputArtifact {
            token,
            file_name,
            path,
            url,
            format,
            size_bytes,
        })
    }
}

fn publish_blocking(
    dir: &Path,
    bytes: &[u8],
    format: TargetFormat,
    attempts: u32,
    next_token: fn() -> String,
) -> Result<(String, String, PathBuf), ConvertError> {
    let write_err = |e: std::io::Error| ConvertError::PublishError {
        path: dir.to_path_buf(),
        detail: e.to_string(),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix("publish-")
        .suffix(".tmp")
        .tempfile_in(dir.join(STAGING_DIR))
        .map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    let mut last = dir.to_path_buf();
    for attempt in 1..=attempts {
        let token = next_token();
        let file_name = format!("{}.{}", token, format.extension());
        let dest = dir.join(&file_name);

        match tmp.persist_noclobber(&dest) {
            Ok(_) => return Ok((token, file_name, dest)),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                warn!(
                    "Output name {} already taken (attempt {}/{})",
                    file_name, attempt, attempts
                );
                tmp = e.file;
                last = dest;
            }
            Err(e) => {
                return Err(ConvertError::PublishError {
                    path: dest,
                    detail: e.error.to_string(),
                })
            }
        }
    }

    // `tmp` drops here and removes the staged bytes.
    Err(ConvertError::PublishError {
        path: last,
        detail: format!("no free output name after {} attempts", attempts),
    })
}
