//! Request and result types flowing through the conversion pipeline.

use crate::error::ConvertError;
use crate::format::TargetFormat;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// One uploaded file part as received from the transport.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    /// Client-supplied file name. Informational only; never used for storage.
    pub file_name: Option<String>,

    /// Declared `Content-Type` of the part, if any.
    pub content_type: Option<String>,

    /// Total number of bytes the client sent for this part.
    pub size: u64,

    /// The part body.
    ///
    /// When `size` exceeds the configured ceiling the transport may keep only
    /// a prefix here; such uploads are always rejected by validation.
    pub data: Bytes,
}

impl UploadedFile {
    /// Build from a complete in-memory body.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            file_name: None,
            content_type: None,
            size: data.len() as u64,
            data,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

/// A single conversion request: at most one file plus the requested format.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Unique per request; used for log correlation.
    pub id: Uuid,

    /// `None` when the client attached no file part.
    pub file: Option<UploadedFile>,

    /// Raw `format` value. Parsed during validation so that an unknown value
    /// is reported as a validation error rather than a transport error.
    pub target: Option<String>,
}

impl ConversionRequest {
    pub fn new(file: Option<UploadedFile>, target: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file,
            target,
        }
    }

    /// Convenience for callers that already hold a typed format.
    pub fn for_format(file: UploadedFile, target: TargetFormat) -> Self {
        Self::new(Some(file), Some(target.as_str().to_string()))
    }
}

/// A converted image at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputArtifact {
    /// Request-unique token the file name is derived from.
    pub token: String,

    /// `<token>.<ext>`
    pub file_name: String,

    /// Absolute or config-relative filesystem location.
    pub path: PathBuf,

    /// Retrievable URL path, e.g. `/converted/<token>.jpeg`.
    pub url: String,

    pub format: TargetFormat,

    pub size_bytes: u64,
}

/// The one terminal outcome of a request.
pub type ConversionResult = Result<OutputArtifact, ConvertError>;

/// Body of a successful HTTP response: `{ "url": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResponse {
    pub url: String,
}

impl From<&OutputArtifact> for ConversionResponse {
    fn from(artifact: &OutputArtifact) -> Self {
        Self {
            url: artifact.url.clone(),
        }
    }
}
