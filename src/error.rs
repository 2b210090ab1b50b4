//! Error types for the edgequake-imgconv library.
//!
//! Every failure a conversion request can hit is a variant of
//! [`ConvertError`]. All of them are terminal for the request: the
//! orchestrator never retries, because a corrupt upload stays corrupt.
//!
//! The variants split into two audiences:
//!
//! * **Client errors**: the upload itself is unacceptable (no file, wrong
//!   source type, too large, unknown target format). Their messages are safe
//!   to show to the uploader verbatim.
//!
//! * **Server errors**: decoding, encoding, or storing failed. Their
//!   `Display` output carries internal detail for the logs; callers facing
//!   end users should render [`ConvertError::public_message`] instead, which
//!   never leaks paths or codec internals.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-imgconv library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Client input errors ───────────────────────────────────────────────
    /// No file part was attached, or the attached part was empty.
    #[error("No file uploaded.")]
    MissingFile,

    /// The declared (or sniffed) media type is not in the accepted set.
    #[error("Unsupported source type '{found}'. Accepted: {accepted}")]
    UnsupportedSourceType { found: String, accepted: String },

    /// The upload exceeds the configured size ceiling.
    ///
    /// `size` is `None` when the transport gave up reading before the part
    /// ended, so the real size is unknown.
    #[error(
        "File is too large{} (maximum {max} bytes)",
        .size.map(|s| format!(": {s} bytes")).unwrap_or_default()
    )]
    PayloadTooLarge { size: Option<u64>, max: u64 },

    /// The requested output format is not one the converter can encode.
    #[error("Unsupported target format '{requested}'. Supported: {supported}")]
    UnsupportedTargetFormat { requested: String, supported: String },

    /// The multipart body could not be parsed at all.
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    // ── Processing errors ─────────────────────────────────────────────────
    /// Source bytes could not be decoded as an image of the declared type.
    #[error("Failed to decode {source_type} image: {detail}")]
    DecodeError { source_type: String, detail: String },

    /// The decoded image could not be re-encoded into the target format.
    #[error("Failed to encode {target} image: {detail}")]
    EncodeError { target: String, detail: String },

    /// Decode + encode did not finish within the configured limit.
    #[error("Transcoding timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    // ── Storage errors ────────────────────────────────────────────────────
    /// The raw upload could not be written to the intake directory.
    #[error("Failed to store upload at '{path}': {source}")]
    IntakeFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converted output could not be durably published.
    #[error("Failed to publish output to '{path}': {detail}")]
    PublishError { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (a blocking worker panicked, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A field-free classification of [`ConvertError`].
///
/// Useful for matching, metrics labels, and the machine-readable `code`
/// in HTTP error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingFile,
    UnsupportedSourceType,
    PayloadTooLarge,
    UnsupportedTargetFormat,
    MalformedUpload,
    DecodeError,
    EncodeError,
    Timeout,
    IntakeFailed,
    PublishError,
    InvalidConfig,
    Internal,
}

impl ErrorKind {
    /// Stable snake_case identifier.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::MissingFile => "missing_file",
            ErrorKind::UnsupportedSourceType => "unsupported_source_type",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::UnsupportedTargetFormat => "unsupported_target_format",
            ErrorKind::MalformedUpload => "malformed_upload",
            ErrorKind::DecodeError => "decode_error",
            ErrorKind::EncodeError => "encode_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::IntakeFailed => "intake_failed",
            ErrorKind::PublishError => "publish_error",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::Internal => "internal",
        }
    }

    /// `true` when the uploader caused the failure.
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::MissingFile
                | ErrorKind::UnsupportedSourceType
                | ErrorKind::PayloadTooLarge
                | ErrorKind::UnsupportedTargetFormat
                | ErrorKind::MalformedUpload
        )
    }
}

/// Message shown to end users for every server-side failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "Conversion failed.";

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::MissingFile => ErrorKind::MissingFile,
            ConvertError::UnsupportedSourceType { .. } => ErrorKind::UnsupportedSourceType,
            ConvertError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            ConvertError::UnsupportedTargetFormat { .. } => ErrorKind::UnsupportedTargetFormat,
            ConvertError::MalformedUpload(_) => ErrorKind::MalformedUpload,
            ConvertError::DecodeError { .. } => ErrorKind::DecodeError,
            ConvertError::EncodeError { .. } => ErrorKind::EncodeError,
            ConvertError::Timeout { .. } => ErrorKind::Timeout,
            ConvertError::IntakeFailed { .. } => ErrorKind::IntakeFailed,
            ConvertError::PublishError { .. } => ErrorKind::PublishError,
            ConvertError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            ConvertError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind().is_client_error()
    }

    /// The message safe to return to the uploader.
    ///
    /// Client errors describe exactly what was wrong with the upload.
    /// Server errors collapse to [`GENERIC_FAILURE_MESSAGE`].
    pub fn public_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            GENERIC_FAILURE_MESSAGE.to_string()
        }
    }
}
