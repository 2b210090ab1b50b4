//! Upload validation: decide whether a request is worth any I/O at all.
//!
//! Runs purely on metadata already in memory (presence, declared type, byte
//! count, requested format), so a rejected upload never touches disk.
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. a non-empty file part is present       → [`ConvertError::MissingFile`]
//! 2. its media type is accepted             → [`ConvertError::UnsupportedSourceType`]
//! 3. it fits under the size ceiling         → [`ConvertError::PayloadTooLarge`]
//! 4. the target format is encodable         → [`ConvertError::UnsupportedTargetFormat`]

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::format::{normalize_mime, SourceType, TargetFormat};
use crate::request::ConversionRequest;
use tracing::debug;

/// An upload that passed every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub source: SourceType,
    pub target: TargetFormat,
}

/// Validate a request against the configured limits.
pub fn validate(
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<Accepted, ConvertError> {
    let file = match &request.file {
        Some(f) if f.size > 0 => f,
        _ => return Err(ConvertError::MissingFile),
    };

    let source = resolve_source_type(file.content_type.as_deref(), &file.data)
        .filter(|s| config.accepts(*s))
        .ok_or_else(|| ConvertError::UnsupportedSourceType {
            found: file
                .content_type
                .as_deref()
                .map(normalize_mime)
                .unwrap_or_else(|| "unknown".to_string()),
            accepted: config.accepted_list(),
        })?;

    if file.size > config.max_upload_bytes {
        return Err(ConvertError::PayloadTooLarge {
            size: Some(file.size),
            max: config.max_upload_bytes,
        });
    }

    let target: TargetFormat = request
        .target
        .as_deref()
        .unwrap_or("")
        .parse()?;

    debug!(
        "Accepted upload: {} bytes, {} → {}",
        file.size, source, target
    );
    Ok(Accepted { source, target })
}

/// Work out the source type of an upload.
///
/// A concrete declaration is trusted as-is; only a missing or generic
/// `application/octet-stream` declaration falls back to sniffing. Trusting
/// the declaration means a mislabelled file fails at decode time rather than
/// being silently reinterpreted.
pub fn resolve_source_type(content_type: Option<&str>, data: &[u8]) -> Option<SourceType> {
    match content_type.map(normalize_mime) {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => {
            SourceType::from_mime(&ct)
        }
        _ => SourceType::sniff(data),
    }
}
