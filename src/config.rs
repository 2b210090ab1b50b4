//! Configuration types for image conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The config is passed explicitly into
//! [`crate::convert::ConversionService`]; nothing is read from process-wide
//! state once the service exists.

use crate::error::ConvertError;
use crate::format::SourceType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 5 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Configuration for the conversion pipeline.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_imgconv::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .max_upload_bytes(2 * 1024 * 1024)
///     .output_dir("/var/lib/imgconv/converted")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Source media types the validator admits. Default: PNG, JPEG and WebP.
    pub accepted_source_types: Vec<SourceType>,

    /// Largest accepted upload in bytes. Default: 5 MiB.
    pub max_upload_bytes: u64,

    /// Ceiling for a whole multipart request body. Default: 4 × `max_upload_bytes`.
    ///
    /// Bytes of the image part beyond `max_upload_bytes` are counted and
    /// discarded rather than buffered; this cap bounds how long the server
    /// keeps draining an oversized body.
    pub max_request_bytes: u64,

    /// Directory holding raw uploads for the lifetime of one request.
    pub intake_dir: PathBuf,

    /// Directory holding published conversions.
    pub output_dir: PathBuf,

    /// URL path prefix under which `output_dir` is served. Default: `/converted`.
    pub public_prefix: String,

    /// Maximum decoded width or height in pixels. Default: 16 384.
    ///
    /// A 4 MB PNG can legally declare a 100 000 × 100 000 canvas; the decoder
    /// refuses anything larger than this before allocating pixels.
    pub max_image_dimension: u32,

    /// Upper bound on decode + encode wall time. `None` disables it. Default: 30 s.
    pub transcode_timeout: Option<Duration>,

    /// How many fresh names the publisher tries before giving up. Default: 4.
    pub publish_attempts: u32,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            accepted_source_types: vec![SourceType::Png, SourceType::Jpeg, SourceType::Webp],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_request_bytes: DEFAULT_MAX_UPLOAD_BYTES * 4,
            intake_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("converted"),
            public_prefix: "/converted".to_string(),
            max_image_dimension: 16_384,
            transcode_timeout: Some(Duration::from_secs(30)),
            publish_attempts: 4,
        }
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
            request_cap_set: false,
        }
    }

    pub fn accepts(&self, source: SourceType) -> bool {
        self.accepted_source_types.contains(&source)
    }

    /// Comma-separated MIME list for error messages.
    pub fn accepted_list(&self) -> String {
        self.accepted_source_types
            .iter()
            .map(|s| s.mime_type())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Public URL for a published file name.
    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_prefix.trim_end_matches('/'), file_name)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
    request_cap_set: bool,
}

impl ConversionConfigBuilder {
    pub fn accepted_source_types(mut self, types: impl IntoIterator<Item = SourceType>) -> Self {
        self.config.accepted_source_types = types.into_iter().collect();
        self
    }

    pub fn max_upload_bytes(mut self, n: u64) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn max_request_bytes(mut self, n: u64) -> Self {
        self.config.max_request_bytes = n;
        self.request_cap_set = true;
        self
    }

    pub fn intake_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.intake_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.public_prefix = prefix.into();
        self
    }

    pub fn max_image_dimension(mut self, px: u32) -> Self {
        self.config.max_image_dimension = px;
        self
    }

    pub fn transcode_timeout(mut self, limit: Option<Duration>) -> Self {
        self.config.transcode_timeout = limit;
        self
    }

    pub fn publish_attempts(mut self, n: u32) -> Self {
        self.config.publish_attempts = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ConversionConfig, ConvertError> {
        if !self.request_cap_set {
            self.config.max_request_bytes = self.config.max_upload_bytes.saturating_mul(4);
        }
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if c.max_request_bytes < c.max_upload_bytes {
            return Err(ConvertError::InvalidConfig(format!(
                "max_request_bytes ({}) must be ≥ max_upload_bytes ({})",
                c.max_request_bytes, c.max_upload_bytes
            )));
        }
        if c.accepted_source_types.is_empty() {
            return Err(ConvertError::InvalidConfig(
                "at least one accepted source type is required".into(),
            ));
        }
        if c.max_image_dimension == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_image_dimension must be ≥ 1".into(),
            ));
        }
        if c.publish_attempts == 0 {
            return Err(ConvertError::InvalidConfig(
                "publish_attempts must be ≥ 1".into(),
            ));
        }
        if !c.public_prefix.starts_with('/') {
            return Err(ConvertError::InvalidConfig(format!(
                "public_prefix must start with '/', got '{}'",
                c.public_prefix
            )));
        }
        if c.transcode_timeout == Some(Duration::ZERO) {
            return Err(ConvertError::InvalidConfig(
                "transcode timeout must be non-zero (use None to disable)".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Listen address for the HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_service() {
        let c = ConversionConfig::default();
        assert_eq!(c.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(c.public_prefix, "/converted");
        assert!(c.accepts(SourceType::Png));
        assert!(c.accepts(SourceType::Jpeg));
        assert!(c.accepts(SourceType::Webp));
        assert_eq!(c.transcode_timeout, Some(Duration::from_secs(30)));
        assert_eq!(ServerConfig::default().port, 5000);
    }

    #[test]
    fn request_cap_follows_upload_cap() {
        let c = ConversionConfig::builder()
            .max_upload_bytes(1000)
            .build()
            .unwrap();
        assert_eq!(c.max_request_bytes, 4000);
    }

    #[test]
    fn explicit_request_cap_is_kept() {
        let c = ConversionConfig::builder()
            .max_upload_bytes(1000)
            .max_request_bytes(1500)
            .build()
            .unwrap();
        assert_eq!(c.max_request_bytes, 1500);
    }

    #[test]
    fn rejects_request_cap_below_upload_cap() {
        let err = ConversionConfig::builder()
            .max_upload_bytes(1000)
            .max_request_bytes(10)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_empty_accept_list() {
        let err = ConversionConfig::builder()
            .accepted_source_types([])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("accepted source type"));
    }

    #[test]
    fn rejects_zero_timeout_and_relative_prefix() {
        assert!(ConversionConfig::builder()
            .transcode_timeout(Some(Duration::ZERO))
            .build()
            .is_err());
        assert!(ConversionConfig::builder()
            .transcode_timeout(Some(Duration::from_millis(1)))
            .build()
            .is_ok());
        assert!(ConversionConfig::builder()
            .public_prefix("converted")
            .build()
            .is_err());
    }

    #[test]
    fn public_url_joins_prefix() {
        let c = ConversionConfig::builder()
            .public_prefix("/files/")
            .build()
            .unwrap();
        assert_eq!(c.public_url("abc.png"), "/files/abc.png");
    }
}
