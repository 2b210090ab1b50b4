//! Source media types and target encodings.
//!
//! Both enums are closed: a value exists only if the `image` crate features
//! compiled into this crate can actually decode (for [`SourceType`]) or
//! encode (for [`TargetFormat`]) it.

use crate::error::ConvertError;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output encoding requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Jpeg,
    Png,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 2] = [TargetFormat::Jpeg, TargetFormat::Png];

    /// Canonical lowercase name, as accepted in the `format` form field.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Png => "png",
        }
    }

    /// File extension used for published artifacts.
    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "image/jpeg",
            TargetFormat::Png => "image/png",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            TargetFormat::Jpeg => ImageFormat::Jpeg,
            TargetFormat::Png => ImageFormat::Png,
        }
    }

    /// Comma-separated list for error messages.
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(TargetFormat::Jpeg),
            "png" => Ok(TargetFormat::Png),
            _ => Err(ConvertError::UnsupportedTargetFormat {
                requested: s.to_string(),
                supported: Self::supported_list(),
            }),
        }
    }
}

/// Media type of an uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Png,
    Jpeg,
    Webp,
}

impl SourceType {
    pub fn mime_type(self) -> &'static str {
        match self {
            SourceType::Png => "image/png",
            SourceType::Jpeg => "image/jpeg",
            SourceType::Webp => "image/webp",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            SourceType::Png => ImageFormat::Png,
            SourceType::Jpeg => ImageFormat::Jpeg,
            SourceType::Webp => ImageFormat::WebP,
        }
    }

    /// Parse a declared `Content-Type`. Parameters after `;` are ignored.
    ///
    /// Returns `None` for any media type this crate cannot decode.
    pub fn from_mime(content_type: &str) -> Option<Self> {
        match normalize_mime(content_type).as_str() {
            "image/png" => Some(SourceType::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(SourceType::Jpeg),
            "image/webp" => Some(SourceType::Webp),
            _ => None,
        }
    }

    /// Guess the type from magic bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        match image::guess_format(data).ok()? {
            ImageFormat::Png => Some(SourceType::Png),
            ImageFormat::Jpeg => Some(SourceType::Jpeg),
            ImageFormat::WebP => Some(SourceType::Webp),
            _ => None,
        }
    }

    /// Guess the type from a file extension (CLI input).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(SourceType::Png),
            "jpg" | "jpeg" | "jpe" => Some(SourceType::Jpeg),
            "webp" => Some(SourceType::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Lowercase the media type and drop any parameters
/// (`"IMAGE/PNG; charset=binary"` → `"image/png"`).
pub fn normalize_mime(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_format_parsing() {
        assert_eq!("jpeg".parse::<TargetFormat>().unwrap(), TargetFormat::Jpeg);
        assert_eq!("JPG".parse::<TargetFormat>().unwrap(), TargetFormat::Jpeg);
        assert_eq!(" png ".parse::<TargetFormat>().unwrap(), TargetFormat::Png);
    }

    #[test]
    fn gif_is_not_a_target() {
        let err = "gif".parse::<TargetFormat>().unwrap_err();
        assert!(matches!(
            err,
            ConvertError::UnsupportedTargetFormat { ref requested, .. } if requested == "gif"
        ));
    }

    #[test]
    fn empty_target_is_rejected() {
        assert!("".parse::<TargetFormat>().is_err());
    }

    #[test]
    fn mime_parameters_are_ignored() {
        assert_eq!(
            SourceType::from_mime("Image/PNG; charset=binary"),
            Some(SourceType::Png)
        );
        assert_eq!(SourceType::from_mime("image/jpg"), Some(SourceType::Jpeg));
        assert_eq!(SourceType::from_mime("image/gif"), None);
        assert_eq!(SourceType::from_mime("text/plain"), None);
    }

    #[test]
    fn sniff_png_signature() {
        let sig = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(SourceType::sniff(&sig), Some(SourceType::Png));
        assert_eq!(SourceType::sniff(b"GIF89a......"), None);
        assert_eq!(SourceType::sniff(b""), None);
    }

    #[test]
    fn extension_matches_format_name() {
        assert_eq!(TargetFormat::Jpeg.extension(), "jpeg");
        assert_eq!(TargetFormat::Png.mime_type(), "image/png");
        assert_eq!(SourceType::from_extension("JPG"), Some(SourceType::Jpeg));
    }

    #[test]
    fn webp_is_recognised_everywhere() {
        assert_eq!(SourceType::from_mime("image/webp"), Some(SourceType::Webp));
        assert_eq!(SourceType::from_extension("WebP"), Some(SourceType::Webp));
        assert_eq!(SourceType::Webp.image_format(), ImageFormat::WebP);
        assert_eq!(SourceType::Webp.to_string(), "image/webp");

        let riff = *b"RIFF\x24\0\0\0WEBPVP8L";
        assert_eq!(SourceType::sniff(&riff), Some(SourceType::Webp));
    }
}
