//! Decode the source image and re-encode it in the requested format.
//!
//! ## Why spawn_blocking?
//!
//! Decoding a 5 MB PNG and re-encoding it as JPEG is pure CPU work that can
//! take hundreds of milliseconds. Running it on a Tokio worker thread would
//! stall every other request scheduled there, so the codec work moves to the
//! blocking pool and the async side only awaits its result.
//!
//! Codec defaults are used throughout: `image`'s JPEG quality 75 and its
//! default PNG compression. The output is returned in memory; making it
//! durable is the publisher's job, which keeps a failed encode from ever
//! leaving a partial file behind.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::format::{SourceType, TargetFormat};
use crate::pipeline::intake::IntakeArtifact;
use crate::pipeline::validate::Accepted;
use image::{DynamicImage, ImageReader, Limits};
use std::io::Cursor;
use std::time::Instant;
use tracing::debug;

/// Encoded output plus the geometry it was produced from.
#[derive(Debug, Clone)]
pub struct Transcoded {
    pub bytes: Vec<u8>,
    pub format: TargetFormat,
    pub width: u32,
    pub height: u32,
}

/// Convert a stored upload.
///
/// Reads the intake file, then decodes and encodes on the blocking pool,
/// bounded by `config.transcode_timeout` when set.
pub async fn transcode(
    intake: &IntakeArtifact,
    accepted: Accepted,
    config: &ConversionConfig,
) -> Result<Transcoded, ConvertError> {
    let data = intake.read().await?;
    let max_dim = config.max_image_dimension;

    let task = tokio::task::spawn_blocking(move || {
        transcode_bytes(&data, accepted.source, accepted.target, max_dim)
    });

    let joined = match config.transcode_timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| ConvertError::Timeout {
                limit_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            })?,
        None => task.await,
    };

    joined.map_err(|e| ConvertError::Internal(format!("Transcode task panicked: {}", e)))?
}

/// Blocking decode + encode of an in-memory image.
pub fn transcode_bytes(
    data: &[u8],
    source: SourceType,
    target: TargetFormat,
    max_dimension: u32,
) -> Result<Transcoded, ConvertError> {
    let start = Instant::now();
    let img = decode(data, source, max_dimension)?;
    let (width, height) = (img.width(), img.height());
    let bytes = encode(img, target)?;
    debug!(
        "Transcoded {}x{} {} → {} ({} → {} bytes) in {}ms",
        width,
        height,
        source,
        target,
        data.len(),
        bytes.len(),
        start.elapsed().as_millis()
    );
    Ok(Transcoded {
        bytes,
        format: target,
        width,
        height,
    })
}

/// Decode with the codec implied by `source`, never by content sniffing.
pub fn decode(
    data: &[u8],
    source: SourceType,
    max_dimension: u32,
) -> Result<DynamicImage, ConvertError> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(max_dimension);
    limits.max_image_height = Some(max_dimension);

    let mut reader = ImageReader::with_format(Cursor::new(data), source.image_format());
    reader.limits(limits);
    reader.decode().map_err(|e| ConvertError::DecodeError {
        source_type: source.mime_type().to_string(),
        detail: e.to_string(),
    })
}

/// Encode into `target`, adapting the pixel layout where the codec needs it.
pub fn encode(img: DynamicImage, target: TargetFormat) -> Result<Vec<u8>, ConvertError> {
    let img = prepare_for(img, target);
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), target.image_format())
        .map_err(|e| ConvertError::EncodeError {
            target: target.as_str().to_string(),
            detail: e.to_string(),
        })?;
    Ok(buf)
}

/// JPEG stores 8-bit gray or RGB only: alpha is dropped and deep samples are
/// narrowed. PNG takes every integer layout the decoders produce.
fn prepare_for(img: DynamicImage, target: TargetFormat) -> DynamicImage {
    match target {
        TargetFormat::Jpeg => match img {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
            DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLuma8(img.to_luma8()),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        },
        TargetFormat::Png => match img {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                DynamicImage::ImageRgba16(img.to_rgba16())
            }
            other => other,
        },
    }
}
