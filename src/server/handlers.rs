//! Request handlers.

use super::error::HttpError;
use super::state::AppState;
use crate::error::ConvertError;
use crate::request::{ConversionRequest, ConversionResponse, UploadedFile};
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::BytesMut;
use tracing::debug;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";
/// Multipart field carrying the requested target format.
pub const FORMAT_FIELD: &str = "format";

/// `POST /api/convert` and `POST /convert`.
pub async fn convert_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConversionResponse>, HttpError> {
    let multipart = multipart.map_err(|r| ConvertError::MalformedUpload(r.body_text()))?;
    let config = state.service.config();
    let request = read_conversion_form(multipart, config.max_upload_bytes, config.max_request_bytes).await?;

    let artifact = state.service.convert(request).await?;
    Ok(Json(ConversionResponse::from(&artifact)))
}

/// `GET /api/health`.
pub async fn health() -> &'static str {
    "ok"
}

/// Turn a multipart body into a [`ConversionRequest`].
///
/// Unknown fields are skipped. The `image` field is streamed: at most
/// `max_upload_bytes + 1` bytes are kept, the remainder is only counted, so
/// an oversized file still reaches validation with its true size.
pub async fn read_conversion_form(
    mut multipart: Multipart,
    max_upload_bytes: u64,
    max_request_bytes: u64,
) -> Result<ConversionRequest, ConvertError> {
    let mut file: Option<UploadedFile> = None;
    let mut target: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_request_bytes))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(IMAGE_FIELD) => {
                if file.is_some() {
                    return Err(ConvertError::MalformedUpload(format!(
                        "more than one '{IMAGE_FIELD}' field"
                    )));
                }
                file = Some(read_file_field(field, max_upload_bytes, max_request_bytes).await?);
            }
            Some(FORMAT_FIELD) => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, max_request_bytes))?;
                target = Some(value);
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    Ok(ConversionRequest::new(file, target))
}

async fn read_file_field(
    mut field: Field<'_>,
    max_upload_bytes: u64,
    max_request_bytes: u64,
) -> Result<UploadedFile, ConvertError> {
    let file_name = field.file_name().map(str::to_owned);
    let content_type = field.content_type().map(str::to_owned);
    let keep = max_upload_bytes.saturating_add(1);

    let mut data = BytesMut::new();
    let mut size: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_request_bytes))?
    {
        let room = keep.saturating_sub(data.len() as u64);
        let take = usize::try_from(room).unwrap_or(usize::MAX).min(chunk.len());
        data.extend_from_slice(&chunk[..take]);
        size += chunk.len() as u64;
    }
    debug!("Received '{IMAGE_FIELD}' part: {} bytes", size);

    Ok(UploadedFile {
        file_name: file_name.filter(|n| !n.is_empty()),
        content_type,
        size,
        data: data.freeze(),
    })
}

/// The body limit surfaces as a multipart error with status 413; anything
/// else means the body could not be parsed.
fn multipart_error(err: MultipartError, max_request_bytes: u64) -> ConvertError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ConvertError::PayloadTooLarge {
            size: None,
            max: max_request_bytes,
        }
    } else {
        ConvertError::MalformedUpload(err.body_text())
    }
}
