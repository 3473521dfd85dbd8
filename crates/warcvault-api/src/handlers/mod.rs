pub mod download;
pub mod health;
pub mod webdata;

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
};
use warcvault_core::AppError;
use warcvault_services::ArchiveStream;

use crate::constants::OCTET_STREAM;
use crate::error::HttpAppError;

/// Attachment response for a download. Sends `Content-Length` when the size
/// is known and chunked transfer otherwise.
pub(crate) fn attachment(download: ArchiveStream) -> Result<Response<Body>, HttpAppError> {
    let disposition = format!("attachment; filename*=UTF-8''{}", download.filename);

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, OCTET_STREAM)
        .header(header::CONTENT_DISPOSITION, disposition);
    if let Some(length) = download.content_length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    let response = builder
        .body(Body::from_stream(download.body))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;
    Ok(response)
}
