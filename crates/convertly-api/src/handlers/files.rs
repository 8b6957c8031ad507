use crate::error::{ErrorResponse, HttpAppError};
use crate::state::UploadState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
};
use convertly_core::AppError;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Raw file bytes", content_type = "application/octet-stream"),
        (status = 404, description = "File not found or expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(uploads), fields(file_id = %id))]
pub async fn get_file(
    State(uploads): State<UploadState>,
    Path(id): Path<Uuid>,
) -> Result<Response<Body>, HttpAppError> {
    let file = uploads.repository.get(id).await?;

    let content_disposition = format!(
        "inline; filename*=UTF-8''{}",
        urlencoding::encode(&file.name)
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.mime_type.as_str())
        .header(header::CONTENT_LENGTH, file.size_bytes)
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(Body::from(file.bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}
