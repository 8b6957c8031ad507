use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::extract_multipart_file;
use axum::{
    extract::{Multipart, State},
    Json,
};
use convertly_core::models::UploadResponse;
use convertly_core::validation::normalize_mime_type;
use convertly_core::AppError;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/upload",
    tag = "files",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing or empty file", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "File type not allowed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let (data, filename, content_type) = extract_multipart_file(multipart).await?;

    // Nothing is stored unless validation passes.
    state
        .uploads
        .validator
        .validate(&content_type, data.len() as u64)
        .map_err(AppError::from)?;

    let file = state
        .uploads
        .repository
        .store(&filename, &normalize_mime_type(&content_type), data)
        .await?;

    tracing::info!(
        file_id = %file.id,
        size_bytes = file.size_bytes,
        mime_type = %file.mime_type,
        "File uploaded"
    );

    let url = state.config.file_url(&file.id);
    Ok(Json(UploadResponse::from_file(&file, url)))
}
