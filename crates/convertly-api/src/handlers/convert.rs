use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::ConversionState;
use axum::{
    extract::{Query, State},
    Json,
};
use convertly_core::models::{ConvertRequest, ConvertResponse, JobStatusResponse};
use convertly_core::AppError;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// Job ID returned by `POST /convert`
    #[serde(alias = "job_id")]
    job_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/convert",
    tag = "conversions",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Job created; provider failures show up as status `error`", body = ConvertResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(conversions, request), fields(file_id = %request.file_id, target = %request.target_format))]
pub async fn create_conversion(
    State(conversions): State<ConversionState>,
    ValidatedJson(request): ValidatedJson<ConvertRequest>,
) -> Result<Json<ConvertResponse>, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let job = conversions
        .orchestrator
        .create_job(
            request.file_id,
            &request.target_format,
            request.options.as_ref(),
        )
        .await?;

    Ok(Json(ConvertResponse {
        job_id: job.job_id,
        data: job,
    }))
}

#[utoipa::path(
    get,
    path = "/convert",
    tag = "conversions",
    params(StatusQuery),
    responses(
        (status = 200, description = "Current job status", body = JobStatusResponse),
        (status = 400, description = "Missing or malformed jobId", body = ErrorResponse),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(conversions))]
pub async fn get_conversion_status(
    State(conversions): State<ConversionState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<JobStatusResponse>, HttpAppError> {
    let raw = query
        .job_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("jobId query parameter is required".to_string()))?;
    let job_id = Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidInput(format!("Invalid jobId: '{}'", raw)))?;

    let job = conversions.orchestrator.poll_status(job_id).await?;

    Ok(Json(JobStatusResponse::from(&job)))
}
