//! OpenAPI documentation, served at `/api/openapi.json` and rendered by
//! RapiDoc at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use convertly_core::{models, ConversionOperation};

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Convertly API",
        version = "0.1.0",
        description = "Document conversion service. Upload a file, start a conversion against the hosted provider and poll the job until it finishes."
    ),
    paths(
        handlers::upload::upload_file,
        handlers::files::get_file,
        handlers::convert::create_conversion,
        handlers::convert::get_conversion_status,
        handlers::batch::convert_batch,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::UploadResponse,
            models::ConvertRequest,
            models::ConvertResponse,
            models::ConversionJob,
            models::JobStatus,
            models::JobStatusResponse,
            models::BatchConvertRequest,
            models::BatchConvertResponse,
            models::BatchItemResult,
            ConversionOperation,
            error::ErrorResponse,
            handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "files", description = "Upload and re-serve files"),
        (name = "conversions", description = "Conversion jobs and status polling"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
