//! Route paths and HTTP limits.

pub const UPLOAD_PATH: &str = "/upload";
pub const FILES_PATH: &str = "/files/{id}";
pub const CONVERT_PATH: &str = "/convert";
pub const BATCH_CONVERT_PATH: &str = "/convert/batch";
pub const HEALTH_PATH: &str = "/health";
pub const OPENAPI_PATH: &str = "/api/openapi.json";
pub const DOCS_PATH: &str = "/docs";

/// Room for multipart boundaries and headers on top of the file size limit.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub const DEFAULT_HTTP_CONCURRENCY_LIMIT: usize = 1024;
