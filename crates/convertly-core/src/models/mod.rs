//! Data models shared by the API, services and client.

mod conversion;
mod upload;

pub use conversion::{
    BatchConvertRequest, BatchConvertResponse, BatchItemResult, ConversionJob, ConvertRequest,
    ConvertResponse, JobPatch, JobStatus, JobStatusResponse, MAX_BATCH_FILES,
};
pub use upload::{UploadResponse, UploadedFile};
