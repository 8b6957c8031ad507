//! Repositories for the data access layer
//!
//! Each repository owns one record type and maps store failures onto
//! `AppError`.

mod jobs;
mod locks;
mod uploads;

pub use jobs::JobRepository;
pub use locks::KeyedLocks;
pub use uploads::UploadRepository;

use convertly_core::AppError;
use convertly_storage::StorageError;

pub(crate) fn storage_error(err: StorageError) -> AppError {
    AppError::Storage(err.to_string())
}
