//! Convertly Core Library
//!
//! Domain models, error types, configuration, validation and the poll loop
//! shared by every convertly component.

pub mod config;
pub mod error;
pub mod formats;
pub mod models;
pub mod poll;
pub mod storage_types;
pub mod validation;

pub use config::{BaseConfig, Config, ConverterConfig, ImportMode, ProviderCredential};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use formats::{derive_output_filename, ConversionOperation, ConversionPlan};
pub use poll::{poll_until_terminal, PollError, PollPolicy, PollStatus};
pub use storage_types::StorageBackend;
pub use validation::{FileValidator, ValidationError};
