//! Convertly conversion providers
//!
//! The [`ConversionProvider`] trait is the seam between the orchestrator and
//! a hosted conversion service. [`CloudConvertProvider`] talks to the
//! CloudConvert v2 job API; `testing::ScriptedProvider` (feature `testing`)
//! replays scripted status sequences without network access.

pub mod cloudconvert;
pub mod error;
pub mod provider;
#[cfg(feature = "testing")]
pub mod testing;

pub use cloudconvert::CloudConvertProvider;
pub use error::ProviderError;
pub use provider::{
    ConversionProvider, ImportSource, RemoteFile, RemoteJob, RemoteJobSpec, RemoteStatus,
    RemoteTask, UploadForm,
};
