//! Convertly Services Layer
//!
//! Business coordination between the record repositories and the conversion
//! provider. HTTP handling stays in convertly-api.

pub mod cleanup;
pub mod orchestration;

pub use cleanup::CleanupService;
pub use orchestration::{ConversionOrchestrator, OrchestratorConfig};
