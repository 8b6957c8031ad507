//! Conversion orchestration: upload -> remote pipeline -> poll -> artifact.

mod batch;
mod orchestrator;

pub use orchestrator::{ConversionOrchestrator, OrchestratorConfig};
