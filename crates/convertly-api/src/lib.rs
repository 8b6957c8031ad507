//! Convertly API Library
//!
//! HTTP handlers, error mapping and application setup for the conversion
//! service.

mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;
mod telemetry;
mod utils;

pub mod error;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
