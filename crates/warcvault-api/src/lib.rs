//! Warcvault API Library
//!
//! HTTP handlers and application setup for archive downloads and the
//! committed-file catalog.

pub mod constants;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
