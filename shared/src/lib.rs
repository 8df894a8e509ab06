//! Shared types for the mess booking service
//!
//! Error codes, the unified response envelope, data models and small
//! utilities used by the server and its API clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
