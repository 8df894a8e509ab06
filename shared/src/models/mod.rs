//! Data models
//!
//! Shared between mess-server and its API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod booking;
pub mod meal;
pub mod menu;
pub mod report;
pub mod residence;

// Re-exports
pub use booking::*;
pub use meal::*;
pub use menu::*;
pub use report::*;
pub use residence::*;
