//! 订餐核心
//!
//! - [`cutoff`] - 截止时间校验 (pure)
//! - [`status`] - 派生状态决策表 (pure)
//! - [`plan`] - per-slot transition planning (pure)
//! - [`BookingService`] - transactional writes

pub mod cutoff;
pub mod plan;
pub mod service;
pub mod status;

pub use cutoff::{CutoffPolicy, Decision, DenyReason};
pub use service::BookingService;
pub use status::{derive_status, display_status};
