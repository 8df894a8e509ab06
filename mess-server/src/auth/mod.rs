//! 身份与权限模块
//!
//! - [`Actor`] - 网关转发的调用方身份
//! - [`Role`] - student / warden / admin
//! - [`extractor`] - axum 提取器 (`x-actor-*` 请求头)

pub mod actor;
pub mod extractor;

pub use actor::{Actor, Role};
