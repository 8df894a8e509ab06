//! 统一错误处理
//!
//! 错误类型来自 `shared::error`，这里只补充 handler 常用的响应构造函数。
//!
//! # 使用示例
//!
//! ```ignore
//! // 返回错误
//! Err(AppError::with_message(ErrorCode::BookingNotFound, "Booking 42 not found"))
//!
//! // 返回成功响应
//! Ok(ok(booking))
//! ```

use axum::Json;

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

/// 成功响应
pub fn ok<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// 分页列表响应 (`count` 为过滤后的总数)
pub fn ok_list<T>(data: Vec<T>, count: u64) -> Json<ApiResponse<Vec<T>>> {
    Json(ApiResponse::list(data, count))
}
