//! Report API 模块 (只读)
//!
//! | 路径 | 说明 |
//! |------|------|
//! | /api/hostels/{hostel_id}/students/{student_id}/calendar | 学生月历 |
//! | /api/hostels/{hostel_id}/analytics/daily | 当日各餐次统计 |
//! | /api/hostels/{hostel_id}/analytics/students | 当日学生列表 |
//! | /api/hostels/{hostel_id}/gatepasses/{id}/bookings | 外出期间订餐 |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Routes under `/api/hostels/{hostel_id}`
pub fn hostel_routes() -> Router<ServerState> {
    Router::new()
        .route("/students/{student_id}/calendar", get(handler::calendar))
        .route("/analytics/daily", get(handler::daily))
        .route("/analytics/students", get(handler::students))
        .route("/gatepasses/{id}/bookings", get(handler::gatepass_bookings))
}
