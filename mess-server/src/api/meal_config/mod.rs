//! 餐次配置 API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/hostels/{hostel_id}/meal-timing | GET / PUT | 用餐时间 |
//! | /api/hostels/{hostel_id}/meal-cutoff | GET / PUT | 截止时间 |
//! | /api/hostels/{hostel_id}/menus | GET | 菜单区间 (`from` / `to`) |
//! | /api/hostels/{hostel_id}/menus/{date} | PUT | 发布菜单 |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Routes under `/api/hostels/{hostel_id}`
pub fn hostel_routes() -> Router<ServerState> {
    Router::new()
        .route(
            "/meal-timing",
            get(handler::get_timing).put(handler::put_timing),
        )
        .route(
            "/meal-cutoff",
            get(handler::get_cutoff).put(handler::put_cutoff),
        )
        .route("/menus", get(handler::list_menus))
        .route("/menus/{date}", axum::routing::put(handler::put_menu))
}
