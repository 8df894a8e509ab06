//! Booking API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/hostels/{hostel_id}/bookings | POST | 按日订餐 |
//! | /api/hostels/{hostel_id}/bookings | GET | 订餐记录 (报表) |
//! | /api/hostels/{hostel_id}/bookings/range | POST | 按区间订餐 |
//! | /api/hostels/{hostel_id}/bookings/cancel | POST | 取消 |
//! | /api/hostels/{hostel_id}/bookings/manual | POST | 管理员代订 |
//! | /api/hostels/{hostel_id}/bookings/consume | POST | 标记已就餐 |
//! | /api/bookings/{id} | PUT | 修改 |
//! | /api/bookings/{id}/reverse | POST | 撤销 |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use super::guard::rate_guard;
use crate::core::ServerState;

/// Routes under `/api/hostels/{hostel_id}`
///
/// Only booking writes pass the rate guard; staff counter work
/// (manual, consume) does not.
pub fn hostel_routes(state: &ServerState) -> Router<ServerState> {
    let read_routes = Router::new().route("/bookings", get(handler::records));

    let booking_writes = Router::new()
        .route("/bookings", post(handler::book))
        .route("/bookings/range", post(handler::book_range))
        .route("/bookings/cancel", post(handler::cancel))
        .layer(middleware::from_fn_with_state(state.clone(), rate_guard));

    let staff_writes = Router::new()
        .route("/bookings/manual", post(handler::manual_book))
        .route("/bookings/consume", post(handler::consume));

    read_routes.merge(booking_writes).merge(staff_writes)
}

/// Routes under `/api/bookings`
pub fn booking_routes(state: &ServerState) -> Router<ServerState> {
    let edit_routes = Router::new()
        .route("/{id}", put(handler::edit))
        .layer(middleware::from_fn_with_state(state.clone(), rate_guard));

    edit_routes.merge(Router::new().route("/{id}/reverse", post(handler::reverse)))
}
