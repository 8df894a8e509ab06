//! Booking API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::models::{
    BookRangeRequest, BookRequest, BookingRecord, CancelRequest, ConsumeRequest, EditRequest,
    ManualBookRequest, MealBooking, ReverseRequest,
};

use crate::auth::Actor;
use crate::core::ServerState;
use crate::reports::RecordQuery;
use crate::utils::{ApiResponse, AppResult, ok, ok_list};

/// POST /api/hostels/:hostel_id/bookings - 按日订餐
pub async fn book(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
    Json(payload): Json<BookRequest>,
) -> AppResult<Json<ApiResponse<Vec<MealBooking>>>> {
    let bookings = state.bookings.book(&actor, hostel_id, payload).await?;
    Ok(ok(bookings))
}

/// POST /api/hostels/:hostel_id/bookings/range - 按区间订餐
pub async fn book_range(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
    Json(payload): Json<BookRangeRequest>,
) -> AppResult<Json<ApiResponse<Vec<MealBooking>>>> {
    let bookings = state.bookings.book_range(&actor, hostel_id, payload).await?;
    Ok(ok(bookings))
}

/// POST /api/hostels/:hostel_id/bookings/cancel - 取消
pub async fn cancel(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
    Json(payload): Json<CancelRequest>,
) -> AppResult<Json<ApiResponse<Vec<MealBooking>>>> {
    let bookings = state.bookings.cancel(&actor, hostel_id, payload).await?;
    Ok(ok(bookings))
}

/// POST /api/hostels/:hostel_id/bookings/manual - 管理员代订
pub async fn manual_book(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
    Json(payload): Json<ManualBookRequest>,
) -> AppResult<Json<ApiResponse<MealBooking>>> {
    let booking = state.bookings.manual_book(&actor, hostel_id, payload).await?;
    Ok(ok(booking))
}

/// POST /api/hostels/:hostel_id/bookings/consume - 标记已就餐
pub async fn consume(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
    Json(payload): Json<ConsumeRequest>,
) -> AppResult<Json<ApiResponse<MealBooking>>> {
    let booking = state.bookings.consume(&actor, hostel_id, payload).await?;
    Ok(ok(booking))
}

/// PUT /api/bookings/:id - 修改
pub async fn edit(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<EditRequest>,
) -> AppResult<Json<ApiResponse<MealBooking>>> {
    let booking = state.bookings.edit(&actor, id, payload).await?;
    Ok(ok(booking))
}

/// POST /api/bookings/:id/reverse - 撤销
pub async fn reverse(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<ReverseRequest>,
) -> AppResult<Json<ApiResponse<MealBooking>>> {
    let booking = state.bookings.reverse(&actor, id, payload).await?;
    Ok(ok(booking))
}

/// GET /api/hostels/:hostel_id/bookings - 订餐记录 (分页)
pub async fn records(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
    Query(query): Query<RecordQuery>,
) -> AppResult<Json<ApiResponse<Vec<BookingRecord>>>> {
    let (records, count) = state.reports.records(&actor, hostel_id, query).await?;
    Ok(ok_list(records, count))
}
