//! Report API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{CalendarView, DailyAnalytics, GatepassBookings, StudentDay};

use crate::auth::Actor;
use crate::core::ServerState;
use crate::reports::{CalendarQuery, StudentQuery};
use crate::utils::{ApiResponse, AppResult, ok, ok_list};

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: String,
}

/// GET /api/hostels/:hostel_id/students/:student_id/calendar
pub async fn calendar(
    State(state): State<ServerState>,
    actor: Actor,
    Path((hostel_id, student_id)): Path<(i64, i64)>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<ApiResponse<CalendarView>>> {
    let view = state
        .reports
        .calendar(&actor, hostel_id, student_id, query)
        .await?;
    Ok(ok(view))
}

/// GET /api/hostels/:hostel_id/analytics/daily?date=
pub async fn daily(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
    Query(query): Query<DailyQuery>,
) -> AppResult<Json<ApiResponse<DailyAnalytics>>> {
    let analytics = state
        .reports
        .daily_analytics(&actor, hostel_id, &query.date)
        .await?;
    Ok(ok(analytics))
}

/// GET /api/hostels/:hostel_id/analytics/students?date=&statuses=
pub async fn students(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
    Query(query): Query<StudentQuery>,
) -> AppResult<Json<ApiResponse<Vec<StudentDay>>>> {
    let (days, count) = state.reports.students(&actor, hostel_id, query).await?;
    Ok(ok_list(days, count))
}

/// GET /api/hostels/:hostel_id/gatepasses/:id/bookings
pub async fn gatepass_bookings(
    State(state): State<ServerState>,
    actor: Actor,
    Path((hostel_id, gatepass_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<GatepassBookings>>> {
    let bookings = state
        .reports
        .gatepass_bookings(&actor, hostel_id, gatepass_id)
        .await?;
    Ok(ok(bookings))
}
