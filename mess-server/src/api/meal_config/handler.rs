//! Meal Config API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::models::{MealCutoff, MealTiming, MessMenu, MessMenuUpsert};

use crate::auth::Actor;
use crate::core::ServerState;
use crate::db::repository::residence;
use crate::utils::time::parse_date;
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode, ok};

#[derive(Debug, Deserialize)]
pub struct MenuRangeQuery {
    pub from: String,
    pub to: String,
}

async fn ensure_hostel(state: &ServerState, hostel_id: i64) -> AppResult<()> {
    if residence::find_hostel(&state.pool, hostel_id).await?.is_none() {
        return Err(AppError::with_message(
            ErrorCode::HostelNotFound,
            format!("Hostel {hostel_id} not found"),
        ));
    }
    Ok(())
}

/// GET /api/hostels/:hostel_id/meal-timing
pub async fn get_timing(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
) -> AppResult<Json<ApiResponse<MealTiming>>> {
    actor.require_hostel(hostel_id)?;
    let timing = state.meal_config.timing(hostel_id).await?;
    Ok(ok(timing))
}

/// PUT /api/hostels/:hostel_id/meal-timing
pub async fn put_timing(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
    Json(payload): Json<MealTiming>,
) -> AppResult<Json<ApiResponse<MealTiming>>> {
    actor.require_staff_in(hostel_id)?;
    ensure_hostel(&state, hostel_id).await?;
    let timing = state.meal_config.put_timing(hostel_id, payload).await?;
    Ok(ok(timing))
}

/// GET /api/hostels/:hostel_id/meal-cutoff
pub async fn get_cutoff(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
) -> AppResult<Json<ApiResponse<MealCutoff>>> {
    actor.require_hostel(hostel_id)?;
    let cutoff = state.meal_config.cutoff(hostel_id).await?;
    Ok(ok(cutoff))
}

/// PUT /api/hostels/:hostel_id/meal-cutoff
pub async fn put_cutoff(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
    Json(payload): Json<MealCutoff>,
) -> AppResult<Json<ApiResponse<MealCutoff>>> {
    actor.require_staff_in(hostel_id)?;
    ensure_hostel(&state, hostel_id).await?;
    let cutoff = state.meal_config.put_cutoff(hostel_id, payload).await?;
    Ok(ok(cutoff))
}

/// GET /api/hostels/:hostel_id/menus?from=&to=
pub async fn list_menus(
    State(state): State<ServerState>,
    actor: Actor,
    Path(hostel_id): Path<i64>,
    Query(query): Query<MenuRangeQuery>,
) -> AppResult<Json<ApiResponse<Vec<MessMenu>>>> {
    actor.require_hostel(hostel_id)?;
    let from = parse_date(&query.from)?;
    let to = parse_date(&query.to)?;
    let menus = state.meal_config.list_menus(hostel_id, from, to).await?;
    Ok(ok(menus))
}

/// PUT /api/hostels/:hostel_id/menus/:date
pub async fn put_menu(
    State(state): State<ServerState>,
    actor: Actor,
    Path((hostel_id, date)): Path<(i64, String)>,
    Json(payload): Json<MessMenuUpsert>,
) -> AppResult<Json<ApiResponse<MessMenu>>> {
    actor.require_staff_in(hostel_id)?;
    let date = parse_date(&date)?;
    ensure_hostel(&state, hostel_id).await?;
    let menu = state.meal_config.put_menu(hostel_id, date, payload).await?;
    Ok(ok(menu))
}
