//! Mess Menu Repository

use super::{RepoError, RepoResult};
use shared::models::{MessMenu, MessMenuUpsert};
use sqlx::SqlitePool;

const MENU_SELECT: &str =
    "SELECT hostel_id, date, breakfast, lunch, snacks, dinner, updated_at FROM mess_menu";

pub async fn find_by_date(
    pool: &SqlitePool,
    hostel_id: i64,
    date: &str,
) -> RepoResult<Option<MessMenu>> {
    let sql = format!("{MENU_SELECT} WHERE hostel_id = ? AND date = ?");
    let menu = sqlx::query_as::<_, MessMenu>(&sql)
        .bind(hostel_id)
        .bind(date)
        .fetch_optional(pool)
        .await?;
    Ok(menu)
}

/// Menus in the inclusive range `[from, to]`, ordered by date
pub async fn find_range(
    pool: &SqlitePool,
    hostel_id: i64,
    from: &str,
    to: &str,
) -> RepoResult<Vec<MessMenu>> {
    let sql = format!("{MENU_SELECT} WHERE hostel_id = ? AND date >= ? AND date <= ? ORDER BY date");
    let menus = sqlx::query_as::<_, MessMenu>(&sql)
        .bind(hostel_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;
    Ok(menus)
}

/// Insert or replace the menu of one date
///
/// Blank items are stored as NULL so they never count as served.
pub async fn upsert(
    pool: &SqlitePool,
    hostel_id: i64,
    date: &str,
    data: MessMenuUpsert,
) -> RepoResult<MessMenu> {
    let now = shared::util::now_millis();
    let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    sqlx::query(
        "INSERT INTO mess_menu (hostel_id, date, breakfast, lunch, snacks, dinner, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         ON CONFLICT(hostel_id, date) DO UPDATE SET breakfast = excluded.breakfast, lunch = excluded.lunch, snacks = excluded.snacks, dinner = excluded.dinner, updated_at = excluded.updated_at",
    )
    .bind(hostel_id)
    .bind(date)
    .bind(clean(data.breakfast))
    .bind(clean(data.lunch))
    .bind(clean(data.snacks))
    .bind(clean(data.dinner))
    .bind(now)
    .execute(pool)
    .await?;

    find_by_date(pool, hostel_id, date)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to upsert menu".into()))
}
