//! Meal Timing / Cutoff Repository
//!
//! Stored as one row per (hostel, slot); a hostel counts as configured
//! only when all four slots are present.

use super::RepoResult;
use shared::models::{
    MealCutoff, MealCutoffRow, MealSlot, MealTiming, MealTimingRow, SlotCutoff, SlotWindow,
};
use sqlx::SqlitePool;
use std::collections::HashMap;

pub async fn find_timing(pool: &SqlitePool, hostel_id: i64) -> RepoResult<Option<MealTiming>> {
    let rows = sqlx::query_as::<_, MealTimingRow>(
        "SELECT hostel_id, slot, start_time, end_time, updated_at FROM meal_timing WHERE hostel_id = ?",
    )
    .bind(hostel_id)
    .fetch_all(pool)
    .await?;

    let mut by_slot: HashMap<MealSlot, SlotWindow> = rows
        .into_iter()
        .map(|r| {
            (
                r.slot,
                SlotWindow {
                    start: r.start_time,
                    end: r.end_time,
                },
            )
        })
        .collect();

    Ok(complete(&mut by_slot).map(|[breakfast, lunch, snacks, dinner]| MealTiming {
        breakfast,
        lunch,
        snacks,
        dinner,
    }))
}

pub async fn find_cutoff(pool: &SqlitePool, hostel_id: i64) -> RepoResult<Option<MealCutoff>> {
    let rows = sqlx::query_as::<_, MealCutoffRow>(
        "SELECT hostel_id, slot, day_offset, cutoff_time, updated_at FROM meal_cutoff WHERE hostel_id = ?",
    )
    .bind(hostel_id)
    .fetch_all(pool)
    .await?;

    let mut by_slot: HashMap<MealSlot, SlotCutoff> = rows
        .into_iter()
        .map(|r| {
            (
                r.slot,
                SlotCutoff {
                    day_offset: r.day_offset,
                    time: r.cutoff_time,
                },
            )
        })
        .collect();

    Ok(complete(&mut by_slot).map(|[breakfast, lunch, snacks, dinner]| MealCutoff {
        breakfast,
        lunch,
        snacks,
        dinner,
    }))
}

/// Replace all four timing rows of a hostel
pub async fn upsert_timing(pool: &SqlitePool, hostel_id: i64, timing: &MealTiming) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;
    for slot in MealSlot::ALL {
        let window = timing.get(slot);
        sqlx::query(
            "INSERT INTO meal_timing (hostel_id, slot, start_time, end_time, updated_at) VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(hostel_id, slot) DO UPDATE SET start_time = excluded.start_time, end_time = excluded.end_time, updated_at = excluded.updated_at",
        )
        .bind(hostel_id)
        .bind(slot)
        .bind(&window.start)
        .bind(&window.end)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Replace all four cutoff rows of a hostel
pub async fn upsert_cutoff(pool: &SqlitePool, hostel_id: i64, cutoff: &MealCutoff) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;
    for slot in MealSlot::ALL {
        let rule = cutoff.get(slot);
        sqlx::query(
            "INSERT INTO meal_cutoff (hostel_id, slot, day_offset, cutoff_time, updated_at) VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(hostel_id, slot) DO UPDATE SET day_offset = excluded.day_offset, cutoff_time = excluded.cutoff_time, updated_at = excluded.updated_at",
        )
        .bind(hostel_id)
        .bind(slot)
        .bind(rule.day_offset)
        .bind(&rule.time)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

fn complete<T>(by_slot: &mut HashMap<MealSlot, T>) -> Option<[T; 4]> {
    if MealSlot::ALL.iter().any(|s| !by_slot.contains_key(s)) {
        return None;
    }
    Some([
        by_slot.remove(&MealSlot::Breakfast)?,
        by_slot.remove(&MealSlot::Lunch)?,
        by_slot.remove(&MealSlot::Snacks)?,
        by_slot.remove(&MealSlot::Dinner)?,
    ])
}
