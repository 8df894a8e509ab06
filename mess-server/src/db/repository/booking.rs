//! Meal Booking Repository
//!
//! Rows are never deleted. Writes go through a transaction: the booking
//! row is created with an insert-if-absent on (hostel, student, date) and
//! every slot change is a compare-and-swap on the slot's current
//! `(state, consumed)` pair.

use super::{RepoError, RepoResult, Tx};
use shared::models::{
    BookedBy, BookingAction, MealBooking, MealBookingSlot, MealSlot, SlotState,
};
use sqlx::SqlitePool;

const BOOKING_SELECT: &str =
    "SELECT id, hostel_id, student_id, date, created_at, updated_at FROM meal_booking";

const SLOT_SELECT: &str = "SELECT booking_id, slot, state, consumed, booked_by, cancellation_reason, is_reversible, last_action, cutoff_bypassed, actor_id, created_at, updated_at FROM meal_booking_slot";

/// New values of a slot after a successful compare-and-swap
#[derive(Debug, Clone)]
pub struct SlotWrite {
    pub state: SlotState,
    pub consumed: bool,
    pub booked_by: BookedBy,
    pub cancellation_reason: Option<String>,
    pub is_reversible: bool,
    pub last_action: BookingAction,
    pub cutoff_bypassed: bool,
    pub actor_id: i64,
}

// ── Reads (pool) ────────────────────────────────────────────────────

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<MealBooking>> {
    let sql = format!("{BOOKING_SELECT} WHERE id = ?");
    let booking = sqlx::query_as::<_, MealBooking>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match booking {
        Some(mut b) => {
            b.slots = find_slots(pool, b.id).await?;
            Ok(Some(b))
        }
        None => Ok(None),
    }
}

pub async fn find_slots(pool: &SqlitePool, booking_id: i64) -> RepoResult<Vec<MealBookingSlot>> {
    let sql = format!("{SLOT_SELECT} WHERE booking_id = ?");
    let mut slots = sqlx::query_as::<_, MealBookingSlot>(&sql)
        .bind(booking_id)
        .fetch_all(pool)
        .await?;
    slots.sort_by_key(|s| s.slot);
    Ok(slots)
}

/// Bookings of one student on the given dates, with slots
pub async fn find_for_dates(
    pool: &SqlitePool,
    hostel_id: i64,
    student_id: i64,
    dates: &[String],
) -> RepoResult<Vec<MealBooking>> {
    if dates.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(BOOKING_SELECT);
    qb.push(" WHERE hostel_id = ")
        .push_bind(hostel_id)
        .push(" AND student_id = ")
        .push_bind(student_id)
        .push(" AND date IN (");
    let mut sep = qb.separated(", ");
    for d in dates {
        sep.push_bind(d.as_str());
    }
    sep.push_unseparated(") ORDER BY date");

    let mut bookings = qb
        .build_query_as::<MealBooking>()
        .fetch_all(pool)
        .await?;
    if bookings.is_empty() {
        return Ok(bookings);
    }

    let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(SLOT_SELECT);
    qb.push(" WHERE booking_id IN (");
    let mut sep = qb.separated(", ");
    for b in &bookings {
        sep.push_bind(b.id);
    }
    sep.push_unseparated(")");
    let slots = qb
        .build_query_as::<MealBookingSlot>()
        .fetch_all(pool)
        .await?;

    for booking in &mut bookings {
        booking.slots = slots
            .iter()
            .filter(|s| s.booking_id == booking.id)
            .cloned()
            .collect();
        booking.slots.sort_by_key(|s| s.slot);
    }
    Ok(bookings)
}

// ── Writes (transaction) ────────────────────────────────────────────

/// Create the booking row and its slot rows if absent, returning the id
///
/// `served` lists the slots with a published menu; the others start as
/// NOT_APPLICABLE. Existing rows are left untouched.
pub async fn ensure_booking(
    tx: &mut Tx<'_>,
    hostel_id: i64,
    student_id: i64,
    date: &str,
    served: &[MealSlot],
    booked_by: BookedBy,
    actor_id: i64,
) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO meal_booking (id, hostel_id, student_id, date, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
         ON CONFLICT(hostel_id, student_id, date) DO NOTHING",
    )
    .bind(shared::util::snowflake_id())
    .bind(hostel_id)
    .bind(student_id)
    .bind(date)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    let booking_id: i64 = sqlx::query_scalar(
        "SELECT id FROM meal_booking WHERE hostel_id = ? AND student_id = ? AND date = ?",
    )
    .bind(hostel_id)
    .bind(student_id)
    .bind(date)
    .fetch_one(&mut **tx)
    .await?;

    for slot in MealSlot::ALL {
        let state = if served.contains(&slot) {
            SlotState::Pending
        } else {
            SlotState::NotApplicable
        };
        sqlx::query(
            "INSERT OR IGNORE INTO meal_booking_slot (booking_id, slot, state, consumed, booked_by, is_reversible, last_action, cutoff_bypassed, actor_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, 0, ?4, 0, ?5, 0, ?6, ?7, ?7)",
        )
        .bind(booking_id)
        .bind(slot)
        .bind(state)
        .bind(booked_by)
        .bind(BookingAction::Created)
        .bind(actor_id)
        .bind(now)
        .execute(&mut **tx)
        .await?;
    }

    Ok(booking_id)
}

/// Compare-and-swap one slot
///
/// Applies `write` only if the slot still holds `expected`. Returns
/// whether the row was updated.
pub async fn cas_update_slot(
    tx: &mut Tx<'_>,
    booking_id: i64,
    slot: MealSlot,
    expected: (SlotState, bool),
    write: &SlotWrite,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let result = sqlx::query(
        "UPDATE meal_booking_slot SET state = ?1, consumed = ?2, booked_by = ?3, cancellation_reason = ?4, is_reversible = ?5, last_action = ?6, cutoff_bypassed = ?7, actor_id = ?8, updated_at = ?9 \
         WHERE booking_id = ?10 AND slot = ?11 AND state = ?12 AND consumed = ?13",
    )
    .bind(write.state)
    .bind(write.consumed)
    .bind(write.booked_by)
    .bind(&write.cancellation_reason)
    .bind(write.is_reversible)
    .bind(write.last_action)
    .bind(write.cutoff_bypassed)
    .bind(write.actor_id)
    .bind(now)
    .bind(booking_id)
    .bind(slot)
    .bind(expected.0)
    .bind(expected.1)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query("UPDATE meal_booking SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(booking_id)
        .execute(&mut **tx)
        .await?;
    Ok(true)
}

/// Re-read one slot inside the transaction (after a CAS miss)
pub async fn find_slot_tx(
    tx: &mut Tx<'_>,
    booking_id: i64,
    slot: MealSlot,
) -> RepoResult<MealBookingSlot> {
    let sql = format!("{SLOT_SELECT} WHERE booking_id = ? AND slot = ?");
    sqlx::query_as::<_, MealBookingSlot>(&sql)
        .bind(booking_id)
        .bind(slot)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Booking {booking_id} slot {slot}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::residence;
    use shared::models::{Hostel, Student};

    async fn seeded_pool() -> SqlitePool {
        let db = DbService::in_memory().await.unwrap();
        residence::upsert_hostel(
            &db.pool,
            &Hostel {
                id: 1,
                name: "North Block".into(),
            },
        )
        .await
        .unwrap();
        residence::upsert_student(
            &db.pool,
            &Student {
                id: 7,
                hostel_id: 1,
                name: "Asha".into(),
                roll_no: "CS-07".into(),
                floor: 2,
                room: "204".into(),
            },
        )
        .await
        .unwrap();
        db.pool
    }

    fn confirm_write() -> SlotWrite {
        SlotWrite {
            state: SlotState::Confirmed,
            consumed: false,
            booked_by: BookedBy::Student,
            cancellation_reason: None,
            is_reversible: true,
            last_action: BookingAction::Book,
            cutoff_bypassed: false,
            actor_id: 7,
        }
    }

    #[tokio::test]
    async fn test_ensure_booking_is_insert_if_absent() {
        let pool = seeded_pool().await;
        let served = [MealSlot::Breakfast, MealSlot::Lunch];

        let mut tx = pool.begin().await.unwrap();
        let first = ensure_booking(&mut tx, 1, 7, "2025-06-10", &served, BookedBy::Student, 7)
            .await
            .unwrap();
        let second = ensure_booking(&mut tx, 1, 7, "2025-06-10", &MealSlot::ALL, BookedBy::Student, 7)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first, second);
        let booking = find_by_id(&pool, first).await.unwrap().unwrap();
        assert_eq!(booking.slots.len(), 4);
        assert_eq!(
            booking.slot(MealSlot::Breakfast).unwrap().state,
            SlotState::Pending
        );
        // Second call must not rewrite the initial applicability
        assert_eq!(
            booking.slot(MealSlot::Dinner).unwrap().state,
            SlotState::NotApplicable
        );
    }

    #[tokio::test]
    async fn test_cas_update_only_applies_on_matching_snapshot() {
        let pool = seeded_pool().await;
        let mut tx = pool.begin().await.unwrap();
        let id = ensure_booking(&mut tx, 1, 7, "2025-06-10", &MealSlot::ALL, BookedBy::Student, 7)
            .await
            .unwrap();

        let applied = cas_update_slot(
            &mut tx,
            id,
            MealSlot::Lunch,
            (SlotState::Pending, false),
            &confirm_write(),
        )
        .await
        .unwrap();
        assert!(applied);

        // Stale snapshot: the slot is CONFIRMED now
        let applied = cas_update_slot(
            &mut tx,
            id,
            MealSlot::Lunch,
            (SlotState::Pending, false),
            &confirm_write(),
        )
        .await
        .unwrap();
        assert!(!applied);

        let slot = find_slot_tx(&mut tx, id, MealSlot::Lunch).await.unwrap();
        assert_eq!(slot.state, SlotState::Confirmed);
        assert!(slot.is_reversible);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_find_for_dates_groups_slots() {
        let pool = seeded_pool().await;
        let mut tx = pool.begin().await.unwrap();
        for date in ["2025-06-10", "2025-06-11"] {
            ensure_booking(&mut tx, 1, 7, date, &MealSlot::ALL, BookedBy::Student, 7)
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let dates = vec!["2025-06-11".to_string(), "2025-06-12".to_string()];
        let bookings = find_for_dates(&pool, 1, 7, &dates).await.unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].date, "2025-06-11");
        assert_eq!(bookings[0].slots.len(), 4);
        assert_eq!(bookings[0].slots[0].slot, MealSlot::Breakfast);
    }
}
