//! Read-side queries for calendars, dashboards and reports

use super::RepoResult;
use shared::models::{BookingRecord, MealSlot, SlotState, SortOrder};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// One slot of one booking, flattened with its date
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SlotRow {
    pub booking_id: i64,
    pub date: String,
    pub slot: MealSlot,
    pub state: SlotState,
    pub consumed: bool,
}

/// Student joined with the slots of their booking for one date
///
/// Slot columns are NULL when the student has no booking that day.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentSlotRow {
    pub student_id: i64,
    pub name: String,
    pub roll_no: String,
    pub floor: i32,
    pub room: String,
    pub booking_id: Option<i64>,
    pub booking_updated_at: Option<i64>,
    pub slot: Option<MealSlot>,
    pub state: Option<SlotState>,
    pub consumed: Option<bool>,
}

/// Filters of the per-student dashboard (applied in SQL)
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub floor: Option<i32>,
    pub room: Option<String>,
    pub search: Option<String>,
}

/// Filters of the booking record report
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub state: Option<SlotState>,
    pub slot: Option<MealSlot>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub floor: Option<i32>,
    pub room: Option<String>,
    pub search: Option<String>,
    pub sort: SortOrder,
}

/// All slot rows of one student in `[from, to]` (single range query)
pub async fn student_slots_in_range(
    pool: &SqlitePool,
    hostel_id: i64,
    student_id: i64,
    from: &str,
    to: &str,
) -> RepoResult<Vec<SlotRow>> {
    let rows = sqlx::query_as::<_, SlotRow>(
        "SELECT b.id AS booking_id, b.date, s.slot, s.state, s.consumed \
         FROM meal_booking b JOIN meal_booking_slot s ON s.booking_id = b.id \
         WHERE b.hostel_id = ? AND b.student_id = ? AND b.date >= ? AND b.date <= ? \
         ORDER BY b.date",
    )
    .bind(hostel_id)
    .bind(student_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// `%term%` with LIKE wildcards in the term matched literally
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Free-text match on student name or roll number
fn push_search(qb: &mut QueryBuilder<'_, Sqlite>, term: &str) {
    let pattern = like_pattern(term);
    qb.push(" AND (st.name LIKE ")
        .push_bind(pattern.clone())
        .push(" ESCAPE '\\' OR st.roll_no LIKE ")
        .push_bind(pattern)
        .push(" ESCAPE '\\')");
}

/// Every student of the hostel LEFT JOINed with their slots on `date`
pub async fn students_with_slots(
    pool: &SqlitePool,
    hostel_id: i64,
    date: &str,
    filter: &StudentFilter,
) -> RepoResult<Vec<StudentSlotRow>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT st.id AS student_id, st.name, st.roll_no, st.floor, st.room, \
         b.id AS booking_id, b.updated_at AS booking_updated_at, s.slot, s.state, s.consumed \
         FROM student st \
         LEFT JOIN meal_booking b ON b.student_id = st.id AND b.hostel_id = st.hostel_id AND b.date = ",
    );
    qb.push_bind(date);
    qb.push(" LEFT JOIN meal_booking_slot s ON s.booking_id = b.id WHERE st.hostel_id = ")
        .push_bind(hostel_id);
    if let Some(floor) = filter.floor {
        qb.push(" AND st.floor = ").push_bind(floor);
    }
    if let Some(room) = &filter.room {
        qb.push(" AND st.room = ").push_bind(room.clone());
    }
    if let Some(search) = &filter.search {
        push_search(&mut qb, search);
    }
    qb.push(" ORDER BY st.roll_no, st.id");

    let rows = qb
        .build_query_as::<StudentSlotRow>()
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

fn push_record_filters(qb: &mut QueryBuilder<'_, Sqlite>, hostel_id: i64, filter: &RecordFilter) {
    qb.push(" WHERE b.hostel_id = ").push_bind(hostel_id);
    if let Some(state) = filter.state {
        qb.push(" AND s.state = ").push_bind(state);
    }
    if let Some(slot) = filter.slot {
        qb.push(" AND s.slot = ").push_bind(slot);
    }
    if let Some(from) = &filter.from {
        qb.push(" AND b.date >= ").push_bind(from.clone());
    }
    if let Some(to) = &filter.to {
        qb.push(" AND b.date <= ").push_bind(to.clone());
    }
    if let Some(floor) = filter.floor {
        qb.push(" AND st.floor = ").push_bind(floor);
    }
    if let Some(room) = &filter.room {
        qb.push(" AND st.room = ").push_bind(room.clone());
    }
    if let Some(search) = &filter.search {
        push_search(qb, search);
    }
}

const RECORD_FROM: &str = " FROM meal_booking_slot s \
     JOIN meal_booking b ON b.id = s.booking_id \
     JOIN student st ON st.id = b.student_id";

/// Count of booking-slot rows matching the filter
pub async fn count_records(
    pool: &SqlitePool,
    hostel_id: i64,
    filter: &RecordFilter,
) -> RepoResult<i64> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*)");
    qb.push(RECORD_FROM);
    push_record_filters(&mut qb, hostel_id, filter);
    let count: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// One page of booking-slot rows, RECENT = newest date first
pub async fn find_records(
    pool: &SqlitePool,
    hostel_id: i64,
    filter: &RecordFilter,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<BookingRecord>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT b.id AS booking_id, b.date, b.student_id, st.name AS student_name, st.roll_no, st.floor, st.room, \
         s.slot, s.state, s.consumed, s.booked_by, s.cancellation_reason, s.is_reversible, s.last_action, s.cutoff_bypassed, s.updated_at",
    );
    qb.push(RECORD_FROM);
    push_record_filters(&mut qb, hostel_id, filter);
    match filter.sort {
        SortOrder::Recent => qb.push(" ORDER BY b.date DESC, s.updated_at DESC, b.id DESC"),
        SortOrder::Oldest => qb.push(" ORDER BY b.date ASC, s.updated_at ASC, b.id ASC"),
    };
    // Slot order inside one booking is stable regardless of direction
    qb.push(", CASE s.slot WHEN 'breakfast' THEN 0 WHEN 'lunch' THEN 1 WHEN 'snacks' THEN 2 ELSE 3 END");
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    let rows = qb
        .build_query_as::<BookingRecord>()
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
