//! View builders
//!
//! Turn flat query rows into calendar days, student-days and counters.
//! No I/O here; the report service feeds the rows in.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use shared::models::{
    CalendarDay, DerivedStatus, MealSlot, MessMenu, SlotView, SortOrder, StudentDay,
};

use crate::booking::display_status;
use crate::db::repository::report::{SlotRow, StudentSlotRow};
use crate::utils::time::format_date;

fn served(menu: Option<&MessMenu>, slot: MealSlot) -> bool {
    menu.is_some_and(|m| m.is_served(slot))
}

/// One calendar entry per day, missing rows shown as NOT_BOOKED / NOT_APPLICABLE
pub fn calendar_days(
    days: &[NaiveDate],
    rows: &[SlotRow],
    menus: &[MessMenu],
    today: NaiveDate,
) -> Vec<CalendarDay> {
    let menus: HashMap<&str, &MessMenu> = menus.iter().map(|m| (m.date.as_str(), m)).collect();
    let mut by_date: HashMap<&str, Vec<&SlotRow>> = HashMap::new();
    for row in rows {
        by_date.entry(row.date.as_str()).or_default().push(row);
    }

    days.iter()
        .map(|&date| {
            let key = format_date(date);
            let menu = menus.get(key.as_str()).copied();
            let day_rows = by_date.get(key.as_str());
            let slots = MealSlot::ALL
                .into_iter()
                .map(|slot| {
                    let row = day_rows.and_then(|rs| rs.iter().find(|r| r.slot == slot));
                    let status = display_status(
                        row.map(|r| r.state),
                        row.is_some_and(|r| r.consumed),
                        date,
                        today,
                        served(menu, slot),
                    );
                    (slot, status)
                })
                .collect();
            CalendarDay {
                booking_id: day_rows.and_then(|rs| rs.first()).map(|r| r.booking_id),
                date: key,
                slots,
            }
        })
        .collect()
}

/// Student-day rows with (raw, derived) per slot
///
/// Input rows come from a LEFT JOIN: one row per slot, or a single row of
/// NULL slot columns when the student has no booking. The row order of
/// the query is preserved.
pub fn student_days(
    rows: Vec<StudentSlotRow>,
    date: NaiveDate,
    today: NaiveDate,
    menu: Option<&MessMenu>,
) -> Vec<(StudentDay, Option<i64>)> {
    let mut order: Vec<i64> = Vec::new();
    let mut grouped: HashMap<i64, (StudentDay, Option<i64>)> = HashMap::new();

    for row in rows {
        let entry = grouped.entry(row.student_id).or_insert_with(|| {
            order.push(row.student_id);
            (
                StudentDay {
                    student_id: row.student_id,
                    name: row.name.clone(),
                    roll_no: row.roll_no.clone(),
                    floor: row.floor,
                    room: row.room.clone(),
                    booking_id: row.booking_id,
                    slots: BTreeMap::new(),
                },
                row.booking_updated_at,
            )
        });
        if let (Some(slot), Some(state)) = (row.slot, row.state) {
            entry.0.slots.insert(
                slot,
                SlotView {
                    state: Some(state),
                    consumed: row.consumed.unwrap_or(false),
                    derived: DerivedStatus::NotBooked,
                },
            );
        }
    }

    order
        .into_iter()
        .filter_map(|id| grouped.remove(&id))
        .map(|(mut day, updated_at)| {
            for slot in MealSlot::ALL {
                let view = day.slots.entry(slot).or_insert(SlotView {
                    state: None,
                    consumed: false,
                    derived: DerivedStatus::NotBooked,
                });
                view.derived =
                    display_status(view.state, view.consumed, date, today, served(menu, slot));
            }
            (day, updated_at)
        })
        .collect()
}

/// Keep a student-day when ANY slot matches; an empty set keeps everything
pub fn retain_by_status(days: &mut Vec<(StudentDay, Option<i64>)>, statuses: &[DerivedStatus]) {
    if statuses.is_empty() {
        return;
    }
    days.retain(|(day, _)| day.slots.values().any(|v| statuses.contains(&v.derived)));
}

/// RECENT: latest booking update first, students without a booking last
pub fn sort_student_days(days: &mut [(StudentDay, Option<i64>)], sort: SortOrder) {
    match sort {
        SortOrder::Recent => days.sort_by(|a, b| b.1.cmp(&a.1)),
        SortOrder::Oldest => days.sort_by(|a, b| match (a.1, b.1) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }),
    }
}

/// Per slot, count of each derived status (every status present, zero or not)
pub fn count_by_status(days: &[(StudentDay, Option<i64>)]) -> BTreeMap<MealSlot, BTreeMap<DerivedStatus, u64>> {
    let mut counts: BTreeMap<MealSlot, BTreeMap<DerivedStatus, u64>> = MealSlot::ALL
        .into_iter()
        .map(|slot| (slot, DerivedStatus::ALL.into_iter().map(|s| (s, 0)).collect()))
        .collect();
    for (day, _) in days {
        for (slot, view) in &day.slots {
            if let Some(per_slot) = counts.get_mut(slot) {
                *per_slot.entry(view.derived).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Parse a comma separated status filter (`MISSED,CONFIRMED`)
pub fn parse_statuses(raw: Option<&str>) -> Result<Vec<DerivedStatus>, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let status: DerivedStatus = part.parse()?;
        if !out.contains(&status) {
            out.push(status);
        }
    }
    Ok(out)
}
