//! Calendar, analytics and reporting views

use super::booking::{BookedBy, BookingAction, DerivedStatus, SlotState};
use super::meal::{MealSlot, MealTiming};
use super::residence::Gatepass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One day of a student's calendar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: String,
    pub booking_id: Option<i64>,
    pub slots: BTreeMap<MealSlot, DerivedStatus>,
}

/// Monthly (or single-day) calendar of a student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarView {
    pub hostel_id: i64,
    pub student_id: i64,
    pub from: String,
    pub to: String,
    pub timing: Option<MealTiming>,
    pub days: Vec<CalendarDay>,
}

/// Warden dashboard: per-slot counts of derived statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAnalytics {
    pub hostel_id: i64,
    pub date: String,
    pub total_students: u64,
    pub slots: BTreeMap<MealSlot, BTreeMap<DerivedStatus, u64>>,
}

/// Raw and derived view of one slot for one student-day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotView {
    pub state: Option<SlotState>,
    pub consumed: bool,
    pub derived: DerivedStatus,
}

/// Student-day row of the warden per-student view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentDay {
    pub student_id: i64,
    pub name: String,
    pub roll_no: String,
    pub floor: i32,
    pub room: String,
    pub booking_id: Option<i64>,
    pub slots: BTreeMap<MealSlot, SlotView>,
}

/// Sort direction of list queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    #[default]
    Recent,
    Oldest,
}

/// One booking-slot row of the reporting query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BookingRecord {
    pub booking_id: i64,
    pub date: String,
    pub student_id: i64,
    pub student_name: String,
    pub roll_no: String,
    pub floor: i32,
    pub room: String,
    pub slot: MealSlot,
    pub state: SlotState,
    pub consumed: bool,
    pub booked_by: BookedBy,
    pub cancellation_reason: Option<String>,
    pub is_reversible: bool,
    pub last_action: BookingAction,
    pub cutoff_bypassed: bool,
    pub updated_at: i64,

    #[cfg_attr(feature = "db", sqlx(skip))]
    #[serde(default)]
    pub derived: DerivedStatus,
}

/// One day of a gatepass correlation report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatepassDay {
    pub booking_id: i64,
    pub date: String,
    pub slots: BTreeMap<MealSlot, DerivedStatus>,
    /// Slots left CONFIRMED while the student was away
    pub booked_while_away: Vec<MealSlot>,
}

/// Bookings that fall inside a gatepass window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatepassBookings {
    pub gatepass: Gatepass,
    pub days: Vec<GatepassDay>,
}
