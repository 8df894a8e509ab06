//! Meal Booking Model (订餐)

use super::meal::MealSlot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Stored state of one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum SlotState {
    Pending,
    Confirmed,
    Skipped,
    /// No menu was published for the slot when the row was created
    NotApplicable,
}

impl SlotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotState::Pending => "PENDING",
            SlotState::Confirmed => "CONFIRMED",
            SlotState::Skipped => "SKIPPED",
            SlotState::NotApplicable => "NOT_APPLICABLE",
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(SlotState::Pending),
            "CONFIRMED" => Ok(SlotState::Confirmed),
            "SKIPPED" => Ok(SlotState::Skipped),
            "NOT_APPLICABLE" => Ok(SlotState::NotApplicable),
            other => Err(format!("unknown slot state: {other}")),
        }
    }
}

/// Who initiated the current slot state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum BookedBy {
    Student,
    Staff,
}

/// Last operation applied to a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum BookingAction {
    Created,
    Book,
    Cancel,
    Edit,
    Manual,
    Reverse,
    Consume,
}

/// Display status derived from stored state, consumption and the date
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DerivedStatus {
    #[default]
    NotBooked,
    NotApplicable,
    Pending,
    Confirmed,
    Consumed,
    Missed,
    Skipped,
    SkippedConsumed,
}

impl DerivedStatus {
    pub const ALL: [DerivedStatus; 8] = [
        DerivedStatus::NotBooked,
        DerivedStatus::NotApplicable,
        DerivedStatus::Pending,
        DerivedStatus::Confirmed,
        DerivedStatus::Consumed,
        DerivedStatus::Missed,
        DerivedStatus::Skipped,
        DerivedStatus::SkippedConsumed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedStatus::NotBooked => "NOT_BOOKED",
            DerivedStatus::NotApplicable => "NOT_APPLICABLE",
            DerivedStatus::Pending => "PENDING",
            DerivedStatus::Confirmed => "CONFIRMED",
            DerivedStatus::Consumed => "CONSUMED",
            DerivedStatus::Missed => "MISSED",
            DerivedStatus::Skipped => "SKIPPED",
            DerivedStatus::SkippedConsumed => "SKIPPED_CONSUMED",
        }
    }
}

impl fmt::Display for DerivedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DerivedStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        DerivedStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| format!("unknown booking status: {}", s.trim()))
    }
}

/// Per-slot booking row (`meal_booking_slot`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MealBookingSlot {
    pub booking_id: i64,
    pub slot: MealSlot,
    pub state: SlotState,
    pub consumed: bool,
    pub booked_by: BookedBy,
    pub cancellation_reason: Option<String>,
    pub is_reversible: bool,
    pub last_action: BookingAction,
    /// Set when the last write skipped the cutoff check
    pub cutoff_bypassed: bool,
    /// Actor of the last write
    pub actor_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Booking of one student for one date (`meal_booking`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MealBooking {
    pub id: i64,
    pub hostel_id: i64,
    pub student_id: i64,
    /// Booking date (YYYY-MM-DD)
    pub date: String,
    pub created_at: i64,
    pub updated_at: i64,

    // -- Relations (populated by application code, skipped by FromRow) --
    #[cfg_attr(feature = "db", sqlx(skip))]
    #[serde(default)]
    pub slots: Vec<MealBookingSlot>,
}

impl MealBooking {
    pub fn slot(&self, slot: MealSlot) -> Option<&MealBookingSlot> {
        self.slots.iter().find(|s| s.slot == slot)
    }
}

// ==================== Request payloads ====================

/// One day of a multi-day request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayEntry {
    /// Target date (YYYY-MM-DD)
    pub date: String,
    #[serde(default)]
    pub slots: Vec<MealSlot>,
    /// Expands to all four slots
    #[serde(default)]
    pub is_full_day: bool,
}

/// Book explicit days
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRequest {
    /// Required for staff callers, defaults to the caller for students
    pub student_id: Option<i64>,
    pub days: Vec<DayEntry>,
}

/// Book every day of an inclusive date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRangeRequest {
    pub student_id: Option<i64>,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub slots: Vec<MealSlot>,
    #[serde(default)]
    pub is_full_day: bool,
}

/// Cancel booked days
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub student_id: Option<i64>,
    pub days: Vec<DayEntry>,
    pub cancellation_reason: Option<String>,
}

/// Target of an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotChoice {
    Confirmed,
    Skipped,
}

impl From<SlotChoice> for SlotState {
    fn from(choice: SlotChoice) -> Self {
        match choice {
            SlotChoice::Confirmed => SlotState::Confirmed,
            SlotChoice::Skipped => SlotState::Skipped,
        }
    }
}

/// Replace per-slot choices of an existing booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditRequest {
    pub slots: BTreeMap<MealSlot, SlotChoice>,
    pub cancellation_reason: Option<String>,
}

/// Staff books slots for a student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualBookRequest {
    pub student_id: i64,
    pub date: String,
    #[serde(default)]
    pub slots: Vec<MealSlot>,
    #[serde(default)]
    pub is_full_day: bool,
}

/// Staff marks slots as served
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumeRequest {
    pub student_id: i64,
    pub date: String,
    pub slots: Vec<MealSlot>,
}

/// Staff undoes the last change of some slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseRequest {
    pub slots: Vec<MealSlot>,
}
