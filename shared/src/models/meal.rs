//! Meal slot, timing and cutoff models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Meal slot served by the mess
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Snacks,
    Dinner,
}

impl MealSlot {
    /// All slots in serving order
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Snacks,
        MealSlot::Dinner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Snacks => "snacks",
            MealSlot::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealSlot::Breakfast),
            "lunch" => Ok(MealSlot::Lunch),
            "snacks" => Ok(MealSlot::Snacks),
            "dinner" => Ok(MealSlot::Dinner),
            other => Err(format!("unknown meal slot: {other}")),
        }
    }
}

/// Service window of one slot (HH:MM, 24h)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotWindow {
    pub start: String,
    pub end: String,
}

/// Hostel meal timing (开餐时间)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealTiming {
    pub breakfast: SlotWindow,
    pub lunch: SlotWindow,
    pub snacks: SlotWindow,
    pub dinner: SlotWindow,
}

impl MealTiming {
    pub fn get(&self, slot: MealSlot) -> &SlotWindow {
        match slot {
            MealSlot::Breakfast => &self.breakfast,
            MealSlot::Lunch => &self.lunch,
            MealSlot::Snacks => &self.snacks,
            MealSlot::Dinner => &self.dinner,
        }
    }
}

/// Cutoff rule of one slot
///
/// `day_offset` is 0 for the target day itself or -1 for the day before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCutoff {
    pub day_offset: i32,
    pub time: String,
}

/// Hostel booking cutoff (截止时间)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealCutoff {
    pub breakfast: SlotCutoff,
    pub lunch: SlotCutoff,
    pub snacks: SlotCutoff,
    pub dinner: SlotCutoff,
}

impl MealCutoff {
    pub fn get(&self, slot: MealSlot) -> &SlotCutoff {
        match slot {
            MealSlot::Breakfast => &self.breakfast,
            MealSlot::Lunch => &self.lunch,
            MealSlot::Snacks => &self.snacks,
            MealSlot::Dinner => &self.dinner,
        }
    }
}

/// `meal_timing` row, one per (hostel, slot)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MealTimingRow {
    pub hostel_id: i64,
    pub slot: MealSlot,
    pub start_time: String,
    pub end_time: String,
    pub updated_at: i64,
}

/// `meal_cutoff` row, one per (hostel, slot)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MealCutoffRow {
    pub hostel_id: i64,
    pub slot: MealSlot,
    pub day_offset: i32,
    pub cutoff_time: String,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_parse_and_display() {
        assert_eq!("Lunch".parse::<MealSlot>().unwrap(), MealSlot::Lunch);
        assert_eq!(" dinner ".parse::<MealSlot>().unwrap(), MealSlot::Dinner);
        assert!("supper".parse::<MealSlot>().is_err());
        assert_eq!(MealSlot::Snacks.to_string(), "snacks");
    }

    #[test]
    fn test_slot_serde_lowercase() {
        let json = serde_json::to_string(&MealSlot::Breakfast).unwrap();
        assert_eq!(json, "\"breakfast\"");
        let slot: MealSlot = serde_json::from_str("\"snacks\"").unwrap();
        assert_eq!(slot, MealSlot::Snacks);
    }

    #[test]
    fn test_slot_order_follows_service_order() {
        let mut slots = vec![MealSlot::Dinner, MealSlot::Breakfast, MealSlot::Snacks];
        slots.sort();
        assert_eq!(
            slots,
            vec![MealSlot::Breakfast, MealSlot::Snacks, MealSlot::Dinner]
        );
    }
}
