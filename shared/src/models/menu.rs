//! Mess Menu Model (菜单)

use super::meal::MealSlot;
use serde::{Deserialize, Serialize};

/// Published menu of one hostel for one date
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MessMenu {
    pub hostel_id: i64,
    /// Menu date (YYYY-MM-DD)
    pub date: String,
    pub breakfast: Option<String>,
    pub lunch: Option<String>,
    pub snacks: Option<String>,
    pub dinner: Option<String>,
    pub updated_at: i64,
}

impl MessMenu {
    pub fn item(&self, slot: MealSlot) -> Option<&str> {
        match slot {
            MealSlot::Breakfast => self.breakfast.as_deref(),
            MealSlot::Lunch => self.lunch.as_deref(),
            MealSlot::Snacks => self.snacks.as_deref(),
            MealSlot::Dinner => self.dinner.as_deref(),
        }
    }

    /// A slot is served only when its menu text is non-blank
    pub fn is_served(&self, slot: MealSlot) -> bool {
        self.item(slot).is_some_and(|s| !s.trim().is_empty())
    }
}

/// Upsert menu payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessMenuUpsert {
    pub breakfast: Option<String>,
    pub lunch: Option<String>,
    pub snacks: Option<String>,
    pub dinner: Option<String>,
}
