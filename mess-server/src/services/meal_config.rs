//! Meal Config Service - 餐次时间 / 截止规则 / 菜单
//!
//! Timing and cutoff are read on every booking action, so they sit behind a
//! per-hostel cache. An entry is served until its TTL elapses, then
//! reloaded; writes drop the entry immediately.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use dashmap::DashMap;
use shared::models::{MealCutoff, MealSlot, MealTiming, MessMenu, MessMenuUpsert};
use sqlx::SqlitePool;

use crate::db::repository::{meal_config, menu};
use crate::utils::time::{format_date, parse_time_of_day, span_days};
use crate::utils::validation::{MAX_MENU_ITEM_LEN, MAX_MENU_RANGE_DAYS, validate_optional_text};
use crate::utils::{AppError, AppResult, ErrorCode, SharedClock};

/// Timing and cutoff of one hostel (either may be unset)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostelMealConfig {
    pub timing: Option<MealTiming>,
    pub cutoff: Option<MealCutoff>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    config: Arc<HostelMealConfig>,
    loaded_at: i64,
}

#[derive(Clone)]
pub struct MealConfigService {
    pool: SqlitePool,
    clock: SharedClock,
    ttl: Duration,
    cache: Arc<DashMap<i64, CacheEntry>>,
}

impl std::fmt::Debug for MealConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MealConfigService")
            .field("ttl", &self.ttl)
            .field("cached_hostels", &self.cache.len())
            .finish()
    }
}

impl MealConfigService {
    pub fn new(pool: SqlitePool, clock: SharedClock, ttl: Duration) -> Self {
        Self {
            pool,
            clock,
            ttl,
            cache: Arc::new(DashMap::new()),
        }
    }

    // ========== Cached reads ==========

    /// Timing and cutoff of a hostel, from cache when fresh
    pub async fn get(&self, hostel_id: i64) -> AppResult<Arc<HostelMealConfig>> {
        let now = self.clock.now_millis();
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);

        if let Some(entry) = self.cache.get(&hostel_id)
            && now.saturating_sub(entry.loaded_at) < ttl_ms
        {
            return Ok(entry.config.clone());
        }

        let timing = meal_config::find_timing(&self.pool, hostel_id).await?;
        let cutoff = meal_config::find_cutoff(&self.pool, hostel_id).await?;
        let config = Arc::new(HostelMealConfig { timing, cutoff });
        self.cache.insert(
            hostel_id,
            CacheEntry {
                config: config.clone(),
                loaded_at: now,
            },
        );
        tracing::debug!(hostel_id = hostel_id, "Meal config loaded into cache");
        Ok(config)
    }

    pub fn invalidate(&self, hostel_id: i64) {
        self.cache.remove(&hostel_id);
    }

    pub async fn timing(&self, hostel_id: i64) -> AppResult<MealTiming> {
        self.get(hostel_id)
            .await?
            .timing
            .clone()
            .ok_or_else(|| AppError::with_message(ErrorCode::MealConfigNotFound, "Meal timing is not configured"))
    }

    pub async fn cutoff(&self, hostel_id: i64) -> AppResult<MealCutoff> {
        self.get(hostel_id)
            .await?
            .cutoff
            .clone()
            .ok_or_else(|| AppError::with_message(ErrorCode::MealConfigNotFound, "Meal cutoff is not configured"))
    }

    // ========== Writes ==========

    pub async fn put_timing(&self, hostel_id: i64, timing: MealTiming) -> AppResult<MealTiming> {
        validate_timing(&timing)?;
        meal_config::upsert_timing(&self.pool, hostel_id, &timing).await?;
        self.invalidate(hostel_id);
        tracing::info!(hostel_id = hostel_id, "Meal timing updated");
        Ok(timing)
    }

    pub async fn put_cutoff(&self, hostel_id: i64, cutoff: MealCutoff) -> AppResult<MealCutoff> {
        validate_cutoff(&cutoff)?;
        meal_config::upsert_cutoff(&self.pool, hostel_id, &cutoff).await?;
        self.invalidate(hostel_id);
        tracing::info!(hostel_id = hostel_id, "Meal cutoff updated");
        Ok(cutoff)
    }

    // ========== Menus ==========

    pub async fn put_menu(
        &self,
        hostel_id: i64,
        date: NaiveDate,
        data: MessMenuUpsert,
    ) -> AppResult<MessMenu> {
        for slot in MealSlot::ALL {
            let item = match slot {
                MealSlot::Breakfast => &data.breakfast,
                MealSlot::Lunch => &data.lunch,
                MealSlot::Snacks => &data.snacks,
                MealSlot::Dinner => &data.dinner,
            };
            validate_optional_text(item, slot.as_str(), MAX_MENU_ITEM_LEN)?;
        }
        let date = format_date(date);
        let saved = menu::upsert(&self.pool, hostel_id, &date, data).await?;
        self.invalidate(hostel_id);
        tracing::info!(hostel_id = hostel_id, date = %date, "Menu published");
        Ok(saved)
    }

    pub async fn list_menus(
        &self,
        hostel_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<MessMenu>> {
        if from > to {
            return Err(AppError::validation("'from' must not be after 'to'"));
        }
        if span_days(from, to) > MAX_MENU_RANGE_DAYS {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                format!("Menu range is limited to {MAX_MENU_RANGE_DAYS} days"),
            ));
        }
        let menus = menu::find_range(&self.pool, hostel_id, &format_date(from), &format_date(to)).await?;
        Ok(menus)
    }
}

/// Every slot: strict `HH:MM`, start before end
pub fn validate_timing(timing: &MealTiming) -> AppResult<()> {
    for slot in MealSlot::ALL {
        let window = timing.get(slot);
        let invalid = |msg: String| {
            AppError::with_message(ErrorCode::MealTimingInvalid, msg).with_detail("slot", slot.as_str())
        };
        let start = parse_time_of_day(&window.start)
            .map_err(|_| invalid(format!("Invalid {slot} start time: {}", window.start)))?;
        let end = parse_time_of_day(&window.end)
            .map_err(|_| invalid(format!("Invalid {slot} end time: {}", window.end)))?;
        if start >= end {
            return Err(invalid(format!("{slot} must start before it ends")));
        }
    }
    Ok(())
}

/// Every slot: strict `HH:MM`, day offset of -1 or 0
pub fn validate_cutoff(cutoff: &MealCutoff) -> AppResult<()> {
    for slot in MealSlot::ALL {
        let rule = cutoff.get(slot);
        let invalid = |msg: String| {
            AppError::with_message(ErrorCode::MealCutoffInvalid, msg).with_detail("slot", slot.as_str())
        };
        if !matches!(rule.day_offset, -1 | 0) {
            return Err(invalid(format!(
                "{slot} cutoff day offset must be -1 or 0, got {}",
                rule.day_offset
            )));
        }
        parse_time_of_day(&rule.time)
            .map_err(|_| invalid(format!("Invalid {slot} cutoff time: {}", rule.time)))?;
    }
    Ok(())
}
