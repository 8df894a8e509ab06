//! Report Service - 日历 / 看板 / 报表
//!
//! All reads are bounded range queries; statuses are derived in memory.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use serde::Deserialize;
use shared::models::{
    BookingRecord, CalendarView, DailyAnalytics, DerivedStatus, GatepassBookings, GatepassDay,
    MealSlot, SlotState, SortOrder, StudentDay,
};
use sqlx::SqlitePool;

use super::view;
use crate::auth::Actor;
use crate::booking::derive_status;
use crate::db::repository::report::{self as report_repo, RecordFilter, StudentFilter};
use crate::db::repository::{menu, residence};
use crate::services::MealConfigService;
use crate::utils::time::{
    days_between, format_date, local_today, month_bounds, parse_date, parse_month,
};
use crate::utils::validation::{MAX_SEARCH_LEN, page_window, validate_optional_text};
use crate::utils::{AppError, AppResult, ErrorCode, SharedClock};

/// `month=YYYY-MM` or `date=YYYY-MM-DD`; neither means the current month
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarQuery {
    pub month: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentQuery {
    pub date: String,
    /// Comma separated derived statuses
    pub statuses: Option<String>,
    pub search: Option<String>,
    pub floor: Option<i32>,
    pub room: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordQuery {
    pub state: Option<SlotState>,
    pub slot: Option<MealSlot>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub floor: Option<i32>,
    pub room: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn clean_search(search: Option<String>) -> AppResult<Option<String>> {
    let search = search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    validate_optional_text(&search, "search", MAX_SEARCH_LEN)?;
    Ok(search)
}

#[derive(Clone)]
pub struct ReportService {
    pool: SqlitePool,
    meal_config: MealConfigService,
    clock: SharedClock,
    tz: Tz,
}

impl std::fmt::Debug for ReportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportService").field("tz", &self.tz).finish()
    }
}

impl ReportService {
    pub fn new(pool: SqlitePool, meal_config: MealConfigService, clock: SharedClock, tz: Tz) -> Self {
        Self {
            pool,
            meal_config,
            clock,
            tz,
        }
    }

    fn today(&self) -> NaiveDate {
        local_today(self.clock.now(), self.tz)
    }

    async fn ensure_hostel(&self, hostel_id: i64) -> AppResult<()> {
        if residence::find_hostel(&self.pool, hostel_id).await?.is_none() {
            return Err(AppError::with_message(
                ErrorCode::HostelNotFound,
                format!("Hostel {hostel_id} not found"),
            ));
        }
        Ok(())
    }

    /// Monthly (or single-day) calendar of one student
    pub async fn calendar(
        &self,
        actor: &Actor,
        hostel_id: i64,
        student_id: i64,
        query: CalendarQuery,
    ) -> AppResult<CalendarView> {
        actor.require_owner_or_staff(hostel_id, student_id)?;
        match residence::find_student(&self.pool, student_id).await? {
            Some(student) if student.hostel_id == hostel_id => {}
            _ => {
                return Err(AppError::with_message(
                    ErrorCode::StudentNotFound,
                    format!("Student {student_id} not found in hostel {hostel_id}"),
                ));
            }
        }

        let today = self.today();
        let (from, to) = match (query.date.as_deref(), query.month.as_deref()) {
            (Some(date), _) => {
                let date = parse_date(date)?;
                (date, date)
            }
            (None, Some(month)) => {
                let (year, month) = parse_month(month)?;
                month_bounds(year, month)?
            }
            (None, None) => month_bounds(today.year(), today.month())?,
        };
        let (from_key, to_key) = (format_date(from), format_date(to));

        let rows =
            report_repo::student_slots_in_range(&self.pool, hostel_id, student_id, &from_key, &to_key)
                .await?;
        let menus = menu::find_range(&self.pool, hostel_id, &from_key, &to_key).await?;
        let timing = self.meal_config.get(hostel_id).await?.timing.clone();

        let days = view::calendar_days(&days_between(from, to), &rows, &menus, today);
        Ok(CalendarView {
            hostel_id,
            student_id,
            from: from_key,
            to: to_key,
            timing,
            days,
        })
    }

    /// Counts per slot per derived status across every student of the hostel
    pub async fn daily_analytics(
        &self,
        actor: &Actor,
        hostel_id: i64,
        date: &str,
    ) -> AppResult<DailyAnalytics> {
        actor.require_staff_in(hostel_id)?;
        let date = parse_date(date)?;
        self.ensure_hostel(hostel_id).await?;

        let key = format_date(date);
        let rows =
            report_repo::students_with_slots(&self.pool, hostel_id, &key, &StudentFilter::default())
                .await?;
        let menu = menu::find_by_date(&self.pool, hostel_id, &key).await?;
        let days = view::student_days(rows, date, self.today(), menu.as_ref());

        Ok(DailyAnalytics {
            hostel_id,
            date: key,
            total_students: days.len() as u64,
            slots: view::count_by_status(&days),
        })
    }

    /// Per-student view of one day, filtered by derived status
    ///
    /// Returns the page and the total number of retained student-days.
    pub async fn students(
        &self,
        actor: &Actor,
        hostel_id: i64,
        query: StudentQuery,
    ) -> AppResult<(Vec<StudentDay>, u64)> {
        actor.require_staff_in(hostel_id)?;
        let date = parse_date(&query.date)?;
        let statuses: Vec<DerivedStatus> = view::parse_statuses(query.statuses.as_deref())
            .map_err(AppError::validation)?;
        let (limit, offset) = page_window(query.page, query.limit)?;
        let filter = StudentFilter {
            floor: query.floor,
            room: query.room.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            search: clean_search(query.search)?,
        };
        self.ensure_hostel(hostel_id).await?;

        let key = format_date(date);
        let rows = report_repo::students_with_slots(&self.pool, hostel_id, &key, &filter).await?;
        let menu = menu::find_by_date(&self.pool, hostel_id, &key).await?;

        let mut days = view::student_days(rows, date, self.today(), menu.as_ref());
        view::retain_by_status(&mut days, &statuses);
        view::sort_student_days(&mut days, query.sort);

        let count = days.len() as u64;
        let page = days
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(day, _)| day)
            .collect();
        Ok((page, count))
    }

    /// Paginated booking-slot rows with derived status
    pub async fn records(
        &self,
        actor: &Actor,
        hostel_id: i64,
        query: RecordQuery,
    ) -> AppResult<(Vec<BookingRecord>, u64)> {
        actor.require_staff_in(hostel_id)?;
        let (limit, offset) = page_window(query.page, query.limit)?;
        let from = query.from.as_deref().map(parse_date).transpose()?;
        let to = query.to.as_deref().map(parse_date).transpose()?;
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            return Err(AppError::validation("'from' must not be after 'to'"));
        }
        let filter = RecordFilter {
            state: query.state,
            slot: query.slot,
            from: from.map(format_date),
            to: to.map(format_date),
            floor: query.floor,
            room: query.room.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            search: clean_search(query.search)?,
            sort: query.sort,
        };
        self.ensure_hostel(hostel_id).await?;

        let count = report_repo::count_records(&self.pool, hostel_id, &filter).await?;
        let mut records = report_repo::find_records(&self.pool, hostel_id, &filter, limit, offset).await?;

        let today = self.today();
        for record in &mut records {
            let date = parse_date(&record.date)?;
            record.derived = derive_status(Some(record.state), record.consumed, date, today);
        }
        Ok((records, count.max(0) as u64))
    }

    /// Bookings of a gatepass holder inside the gatepass window
    ///
    /// CONFIRMED slots are flagged as booked while away when the gatepass
    /// was approved (or has closed).
    pub async fn gatepass_bookings(
        &self,
        actor: &Actor,
        hostel_id: i64,
        gatepass_id: i64,
    ) -> AppResult<GatepassBookings> {
        actor.require_staff_in(hostel_id)?;
        let gatepass = residence::find_gatepass(&self.pool, hostel_id, gatepass_id)
            .await?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::GatepassNotFound,
                    format!("Gatepass {gatepass_id} not found"),
                )
            })?;
        let out_date = parse_date(&gatepass.out_date)?;
        let in_date = parse_date(&gatepass.in_date)?;

        let rows = report_repo::student_slots_in_range(
            &self.pool,
            hostel_id,
            gatepass.student_id,
            &format_date(out_date),
            &format_date(in_date),
        )
        .await?;

        let today = self.today();
        let away = gatepass.status.is_absence();
        let mut by_booking: BTreeMap<(String, i64), GatepassDay> = BTreeMap::new();
        let mut dates: HashMap<String, NaiveDate> = HashMap::new();
        for row in rows {
            let date = match dates.get(&row.date) {
                Some(d) => *d,
                None => {
                    let d = parse_date(&row.date)?;
                    dates.insert(row.date.clone(), d);
                    d
                }
            };
            let day = by_booking
                .entry((row.date.clone(), row.booking_id))
                .or_insert_with(|| GatepassDay {
                    booking_id: row.booking_id,
                    date: row.date.clone(),
                    slots: BTreeMap::new(),
                    booked_while_away: Vec::new(),
                });
            day.slots
                .insert(row.slot, derive_status(Some(row.state), row.consumed, date, today));
            if away && row.state == SlotState::Confirmed {
                day.booked_while_away.push(row.slot);
            }
        }

        let days: Vec<GatepassDay> = by_booking
            .into_values()
            .map(|mut day| {
                day.booked_while_away.sort();
                day
            })
            .collect();
        let flagged: usize = days.iter().map(|d| d.booked_while_away.len()).sum();
        tracing::debug!(
            hostel_id = hostel_id,
            gatepass_id = gatepass_id,
            days = days.len(),
            flagged = flagged,
            "Gatepass correlation built"
        );

        Ok(GatepassBookings { gatepass, days })
    }
}
