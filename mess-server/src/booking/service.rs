//! Booking Service - 订餐写入
//!
//! Every operation follows the same shape:
//! 1. scope and shape checks
//! 2. load config, menus and current rows
//! 3. plan every (date, slot); any error rejects the whole call
//! 4. one transaction: insert-if-absent booking rows, CAS slot updates
//!
//! A CAS miss re-reads the slot. If it already holds the planned values the
//! write converges to a no-op, otherwise the call fails with a conflict.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use chrono_tz::Tz;
use shared::models::{
    BookRangeRequest, BookRequest, BookedBy, CancelRequest, ConsumeRequest, DayEntry,
    EditRequest, ManualBookRequest, MealBooking, MealSlot, MessMenu, ReverseRequest, SlotState,
};
use sqlx::SqlitePool;

use super::cutoff::CutoffPolicy;
use super::plan::{self, Planner, SlotChange, SlotPlan};
use crate::audit_log;
use crate::auth::Actor;
use crate::db::repository::booking::{self as booking_repo, SlotWrite};
use crate::db::repository::{RepoError, menu, residence};
use crate::services::MealConfigService;
use crate::utils::time::{days_between, format_date, parse_date, span_days};
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};
use crate::utils::{AppError, AppResult, ErrorCode, SharedClock};

/// Writes planned for one date
#[derive(Debug)]
struct DayPlan {
    date: String,
    served: Vec<MealSlot>,
    changes: Vec<SlotChange>,
}

/// Loaded state of one requested date
#[derive(Debug)]
struct DayContext {
    date: NaiveDate,
    key: String,
    menu: Option<MessMenu>,
    booking: Option<MealBooking>,
}

impl DayContext {
    fn served(&self, slot: MealSlot) -> bool {
        self.menu.as_ref().is_some_and(|m| m.is_served(slot))
    }

    fn served_slots(&self) -> Vec<MealSlot> {
        MealSlot::ALL
            .into_iter()
            .filter(|s| self.served(*s))
            .collect()
    }
}

fn attribution(actor: &Actor) -> BookedBy {
    if actor.is_staff() {
        BookedBy::Staff
    } else {
        BookedBy::Student
    }
}

fn to_write(change: &SlotChange, actor_id: i64) -> SlotWrite {
    SlotWrite {
        state: change.state,
        consumed: change.consumed,
        booked_by: change.booked_by,
        cancellation_reason: change.cancellation_reason.clone(),
        is_reversible: change.is_reversible,
        last_action: change.last_action,
        cutoff_bypassed: change.cutoff_bypassed,
        actor_id,
    }
}

/// Explicit slots, or all four for a full day; sorted and deduplicated
fn expand_slots(slots: &[MealSlot], is_full_day: bool) -> AppResult<Vec<MealSlot>> {
    if is_full_day {
        return Ok(MealSlot::ALL.to_vec());
    }
    let set: BTreeSet<MealSlot> = slots.iter().copied().collect();
    if set.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            "At least one meal slot is required",
        ));
    }
    Ok(set.into_iter().collect())
}

#[derive(Clone)]
pub struct BookingService {
    pool: SqlitePool,
    meal_config: MealConfigService,
    clock: SharedClock,
    tz: Tz,
    max_bulk_entries: usize,
}

impl std::fmt::Debug for BookingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingService")
            .field("tz", &self.tz)
            .field("max_bulk_entries", &self.max_bulk_entries)
            .finish()
    }
}

impl BookingService {
    pub fn new(
        pool: SqlitePool,
        meal_config: MealConfigService,
        clock: SharedClock,
        tz: Tz,
        max_bulk_entries: usize,
    ) -> Self {
        Self {
            pool,
            meal_config,
            clock,
            tz,
            max_bulk_entries,
        }
    }

    // ========== Operations ==========

    /// Book explicit days (all-or-nothing)
    pub async fn book(
        &self,
        actor: &Actor,
        hostel_id: i64,
        req: BookRequest,
    ) -> AppResult<Vec<MealBooking>> {
        let student_id = actor.resolve_student(hostel_id, req.student_id)?;
        let days = self.resolve_days(&req.days)?;
        self.ensure_student(hostel_id, student_id).await?;

        let config = self.meal_config.get(hostel_id).await?;
        let planner = Planner::new(
            CutoffPolicy::new(config.cutoff.as_ref(), config.timing.as_ref()),
            self.clock.now(),
            self.tz,
        );
        let contexts = self.load_days(hostel_id, student_id, &days).await?;
        let booked_by = attribution(actor);

        let mut plans = Vec::with_capacity(days.len());
        for ((_, slots), ctx) in days.iter().zip(&contexts) {
            let mut changes = Vec::new();
            for &slot in slots {
                let current = ctx.booking.as_ref().and_then(|b| b.slot(slot));
                if let SlotPlan::Apply(change) =
                    planner.book(slot, ctx.date, ctx.served(slot), current, booked_by)?
                {
                    changes.push(change);
                }
            }
            plans.push(DayPlan {
                date: ctx.key.clone(),
                served: ctx.served_slots(),
                changes,
            });
        }

        let written = self
            .apply(hostel_id, student_id, actor, booked_by, &plans)
            .await?;
        tracing::info!(
            hostel_id = hostel_id,
            student_id = student_id,
            days = plans.len(),
            slots_written = written,
            "Meals booked"
        );
        self.reload_days(hostel_id, student_id, &contexts).await
    }

    /// Book every day of `[from, to]`
    pub async fn book_range(
        &self,
        actor: &Actor,
        hostel_id: i64,
        req: BookRangeRequest,
    ) -> AppResult<Vec<MealBooking>> {
        let from = parse_date(&req.from)?;
        let to = parse_date(&req.to)?;
        if from > to {
            return Err(AppError::validation("'from' must not be after 'to'"));
        }
        let span = span_days(from, to);
        if span > self.max_bulk_entries as i64 {
            return Err(self.bulk_limit_error(span as usize));
        }

        let days = days_between(from, to)
            .into_iter()
            .map(|d| DayEntry {
                date: format_date(d),
                slots: req.slots.clone(),
                is_full_day: req.is_full_day,
            })
            .collect();
        self.book(
            actor,
            hostel_id,
            BookRequest {
                student_id: req.student_id,
                days,
            },
        )
        .await
    }

    /// Cancel days (PENDING/CONFIRMED → SKIPPED, all-or-nothing)
    pub async fn cancel(
        &self,
        actor: &Actor,
        hostel_id: i64,
        req: CancelRequest,
    ) -> AppResult<Vec<MealBooking>> {
        let student_id = actor.resolve_student(hostel_id, req.student_id)?;
        validate_optional_text(&req.cancellation_reason, "cancellation_reason", MAX_NOTE_LEN)?;
        let days = self.resolve_days(&req.days)?;
        self.ensure_student(hostel_id, student_id).await?;

        let config = self.meal_config.get(hostel_id).await?;
        let planner = Planner::new(
            CutoffPolicy::new(config.cutoff.as_ref(), config.timing.as_ref()),
            self.clock.now(),
            self.tz,
        );
        let contexts = self.load_days(hostel_id, student_id, &days).await?;
        let booked_by = attribution(actor);
        let reason = req.cancellation_reason.as_deref().map(str::trim);

        let mut plans = Vec::with_capacity(days.len());
        for ((_, slots), ctx) in days.iter().zip(&contexts) {
            let mut changes = Vec::new();
            for &slot in slots {
                let current = ctx.booking.as_ref().and_then(|b| b.slot(slot));
                if let SlotPlan::Apply(change) =
                    planner.cancel(slot, ctx.date, ctx.served(slot), current, reason, booked_by)?
                {
                    changes.push(change);
                }
            }
            plans.push(DayPlan {
                date: ctx.key.clone(),
                served: ctx.served_slots(),
                changes,
            });
        }

        let written = self
            .apply(hostel_id, student_id, actor, booked_by, &plans)
            .await?;
        tracing::info!(
            hostel_id = hostel_id,
            student_id = student_id,
            days = plans.len(),
            slots_written = written,
            "Meals cancelled"
        );
        self.reload_days(hostel_id, student_id, &contexts).await
    }

    /// Replace per-slot choices of one booking
    ///
    /// Slots already holding their target are not touched (and not gated).
    pub async fn edit(
        &self,
        actor: &Actor,
        booking_id: i64,
        req: EditRequest,
    ) -> AppResult<MealBooking> {
        let booking = self.find_booking(booking_id).await?;
        actor.require_owner_or_staff(booking.hostel_id, booking.student_id)?;
        if req.slots.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "At least one meal slot is required",
            ));
        }
        validate_optional_text(&req.cancellation_reason, "cancellation_reason", MAX_NOTE_LEN)?;

        let date = parse_date(&booking.date)?;
        let config = self.meal_config.get(booking.hostel_id).await?;
        let planner = Planner::new(
            CutoffPolicy::new(config.cutoff.as_ref(), config.timing.as_ref()),
            self.clock.now(),
            self.tz,
        );
        let menu = menu::find_by_date(&self.pool, booking.hostel_id, &booking.date).await?;
        let ctx = DayContext {
            date,
            key: booking.date.clone(),
            menu,
            booking: None,
        };
        let booked_by = attribution(actor);
        let reason = req.cancellation_reason.as_deref().map(str::trim);

        let mut changes = Vec::new();
        for (&slot, &choice) in &req.slots {
            let current = booking.slot(slot).ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::BookingNotFound,
                    format!("Booking {booking_id} has no {slot} slot"),
                )
            })?;
            let target = SlotState::from(choice);
            if let SlotPlan::Apply(change) = planner.edit(
                slot,
                date,
                ctx.served(slot),
                current,
                target,
                reason,
                booked_by,
            )? {
                changes.push(change);
            }
        }

        if changes.is_empty() {
            tracing::debug!(booking_id = booking_id, "Edit changes nothing");
            return Ok(booking);
        }

        let plans = [DayPlan {
            date: ctx.key.clone(),
            served: ctx.served_slots(),
            changes,
        }];
        let written = self
            .apply(booking.hostel_id, booking.student_id, actor, booked_by, &plans)
            .await?;
        tracing::info!(
            booking_id = booking_id,
            hostel_id = booking.hostel_id,
            student_id = booking.student_id,
            slots_written = written,
            "Booking edited"
        );
        self.find_booking(booking_id).await
    }

    /// Staff books slots for a student
    ///
    /// Wardens are held to the cutoff; admins may book late, which is
    /// flagged on the slot and written to the audit log.
    pub async fn manual_book(
        &self,
        actor: &Actor,
        hostel_id: i64,
        req: ManualBookRequest,
    ) -> AppResult<MealBooking> {
        actor.require_staff_in(hostel_id)?;
        let date = parse_date(&req.date)?;
        let slots = expand_slots(&req.slots, req.is_full_day)?;
        self.ensure_student(hostel_id, req.student_id).await?;

        let config = self.meal_config.get(hostel_id).await?;
        let planner = Planner::new(
            CutoffPolicy::new(config.cutoff.as_ref(), config.timing.as_ref()),
            self.clock.now(),
            self.tz,
        );
        let ctx = self
            .load_days(hostel_id, req.student_id, &[(date, slots.clone())])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal("Failed to load booking day"))?;

        let mut changes = Vec::new();
        for &slot in &slots {
            let current = ctx.booking.as_ref().and_then(|b| b.slot(slot));
            if let SlotPlan::Apply(change) =
                planner.manual(slot, date, ctx.served(slot), current, actor.is_admin())?
            {
                changes.push(change);
            }
        }

        let bypassed: Vec<MealSlot> = changes
            .iter()
            .filter(|c| c.cutoff_bypassed)
            .map(|c| c.slot)
            .collect();
        let plans = [DayPlan {
            date: ctx.key.clone(),
            served: ctx.served_slots(),
            changes,
        }];
        self.apply(hostel_id, req.student_id, actor, BookedBy::Staff, &plans)
            .await?;

        for slot in &bypassed {
            audit_log!(
                "manual_book_cutoff_bypass",
                actor_id = actor.id,
                role = actor.role.as_str(),
                hostel_id = hostel_id,
                student_id = req.student_id,
                date = ctx.key.as_str(),
                slot = slot.as_str()
            );
        }
        tracing::info!(
            hostel_id = hostel_id,
            student_id = req.student_id,
            date = %ctx.key,
            actor_id = actor.id,
            "Manual booking recorded"
        );

        self.find_day(hostel_id, req.student_id, &ctx.key).await
    }

    /// Serving counter marks slots as eaten (not cutoff-gated, idempotent)
    pub async fn consume(
        &self,
        actor: &Actor,
        hostel_id: i64,
        req: ConsumeRequest,
    ) -> AppResult<MealBooking> {
        actor.require_staff_in(hostel_id)?;
        let date = parse_date(&req.date)?;
        let slots = expand_slots(&req.slots, false)?;
        self.ensure_student(hostel_id, req.student_id).await?;

        let ctx = self
            .load_days(hostel_id, req.student_id, &[(date, slots.clone())])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal("Failed to load booking day"))?;

        let mut changes = Vec::new();
        for &slot in &slots {
            let current = ctx.booking.as_ref().and_then(|b| b.slot(slot));
            if let SlotPlan::Apply(change) = plan::consume(slot, current)? {
                changes.push(change);
            }
        }

        let plans = [DayPlan {
            date: ctx.key.clone(),
            served: ctx.served_slots(),
            changes,
        }];
        let written = self
            .apply(hostel_id, req.student_id, actor, BookedBy::Staff, &plans)
            .await?;
        tracing::info!(
            hostel_id = hostel_id,
            student_id = req.student_id,
            date = %ctx.key,
            slots_written = written,
            "Meals marked consumed"
        );

        self.find_day(hostel_id, req.student_id, &ctx.key).await
    }

    /// Staff undo of the last change of some slots (no cutoff check)
    pub async fn reverse(
        &self,
        actor: &Actor,
        booking_id: i64,
        req: ReverseRequest,
    ) -> AppResult<MealBooking> {
        let booking = self.find_booking(booking_id).await?;
        actor.require_staff_in(booking.hostel_id)?;
        let slots = expand_slots(&req.slots, false)?;

        let mut changes = Vec::new();
        for &slot in &slots {
            let current = booking.slot(slot).ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::BookingNotFound,
                    format!("Booking {booking_id} has no {slot} slot"),
                )
            })?;
            if let SlotPlan::Apply(change) = plan::reverse(slot, current)? {
                changes.push(change);
            }
        }

        let plans = [DayPlan {
            date: booking.date.clone(),
            served: Vec::new(),
            changes,
        }];
        self.apply(
            booking.hostel_id,
            booking.student_id,
            actor,
            BookedBy::Staff,
            &plans,
        )
        .await?;

        for change in &plans[0].changes {
            audit_log!(
                "booking_reversed",
                actor_id = actor.id,
                role = actor.role.as_str(),
                booking_id = booking_id,
                hostel_id = booking.hostel_id,
                student_id = booking.student_id,
                date = booking.date.as_str(),
                slot = change.slot.as_str(),
                from = change.expected.0.as_str(),
                to = change.state.as_str()
            );
        }

        self.find_booking(booking_id).await
    }

    // ========== Helpers ==========

    fn bulk_limit_error(&self, got: usize) -> AppError {
        AppError::with_message(
            ErrorCode::BulkLimitExceeded,
            format!(
                "At most {} days per request, got {got}",
                self.max_bulk_entries
            ),
        )
        .with_detail("max", self.max_bulk_entries)
        .with_detail("got", got)
    }

    /// Validate the day entries of a bulk request
    fn resolve_days(&self, entries: &[DayEntry]) -> AppResult<Vec<(NaiveDate, Vec<MealSlot>)>> {
        if entries.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "At least one day is required",
            ));
        }
        if entries.len() > self.max_bulk_entries {
            return Err(self.bulk_limit_error(entries.len()));
        }

        let mut seen = HashSet::with_capacity(entries.len());
        let mut days = Vec::with_capacity(entries.len());
        for entry in entries {
            let date = parse_date(&entry.date)?;
            if !seen.insert(date) {
                return Err(AppError::with_message(
                    ErrorCode::DuplicateDate,
                    format!("Date {date} appears more than once"),
                )
                .with_detail("date", date.to_string()));
            }
            days.push((date, expand_slots(&entry.slots, entry.is_full_day)?));
        }
        Ok(days)
    }

    async fn ensure_student(&self, hostel_id: i64, student_id: i64) -> AppResult<()> {
        if residence::find_hostel(&self.pool, hostel_id).await?.is_none() {
            return Err(AppError::with_message(
                ErrorCode::HostelNotFound,
                format!("Hostel {hostel_id} not found"),
            ));
        }
        match residence::find_student(&self.pool, student_id).await? {
            Some(student) if student.hostel_id == hostel_id => Ok(()),
            _ => Err(AppError::with_message(
                ErrorCode::StudentNotFound,
                format!("Student {student_id} not found in hostel {hostel_id}"),
            )),
        }
    }

    async fn find_booking(&self, booking_id: i64) -> AppResult<MealBooking> {
        booking_repo::find_by_id(&self.pool, booking_id)
            .await?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::BookingNotFound,
                    format!("Booking {booking_id} not found"),
                )
            })
    }

    async fn find_day(&self, hostel_id: i64, student_id: i64, date: &str) -> AppResult<MealBooking> {
        booking_repo::find_for_dates(&self.pool, hostel_id, student_id, &[date.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::BookingNotFound,
                    format!("No booking on {date}"),
                )
            })
    }

    /// Menus and current rows for the requested dates (two queries)
    async fn load_days(
        &self,
        hostel_id: i64,
        student_id: i64,
        days: &[(NaiveDate, Vec<MealSlot>)],
    ) -> AppResult<Vec<DayContext>> {
        let (Some(min), Some(max)) = (
            days.iter().map(|(d, _)| *d).min(),
            days.iter().map(|(d, _)| *d).max(),
        ) else {
            return Ok(Vec::new());
        };

        let keys: Vec<String> = days.iter().map(|(d, _)| format_date(*d)).collect();
        let mut menus: HashMap<String, MessMenu> =
            menu::find_range(&self.pool, hostel_id, &format_date(min), &format_date(max))
                .await?
                .into_iter()
                .map(|m| (m.date.clone(), m))
                .collect();
        let mut bookings: HashMap<String, MealBooking> =
            booking_repo::find_for_dates(&self.pool, hostel_id, student_id, &keys)
                .await?
                .into_iter()
                .map(|b| (b.date.clone(), b))
                .collect();

        Ok(days
            .iter()
            .zip(keys)
            .map(|((date, _), key)| DayContext {
                date: *date,
                menu: menus.remove(&key),
                booking: bookings.remove(&key),
                key,
            })
            .collect())
    }

    async fn reload_days(
        &self,
        hostel_id: i64,
        student_id: i64,
        contexts: &[DayContext],
    ) -> AppResult<Vec<MealBooking>> {
        let keys: Vec<String> = contexts.iter().map(|c| c.key.clone()).collect();
        Ok(booking_repo::find_for_dates(&self.pool, hostel_id, student_id, &keys).await?)
    }

    /// Write all planned changes in one transaction
    ///
    /// Returns the number of slot rows actually updated.
    async fn apply(
        &self,
        hostel_id: i64,
        student_id: i64,
        actor: &Actor,
        booked_by: BookedBy,
        plans: &[DayPlan],
    ) -> AppResult<usize> {
        if plans.iter().all(|p| p.changes.is_empty()) {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;
        let mut written = 0;
        for day in plans.iter().filter(|p| !p.changes.is_empty()) {
            let booking_id = booking_repo::ensure_booking(
                &mut tx,
                hostel_id,
                student_id,
                &day.date,
                &day.served,
                booked_by,
                actor.id,
            )
            .await?;

            for change in &day.changes {
                let applied = booking_repo::cas_update_slot(
                    &mut tx,
                    booking_id,
                    change.slot,
                    change.expected,
                    &to_write(change, actor.id),
                )
                .await?;
                if applied {
                    written += 1;
                    continue;
                }

                let current = booking_repo::find_slot_tx(&mut tx, booking_id, change.slot).await?;
                if change.is_satisfied_by(&current) {
                    tracing::debug!(
                        booking_id = booking_id,
                        slot = %change.slot,
                        "Concurrent write already applied, converging"
                    );
                    continue;
                }
                tracing::warn!(
                    booking_id = booking_id,
                    slot = %change.slot,
                    expected = %change.expected.0,
                    found = %current.state,
                    "Booking slot changed concurrently"
                );
                return Err(AppError::conflict(format!(
                    "{} on {} was modified concurrently, please retry",
                    change.slot, day.date
                ))
                .with_detail("booking_id", booking_id)
                .with_detail("slot", change.slot.as_str()));
            }
        }

        tx.commit().await.map_err(RepoError::from)?;
        Ok(written)
    }
}
