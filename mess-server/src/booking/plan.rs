//! 状态机: per-slot transition planning
//!
//! Planning is pure. The service loads the current rows, plans every
//! (date, slot) of a request, and only writes once the whole request
//! planned without error. Each [`SlotChange`] carries the snapshot it was
//! planned against so the write can be a compare-and-swap.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use shared::models::{BookedBy, BookingAction, MealBookingSlot, MealSlot, SlotState};

use super::cutoff::{CutoffPolicy, Decision, DenyReason};
use crate::utils::{AppError, AppResult, ErrorCode};

/// Snapshot assumed for a slot row that does not exist yet
///
/// Only served slots are ever planned against a missing row, and
/// `ensure_booking` creates those as PENDING.
const FRESH: (SlotState, bool) = (SlotState::Pending, false);

/// New values of one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotChange {
    pub slot: MealSlot,
    /// `(state, consumed)` the slot must still hold
    pub expected: (SlotState, bool),
    pub state: SlotState,
    pub consumed: bool,
    pub booked_by: BookedBy,
    pub cancellation_reason: Option<String>,
    pub is_reversible: bool,
    pub last_action: BookingAction,
    pub cutoff_bypassed: bool,
}

impl SlotChange {
    /// The slot already holds what this change writes
    pub fn is_satisfied_by(&self, current: &MealBookingSlot) -> bool {
        current.state == self.state && current.consumed == self.consumed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotPlan {
    /// Nothing to write (idempotent repeat)
    Unchanged,
    Apply(SlotChange),
}

impl SlotPlan {
    pub fn change(&self) -> Option<&SlotChange> {
        match self {
            SlotPlan::Unchanged => None,
            SlotPlan::Apply(change) => Some(change),
        }
    }
}

fn snapshot(current: Option<&MealBookingSlot>) -> (SlotState, bool) {
    current.map_or(FRESH, |c| (c.state, c.consumed))
}

fn not_applicable(slot: MealSlot, date: NaiveDate) -> AppError {
    AppError::with_message(
        ErrorCode::MealNotApplicable,
        format!("No {slot} is served on {date}"),
    )
    .with_detail("slot", slot.as_str())
    .with_detail("date", date.to_string())
}

fn cutoff_passed(slot: MealSlot, date: NaiveDate, cutoff: DateTime<Utc>) -> AppError {
    AppError::with_message(
        ErrorCode::CutoffPassed,
        format!("Cutoff for {slot} on {date} has passed"),
    )
    .with_detail("slot", slot.as_str())
    .with_detail("date", date.to_string())
    .with_detail("cutoff", cutoff.to_rfc3339())
}

fn already_consumed(slot: MealSlot, date: NaiveDate) -> AppError {
    AppError::with_message(
        ErrorCode::AlreadyConsumed,
        format!("{slot} on {date} has already been consumed"),
    )
    .with_detail("slot", slot.as_str())
}

fn invalid_transition(slot: MealSlot, from: Option<SlotState>, action: BookingAction) -> AppError {
    let from = from.map_or("NO_RECORD", |s| s.as_str());
    AppError::with_message(
        ErrorCode::InvalidTransition,
        format!("Cannot apply {action:?} to {slot} in state {from}"),
    )
    .with_detail("slot", slot.as_str())
    .with_detail("state", from)
}

/// Plans slot transitions at a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct Planner<'a> {
    policy: CutoffPolicy<'a>,
    now: DateTime<Utc>,
    tz: Tz,
}

impl<'a> Planner<'a> {
    pub fn new(policy: CutoffPolicy<'a>, now: DateTime<Utc>, tz: Tz) -> Self {
        Self { policy, now, tz }
    }

    /// Cutoff gate; returns `Ok(true)` when the action is late but `bypass` allows it
    fn gate(&self, slot: MealSlot, date: NaiveDate, bypass: bool) -> AppResult<bool> {
        match self.policy.can_mutate(slot, date, true, self.now, self.tz) {
            Decision::Allowed { .. } => Ok(false),
            Decision::Denied(DenyReason::CutoffPassed { .. }) if bypass => Ok(true),
            Decision::Denied(DenyReason::CutoffPassed { cutoff }) => {
                Err(cutoff_passed(slot, date, cutoff))
            }
            Decision::Denied(DenyReason::NotApplicable) => Err(not_applicable(slot, date)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn confirm(
        &self,
        slot: MealSlot,
        date: NaiveDate,
        menu_served: bool,
        current: Option<&MealBookingSlot>,
        bypass: bool,
        booked_by: BookedBy,
        action: BookingAction,
    ) -> AppResult<SlotPlan> {
        if !menu_served {
            return Err(not_applicable(slot, date));
        }
        match current {
            Some(c) if c.state == SlotState::Confirmed => return Ok(SlotPlan::Unchanged),
            Some(c) if c.consumed => return Err(already_consumed(slot, date)),
            _ => {}
        }
        let bypassed = self.gate(slot, date, bypass)?;
        Ok(SlotPlan::Apply(SlotChange {
            slot,
            expected: snapshot(current),
            state: SlotState::Confirmed,
            consumed: false,
            booked_by,
            cancellation_reason: None,
            is_reversible: true,
            last_action: action,
            cutoff_bypassed: bypassed,
        }))
    }

    /// Book a slot (cutoff-gated)
    pub fn book(
        &self,
        slot: MealSlot,
        date: NaiveDate,
        menu_served: bool,
        current: Option<&MealBookingSlot>,
        booked_by: BookedBy,
    ) -> AppResult<SlotPlan> {
        self.confirm(
            slot,
            date,
            menu_served,
            current,
            false,
            booked_by,
            BookingAction::Book,
        )
    }

    /// Staff books a slot for a student
    ///
    /// With `bypass_cutoff` a late booking is still planned and flagged.
    pub fn manual(
        &self,
        slot: MealSlot,
        date: NaiveDate,
        menu_served: bool,
        current: Option<&MealBookingSlot>,
        bypass_cutoff: bool,
    ) -> AppResult<SlotPlan> {
        self.confirm(
            slot,
            date,
            menu_served,
            current,
            bypass_cutoff,
            BookedBy::Staff,
            BookingAction::Manual,
        )
    }

    /// Cancel a slot (PENDING or CONFIRMED → SKIPPED)
    ///
    /// A NOT_APPLICABLE row whose menu has since been published is treated
    /// like PENDING; the CAS still expects the stored state.
    pub fn cancel(
        &self,
        slot: MealSlot,
        date: NaiveDate,
        menu_served: bool,
        current: Option<&MealBookingSlot>,
        reason: Option<&str>,
        booked_by: BookedBy,
    ) -> AppResult<SlotPlan> {
        if !menu_served {
            return Err(not_applicable(slot, date));
        }
        match current {
            Some(c) if c.state == SlotState::Skipped => return Ok(SlotPlan::Unchanged),
            Some(c) if c.consumed => return Err(already_consumed(slot, date)),
            _ => {}
        }
        self.gate(slot, date, false)?;
        Ok(SlotPlan::Apply(SlotChange {
            slot,
            expected: snapshot(current),
            state: SlotState::Skipped,
            consumed: false,
            booked_by,
            cancellation_reason: reason.map(str::to_string),
            is_reversible: true,
            last_action: BookingAction::Cancel,
            cutoff_bypassed: false,
        }))
    }

    /// Move an existing slot to `target` (CONFIRMED or SKIPPED)
    #[allow(clippy::too_many_arguments)]
    pub fn edit(
        &self,
        slot: MealSlot,
        date: NaiveDate,
        menu_served: bool,
        current: &MealBookingSlot,
        target: SlotState,
        reason: Option<&str>,
        booked_by: BookedBy,
    ) -> AppResult<SlotPlan> {
        if current.state == target {
            return Ok(SlotPlan::Unchanged);
        }
        if !menu_served {
            return Err(not_applicable(slot, date));
        }
        if current.consumed {
            return Err(already_consumed(slot, date));
        }
        self.gate(slot, date, false)?;
        let cancellation_reason = match target {
            SlotState::Skipped => reason.map(str::to_string),
            _ => None,
        };
        Ok(SlotPlan::Apply(SlotChange {
            slot,
            expected: (current.state, current.consumed),
            state: target,
            consumed: false,
            booked_by,
            cancellation_reason,
            is_reversible: true,
            last_action: BookingAction::Edit,
            cutoff_bypassed: false,
        }))
    }
}

/// Serving counter marks a slot as eaten (not cutoff-gated)
pub fn consume(slot: MealSlot, current: Option<&MealBookingSlot>) -> AppResult<SlotPlan> {
    let Some(c) = current else {
        return Err(invalid_transition(slot, None, BookingAction::Consume));
    };
    match c.state {
        SlotState::Confirmed | SlotState::Skipped if c.consumed => Ok(SlotPlan::Unchanged),
        SlotState::Confirmed | SlotState::Skipped => Ok(SlotPlan::Apply(SlotChange {
            slot,
            expected: (c.state, false),
            state: c.state,
            consumed: true,
            booked_by: BookedBy::Staff,
            cancellation_reason: c.cancellation_reason.clone(),
            is_reversible: true,
            last_action: BookingAction::Consume,
            cutoff_bypassed: false,
        })),
        other => Err(invalid_transition(slot, Some(other), BookingAction::Consume)),
    }
}

/// Staff undo of the last change (no cutoff check)
pub fn reverse(slot: MealSlot, current: &MealBookingSlot) -> AppResult<SlotPlan> {
    if !current.is_reversible {
        return Err(AppError::with_message(
            ErrorCode::NotReversible,
            format!("{slot} is not reversible"),
        )
        .with_detail("slot", slot.as_str()));
    }

    let (state, consumed, cancellation_reason) = if current.consumed {
        (current.state, false, current.cancellation_reason.clone())
    } else {
        match current.state {
            SlotState::Skipped => (SlotState::Confirmed, false, None),
            SlotState::Confirmed => (SlotState::Skipped, false, None),
            other => {
                return Err(invalid_transition(
                    slot,
                    Some(other),
                    BookingAction::Reverse,
                ));
            }
        }
    };

    Ok(SlotPlan::Apply(SlotChange {
        slot,
        expected: (current.state, current.consumed),
        state,
        consumed,
        booked_by: BookedBy::Staff,
        cancellation_reason,
        is_reversible: false,
        last_action: BookingAction::Reverse,
        cutoff_bypassed: true,
    }))
}
