//! Derived booking status
//!
//! The read path never branches on slot state directly: every view goes
//! through [`derive_status`], which walks [`STATUS_TABLE`] and returns the
//! first matching row.

use chrono::NaiveDate;
use shared::models::{DerivedStatus, SlotState};

/// Stored state column of a table row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateMatch {
    NoRecord,
    Is(SlotState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsumedMatch {
    Any,
    Yes,
    No,
}

/// Booking date relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateMatch {
    Any,
    Past,
    TodayOrFuture,
}

#[derive(Debug, Clone, Copy)]
struct StatusRule {
    state: StateMatch,
    consumed: ConsumedMatch,
    date: DateMatch,
    derived: DerivedStatus,
}

const fn rule(
    state: StateMatch,
    consumed: ConsumedMatch,
    date: DateMatch,
    derived: DerivedStatus,
) -> StatusRule {
    StatusRule {
        state,
        consumed,
        date,
        derived,
    }
}

/// First match wins
const STATUS_TABLE: &[StatusRule] = &[
    rule(StateMatch::NoRecord, ConsumedMatch::Any, DateMatch::Any, DerivedStatus::NotBooked),
    rule(
        StateMatch::Is(SlotState::NotApplicable),
        ConsumedMatch::Any,
        DateMatch::Any,
        DerivedStatus::NotBooked,
    ),
    rule(
        StateMatch::Is(SlotState::Confirmed),
        ConsumedMatch::Yes,
        DateMatch::Any,
        DerivedStatus::Consumed,
    ),
    rule(
        StateMatch::Is(SlotState::Confirmed),
        ConsumedMatch::No,
        DateMatch::Past,
        DerivedStatus::Missed,
    ),
    rule(
        StateMatch::Is(SlotState::Confirmed),
        ConsumedMatch::No,
        DateMatch::TodayOrFuture,
        DerivedStatus::Confirmed,
    ),
    rule(
        StateMatch::Is(SlotState::Skipped),
        ConsumedMatch::Yes,
        DateMatch::Any,
        DerivedStatus::SkippedConsumed,
    ),
    rule(
        StateMatch::Is(SlotState::Skipped),
        ConsumedMatch::No,
        DateMatch::Any,
        DerivedStatus::Skipped,
    ),
    rule(
        StateMatch::Is(SlotState::Pending),
        ConsumedMatch::Any,
        DateMatch::Any,
        DerivedStatus::Pending,
    ),
];

impl StatusRule {
    fn matches(&self, state: Option<SlotState>, consumed: bool, is_past: bool) -> bool {
        let state_ok = match self.state {
            StateMatch::NoRecord => state.is_none(),
            StateMatch::Is(s) => state == Some(s),
        };
        let consumed_ok = match self.consumed {
            ConsumedMatch::Any => true,
            ConsumedMatch::Yes => consumed,
            ConsumedMatch::No => !consumed,
        };
        let date_ok = match self.date {
            DateMatch::Any => true,
            DateMatch::Past => is_past,
            DateMatch::TodayOrFuture => !is_past,
        };
        state_ok && consumed_ok && date_ok
    }
}

/// Derive the display status of one slot
///
/// `state` is `None` when no booking row exists.
pub fn derive_status(
    state: Option<SlotState>,
    consumed: bool,
    date: NaiveDate,
    today: NaiveDate,
) -> DerivedStatus {
    let is_past = date < today;
    STATUS_TABLE
        .iter()
        .find(|r| r.matches(state, consumed, is_past))
        .map(|r| r.derived)
        .unwrap_or(DerivedStatus::NotBooked)
}

/// Status shown in calendars and dashboards
///
/// Same as [`derive_status`], except that an unbooked slot with no
/// published menu shows as NOT_APPLICABLE.
pub fn display_status(
    state: Option<SlotState>,
    consumed: bool,
    date: NaiveDate,
    today: NaiveDate,
    menu_served: bool,
) -> DerivedStatus {
    let derived = derive_status(state, consumed, date, today);
    let unbooked = matches!(state, None | Some(SlotState::NotApplicable));
    if derived == DerivedStatus::NotBooked && unbooked && !menu_served {
        DerivedStatus::NotApplicable
    } else {
        derived
    }
}
