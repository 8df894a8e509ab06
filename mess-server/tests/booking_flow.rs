//! 订餐流程集成测试
//!
//! Drives the booking and report services end to end against an in-memory
//! database with a pinned clock.

mod common;

use std::collections::BTreeMap;

use common::*;
use mess_server::db::repository::{booking as booking_repo, residence};
use mess_server::reports::{CalendarQuery, StudentQuery};
use mess_server::{Actor, ErrorCode};
use shared::models::{
    BookRangeRequest, BookRequest, BookedBy, BookingAction, CancelRequest, ConsumeRequest,
    DerivedStatus, EditRequest, Gatepass, GatepassStatus, ManualBookRequest, MealSlot,
    MessMenuUpsert, ReverseRequest, SlotChoice, SlotState,
};

use MealSlot::{Breakfast, Dinner, Lunch, Snacks};

fn book_req(student_id: Option<i64>, days: Vec<shared::models::DayEntry>) -> BookRequest {
    BookRequest { student_id, days }
}

async fn stored_dates(fx: &Fixture, student_id: i64, dates: &[String]) -> usize {
    booking_repo::find_for_dates(&fx.state.pool, HOSTEL, student_id, dates)
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn test_bulk_limit_rejects_whole_request() {
    let fx = fixture().await;
    let asha = student(ASHA);

    let eleven: Vec<_> = (11..=21).map(|d| day(d, &[Lunch])).collect();
    let dates: Vec<String> = (11..=21).map(date).collect();
    let err = fx
        .state
        .bookings
        .book(&asha, HOSTEL, book_req(None, eleven))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BulkLimitExceeded);
    assert_eq!(stored_dates(&fx, ASHA, &dates).await, 0);

    let ten: Vec<_> = (11..=20).map(|d| day(d, &[Lunch])).collect();
    let bookings = fx
        .state
        .bookings
        .book(&asha, HOSTEL, book_req(None, ten))
        .await
        .unwrap();
    assert_eq!(bookings.len(), 10);
    for booking in &bookings {
        assert_eq!(booking.slots.len(), 4);
        assert_eq!(booking.slot(Lunch).unwrap().state, SlotState::Confirmed);
        assert_eq!(booking.slot(Breakfast).unwrap().state, SlotState::Pending);
    }
    let twelfth = bookings.iter().find(|b| b.date == date(12)).unwrap();
    assert_eq!(twelfth.slot(Dinner).unwrap().state, SlotState::NotApplicable);
}

#[tokio::test]
async fn test_book_range_counts_days() {
    let fx = fixture().await;
    let range = |from: u32, to: u32| BookRangeRequest {
        student_id: None,
        from: date(from),
        to: date(to),
        slots: Vec::new(),
        is_full_day: true,
    };

    let err = fx
        .state
        .bookings
        .book_range(&student(ASHA), HOSTEL, range(13, 23))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BulkLimitExceeded);

    let bookings = fx
        .state
        .bookings
        .book_range(&student(ASHA), HOSTEL, range(13, 14))
        .await
        .unwrap();
    assert_eq!(bookings.len(), 2);
    assert!(bookings.iter().all(|b| b
        .slots
        .iter()
        .all(|s| s.state == SlotState::Confirmed)));
}

#[tokio::test]
async fn test_duplicate_date_rejected() {
    let fx = fixture().await;
    let err = fx
        .state
        .bookings
        .book(
            &student(ASHA),
            HOSTEL,
            book_req(None, vec![day(11, &[Lunch]), day(11, &[Dinner])]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicateDate);
}

#[tokio::test]
async fn test_rebook_is_idempotent() {
    let fx = fixture().await;
    let asha = student(ASHA);

    let first = fx
        .state
        .bookings
        .book(&asha, HOSTEL, book_req(None, vec![day(11, &[Lunch])]))
        .await
        .unwrap();
    let second = fx
        .state
        .bookings
        .book(&asha, HOSTEL, book_req(None, vec![day(11, &[Lunch])]))
        .await
        .unwrap();

    assert_eq!(first[0].id, second[0].id);
    let (a, b) = (first[0].slot(Lunch).unwrap(), second[0].slot(Lunch).unwrap());
    assert_eq!(a.state, SlotState::Confirmed);
    assert_eq!(a.updated_at, b.updated_at);
    assert_eq!(b.last_action, BookingAction::Book);
}

#[tokio::test]
async fn test_concurrent_duplicate_bookings_converge() {
    let fx = fixture().await;
    let asha = student(ASHA);
    let req = || book_req(None, vec![day(15, &[Lunch, Dinner])]);

    let (a, b) = tokio::join!(
        fx.state.bookings.book(&asha, HOSTEL, req()),
        fx.state.bookings.book(&asha, HOSTEL, req()),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a[0].id, b[0].id);
    assert_eq!(b[0].slot(Dinner).unwrap().state, SlotState::Confirmed);
}

#[tokio::test]
async fn test_one_late_slot_rejects_whole_request() {
    let fx = fixture().await;

    // 09:00 on the 10th: lunch is open until 10:00, breakfast closed the night before
    let err = fx
        .state
        .bookings
        .book(
            &student(ASHA),
            HOSTEL,
            book_req(None, vec![day(11, &[Lunch]), day(10, &[Breakfast, Lunch])]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::CutoffPassed);
    assert_eq!(
        err.details.as_ref().and_then(|d| d.get("slot")).and_then(|v| v.as_str()),
        Some("breakfast")
    );
    assert_eq!(stored_dates(&fx, ASHA, &[date(10), date(11)]).await, 0);
}

#[tokio::test]
async fn test_cutoff_is_inclusive() {
    let fx = fixture().await;
    let asha = student(ASHA);

    let booked = fx
        .state
        .bookings
        .book(&asha, HOSTEL, book_req(None, vec![day(10, &[Lunch])]))
        .await
        .unwrap();
    let booking_id = booked[0].id;

    // exactly at the cutoff instant
    fx.set_now(ist(10, 10, 0, 0));
    let cancelled = fx
        .state
        .bookings
        .cancel(
            &asha,
            HOSTEL,
            CancelRequest {
                student_id: None,
                days: vec![day(10, &[Lunch])],
                cancellation_reason: Some("  Exam  ".into()),
            },
        )
        .await
        .unwrap();
    let lunch = cancelled[0].slot(Lunch).unwrap();
    assert_eq!(lunch.state, SlotState::Skipped);
    assert_eq!(lunch.cancellation_reason.as_deref(), Some("Exam"));

    fx.set_now(ist(10, 10, 0, 1));
    let err = fx
        .state
        .bookings
        .edit(
            &asha,
            booking_id,
            EditRequest {
                slots: BTreeMap::from([(Lunch, SlotChoice::Confirmed)]),
                cancellation_reason: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::CutoffPassed);
}

#[tokio::test]
async fn test_missing_cutoff_falls_back_to_timing_start() {
    let fx = fixture().await;
    let meera = student(MEERA);

    fx.set_now(ist(10, 12, 30, 0));
    fx.state
        .bookings
        .book(&meera, OTHER_HOSTEL, book_req(None, vec![day(10, &[Lunch])]))
        .await
        .unwrap();

    // dinner and snacks start later that day, so both are still open
    fx.set_now(ist(10, 12, 30, 1));
    fx.state
        .bookings
        .book(&meera, OTHER_HOSTEL, book_req(None, vec![day(10, &[Dinner, Snacks])]))
        .await
        .unwrap();

    let err = fx
        .state
        .bookings
        .cancel(
            &meera,
            OTHER_HOSTEL,
            CancelRequest {
                student_id: None,
                days: vec![day(10, &[Lunch])],
                cancellation_reason: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::CutoffPassed);
}

#[tokio::test]
async fn test_unserved_slot_is_not_applicable() {
    let fx = fixture().await;
    let asha = student(ASHA);

    let err = fx
        .state
        .bookings
        .book(&asha, HOSTEL, book_req(None, vec![day(12, &[Dinner])]))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MealNotApplicable);

    // no menu published at all
    let err = fx
        .state
        .bookings
        .book(&asha, HOSTEL, book_req(None, vec![day(28, &[Lunch])]))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MealNotApplicable);
}

#[tokio::test]
async fn test_menu_published_after_booking_can_be_cancelled() {
    let fx = fixture().await;
    let asha = student(ASHA);

    // Row created while dinner was not served on the 12th
    let bookings = fx
        .state
        .bookings
        .book(&asha, HOSTEL, book_req(None, vec![day(12, &[Lunch])]))
        .await
        .unwrap();
    assert_eq!(bookings[0].slot(Dinner).unwrap().state, SlotState::NotApplicable);

    fx.state
        .meal_config
        .put_menu(
            HOSTEL,
            chrono::NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
            MessMenuUpsert {
                breakfast: Some("Poha".into()),
                lunch: Some("Dal, rice".into()),
                snacks: Some("Samosa".into()),
                dinner: Some("Khichdi".into()),
            },
        )
        .await
        .unwrap();

    let bookings = fx
        .state
        .bookings
        .cancel(
            &asha,
            HOSTEL,
            CancelRequest {
                student_id: None,
                days: vec![day(12, &[Dinner])],
                cancellation_reason: Some("Going home".into()),
            },
        )
        .await
        .unwrap();
    let dinner = bookings[0].slot(Dinner).unwrap();
    assert_eq!(dinner.state, SlotState::Skipped);
    assert_eq!(dinner.cancellation_reason.as_deref(), Some("Going home"));

    let bookings = fx
        .state
        .bookings
        .book(&asha, HOSTEL, book_req(None, vec![day(12, &[Dinner])]))
        .await
        .unwrap();
    assert_eq!(bookings[0].slot(Dinner).unwrap().state, SlotState::Confirmed);
}

#[tokio::test]
async fn test_manual_book_cutoff_and_bypass() {
    let fx = fixture().await;
    let late = ManualBookRequest {
        student_id: RAVI,
        date: date(10),
        slots: vec![Breakfast],
        is_full_day: false,
    };

    let err = fx
        .state
        .bookings
        .manual_book(&warden(), HOSTEL, late.clone())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::CutoffPassed);

    let booking = fx
        .state
        .bookings
        .manual_book(&admin(), HOSTEL, late)
        .await
        .unwrap();
    let breakfast = booking.slot(Breakfast).unwrap();
    assert_eq!(breakfast.state, SlotState::Confirmed);
    assert!(breakfast.cutoff_bypassed);
    assert_eq!(breakfast.booked_by, BookedBy::Staff);
    assert_eq!(breakfast.last_action, BookingAction::Manual);
    assert_eq!(breakfast.actor_id, Some(200));

    let err = fx
        .state
        .bookings
        .manual_book(
            &admin(),
            HOSTEL,
            ManualBookRequest {
                student_id: RAVI,
                date: date(28),
                slots: Vec::new(),
                is_full_day: true,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MealNotApplicable);

    let err = fx
        .state
        .bookings
        .manual_book(
            &student(ASHA),
            HOSTEL,
            ManualBookRequest {
                student_id: ASHA,
                date: date(11),
                slots: vec![Lunch],
                is_full_day: false,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StaffRequired);
}

#[tokio::test]
async fn test_reverse_restores_cancelled_slot_once() {
    let fx = fixture().await;
    let asha = student(ASHA);

    fx.state
        .bookings
        .book(&asha, HOSTEL, book_req(None, vec![day(11, &[Lunch])]))
        .await
        .unwrap();
    let cancelled = fx
        .state
        .bookings
        .cancel(
            &asha,
            HOSTEL,
            CancelRequest {
                student_id: None,
                days: vec![day(11, &[Lunch])],
                cancellation_reason: Some("Going home".into()),
            },
        )
        .await
        .unwrap();
    let booking_id = cancelled[0].id;
    assert_eq!(
        cancelled[0].slot(Lunch).unwrap().cancellation_reason.as_deref(),
        Some("Going home")
    );

    let err = fx
        .state
        .bookings
        .reverse(&asha, booking_id, ReverseRequest { slots: vec![Lunch] })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StaffRequired);

    // reversal ignores the cutoff
    fx.set_now(ist(11, 20, 0, 0));
    let reversed = fx
        .state
        .bookings
        .reverse(&warden(), booking_id, ReverseRequest { slots: vec![Lunch] })
        .await
        .unwrap();
    let lunch = reversed.slot(Lunch).unwrap();
    assert_eq!(lunch.state, SlotState::Confirmed);
    assert_eq!(lunch.cancellation_reason, None);
    assert!(!lunch.is_reversible);
    assert_eq!(lunch.last_action, BookingAction::Reverse);

    let err = fx
        .state
        .bookings
        .reverse(&warden(), booking_id, ReverseRequest { slots: vec![Lunch] })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotReversible);
}

#[tokio::test]
async fn test_edit_without_changes_is_noop() {
    let fx = fixture().await;
    let asha = student(ASHA);

    let booked = fx
        .state
        .bookings
        .book(&asha, HOSTEL, book_req(None, vec![day(11, &[Lunch, Dinner])]))
        .await
        .unwrap();
    let before = &booked[0];

    let same = fx
        .state
        .bookings
        .edit(
            &asha,
            before.id,
            EditRequest {
                slots: BTreeMap::from([(Lunch, SlotChoice::Confirmed)]),
                cancellation_reason: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(same.updated_at, before.updated_at);
    assert_eq!(
        same.slot(Lunch).unwrap().updated_at,
        before.slot(Lunch).unwrap().updated_at
    );

    let edited = fx
        .state
        .bookings
        .edit(
            &asha,
            before.id,
            EditRequest {
                slots: BTreeMap::from([
                    (Lunch, SlotChoice::Confirmed),
                    (Dinner, SlotChoice::Skipped),
                ]),
                cancellation_reason: Some("Dinner outside".into()),
            },
        )
        .await
        .unwrap();
    let dinner = edited.slot(Dinner).unwrap();
    assert_eq!(dinner.state, SlotState::Skipped);
    assert_eq!(dinner.last_action, BookingAction::Edit);
    assert_eq!(dinner.cancellation_reason.as_deref(), Some("Dinner outside"));
    assert_eq!(edited.slot(Lunch).unwrap().last_action, BookingAction::Book);

    let err = fx
        .state
        .bookings
        .edit(
            &student(RAVI),
            before.id,
            EditRequest {
                slots: BTreeMap::from([(Lunch, SlotChoice::Skipped)]),
                cancellation_reason: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
}

#[tokio::test]
async fn test_consumed_slot_cannot_be_cancelled() {
    let fx = fixture().await;
    let asha = student(ASHA);

    fx.state
        .bookings
        .book(&asha, HOSTEL, book_req(None, vec![day(10, &[Lunch])]))
        .await
        .unwrap();

    let consume = || ConsumeRequest {
        student_id: ASHA,
        date: date(10),
        slots: vec![Lunch],
    };
    let served = fx
        .state
        .bookings
        .consume(&warden(), HOSTEL, consume())
        .await
        .unwrap();
    assert!(served.slot(Lunch).unwrap().consumed);

    // idempotent
    fx.state
        .bookings
        .consume(&warden(), HOSTEL, consume())
        .await
        .unwrap();

    let err = fx
        .state
        .bookings
        .cancel(
            &asha,
            HOSTEL,
            CancelRequest {
                student_id: None,
                days: vec![day(10, &[Lunch])],
                cancellation_reason: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AlreadyConsumed);

    let err = fx
        .state
        .bookings
        .consume(
            &warden(),
            HOSTEL,
            ConsumeRequest {
                student_id: ASHA,
                date: date(10),
                slots: vec![Snacks],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidTransition);
}

#[tokio::test]
async fn test_scope_checks() {
    let fx = fixture().await;

    let err = fx
        .state
        .bookings
        .book(&student(ASHA), HOSTEL, book_req(Some(RAVI), vec![day(11, &[Lunch])]))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);

    let outsider = Actor::warden(101, vec![OTHER_HOSTEL]);
    let err = fx
        .state
        .bookings
        .book(&outsider, HOSTEL, book_req(Some(ASHA), vec![day(11, &[Lunch])]))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::HostelScopeViolation);

    let err = fx
        .state
        .bookings
        .book(&warden(), HOSTEL, book_req(None, vec![day(11, &[Lunch])]))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RequiredField);

    // a student of another hostel
    let err = fx
        .state
        .bookings
        .book(&warden(), HOSTEL, book_req(Some(MEERA), vec![day(11, &[Lunch])]))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StudentNotFound);

    // staff bookings are attributed to staff
    let booked = fx
        .state
        .bookings
        .book(&warden(), HOSTEL, book_req(Some(ASHA), vec![day(11, &[Lunch])]))
        .await
        .unwrap();
    assert_eq!(booked[0].slot(Lunch).unwrap().booked_by, BookedBy::Staff);
}

#[tokio::test]
async fn test_reports_after_the_day() {
    let fx = fixture().await;

    for id in [ASHA, RAVI] {
        fx.state
            .bookings
            .book(&student(id), HOSTEL, book_req(None, vec![day(10, &[Lunch])]))
            .await
            .unwrap();
    }
    fx.state
        .bookings
        .consume(
            &warden(),
            HOSTEL,
            ConsumeRequest {
                student_id: ASHA,
                date: date(10),
                slots: vec![Lunch],
            },
        )
        .await
        .unwrap();
    residence::upsert_gatepass(
        &fx.state.pool,
        &Gatepass {
            id: 50,
            hostel_id: HOSTEL,
            student_id: RAVI,
            out_date: date(10),
            in_date: date(11),
            status: GatepassStatus::Approved,
        },
    )
    .await
    .unwrap();

    fx.set_now(ist(11, 9, 0, 0));

    let (missed, count) = fx
        .state
        .reports
        .students(
            &warden(),
            HOSTEL,
            StudentQuery {
                date: date(10),
                statuses: Some("MISSED".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(missed[0].student_id, RAVI);
    assert_eq!(missed[0].slots[&Lunch].derived, DerivedStatus::Missed);
    assert_eq!(missed[0].slots[&Lunch].state, Some(SlotState::Confirmed));
    assert_eq!(missed[0].slots[&Dinner].derived, DerivedStatus::Pending);

    let analytics = fx
        .state
        .reports
        .daily_analytics(&warden(), HOSTEL, &date(10))
        .await
        .unwrap();
    assert_eq!(analytics.total_students, 2);
    assert_eq!(analytics.slots[&Lunch][&DerivedStatus::Consumed], 1);
    assert_eq!(analytics.slots[&Lunch][&DerivedStatus::Missed], 1);
    assert_eq!(analytics.slots[&Dinner][&DerivedStatus::Pending], 2);

    let calendar = fx
        .state
        .reports
        .calendar(
            &student(ASHA),
            HOSTEL,
            ASHA,
            CalendarQuery {
                month: Some("2025-06".into()),
                date: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(calendar.days.len(), 30);
    assert_eq!(calendar.days[9].slots[&Lunch], DerivedStatus::Consumed);
    assert_eq!(calendar.days[11].slots[&Dinner], DerivedStatus::NotApplicable);
    assert_eq!(calendar.days[0].slots[&Lunch], DerivedStatus::NotApplicable);
    assert!(calendar.timing.is_some());

    let err = fx
        .state
        .reports
        .calendar(&student(RAVI), HOSTEL, ASHA, CalendarQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);

    let away = fx
        .state
        .reports
        .gatepass_bookings(&warden(), HOSTEL, 50)
        .await
        .unwrap();
    assert_eq!(away.days.len(), 1);
    assert_eq!(away.days[0].date, date(10));
    assert_eq!(away.days[0].booked_while_away, vec![Lunch]);

    let err = fx
        .state
        .reports
        .daily_analytics(&student(ASHA), HOSTEL, &date(10))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StaffRequired);
}
