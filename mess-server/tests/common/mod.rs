//! 集成测试公共夹具
//!
//! In-memory database, a pinned clock in Asia/Kolkata and a small hostel:
//!
//! - hostel 1: students 7 and 8, full cutoff rules, menus 2025-06-09..=2025-06-25
//!   (no dinner on 2025-06-12)
//! - hostel 2: student 9, meal timing only (no cutoff rules)

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Asia::Kolkata;
use mess_server::db::DbService;
use mess_server::db::repository::residence;
use mess_server::utils::{ManualClock, SharedClock};
use mess_server::{Actor, Config, ServerState};
use shared::models::{
    DayEntry, Hostel, MealCutoff, MealSlot, MealTiming, MessMenuUpsert, SlotCutoff, SlotWindow,
    Student,
};

pub const HOSTEL: i64 = 1;
pub const OTHER_HOSTEL: i64 = 2;
pub const ASHA: i64 = 7;
pub const RAVI: i64 = 8;
pub const MEERA: i64 = 9;

/// Local (Asia/Kolkata) wall time as UTC
pub fn ist(day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Kolkata
        .with_ymd_and_hms(2025, 6, day, hour, min, sec)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

pub fn date(day: u32) -> String {
    format!("2025-06-{day:02}")
}

pub fn day(day: u32, slots: &[MealSlot]) -> DayEntry {
    DayEntry {
        date: date(day),
        slots: slots.to_vec(),
        is_full_day: false,
    }
}

pub fn student(id: i64) -> Actor {
    Actor::student(id)
}

pub fn warden() -> Actor {
    Actor::warden(100, vec![HOSTEL])
}

pub fn admin() -> Actor {
    Actor::admin(200, vec![HOSTEL])
}

pub fn timing() -> MealTiming {
    let window = |start: &str, end: &str| SlotWindow {
        start: start.into(),
        end: end.into(),
    };
    MealTiming {
        breakfast: window("07:30", "09:30"),
        lunch: window("12:30", "14:00"),
        snacks: window("16:30", "17:30"),
        dinner: window("19:30", "21:30"),
    }
}

pub fn cutoff() -> MealCutoff {
    let rule = |day_offset: i32, time: &str| SlotCutoff {
        day_offset,
        time: time.into(),
    };
    MealCutoff {
        breakfast: rule(-1, "22:00"),
        lunch: rule(0, "10:00"),
        snacks: rule(0, "15:00"),
        dinner: rule(0, "18:00"),
    }
}

fn full_menu() -> MessMenuUpsert {
    MessMenuUpsert {
        breakfast: Some("Poha".into()),
        lunch: Some("Dal, rice".into()),
        snacks: Some("Samosa".into()),
        dinner: Some("Roti, paneer".into()),
    }
}

pub struct Fixture {
    pub state: ServerState,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn set_now(&self, at: DateTime<Utc>) {
        self.clock.set(at);
    }
}

/// Seeded state, clock at 2025-06-10 09:00 IST
pub async fn fixture() -> Fixture {
    let db = DbService::in_memory().await.unwrap();
    let pool = db.pool;

    for (id, name) in [(HOSTEL, "North Block"), (OTHER_HOSTEL, "South Block")] {
        residence::upsert_hostel(&pool, &Hostel { id, name: name.into() })
            .await
            .unwrap();
    }
    for (id, hostel_id, name, room) in [
        (ASHA, HOSTEL, "Asha", "204"),
        (RAVI, HOSTEL, "Ravi", "310"),
        (MEERA, OTHER_HOSTEL, "Meera", "101"),
    ] {
        residence::upsert_student(
            &pool,
            &Student {
                id,
                hostel_id,
                name: name.into(),
                roll_no: format!("CS-{id:02}"),
                floor: 2,
                room: room.into(),
            },
        )
        .await
        .unwrap();
    }

    let mut config = Config::from_env();
    config.timezone = Kolkata;
    config.max_bulk_entries = 10;
    config.booking_rate_limit = 3;
    config.booking_rate_window_secs = 60;
    config.config_cache_ttl_secs = 300;

    let clock = Arc::new(ManualClock::new(ist(10, 9, 0, 0)));
    let shared_clock: SharedClock = clock.clone();
    let state = ServerState::with_pool(config, pool, shared_clock);

    state.meal_config.put_timing(HOSTEL, timing()).await.unwrap();
    state.meal_config.put_cutoff(HOSTEL, cutoff()).await.unwrap();
    state
        .meal_config
        .put_timing(OTHER_HOSTEL, timing())
        .await
        .unwrap();

    for d in 9..=25 {
        let mut menu = full_menu();
        if d == 12 {
            menu.dinner = None;
        }
        let date = chrono::NaiveDate::from_ymd_opt(2025, 6, d).unwrap();
        state.meal_config.put_menu(HOSTEL, date, menu).await.unwrap();
        state
            .meal_config
            .put_menu(OTHER_HOSTEL, date, full_menu())
            .await
            .unwrap();
    }

    Fixture { state, clock }
}
