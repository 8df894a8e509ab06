//! 截止时间校验
//!
//! Pure decision: given the hostel rules, a slot, a target date, whether a
//! menu is published and the current instant, may a booking action run?
//!
//! Rule precedence per slot:
//! 1. configured cutoff: `date + day_offset` at `time`
//! 2. meal timing start on the target date
//! 3. 00:00 of the target date

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use shared::models::{MealCutoff, MealSlot, MealTiming};

use crate::utils::time::{local_instant, parse_time_of_day};

/// Where the effective cutoff of a slot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    Cutoff,
    TimingStart,
    Midnight,
}

/// Effective cutoff rule of one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffRule {
    pub day_offset: i64,
    pub time: NaiveTime,
    pub source: RuleSource,
}

impl CutoffRule {
    /// Latest instant at which an action for `date` is allowed
    pub fn instant(&self, date: NaiveDate, tz: Tz) -> DateTime<Utc> {
        let day = date + Duration::days(self.day_offset);
        local_instant(day, self.time, tz)
    }
}

/// Why an action was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No menu published for the slot on that date
    NotApplicable,
    CutoffPassed { cutoff: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { cutoff: DateTime<Utc> },
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Hostel rules the validator reads
#[derive(Debug, Clone, Copy, Default)]
pub struct CutoffPolicy<'a> {
    pub cutoff: Option<&'a MealCutoff>,
    pub timing: Option<&'a MealTiming>,
}

impl<'a> CutoffPolicy<'a> {
    pub fn new(cutoff: Option<&'a MealCutoff>, timing: Option<&'a MealTiming>) -> Self {
        Self { cutoff, timing }
    }

    /// Resolve the effective rule of a slot
    ///
    /// Stored times are validated on write; an unparsable value falls
    /// through to the next rule.
    pub fn rule(&self, slot: MealSlot) -> CutoffRule {
        if let Some(cutoff) = self.cutoff {
            let rule = cutoff.get(slot);
            match parse_time_of_day(&rule.time) {
                Ok(time) => {
                    return CutoffRule {
                        day_offset: i64::from(rule.day_offset),
                        time,
                        source: RuleSource::Cutoff,
                    };
                }
                Err(_) => {
                    tracing::warn!(slot = %slot, time = %rule.time, "Stored cutoff time is invalid, ignoring");
                }
            }
        }

        if let Some(timing) = self.timing {
            let window = timing.get(slot);
            match parse_time_of_day(&window.start) {
                Ok(time) => {
                    return CutoffRule {
                        day_offset: 0,
                        time,
                        source: RuleSource::TimingStart,
                    };
                }
                Err(_) => {
                    tracing::warn!(slot = %slot, start = %window.start, "Stored meal timing is invalid, ignoring");
                }
            }
        }

        CutoffRule {
            day_offset: 0,
            time: NaiveTime::MIN,
            source: RuleSource::Midnight,
        }
    }

    /// 判断是否允许变更
    ///
    /// Unpublished menus are refused before the cutoff is looked at.
    /// The cutoff instant itself is still allowed.
    pub fn can_mutate(
        &self,
        slot: MealSlot,
        target_date: NaiveDate,
        menu_served: bool,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Decision {
        if !menu_served {
            return Decision::Denied(DenyReason::NotApplicable);
        }
        let cutoff = self.rule(slot).instant(target_date, tz);
        if now <= cutoff {
            Decision::Allowed { cutoff }
        } else {
            Decision::Denied(DenyReason::CutoffPassed { cutoff })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::models::{SlotCutoff, SlotWindow};

    const TZ: Tz = chrono_tz::Asia::Kolkata;

    fn cutoff_all(day_offset: i32, time: &str) -> MealCutoff {
        let rule = SlotCutoff {
            day_offset,
            time: time.into(),
        };
        MealCutoff {
            breakfast: rule.clone(),
            lunch: rule.clone(),
            snacks: rule.clone(),
            dinner: rule,
        }
    }

    fn timing() -> MealTiming {
        let w = |s: &str, e: &str| SlotWindow {
            start: s.into(),
            end: e.into(),
        };
        MealTiming {
            breakfast: w("07:30", "09:30"),
            lunch: w("12:30", "14:30"),
            snacks: w("17:00", "18:00"),
            dinner: w("20:00", "22:00"),
        }
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        TZ.with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_previous_day_cutoff_scenario() {
        let cutoff = cutoff_all(-1, "20:00");
        let policy = CutoffPolicy::new(Some(&cutoff), None);
        let target = date(2025, 6, 10);

        let before = policy.can_mutate(MealSlot::Breakfast, target, true, local(2025, 6, 9, 19, 59, 0), TZ);
        assert!(before.is_allowed());

        let after = policy.can_mutate(MealSlot::Breakfast, target, true, local(2025, 6, 9, 20, 1, 0), TZ);
        assert!(matches!(
            after,
            Decision::Denied(DenyReason::CutoffPassed { .. })
        ));
    }

    #[test]
    fn test_cutoff_boundary_is_inclusive() {
        let cutoff = cutoff_all(0, "10:00");
        let policy = CutoffPolicy::new(Some(&cutoff), None);
        let target = date(2025, 6, 10);
        let instant = local(2025, 6, 10, 10, 0, 0);

        let at = policy.can_mutate(MealSlot::Lunch, target, true, instant, TZ);
        assert_eq!(at, Decision::Allowed { cutoff: instant });

        let second_before = instant - Duration::seconds(1);
        assert!(policy
            .can_mutate(MealSlot::Lunch, target, true, second_before, TZ)
            .is_allowed());

        let second_after = instant + Duration::seconds(1);
        assert_eq!(
            policy.can_mutate(MealSlot::Lunch, target, true, second_after, TZ),
            Decision::Denied(DenyReason::CutoffPassed { cutoff: instant })
        );
    }

    #[test]
    fn test_missing_menu_is_denied_regardless_of_cutoff() {
        let cutoff = cutoff_all(0, "23:59");
        let policy = CutoffPolicy::new(Some(&cutoff), None);
        let decision = policy.can_mutate(
            MealSlot::Dinner,
            date(2025, 6, 10),
            false,
            local(2025, 6, 1, 8, 0, 0),
            TZ,
        );
        assert_eq!(decision, Decision::Denied(DenyReason::NotApplicable));
    }

    #[test]
    fn test_fallback_to_timing_start() {
        let timing = timing();
        let policy = CutoffPolicy::new(None, Some(&timing));
        let rule = policy.rule(MealSlot::Lunch);
        assert_eq!(rule.source, RuleSource::TimingStart);
        assert_eq!(rule.day_offset, 0);

        let target = date(2025, 6, 10);
        assert!(policy
            .can_mutate(MealSlot::Lunch, target, true, local(2025, 6, 10, 12, 30, 0), TZ)
            .is_allowed());
        assert!(!policy
            .can_mutate(MealSlot::Lunch, target, true, local(2025, 6, 10, 12, 31, 0), TZ)
            .is_allowed());
    }

    #[test]
    fn test_fallback_to_midnight_without_config() {
        let policy = CutoffPolicy::default();
        let rule = policy.rule(MealSlot::Snacks);
        assert_eq!(rule.source, RuleSource::Midnight);

        let target = date(2025, 6, 10);
        // Earlier days stay open, the day itself is closed
        assert!(policy
            .can_mutate(MealSlot::Snacks, target, true, local(2025, 6, 9, 23, 59, 59), TZ)
            .is_allowed());
        assert!(!policy
            .can_mutate(MealSlot::Snacks, target, true, local(2025, 6, 10, 0, 0, 1), TZ)
            .is_allowed());
    }

    #[test]
    fn test_invalid_stored_cutoff_falls_through() {
        let cutoff = cutoff_all(-1, "8pm");
        let timing = timing();
        let policy = CutoffPolicy::new(Some(&cutoff), Some(&timing));
        assert_eq!(policy.rule(MealSlot::Dinner).source, RuleSource::TimingStart);
    }
}
