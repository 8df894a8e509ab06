//! Booking Rate Guard - 订餐限流
//!
//! Sliding window per actor key: at most `limit` mutations inside the
//! trailing `window`. Keys whose window has emptied are dropped by a
//! periodic sweep registered with [`BackgroundTasks`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::utils::{AppError, AppResult, SharedClock};

#[derive(Clone)]
pub struct RateGuard {
    limit: usize,
    window_ms: i64,
    clock: SharedClock,
    hits: Arc<Mutex<HashMap<String, VecDeque<i64>>>>,
}

impl std::fmt::Debug for RateGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGuard")
            .field("limit", &self.limit)
            .field("window_ms", &self.window_ms)
            .field("keys", &self.hits.lock().len())
            .finish()
    }
}

impl RateGuard {
    pub fn new(limit: usize, window: Duration, clock: SharedClock) -> Self {
        Self {
            limit,
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
            clock,
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record one mutation for `key`, or reject it
    ///
    /// A rejected call is not recorded.
    pub fn check_and_record(&self, key: &str) -> AppResult<()> {
        let now = self.clock.now_millis();
        let mut hits = self.hits.lock();
        let window = hits.entry(key.to_string()).or_default();
        while let Some(&oldest) = window.front() {
            if now - oldest >= self.window_ms {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.limit {
            let oldest = window.front().copied().unwrap_or(now);
            let retry_ms = (oldest + self.window_ms - now).max(0);
            let retry_after = u64::try_from((retry_ms + 999) / 1000).unwrap_or(1);
            tracing::warn!(key = %key, retry_after = retry_after, "Booking rate limit exceeded");
            return Err(AppError::rate_limited(retry_after));
        }

        window.push_back(now);
        Ok(())
    }

    /// Drop expired hits and empty keys; returns the number of keys removed
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let mut hits = self.hits.lock();
        let before = hits.len();
        hits.retain(|_, window| {
            window.retain(|&t| now - t < self.window_ms);
            !window.is_empty()
        });
        before - hits.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.hits.lock().len()
    }

    /// Register the periodic sweeper
    pub fn spawn_sweeper(&self, tasks: &mut BackgroundTasks, interval: Duration) {
        let guard = self.clone();
        let token = tasks.shutdown_token();
        tasks.spawn("rate_guard_sweeper", TaskKind::Periodic, async move {
            guard.run_sweeper(interval, token).await;
        });
    }

    async fn run_sweeper(&self, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Rate guard sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = self.sweep();
                    if removed > 0 {
                        tracing::debug!(removed = removed, "Swept idle rate guard keys");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{ErrorCode, ManualClock};
    use chrono::{TimeZone, Utc};

    fn guard() -> (RateGuard, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 9, 10, 0, 0).unwrap(),
        ));
        (
            RateGuard::new(3, Duration::from_secs(60), clock.clone()),
            clock,
        )
    }

    #[test]
    fn test_fourth_call_in_window_rejected() {
        let (guard, clock) = guard();
        for _ in 0..3 {
            guard.check_and_record("student:7").unwrap();
            clock.advance(chrono::Duration::seconds(3));
        }
        let err = guard.check_and_record("student:7").unwrap_err();
        assert_eq!(err.code, ErrorCode::RateLimited);

        // Other keys are independent
        assert!(guard.check_and_record("student:8").is_ok());

        clock.advance(chrono::Duration::seconds(61));
        assert!(guard.check_and_record("student:7").is_ok());
    }

    #[test]
    fn test_sweep_removes_idle_keys() {
        let (guard, clock) = guard();
        guard.check_and_record("student:7").unwrap();
        clock.advance(chrono::Duration::seconds(30));
        guard.check_and_record("student:8").unwrap();

        clock.advance(chrono::Duration::seconds(31));
        assert_eq!(guard.sweep(), 1);
        assert_eq!(guard.tracked_keys(), 1);

        clock.advance(chrono::Duration::seconds(30));
        assert_eq!(guard.sweep(), 1);
        assert_eq!(guard.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let (guard, _clock) = guard();
        let mut tasks = BackgroundTasks::new();
        guard.spawn_sweeper(&mut tasks, Duration::from_millis(10));
        assert_eq!(tasks.len(), 1);
        tasks.shutdown().await;
    }
}
