//! 时间工具函数 - 宿舍时区转换
//!
//! 日期统一使用 `YYYY-MM-DD` 字符串存储，时刻使用 `HH:MM`。
//! 截止时间等瞬时值在业务时区内计算后转为 UTC。

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Offset, Utc};
use chrono_tz::Tz;

use super::{AppError, AppResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| AppError::invalid_format(format!("Invalid date format: {}", date)))
}

/// 格式化日期为 YYYY-MM-DD
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 解析时刻字符串 (HH:MM, 24h)
///
/// Only the zero-padded two-digit form is accepted.
pub fn parse_time_of_day(value: &str) -> AppResult<NaiveTime> {
    let bytes = value.as_bytes();
    let shape_ok = bytes.len() == 5
        && bytes[2] == b':'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || b.is_ascii_digit());
    if !shape_ok {
        return Err(AppError::invalid_format(format!(
            "Invalid time format (expected HH:MM): {}",
            value
        )));
    }
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| {
        AppError::invalid_format(format!("Invalid time format (expected HH:MM): {}", value))
    })
}

/// 日期 + 本地时刻 → UTC 瞬时 (业务时区)
///
/// 重复的本地时间 (DST 回拨) 取较晚的映射。
/// 不存在的本地时间 (DST 跳变) 按跳变前的偏移解释，即向后顺延；仍失败则按 UTC 解释。
pub fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(time);
    if let Some(dt) = naive.and_local_timezone(tz).latest() {
        return dt.with_timezone(&Utc);
    }
    (naive - Duration::hours(3))
        .and_local_timezone(tz)
        .earliest()
        .map(|before| {
            let offset = before.offset().fix().local_minus_utc();
            (naive - Duration::seconds(i64::from(offset))).and_utc()
        })
        .unwrap_or_else(|| naive.and_utc())
}

/// 业务时区的 "今天"
pub fn local_today(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// 月份首尾日期
pub fn month_bounds(year: i32, month: u32) -> AppResult<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::validation(format!("Invalid month: {year}-{month}")))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::validation(format!("Invalid month: {year}-{month}")))?;
    Ok((first, next_first - Duration::days(1)))
}

/// 闭区间内的每一天
pub fn days_between(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days().take_while(|d| *d <= to).collect()
}

/// 闭区间天数 (from > to 时为 0)
pub fn span_days(from: NaiveDate, to: NaiveDate) -> i64 {
    if from > to {
        0
    } else {
        (to - from).num_days() + 1
    }
}

/// Parse a `YYYY-MM` month parameter
pub fn parse_month(value: &str) -> AppResult<(i32, u32)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", value.trim()), DATE_FORMAT)
        .map_err(|_| AppError::invalid_format(format!("Invalid month format: {}", value)))?;
    Ok((first.year(), first.month()))
}
