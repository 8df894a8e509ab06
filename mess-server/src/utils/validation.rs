//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! SQLite TEXT has no built-in length enforcement.

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Cancellation reasons
pub const MAX_NOTE_LEN: usize = 500;

/// Menu text of one slot
pub const MAX_MENU_ITEM_LEN: usize = 1000;

/// Free-text search (student name / roll number)
pub const MAX_SEARCH_LEN: usize = 100;

// ── Pagination ──────────────────────────────────────────────────────

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Menu listing window
pub const MAX_MENU_RANGE_DAYS: i64 = 62;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Resolve `(page, limit)` to `(limit, offset)`.
///
/// `page` starts at 1; `limit` defaults to 20 and must be 1..=100.
pub fn page_window(page: Option<u32>, limit: Option<u32>) -> Result<(i64, i64), AppError> {
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if page == 0 {
        return Err(AppError::with_message(
            crate::utils::ErrorCode::ValueOutOfRange,
            "page must be at least 1",
        ));
    }
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(AppError::with_message(
            crate::utils::ErrorCode::ValueOutOfRange,
            format!("limit must be between 1 and {MAX_PAGE_LIMIT}"),
        ));
    }
    let limit = i64::from(limit);
    Ok((limit, (i64::from(page) - 1) * limit))
}
