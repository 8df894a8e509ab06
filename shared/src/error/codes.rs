//! Unified error codes for the mess booking service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Residence errors (hostel, student, gatepass)
//! - 4xxx: Booking errors
//! - 5xxx: Meal configuration errors (timing, cutoff, menu)
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format (dates, times)
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Too many requests in the current window
    RateLimited = 9,

    // ==================== 1xxx: Auth ====================
    /// Caller identity missing
    NotAuthenticated = 1001,
    /// Caller identity present but malformed
    InvalidIdentity = 1002,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Staff role required
    StaffRequired = 2002,
    /// Admin role required
    AdminRequired = 2003,
    /// Target hostel is outside the caller's assigned hostels
    HostelScopeViolation = 2004,

    // ==================== 3xxx: Residence ====================
    /// Hostel not found
    HostelNotFound = 3001,
    /// Student not found
    StudentNotFound = 3002,
    /// Gatepass not found
    GatepassNotFound = 3003,

    // ==================== 4xxx: Booking ====================
    /// Booking not found
    BookingNotFound = 4001,
    /// Cutoff for the meal has passed
    CutoffPassed = 4002,
    /// No menu published for the meal on that date
    MealNotApplicable = 4003,
    /// Concurrent modification of the same booking slot
    BookingConflict = 4004,
    /// Requested state change is not allowed from the current state
    InvalidTransition = 4005,
    /// Meal has already been consumed
    AlreadyConsumed = 4006,
    /// Slot is not reversible
    NotReversible = 4007,
    /// Too many day entries in a single request
    BulkLimitExceeded = 4008,
    /// The same date appears more than once in a request
    DuplicateDate = 4009,

    // ==================== 5xxx: Meal configuration ====================
    /// Meal timing is invalid
    MealTimingInvalid = 5001,
    /// Meal cutoff is invalid
    MealCutoffInvalid = 5002,
    /// Meal configuration not found
    MealConfigNotFound = 5003,
    /// Menu not found
    MenuNotFound = 5004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// System busy (IO error, retry later)
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::RateLimited => "Too many requests, please slow down",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidIdentity => "Caller identity is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::StaffRequired => "Staff role is required",
            ErrorCode::AdminRequired => "Administrator role is required",
            ErrorCode::HostelScopeViolation => "Hostel is not assigned to the caller",

            // Residence
            ErrorCode::HostelNotFound => "Hostel not found",
            ErrorCode::StudentNotFound => "Student not found",
            ErrorCode::GatepassNotFound => "Gatepass not found",

            // Booking
            ErrorCode::BookingNotFound => "Booking not found",
            ErrorCode::CutoffPassed => "Booking cutoff has passed",
            ErrorCode::MealNotApplicable => "Meal is not served on that date",
            ErrorCode::BookingConflict => "Booking was modified concurrently",
            ErrorCode::InvalidTransition => "Booking state change is not allowed",
            ErrorCode::AlreadyConsumed => "Meal has already been consumed",
            ErrorCode::NotReversible => "Booking slot is not reversible",
            ErrorCode::BulkLimitExceeded => "Too many days in a single request",
            ErrorCode::DuplicateDate => "Date appears more than once",

            // Meal configuration
            ErrorCode::MealTimingInvalid => "Meal timing is invalid",
            ErrorCode::MealCutoffInvalid => "Meal cutoff is invalid",
            ErrorCode::MealConfigNotFound => "Meal configuration not found",
            ErrorCode::MenuNotFound => "Menu not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::SystemBusy => "System busy, please retry",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::RateLimited),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidIdentity),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::StaffRequired),
            2003 => Ok(ErrorCode::AdminRequired),
            2004 => Ok(ErrorCode::HostelScopeViolation),

            // Residence
            3001 => Ok(ErrorCode::HostelNotFound),
            3002 => Ok(ErrorCode::StudentNotFound),
            3003 => Ok(ErrorCode::GatepassNotFound),

            // Booking
            4001 => Ok(ErrorCode::BookingNotFound),
            4002 => Ok(ErrorCode::CutoffPassed),
            4003 => Ok(ErrorCode::MealNotApplicable),
            4004 => Ok(ErrorCode::BookingConflict),
            4005 => Ok(ErrorCode::InvalidTransition),
            4006 => Ok(ErrorCode::AlreadyConsumed),
            4007 => Ok(ErrorCode::NotReversible),
            4008 => Ok(ErrorCode::BulkLimitExceeded),
            4009 => Ok(ErrorCode::DuplicateDate),

            // Meal configuration
            5001 => Ok(ErrorCode::MealTimingInvalid),
            5002 => Ok(ErrorCode::MealCutoffInvalid),
            5003 => Ok(ErrorCode::MealConfigNotFound),
            5004 => Ok(ErrorCode::MenuNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
