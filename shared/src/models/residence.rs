//! Hostel directory models (宿舍/学生/外出单)
//!
//! Read-only for the booking service; rows are owned by the identity and
//! gatepass services.

use serde::{Deserialize, Serialize};

/// Hostel entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Hostel {
    pub id: i64,
    pub name: String,
}

/// Student entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Student {
    pub id: i64,
    pub hostel_id: i64,
    pub name: String,
    pub roll_no: String,
    pub floor: i32,
    pub room: String,
}

/// Gatepass status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum GatepassStatus {
    Pending,
    Approved,
    Rejected,
    Closed,
}

impl GatepassStatus {
    /// Whether the student actually left for the pass window
    pub fn is_absence(&self) -> bool {
        matches!(self, GatepassStatus::Approved | GatepassStatus::Closed)
    }
}

/// Gatepass entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Gatepass {
    pub id: i64,
    pub hostel_id: i64,
    pub student_id: i64,
    /// First day away (YYYY-MM-DD)
    pub out_date: String,
    /// Day of return (YYYY-MM-DD)
    pub in_date: String,
    pub status: GatepassStatus,
}
