//! 调用方身份
//!
//! The gateway has already authenticated the caller; this service only
//! parses the forwarded identity and enforces hostel scope.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::security_log;
use crate::utils::{AppError, AppResult, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Warden,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Warden => "warden",
            Role::Admin => "admin",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Warden | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "warden" => Ok(Role::Warden),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
    /// Assigned hostels (staff only)
    pub hostels: Vec<i64>,
}

impl Actor {
    pub fn student(id: i64) -> Self {
        Self {
            id,
            role: Role::Student,
            hostels: Vec::new(),
        }
    }

    pub fn warden(id: i64, hostels: impl Into<Vec<i64>>) -> Self {
        Self {
            id,
            role: Role::Warden,
            hostels: hostels.into(),
        }
    }

    pub fn admin(id: i64, hostels: impl Into<Vec<i64>>) -> Self {
        Self {
            id,
            role: Role::Admin,
            hostels: hostels.into(),
        }
    }

    /// Parse the forwarded identity headers
    pub fn from_headers(id: &str, role: &str, hostels: Option<&str>) -> AppResult<Self> {
        let malformed = |what: &str| {
            AppError::with_message(ErrorCode::InvalidIdentity, format!("Malformed {what}"))
        };

        let id: i64 = id.trim().parse().map_err(|_| malformed("actor id"))?;
        let role: Role = role.parse().map_err(|_| malformed("actor role"))?;
        let hostels = match hostels.map(str::trim).filter(|h| !h.is_empty()) {
            Some(list) => list
                .split(',')
                .map(|h| h.trim().parse::<i64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| malformed("actor hostels"))?,
            None => Vec::new(),
        };

        Ok(Self { id, role, hostels })
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Staff only, and only inside their assigned hostels
    pub fn require_staff_in(&self, hostel_id: i64) -> AppResult<()> {
        if !self.is_staff() {
            security_log!(
                "WARN",
                "staff_required",
                actor_id = self.id,
                role = self.role.as_str(),
                hostel_id = hostel_id
            );
            return Err(AppError::new(ErrorCode::StaffRequired));
        }
        self.require_hostel(hostel_id)
    }

    /// Target hostel must be in the staff member's assigned set
    pub fn require_hostel(&self, hostel_id: i64) -> AppResult<()> {
        if self.is_staff() && !self.hostels.contains(&hostel_id) {
            security_log!(
                "WARN",
                "hostel_scope_violation",
                actor_id = self.id,
                role = self.role.as_str(),
                hostel_id = hostel_id
            );
            return Err(AppError::with_message(
                ErrorCode::HostelScopeViolation,
                format!("Hostel {hostel_id} is outside the caller's assigned hostels"),
            ));
        }
        Ok(())
    }

    /// Resolve which student a request acts on
    ///
    /// Students always act on themselves; staff must name the student and
    /// hold the hostel in scope.
    pub fn resolve_student(&self, hostel_id: i64, requested: Option<i64>) -> AppResult<i64> {
        if self.is_staff() {
            self.require_hostel(hostel_id)?;
            return requested.ok_or_else(|| {
                AppError::with_message(ErrorCode::RequiredField, "student_id is required")
            });
        }
        match requested {
            Some(id) if id != self.id => {
                security_log!(
                    "WARN",
                    "foreign_student",
                    actor_id = self.id,
                    student_id = id,
                    hostel_id = hostel_id
                );
                Err(AppError::permission_denied(
                    "Students can only act on their own bookings",
                ))
            }
            _ => Ok(self.id),
        }
    }

    /// The caller may touch bookings of `student_id` in `hostel_id`
    pub fn require_owner_or_staff(&self, hostel_id: i64, student_id: i64) -> AppResult<()> {
        if self.is_staff() {
            return self.require_hostel(hostel_id);
        }
        if self.id != student_id {
            security_log!(
                "WARN",
                "foreign_booking",
                actor_id = self.id,
                student_id = student_id,
                hostel_id = hostel_id
            );
            return Err(AppError::permission_denied(
                "Students can only act on their own bookings",
            ));
        }
        Ok(())
    }
}
