//! 报表与视图
//!
//! - [`ReportService`] - calendar, warden dashboards, booking records, gatepass correlation
//! - [`view`] - pure row → view builders

pub mod service;
pub mod view;

pub use service::{CalendarQuery, RecordQuery, ReportService, StudentQuery};
