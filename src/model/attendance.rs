use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    #[schema(example = 1)]
    pub id: u64,
    pub tenant_id: u64,
    pub employee_id: u64,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "2026-01-01T08:02:11", value_type = String, format = "date-time")]
    pub check_in: NaiveDateTime,
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub check_out: Option<NaiveDateTime>,
    #[schema(example = 8.25, nullable = true)]
    pub total_hours: Option<f64>,
    #[schema(example = "PRESENT")]
    pub status: String,
    #[schema(nullable = true)]
    pub notes: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Late,
    HalfDay,
    Absent,
}

impl AttendanceStatus {
    /// Status for a check-in at `at`, given the latest on-time moment of the day.
    pub fn for_check_in(at: NaiveTime, late_after: NaiveTime) -> Self {
        if at > late_after {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        }
    }
}

/// Elapsed hours between check-in and check-out, rounded to two decimals.
pub fn worked_hours(check_in: NaiveDateTime, check_out: NaiveDateTime) -> f64 {
    let secs = (check_out - check_in).num_seconds().max(0) as f64;
    (secs / 3600.0 * 100.0).round() / 100.0
}

impl Attendance {
    pub fn is_checked_out(&self) -> bool {
        self.check_out.is_some()
    }
}
