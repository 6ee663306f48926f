use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LeaveType {
    Annual,
    Sick,
    Emergency,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, IntoStaticStr, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    pub tenant_id: u64,
    #[schema(example = 12)]
    pub employee_id: u64,
    #[schema(example = "ANNUAL")]
    pub leave_type: String,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub days: i32,
    #[schema(nullable = true)]
    pub reason: Option<String>,
    #[schema(example = "PENDING")]
    pub status: String,
    #[schema(nullable = true)]
    pub reviewed_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub reviewed_at: Option<NaiveDateTime>,
    #[schema(nullable = true)]
    pub rejection_reason: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

impl LeaveRequest {
    pub fn is_pending(&self) -> bool {
        self.status == LeaveStatus::Pending.as_ref()
    }
}

/// Number of calendar days covered by a request, both ends inclusive.
/// `None` when the range is reversed.
pub fn leave_days(start: NaiveDate, end: NaiveDate) -> Option<i32> {
    if start > end {
        return None;
    }
    i32::try_from((end - start).num_days() + 1).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn single_day_counts_as_one() {
        assert_eq!(leave_days(d(2026, 1, 5), d(2026, 1, 5)), Some(1));
    }

    #[test]
    fn range_is_inclusive_across_months() {
        assert_eq!(leave_days(d(2026, 1, 30), d(2026, 2, 2)), Some(4));
        assert_eq!(leave_days(d(2024, 2, 28), d(2024, 3, 1)), Some(3));
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert_eq!(leave_days(d(2026, 1, 6), d(2026, 1, 5)), None);
    }

    #[test]
    fn type_names_match_storage() {
        assert_eq!("SICK".parse::<LeaveType>().unwrap(), LeaveType::Sick);
        assert!("sick".parse::<LeaveType>().is_err());
        let parsed: LeaveType = serde_json::from_str("\"EMERGENCY\"").unwrap();
        assert_eq!(parsed, LeaveType::Emergency);
        assert_eq!(LeaveStatus::Approved.as_ref(), "APPROVED");
    }
}
