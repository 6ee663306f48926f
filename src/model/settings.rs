use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_WORK_START: (u32, u32) = (8, 0);
pub const DEFAULT_WORK_END: (u32, u32) = (17, 0);
pub const DEFAULT_ANNUAL_LEAVE_DAYS: i32 = 21;
pub const DEFAULT_SICK_LEAVE_DAYS: i32 = 10;

/// Per-tenant working hours and leave allowances.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: u64,
    pub tenant_id: u64,
    #[schema(example = "08:00:00", value_type = String)]
    pub work_start_time: NaiveTime,
    #[schema(example = "17:00:00", value_type = String)]
    pub work_end_time: NaiveTime,
    #[schema(example = 15)]
    pub late_tolerance_minutes: i32,
    #[schema(example = 21)]
    pub annual_leave_days: i32,
    #[schema(example = 10)]
    pub sick_leave_days: i32,
    pub updated_at: NaiveDateTime,
}

impl Settings {
    /// Defaults for a tenant that has no settings row yet.
    pub fn defaults(tenant_id: u64) -> Self {
        Self {
            id: 0,
            tenant_id,
            work_start_time: NaiveTime::from_hms_opt(DEFAULT_WORK_START.0, DEFAULT_WORK_START.1, 0)
                .unwrap_or(NaiveTime::MIN),
            work_end_time: NaiveTime::from_hms_opt(DEFAULT_WORK_END.0, DEFAULT_WORK_END.1, 0)
                .unwrap_or(NaiveTime::MIN),
            late_tolerance_minutes: 0,
            annual_leave_days: DEFAULT_ANNUAL_LEAVE_DAYS,
            sick_leave_days: DEFAULT_SICK_LEAVE_DAYS,
            updated_at: NaiveDateTime::default(),
        }
    }

    /// Latest check-in time that still counts as on time.
    pub fn late_after(&self) -> NaiveTime {
        let grace = Duration::minutes(self.late_tolerance_minutes.max(0) as i64);
        let (t, wrapped) = self.work_start_time.overflowing_add_signed(grace);
        if wrapped != 0 {
            NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(self.work_start_time)
        } else {
            t
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_new_tenant_settings() {
        let s = Settings::defaults(7);
        assert_eq!(s.tenant_id, 7);
        assert_eq!(s.work_start_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(s.work_end_time, NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        assert_eq!(s.annual_leave_days, 21);
        assert_eq!(s.sick_leave_days, 10);
    }

    #[test]
    fn tolerance_extends_start_time() {
        let mut s = Settings::defaults(1);
        s.late_tolerance_minutes = 15;
        assert_eq!(s.late_after(), NaiveTime::from_hms_opt(8, 15, 0).unwrap());
    }

    #[test]
    fn tolerance_never_wraps_past_midnight() {
        let mut s = Settings::defaults(1);
        s.work_start_time = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        s.late_tolerance_minutes = 120;
        assert_eq!(s.late_after(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }
}
