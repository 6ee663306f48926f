use serde::{Serialize, Serializer, ser::SerializeStruct};
use utoipa::ToSchema;

use crate::model::leave_request::LeaveType;

/// Per-employee allowance for the year. Remaining days are derived, never stored.
#[derive(Debug, Clone, sqlx::FromRow, ToSchema)]
pub struct LeaveBalance {
    pub id: u64,
    pub tenant_id: u64,
    pub employee_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 21)]
    pub annual_total: i32,
    #[schema(example = 3)]
    pub annual_used: i32,
    #[schema(example = 10)]
    pub sick_total: i32,
    #[schema(example = 0)]
    pub sick_used: i32,
}

impl LeaveBalance {
    pub fn annual_remaining(&self) -> i32 {
        self.annual_total - self.annual_used
    }

    pub fn sick_remaining(&self) -> i32 {
        self.sick_total - self.sick_used
    }

    /// Remaining days for a type that draws from the balance.
    /// Emergency leave is not counted against it.
    pub fn remaining_for(&self, leave_type: LeaveType) -> Option<i32> {
        match leave_type {
            LeaveType::Annual => Some(self.annual_remaining()),
            LeaveType::Sick => Some(self.sick_remaining()),
            LeaveType::Emergency => None,
        }
    }

    pub fn covers(&self, leave_type: LeaveType, days: i32) -> bool {
        self.remaining_for(leave_type).is_none_or(|left| left >= days)
    }
}

// Serialized with the derived remaining values alongside the counters.
impl Serialize for LeaveBalance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("LeaveBalance", 9)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("employeeId", &self.employee_id)?;
        s.serialize_field("year", &self.year)?;
        s.serialize_field("annualTotal", &self.annual_total)?;
        s.serialize_field("annualUsed", &self.annual_used)?;
        s.serialize_field("annualRemaining", &self.annual_remaining())?;
        s.serialize_field("sickTotal", &self.sick_total)?;
        s.serialize_field("sickUsed", &self.sick_used)?;
        s.serialize_field("sickRemaining", &self.sick_remaining())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(annual_used: i32, sick_used: i32) -> LeaveBalance {
        LeaveBalance {
            id: 1,
            tenant_id: 1,
            employee_id: 9,
            year: 2026,
            annual_total: 21,
            annual_used,
            sick_total: 10,
            sick_used,
        }
    }

    #[test]
    fn remaining_is_total_minus_used() {
        let b = balance(5, 2);
        assert_eq!(b.annual_remaining(), 16);
        assert_eq!(b.sick_remaining(), 8);
    }

    #[test]
    fn covers_checks_the_matching_counter() {
        let b = balance(20, 10);
        assert!(b.covers(LeaveType::Annual, 1));
        assert!(!b.covers(LeaveType::Annual, 2));
        assert!(!b.covers(LeaveType::Sick, 1));
        assert!(b.covers(LeaveType::Emergency, 30));
    }

    #[test]
    fn serializes_remaining_fields() {
        let v = serde_json::to_value(balance(3, 1)).unwrap();
        assert_eq!(v["annualRemaining"], 18);
        assert_eq!(v["sickRemaining"], 9);
        assert_eq!(v["employeeId"], 9);
    }
}
