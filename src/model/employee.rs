use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

pub const FIRST_EMPLOYEE_NUMBER: &str = "E1001";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 1,
        "tenantId": 1,
        "userId": 4,
        "employeeNumber": "E1001",
        "firstName": "John",
        "lastName": "Doe",
        "email": "john.doe@company.com",
        "phone": "0501234567",
        "department": "IT",
        "position": "Developer",
        "hireDate": "2024-01-01",
        "status": "ACTIVE"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    pub tenant_id: u64,

    #[schema(nullable = true)]
    pub user_id: Option<u64>,

    #[schema(example = "E1001")]
    pub employee_number: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "0501234567")]
    pub phone: String,

    #[schema(value_type = Option<String>, format = "date", nullable = true)]
    pub birth_date: Option<NaiveDate>,

    #[schema(example = "MALE", nullable = true)]
    pub gender: Option<String>,

    #[schema(example = "IT")]
    pub department: String,

    #[schema(example = "Developer")]
    pub position: String,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub hire_date: NaiveDate,

    #[schema(example = 8000.0, nullable = true)]
    pub salary: Option<f64>,

    #[schema(nullable = true)]
    pub avatar: Option<String>,

    #[schema(example = "ACTIVE")]
    pub status: String,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, EnumString, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Next number in the tenant's `E<n>` sequence.
///
/// No previous employee starts the sequence at `E1001`. A previous number
/// that is not `E<digits>` yields `None`, and the caller falls back to a
/// random number.
pub fn next_employee_number(last: Option<&str>) -> Option<String> {
    let Some(last) = last else {
        return Some(FIRST_EMPLOYEE_NUMBER.to_string());
    };

    let n: u64 = last.strip_prefix('E')?.parse().ok()?;
    Some(format!("E{}", n.checked_add(1)?))
}

/// Random `E` number with `digits` digits and no leading zero.
pub fn random_employee_number(digits: u32, rng_value: u64) -> String {
    let low = 10u64.pow(digits.saturating_sub(1));
    let span = 9 * low;
    format!("E{}", low + rng_value % span)
}
