use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub tenant_id: u64,
    pub email: String,
    pub password: String,
    pub role: String,
    pub status: String,
    pub email_verified: bool,
    pub must_change_password: bool,
    pub last_login_at: Option<NaiveDateTime>,
}

/// Account status shared by `users.status` and `employees.status`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, EnumString, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum AccountStatus {
    Active,
    Inactive,
}
