use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Acme Corp")]
    pub name: String,
    #[schema(example = "acme")]
    pub domain: String,
    #[schema(example = "MEDIUM", nullable = true)]
    pub size: Option<String>,
    #[schema(example = "Software", nullable = true)]
    pub industry: Option<String>,
    #[schema(example = "ACTIVE")]
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, EnumString, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TenantStatus {
    Active,
    Trial,
    Suspended,
}

impl Tenant {
    /// Suspended tenants (and unknown statuses) cannot sign in.
    pub fn allows_login(&self) -> bool {
        matches!(
            self.status.parse::<TenantStatus>(),
            Ok(TenantStatus::Active | TenantStatus::Trial)
        )
    }
}
