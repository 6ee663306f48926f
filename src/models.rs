use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTenantReq {
    #[schema(example = "Acme Corp")]
    pub company_name: Option<String>,
    #[schema(example = "acme")]
    pub subdomain: Option<String>,
    #[schema(example = "Sara Khalid")]
    pub admin_name: Option<String>,
    #[schema(example = "sara@acme.com")]
    pub admin_email: Option<String>,
    #[schema(example = "changeme123")]
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "sara@acme.com")]
    pub email: Option<String>,
    #[schema(example = "changeme123")]
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordReq {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Session token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub tenant_id: u64,
    /// login email
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,
}
