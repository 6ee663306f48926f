use crate::api::attendance::{AttendanceActionReq, AttendanceSummary};
use crate::api::employee::{CreateEmployee, EmployeeListResponse};
use crate::api::leave_request::{CreateLeaveFor, LeaveForm, ReviewLeave};
use crate::api::settings::UpdateSettings;
use crate::auth::auth::SESSION_COOKIE;
use crate::model::{
    attendance::Attendance,
    employee::Employee,
    leave_balance::LeaveBalance,
    leave_request::{LeaveRequest, LeaveStatus, LeaveType},
    role::Role,
    settings::Settings,
    tenant::Tenant,
};
use crate::models::{ChangePasswordReq, LoginReqDto, RegisterTenantReq};
use utoipa::Modify;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Cloud API",
        version = "1.0.0",
        description = r#"
## Multi-tenant HR service

Each company registers as a tenant and manages its own employees.

### 🔹 Key Features
- **Tenants**
  - Company registration with an admin account, subdomain-aware login
- **Employee Management**
  - Create, update, list and view employee profiles; self-service profile
- **Attendance**
  - Daily check-in / check-out with late detection and worked hours
- **Leave Management**
  - Submit, approve and reject requests against yearly balances
- **Settings & Dashboard**
  - Working hours, late tolerance, leave allowances and HR counters

### 🔐 Security
Sessions are carried in the HttpOnly `auth-token` cookie (a Bearer header is accepted too).
Roles: **ADMIN**, **HR**, **EMPLOYEE**.

### 📦 Response Format
`{"success": true, "data": ...}` or `{"success": false, "error": "..."}`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::register_tenant,
        crate::auth::handlers::login,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,
        crate::auth::handlers::change_password,

        crate::api::employee::list_employees,
        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::get_my_profile,
        crate::api::employee::update_my_profile,

        crate::api::attendance::my_attendance,
        crate::api::attendance::record_attendance,
        crate::api::attendance::list_attendance,

        crate::api::leave_request::list_leaves,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::review_leave,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::submit_my_leave,

        crate::api::settings::get_settings,
        crate::api::settings::update_settings,

        crate::api::dashboard::dashboard
    ),
    components(
        schemas(
            RegisterTenantReq,
            LoginReqDto,
            ChangePasswordReq,
            Role,
            Tenant,
            Employee,
            CreateEmployee,
            EmployeeListResponse,
            Attendance,
            AttendanceActionReq,
            AttendanceSummary,
            LeaveType,
            LeaveStatus,
            LeaveRequest,
            LeaveBalance,
            LeaveForm,
            CreateLeaveFor,
            ReviewLeave,
            Settings,
            UpdateSettings
        )
    ),
    modifiers(&SessionCookie),
    tags(
        (name = "Auth", description = "Company registration and sessions"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Settings", description = "Company settings"),
        (name = "Dashboard", description = "HR overview"),
    )
)]
pub struct ApiDoc;

struct SessionCookie;

impl Modify for SessionCookie {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
        }
    }
}
