use crate::{
    auth::{
        auth::{AuthUser, removal_cookie, session_cookie},
        jwt::generate_session_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{ApiError, conflict_or_internal},
    model::{
        role::Role,
        settings::{DEFAULT_ANNUAL_LEAVE_DAYS, DEFAULT_SICK_LEAVE_DAYS, Settings},
        tenant::Tenant,
        user::{AccountStatus, User},
    },
    models::{ChangePasswordReq, LoginReqDto, RegisterTenantReq},
    utils::{
        email_registry::EMAILS,
        tenant_host::tenant_from_host,
        validation::{clean_subdomain, is_strong_enough, is_valid_email, non_blank, split_full_name},
    },
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, error, info, instrument};

pub(crate) fn hash_or_internal(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::Internal
    })
}

fn issue_session(
    user_id: u64,
    tenant_id: u64,
    email: &str,
    role: Role,
    config: &Config,
) -> Result<actix_web::cookie::Cookie<'static>, ApiError> {
    let (token, _) = generate_session_token(
        user_id,
        tenant_id,
        email.to_string(),
        role,
        &config.jwt_secret,
        config.session_ttl,
    )
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to sign session token");
        ApiError::Internal
    })?;

    Ok(session_cookie(token, config))
}

/// Register a company
///
/// Creates the tenant, its admin user and default settings in one
/// transaction and signs the admin in.
#[utoipa::path(
    post,
    path = "/api/auth/register-tenant",
    request_body = RegisterTenantReq,
    responses(
        (status = 201, description = "Tenant registered", body = Object, example = json!({
            "success": true,
            "message": "Company registered successfully",
            "data": {
                "tenant": { "id": 1, "name": "Acme Corp", "domain": "acme" },
                "user": { "id": 1, "email": "sara@acme.com", "role": "ADMIN" }
            }
        })),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Subdomain or email already in use")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register_tenant", skip(body, pool, config))]
pub async fn register_tenant(
    body: web::Json<RegisterTenantReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    // 1️⃣ presence
    let (Some(company_name), Some(subdomain), Some(admin_name), Some(admin_email), Some(password)) = (
        non_blank(&body.company_name),
        non_blank(&body.subdomain),
        non_blank(&body.admin_name),
        non_blank(&body.admin_email),
        body.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    // 2️⃣ shape
    if !is_strong_enough(password) {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }
    if !is_valid_email(admin_email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }

    // 3️⃣ uniqueness
    let domain = clean_subdomain(subdomain);
    if domain.is_empty() {
        return Err(ApiError::bad_request("Subdomain must contain letters or digits"));
    }

    let domain_taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tenants WHERE domain = ?")
        .bind(&domain)
        .fetch_one(pool.get_ref())
        .await?;
    if domain_taken > 0 {
        return Err(ApiError::conflict("This subdomain is already in use"));
    }

    if !EMAILS.is_available(admin_email, pool.get_ref()).await? {
        return Err(ApiError::conflict("This email is already in use"));
    }

    let (first_name, _) = split_full_name(admin_name);
    debug!(domain = %domain, admin = %first_name, "Registering tenant");

    let hashed = hash_or_internal(password)?;
    let defaults = Settings::defaults(0);

    // 4️⃣ tenant + admin + settings
    let mut tx = pool.begin().await?;

    let tenant_id = sqlx::query("INSERT INTO tenants (name, domain, status) VALUES (?, ?, 'ACTIVE')")
        .bind(company_name)
        .bind(&domain)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_or_internal(e, "This subdomain is already in use"))?
        .last_insert_id();

    let user_id = sqlx::query(
        r#"
        INSERT INTO users (tenant_id, email, password, role, status, email_verified, must_change_password)
        VALUES (?, ?, ?, ?, ?, TRUE, FALSE)
        "#,
    )
    .bind(tenant_id)
    .bind(admin_email)
    .bind(&hashed)
    .bind(Role::Admin.as_ref())
    .bind(AccountStatus::Active.as_ref())
    .execute(&mut *tx)
    .await
    .map_err(|e| conflict_or_internal(e, "This email is already in use"))?
    .last_insert_id();

    sqlx::query(
        r#"
        INSERT INTO settings
            (tenant_id, work_start_time, work_end_time, late_tolerance_minutes, annual_leave_days, sick_leave_days)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(tenant_id)
    .bind(defaults.work_start_time)
    .bind(defaults.work_end_time)
    .bind(defaults.late_tolerance_minutes)
    .bind(DEFAULT_ANNUAL_LEAVE_DAYS)
    .bind(DEFAULT_SICK_LEAVE_DAYS)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    EMAILS.remember(admin_email).await;
    info!(tenant_id, user_id, domain = %domain, "Tenant registered");

    let cookie = issue_session(user_id, tenant_id, admin_email, Role::Admin, &config)?;

    Ok(HttpResponse::Created().cookie(cookie).json(json!({
        "success": true,
        "message": "Company registered successfully",
        "data": {
            "tenant": { "id": tenant_id, "name": company_name, "domain": domain },
            "user": { "id": user_id, "email": admin_email, "role": Role::Admin }
        }
    })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginUser<'a> {
    id: u64,
    email: &'a str,
    role: Role,
    tenant_id: u64,
    tenant_name: &'a str,
    must_change_password: bool,
}

/// Log in
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = Object, example = json!({
            "success": true,
            "message": "Logged in successfully",
            "data": { "user": {
                "id": 1, "email": "sara@acme.com", "role": "ADMIN",
                "tenantId": 1, "tenantName": "Acme Corp", "mustChangePassword": false
            }}
        })),
        (status = 400, description = "Email and password are required"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account or company disabled")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(req, body, pool, config))]
pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    // 1️⃣ Basic validation
    let (Some(email), Some(password)) = (
        non_blank(&body.email),
        body.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    // 2️⃣ Fetch user
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, tenant_id, email, password, role, status, email_verified,
               must_change_password, last_login_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| {
        info!("Invalid credentials: user not found");
        ApiError::unauthorized("Invalid email or password")
    })?;

    // 3️⃣ Verify password
    if let Err(e) = verify_password(password, &user.password) {
        info!(error = %e, user_id = user.id, "Invalid credentials: password mismatch");
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    if user.status != AccountStatus::Active.as_ref() {
        return Err(ApiError::forbidden("Account is disabled. Contact your administrator"));
    }

    // 4️⃣ Tenant checks
    let tenant = sqlx::query_as::<_, Tenant>(
        "SELECT id, name, domain, size, industry, status, created_at FROM tenants WHERE id = ?",
    )
    .bind(user.tenant_id)
    .fetch_one(pool.get_ref())
    .await?;

    if !tenant.allows_login() {
        return Err(ApiError::forbidden("Company account is suspended"));
    }

    let host_tenant = tenant_from_host(req.connection_info().host());
    if let Some(sub) = host_tenant {
        if sub != tenant.domain {
            info!(host_tenant = %sub, user_tenant = %tenant.domain, "Login against foreign subdomain");
            return Err(ApiError::unauthorized("Invalid email or password"));
        }
    }

    let role: Role = user.role.parse().map_err(|_| {
        error!(user_id = user.id, role = %user.role, "Unknown role stored for user");
        ApiError::Internal
    })?;

    // 5️⃣ Update last_login_at (non-fatal)
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }
    EMAILS.touch(&user.email).await;

    let cookie = issue_session(user.id, user.tenant_id, &user.email, role, &config)?;

    info!(user_id = user.id, tenant_id = user.tenant_id, "Login successful");

    Ok(HttpResponse::Ok().cookie(cookie).json(json!({
        "success": true,
        "message": "Logged in successfully",
        "data": {
            "user": LoginUser {
                id: user.id,
                email: &user.email,
                role,
                tenant_id: user.tenant_id,
                tenant_name: &tenant.name,
                must_change_password: user.must_change_password,
            }
        }
    })))
}

/// Log out
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = Object, example = json!({
            "success": true,
            "message": "Logged out successfully"
        }))
    ),
    tag = "Auth"
)]
pub async fn logout() -> HttpResponse {
    HttpResponse::Ok().cookie(removal_cookie()).json(json!({
        "success": true,
        "message": "Logged out successfully"
    }))
}

#[derive(FromRow)]
struct MeRow {
    id: u64,
    email: String,
    role: String,
    tenant_id: u64,
    must_change_password: bool,
    employee_id: Option<u64>,
    first_name: Option<String>,
    last_name: Option<String>,
}

/// Current user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Signed-in user", body = Object, example = json!({
            "success": true,
            "data": {
                "id": 4, "email": "john@acme.com", "role": "EMPLOYEE", "tenantId": 1,
                "employeeId": 2, "firstName": "John", "lastName": "Doe", "mustChangePassword": true
            }
        })),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    let row = sqlx::query_as::<_, MeRow>(
        r#"
        SELECT u.id, u.email, u.role, u.tenant_id, u.must_change_password,
               e.id AS employee_id, e.first_name, e.last_name
        FROM users u
        LEFT JOIN employees e ON e.user_id = u.id
        WHERE u.id = ? AND u.tenant_id = ?
        "#,
    )
    .bind(auth.user_id)
    .bind(auth.tenant_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::unauthorized("Session user no longer exists"))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "id": row.id,
            "email": row.email,
            "role": row.role,
            "tenantId": row.tenant_id,
            "employeeId": row.employee_id,
            "firstName": row.first_name.unwrap_or_else(|| "User".to_string()),
            "lastName": row.last_name.unwrap_or_default(),
            "mustChangePassword": row.must_change_password,
        }
    })))
}

/// Change own password
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordReq,
    responses(
        (status = 200, description = "Password changed", body = Object, example = json!({
            "success": true,
            "message": "Password changed successfully"
        })),
        (status = 400, description = "Invalid new password"),
        (status = 401, description = "Current password is wrong")
    ),
    tag = "Auth"
)]
pub async fn change_password(
    auth: AuthUser,
    body: web::Json<ChangePasswordReq>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let (Some(current), Some(new), Some(confirm)) = (
        body.current_password.as_deref().filter(|p| !p.is_empty()),
        body.new_password.as_deref().filter(|p| !p.is_empty()),
        body.confirm_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    if new != confirm {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    if !is_strong_enough(new) {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }
    if new == current {
        return Err(ApiError::bad_request("New password must differ from the current one"));
    }

    let stored = sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE id = ? AND tenant_id = ?")
        .bind(auth.user_id)
        .bind(auth.tenant_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session user no longer exists"))?;

    if verify_password(current, &stored).is_err() {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let hashed = hash_or_internal(new)?;

    sqlx::query(
        "UPDATE users SET password = ?, must_change_password = FALSE, updated_at = NOW() WHERE id = ?",
    )
    .bind(&hashed)
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await?;

    info!(user_id = auth.user_id, "Password changed");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password changed successfully"
    })))
}
