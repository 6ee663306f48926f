use crate::{
    api::{
        leave_request::load_balance,
        local_today, paginate,
        settings::load_settings,
    },
    auth::{
        auth::AuthUser,
        handlers::hash_or_internal,
        password::{generate_temporary_password, random_u64},
    },
    error::{ApiError, conflict_or_internal, is_unique_violation},
    model::{
        attendance::Attendance,
        employee::{Employee, Gender, next_employee_number, random_employee_number},
        leave_request::LeaveRequest,
        role::Role,
        user::AccountStatus,
    },
    utils::{
        db_utils::{ColumnKind, FieldMap, SqlValue, build_update_sql, execute_update},
        email_registry::EMAILS,
        validation::{is_strong_enough, is_valid_email, non_blank},
    },
};
use actix_web::{HttpResponse, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::{FromRow, MySqlPool, mysql::MySqlExecutor};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

const TEMP_PASSWORD_LEN: usize = 12;
const NUMBER_RETRIES: u32 = 3;

/// Columns HR/Admin may change through `PUT /employees/{id}`.
const EMPLOYEE_FIELDS: &FieldMap = &[
    ("firstName", "first_name", ColumnKind::Text),
    ("lastName", "last_name", ColumnKind::Text),
    ("email", "email", ColumnKind::Text),
    ("phone", "phone", ColumnKind::Text),
    ("department", "department", ColumnKind::Text),
    ("position", "position", ColumnKind::Text),
    ("salary", "salary", ColumnKind::NullableNumber),
    ("status", "status", ColumnKind::Text),
    ("hireDate", "hire_date", ColumnKind::Date),
];

/// Columns an employee may change on their own profile.
const SELF_FIELDS: &FieldMap = &[
    ("phone", "phone", ColumnKind::Text),
    ("birthDate", "birth_date", ColumnKind::NullableDate),
    ("gender", "gender", ColumnKind::NullableText),
];

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployee {
    #[schema(example = "John")]
    pub first_name: Option<String>,
    #[schema(example = "Doe")]
    pub last_name: Option<String>,
    #[schema(example = "john.doe@acme.com", format = "email")]
    pub email: Option<String>,
    #[schema(example = "0501234567")]
    pub phone: Option<String>,
    #[schema(example = "IT")]
    pub department: Option<String>,
    #[schema(example = "Developer")]
    pub position: Option<String>,
    #[schema(example = "2026-01-01", value_type = Option<String>, format = "date")]
    pub hire_date: Option<NaiveDate>,
    #[schema(example = 8000.0)]
    pub salary: Option<f64>,
    #[schema(example = "MALE")]
    pub gender: Option<String>,
    #[schema(example = "1995-04-12", value_type = Option<String>, format = "date")]
    pub birth_date: Option<NaiveDate>,
    #[schema(example = "E1001")]
    pub employee_number: Option<String>,
    /// Generated when omitted.
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeListResponse {
    pub success: bool,
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Employee record linked to the signed-in user.
pub async fn find_own_employee<'e, E: MySqlExecutor<'e>>(
    exec: E,
    auth: &AuthUser,
) -> Result<Employee, ApiError> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE user_id = ? AND tenant_id = ?")
        .bind(auth.user_id)
        .bind(auth.tenant_id)
        .fetch_optional(exec)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee profile not found"))
}

async fn find_employee<'e, E: MySqlExecutor<'e>>(
    exec: E,
    id: u64,
    tenant_id: u64,
) -> Result<Employee, ApiError> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ? AND tenant_id = ?")
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(exec)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))
}

fn parse_gender(raw: &str) -> Result<Gender, ApiError> {
    raw.trim()
        .to_uppercase()
        .parse::<Gender>()
        .map_err(|_| ApiError::bad_request("gender must be MALE, FEMALE or OTHER"))
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(
        ("page", Query, description = "Page number"),
        ("perPage", Query, description = "Items per page (max 100)"),
        ("department", Query, description = "Filter by department"),
        ("status", Query, description = "Filter by status"),
        ("search", Query, description = "Search by name, email or employee number")
    ),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("session_cookie" = [])),
    tag = "Employee"
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let (page, per_page, offset) = paginate(query.page, query.per_page);

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = vec!["tenant_id = ?"];
    let mut bindings: Vec<String> = Vec::new();

    if let Some(department) = non_blank(&query.department) {
        conditions.push("department = ?");
        bindings.push(department.to_string());
    }

    if let Some(status) = non_blank(&query.status) {
        conditions.push("status = ?");
        bindings.push(status.to_uppercase());
    }

    if let Some(search) = non_blank(&query.search) {
        conditions.push(
            "(first_name LIKE ? OR last_name LIKE ? OR email LIKE ? OR employee_number LIKE ?)",
        );
        let like = format!("%{search}%");
        bindings.extend(std::iter::repeat_n(like, 4));
    }

    let where_clause = conditions.join(" AND ");

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM employees WHERE {where_clause}");
    debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(auth.tenant_id);
    for b in &bindings {
        count_query = count_query.bind(b);
    }
    let total = count_query.fetch_one(pool.get_ref()).await?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT * FROM employees WHERE {where_clause} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql).bind(auth.tenant_id);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    let employees = data_query
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        success: true,
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Create Employee
///
/// Creates the login user, the employee record and the current-year leave
/// balance in one transaction.
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Object, example = json!({
            "success": true,
            "message": "Employee created successfully",
            "data": {
                "employee": { "id": 7, "employeeNumber": "E1007", "firstName": "John", "email": "john@acme.com" },
                "tempPassword": "k7Qm2xPa9LwZ"
            }
        })),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email or employee number already in use")
    ),
    security(("session_cookie" = [])),
    tag = "Employee"
)]
#[instrument(name = "employee_create", skip(auth, pool, body), fields(tenant_id = auth.tenant_id))]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<CreateEmployee>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let (Some(first_name), Some(email)) = (non_blank(&body.first_name), non_blank(&body.email)) else {
        return Err(ApiError::bad_request("firstName and email are required"));
    };
    if !is_valid_email(email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }

    let gender = non_blank(&body.gender).map(parse_gender).transpose()?;

    let (password, temp_password) = match body.password.as_deref().filter(|p| !p.is_empty()) {
        Some(p) if !is_strong_enough(p) => {
            return Err(ApiError::bad_request("Password must be at least 8 characters"));
        }
        Some(p) => (p.to_string(), None),
        None => {
            let generated = generate_temporary_password(TEMP_PASSWORD_LEN);
            (generated.clone(), Some(generated))
        }
    };

    if !EMAILS.is_available(email, pool.get_ref()).await? {
        return Err(ApiError::conflict("This email is already in use"));
    }

    let requested_number = non_blank(&body.employee_number);
    let mut employee_number = match requested_number {
        Some(n) => {
            let taken = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM employees WHERE tenant_id = ? AND employee_number = ?",
            )
            .bind(auth.tenant_id)
            .bind(n)
            .fetch_one(pool.get_ref())
            .await?;
            if taken > 0 {
                return Err(ApiError::conflict("Employee number already exists"));
            }
            n.to_string()
        }
        None => {
            let last = sqlx::query_scalar::<_, String>(
                "SELECT employee_number FROM employees WHERE tenant_id = ? ORDER BY id DESC LIMIT 1",
            )
            .bind(auth.tenant_id)
            .fetch_optional(pool.get_ref())
            .await?;
            next_employee_number(last.as_deref())
                .unwrap_or_else(|| random_employee_number(4, random_u64()))
        }
    };

    let settings = load_settings(pool.get_ref(), auth.tenant_id).await?;
    let hashed = hash_or_internal(&password)?;
    let hire_date = body.hire_date.unwrap_or_else(local_today);

    let mut tx = pool.begin().await?;

    let user_id = sqlx::query(
        r#"
        INSERT INTO users (tenant_id, email, password, role, status, email_verified, must_change_password)
        VALUES (?, ?, ?, ?, ?, FALSE, TRUE)
        "#,
    )
    .bind(auth.tenant_id)
    .bind(email)
    .bind(&hashed)
    .bind(Role::Employee.as_ref())
    .bind(AccountStatus::Active.as_ref())
    .execute(&mut *tx)
    .await
    .map_err(|e| conflict_or_internal(e, "This email is already in use"))?
    .last_insert_id();

    let mut retries = 0;
    let employee_id = loop {
        let inserted = sqlx::query(
            r#"
            INSERT INTO employees
                (tenant_id, user_id, employee_number, first_name, last_name, email, phone,
                 birth_date, gender, department, position, hire_date, salary, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(auth.tenant_id)
        .bind(user_id)
        .bind(&employee_number)
        .bind(first_name)
        .bind(non_blank(&body.last_name).unwrap_or_default())
        .bind(email)
        .bind(non_blank(&body.phone).unwrap_or_default())
        .bind(body.birth_date)
        .bind(gender.map(|g| g.as_ref().to_string()))
        .bind(non_blank(&body.department).unwrap_or("General"))
        .bind(non_blank(&body.position).unwrap_or("Employee"))
        .bind(hire_date)
        .bind(body.salary)
        .bind(AccountStatus::Active.as_ref())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(done) => break done.last_insert_id(),
            Err(e) if is_unique_violation(&e) && requested_number.is_none() && retries < NUMBER_RETRIES => {
                retries += 1;
                warn!(employee_number = %employee_number, retries, "Employee number collision");
                employee_number = random_employee_number(5, random_u64());
            }
            Err(e) => return Err(conflict_or_internal(e, "Employee number already exists")),
        }
    };

    sqlx::query(
        r#"
        INSERT INTO leave_balances (tenant_id, employee_id, year, annual_total, annual_used, sick_total, sick_used)
        VALUES (?, ?, ?, ?, 0, ?, 0)
        "#,
    )
    .bind(auth.tenant_id)
    .bind(employee_id)
    .bind(local_today().year())
    .bind(settings.annual_leave_days)
    .bind(settings.sick_leave_days)
    .execute(&mut *tx)
    .await?;

    let employee = find_employee(&mut *tx, employee_id, auth.tenant_id).await?;

    tx.commit().await?;

    EMAILS.remember(email).await;
    info!(employee_id, user_id, employee_number = %employee.employee_number, "Employee created");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Employee created successfully",
        "data": { "employee": employee, "tempPassword": temp_password }
    })))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee with balance, recent attendance and leaves", body = Object, example = json!({
            "success": true,
            "data": {
                "employee": { "id": 7, "employeeNumber": "E1007", "firstName": "John" },
                "leaveBalance": { "annualTotal": 21, "annualUsed": 3, "annualRemaining": 18 },
                "recentAttendance": [],
                "recentLeaves": []
            }
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("session_cookie" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let employee = find_employee(pool.get_ref(), id, auth.tenant_id).await?;
    let balance = load_balance(pool.get_ref(), employee.id, auth.tenant_id).await?;

    let attendance = sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendance WHERE employee_id = ? AND tenant_id = ? ORDER BY date DESC LIMIT 10",
    )
    .bind(employee.id)
    .bind(auth.tenant_id)
    .fetch_all(pool.get_ref())
    .await?;

    let leaves = sqlx::query_as::<_, LeaveRequest>(
        "SELECT * FROM leaves WHERE employee_id = ? AND tenant_id = ? ORDER BY created_at DESC, id DESC LIMIT 5",
    )
    .bind(employee.id)
    .bind(auth.tenant_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "employee": employee,
            "leaveBalance": balance,
            "recentAttendance": attendance,
            "recentLeaves": leaves
        }
    })))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee ID")),
    request_body(content = Object, example = json!({ "department": "Finance", "status": "INACTIVE" })),
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Field cannot be updated or invalid value"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("session_cookie" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();
    let mut payload = body.into_inner();

    let status = match payload.get("status") {
        None => None,
        Some(Value::String(s)) => Some(
            s.trim()
                .to_uppercase()
                .parse::<AccountStatus>()
                .map_err(|_| ApiError::bad_request("status must be ACTIVE or INACTIVE"))?,
        ),
        Some(_) => return Err(ApiError::bad_request("status must be ACTIVE or INACTIVE")),
    };
    if let (Some(status), Some(obj)) = (status, payload.as_object_mut()) {
        obj.insert("status".into(), Value::String(status.as_ref().to_string()));
    }

    if let Some(email) = payload.get("email") {
        if !email.as_str().is_some_and(is_valid_email) {
            return Err(ApiError::bad_request("Invalid email format"));
        }
    }
    if let Some(first) = payload.get("firstName") {
        if first.as_str().is_none_or(|s| s.trim().is_empty()) {
            return Err(ApiError::bad_request("firstName cannot be empty"));
        }
    }

    let update = build_update_sql(
        "employees",
        &payload,
        EMPLOYEE_FIELDS,
        &[("id", SqlValue::U64(id)), ("tenant_id", SqlValue::U64(auth.tenant_id))],
    )?;

    let mut tx = pool.begin().await?;

    let existing = find_employee(&mut *tx, id, auth.tenant_id).await?;
    execute_update(&mut tx, update).await?;

    // Inactive employees lose their login.
    if let (Some(status), Some(user_id)) = (status, existing.user_id) {
        sqlx::query("UPDATE users SET status = ? WHERE id = ? AND tenant_id = ?")
            .bind(status.as_ref())
            .bind(user_id)
            .bind(auth.tenant_id)
            .execute(&mut *tx)
            .await?;
    }

    let employee = find_employee(&mut *tx, id, auth.tenant_id).await?;
    tx.commit().await?;

    info!(employee_id = id, by = auth.user_id, "Employee updated");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Employee updated successfully",
        "data": employee
    })))
}

#[derive(FromRow)]
struct LinkedUser {
    user_id: Option<u64>,
    login_email: Option<String>,
}

/// Delete Employee (Admin)
///
/// Attendance, leaves and the balance cascade; the login user is removed too.
#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deleted", body = Object, example = json!({
            "success": true,
            "message": "Employee deleted successfully"
        })),
        (status = 400, description = "Cannot delete own record"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("session_cookie" = [])),
    tag = "Employee"
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let id = path.into_inner();

    let mut tx = pool.begin().await?;

    let linked = sqlx::query_as::<_, LinkedUser>(
        r#"
        SELECT e.user_id, u.email AS login_email
        FROM employees e
        LEFT JOIN users u ON u.id = e.user_id
        WHERE e.id = ? AND e.tenant_id = ?
        "#,
    )
    .bind(id)
    .bind(auth.tenant_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    if linked.user_id == Some(auth.user_id) {
        return Err(ApiError::bad_request("You cannot delete your own employee record"));
    }

    sqlx::query("DELETE FROM employees WHERE id = ? AND tenant_id = ?")
        .bind(id)
        .bind(auth.tenant_id)
        .execute(&mut *tx)
        .await?;

    if let Some(user_id) = linked.user_id {
        sqlx::query("DELETE FROM users WHERE id = ? AND tenant_id = ?")
            .bind(user_id)
            .bind(auth.tenant_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    if let Some(email) = linked.login_email.as_deref() {
        EMAILS.forget(email).await;
    }
    info!(employee_id = id, by = auth.user_id, "Employee deleted");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Employee deleted successfully"
    })))
}

#[derive(FromRow)]
struct AccountRow {
    role: String,
    status: String,
    must_change_password: bool,
}

/// Own profile
#[utoipa::path(
    get,
    path = "/api/employees/me",
    responses(
        (status = 200, description = "Own profile, account and leave balance", body = Object, example = json!({
            "success": true,
            "data": {
                "employee": { "id": 7, "employeeNumber": "E1007", "firstName": "John" },
                "user": { "role": "EMPLOYEE", "status": "ACTIVE", "mustChangePassword": true },
                "leaveBalance": { "annualTotal": 21, "annualUsed": 0, "annualRemaining": 21 }
            }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee profile not found")
    ),
    security(("session_cookie" = [])),
    tag = "Employee"
)]
pub async fn get_my_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let employee = find_own_employee(pool.get_ref(), &auth).await?;

    let account = sqlx::query_as::<_, AccountRow>(
        "SELECT role, status, must_change_password FROM users WHERE id = ? AND tenant_id = ?",
    )
    .bind(auth.user_id)
    .bind(auth.tenant_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::unauthorized("Session user no longer exists"))?;

    let balance = load_balance(pool.get_ref(), employee.id, auth.tenant_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "employee": employee,
            "user": {
                "role": account.role,
                "status": account.status,
                "mustChangePassword": account.must_change_password
            },
            "leaveBalance": balance
        }
    })))
}

/// Update own profile
///
/// Only `phone`, `birthDate` and `gender` are accepted.
#[utoipa::path(
    put,
    path = "/api/employees/me",
    request_body(content = Object, example = json!({ "phone": "0509876543", "gender": "FEMALE", "birthDate": "1994-02-11" })),
    responses(
        (status = 200, description = "Profile updated", body = Employee),
        (status = 400, description = "Field cannot be updated or invalid value"),
        (status = 404, description = "Employee profile not found")
    ),
    security(("session_cookie" = [])),
    tag = "Employee"
)]
pub async fn update_my_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let mut payload = body.into_inner();

    if let Some(obj) = payload.as_object_mut() {
        match obj.get("gender") {
            Some(Value::String(raw)) => {
                let gender = parse_gender(raw)?;
                obj.insert("gender".into(), Value::String(gender.as_ref().to_string()));
            }
            Some(Value::Null) | None => {}
            Some(_) => return Err(ApiError::bad_request("gender must be MALE, FEMALE or OTHER")),
        }
    }

    // Scope is filled in once the profile is known; whitelist first.
    build_update_sql("employees", &payload, SELF_FIELDS, &[])?;

    let mut tx = pool.begin().await?;
    let employee = find_own_employee(&mut *tx, &auth).await?;

    let update = build_update_sql(
        "employees",
        &payload,
        SELF_FIELDS,
        &[("id", SqlValue::U64(employee.id)), ("tenant_id", SqlValue::U64(auth.tenant_id))],
    )?;
    execute_update(&mut tx, update).await?;

    let employee = find_employee(&mut *tx, employee.id, auth.tenant_id).await?;
    tx.commit().await?;

    info!(employee_id = employee.id, "Profile updated");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "data": employee
    })))
}
