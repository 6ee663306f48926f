use crate::{
    api::{employee::find_own_employee, local_now, paginate},
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        leave_balance::LeaveBalance,
        leave_request::{LeaveRequest, LeaveStatus, LeaveType, leave_days},
    },
    utils::validation::non_blank,
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, MySqlPool, mysql::MySqlExecutor};
use strum_macros::EnumString;
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveForm {
    #[serde(rename = "type")]
    #[schema(example = "ANNUAL")]
    pub leave_type: Option<String>,
    #[schema(example = "2026-02-02", value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-02-04", value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    #[schema(example = "Family trip")]
    pub reason: Option<String>,
}

/// Leave submitted by HR/Admin on behalf of an employee.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaveFor {
    #[schema(example = 7)]
    pub employee_id: Option<u64>,
    #[serde(flatten)]
    pub form: LeaveForm,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLeave {
    #[schema(example = "approve")]
    pub action: Option<String>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    fn outcome(self) -> LeaveStatus {
        match self {
            ReviewAction::Approve => LeaveStatus::Approved,
            ReviewAction::Reject => LeaveStatus::Rejected,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeaveFilter {
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    /// PENDING, APPROVED or REJECTED
    pub status: Option<String>,
    /// Page number (starts at 1)
    pub page: Option<u32>,
    /// Items per page
    pub per_page: Option<u32>,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(&'static str),
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
struct LeaveRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    leave: LeaveRequest,
    first_name: String,
    last_name: String,
    employee_number: String,
    department: String,
}

/// A validated request, ready to be checked against the balance.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveDraft {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i32,
    pub reason: Option<String>,
}

impl LeaveForm {
    pub fn validate(&self) -> Result<LeaveDraft, ApiError> {
        let (Some(raw_type), Some(start_date), Some(end_date)) =
            (non_blank(&self.leave_type), self.start_date, self.end_date)
        else {
            return Err(ApiError::bad_request("type, startDate and endDate are required"));
        };

        let leave_type = raw_type
            .to_uppercase()
            .parse::<LeaveType>()
            .map_err(|_| ApiError::bad_request("type must be ANNUAL, SICK or EMERGENCY"))?;

        let days = leave_days(start_date, end_date)
            .ok_or_else(|| ApiError::bad_request("startDate must be on or before endDate"))?;

        Ok(LeaveDraft {
            leave_type,
            start_date,
            end_date,
            days,
            reason: non_blank(&self.reason).map(str::to_string),
        })
    }
}

pub async fn load_balance<'e, E: MySqlExecutor<'e>>(
    exec: E,
    employee_id: u64,
    tenant_id: u64,
) -> Result<Option<LeaveBalance>, sqlx::Error> {
    sqlx::query_as::<_, LeaveBalance>(
        "SELECT * FROM leave_balances WHERE employee_id = ? AND tenant_id = ?",
    )
    .bind(employee_id)
    .bind(tenant_id)
    .fetch_optional(exec)
    .await
}

async fn find_leave<'e, E: MySqlExecutor<'e>>(
    exec: E,
    id: u64,
    tenant_id: u64,
) -> Result<Option<LeaveRequest>, sqlx::Error> {
    sqlx::query_as::<_, LeaveRequest>("SELECT * FROM leaves WHERE id = ? AND tenant_id = ?")
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(exec)
        .await
}

/// Shared submission path: tenant employee, balance, overlap, then insert as PENDING.
#[instrument(name = "leave_submit", skip(pool, draft), fields(leave_type = %draft.leave_type, days = draft.days))]
async fn submit_leave(
    pool: &MySqlPool,
    tenant_id: u64,
    employee_id: u64,
    draft: LeaveDraft,
) -> Result<LeaveRequest, ApiError> {
    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM employees WHERE id = ? AND tenant_id = ?",
    )
    .bind(employee_id)
    .bind(tenant_id)
    .fetch_one(pool)
    .await?;
    if exists == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    let balance = load_balance(pool, employee_id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave balance not found"))?;

    if !balance.covers(draft.leave_type, draft.days) {
        let remaining = balance.remaining_for(draft.leave_type).unwrap_or_default();
        return Err(ApiError::bad_request(format!(
            "Insufficient {} leave balance: {} day(s) remaining",
            draft.leave_type.as_ref().to_lowercase(),
            remaining
        )));
    }

    let overlapping = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM leaves
        WHERE employee_id = ? AND status IN (?, ?)
          AND start_date <= ? AND end_date >= ?
        "#,
    )
    .bind(employee_id)
    .bind(LeaveStatus::Pending.as_ref())
    .bind(LeaveStatus::Approved.as_ref())
    .bind(draft.end_date)
    .bind(draft.start_date)
    .fetch_one(pool)
    .await?;
    if overlapping > 0 {
        return Err(ApiError::conflict("Leave overlaps an existing pending or approved request"));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO leaves (tenant_id, employee_id, leave_type, start_date, end_date, days, reason, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(tenant_id)
    .bind(employee_id)
    .bind(draft.leave_type.as_ref())
    .bind(draft.start_date)
    .bind(draft.end_date)
    .bind(draft.days)
    .bind(&draft.reason)
    .bind(LeaveStatus::Pending.as_ref())
    .execute(pool)
    .await?
    .last_insert_id();

    info!(leave_id = id, employee_id, "Leave submitted");

    find_leave(pool, id, tenant_id).await?.ok_or(ApiError::Internal)
}

/* =========================
List leaves (HR/Admin)
========================= */
#[utoipa::path(
    get,
    path = "/api/leaves",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leaves with employee names", body = Object, example = json!({
            "success": true,
            "data": [{
                "id": 3, "employeeId": 7, "leaveType": "ANNUAL", "startDate": "2026-02-02",
                "endDate": "2026-02-04", "days": 3, "status": "PENDING",
                "firstName": "John", "lastName": "Doe", "employeeNumber": "E1007", "department": "IT"
            }],
            "page": 1, "perPage": 20, "total": 1
        })),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Forbidden")
    ),
    security(("session_cookie" = [])),
    tag = "Leave"
)]
pub async fn list_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let (page, per_page, offset) = paginate(query.page, query.per_page);

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE l.tenant_id = ?");
    let mut args: Vec<FilterValue> = vec![FilterValue::U64(auth.tenant_id)];

    if let Some(emp_id) = query.employee_id {
        where_sql.push_str(" AND l.employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(status) = non_blank(&query.status) {
        let status = status
            .to_uppercase()
            .parse::<LeaveStatus>()
            .map_err(|_| ApiError::bad_request("status must be PENDING, APPROVED or REJECTED"))?;
        where_sql.push_str(" AND l.status = ?");
        args.push(FilterValue::Str(status.into()));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leaves l{where_sql}");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT l.*, e.first_name, e.last_name, e.employee_number, e.department
        FROM leaves l
        JOIN employees e ON e.id = l.employee_id
        {where_sql}
        ORDER BY l.created_at DESC, l.id DESC
        LIMIT ? OFFSET ?
        "#
    );
    debug!(sql = %data_sql, page, per_page, "Fetching leaves");

    let mut data_q = sqlx::query_as::<_, LeaveRow>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": leaves,
        "page": page,
        "perPage": per_page,
        "total": total
    })))
}

/* =========================
Create leave on behalf of an employee (HR/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/leaves",
    request_body = CreateLeaveFor,
    responses(
        (status = 201, description = "Leave submitted as PENDING", body = LeaveRequest),
        (status = 400, description = "Invalid dates, type or insufficient balance"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee or balance not found"),
        (status = 409, description = "Overlaps an existing leave")
    ),
    security(("session_cookie" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<CreateLeaveFor>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let employee_id = body
        .employee_id
        .ok_or_else(|| ApiError::bad_request("employeeId is required"))?;
    let draft = body.form.validate()?;

    let leave = submit_leave(pool.get_ref(), auth.tenant_id, employee_id, draft).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Leave request submitted",
        "data": leave
    })))
}

/* =========================
Approve or reject (HR/Admin)
========================= */
#[utoipa::path(
    patch,
    path = "/api/leaves/{id}",
    params(("id" = u64, Path, description = "Leave request ID")),
    request_body = ReviewLeave,
    responses(
        (status = 200, description = "Leave reviewed", body = Object, example = json!({
            "success": true,
            "message": "Leave approved",
            "data": { "id": 3, "status": "APPROVED", "reviewedBy": 1 }
        })),
        (status = 400, description = "Unknown action, already reviewed or insufficient balance"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave not found")
    ),
    security(("session_cookie" = [])),
    tag = "Leave"
)]
#[instrument(name = "leave_review", skip(auth, pool, body), fields(reviewer = auth.user_id))]
pub async fn review_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ReviewLeave>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let action = body
        .action
        .as_deref()
        .map(|a| a.trim().to_lowercase())
        .and_then(|a| a.parse::<ReviewAction>().ok())
        .ok_or_else(|| ApiError::bad_request("action must be approve or reject"))?;
    let leave_id = path.into_inner();
    let outcome = action.outcome();

    let mut tx = pool.begin().await?;

    let leave = sqlx::query_as::<_, LeaveRequest>(
        "SELECT * FROM leaves WHERE id = ? AND tenant_id = ? FOR UPDATE",
    )
    .bind(leave_id)
    .bind(auth.tenant_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found("Leave request not found"))?;

    if !leave.is_pending() {
        return Err(ApiError::bad_request("Leave request has already been reviewed"));
    }

    let rejection_reason = match action {
        ReviewAction::Reject => non_blank(&body.rejection_reason),
        ReviewAction::Approve => None,
    };

    let updated = sqlx::query(
        r#"
        UPDATE leaves
        SET status = ?, reviewed_by = ?, reviewed_at = ?, rejection_reason = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(outcome.as_ref())
    .bind(auth.user_id)
    .bind(local_now())
    .bind(rejection_reason)
    .bind(leave_id)
    .bind(LeaveStatus::Pending.as_ref())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(ApiError::bad_request("Leave request has already been reviewed"));
    }

    if action == ReviewAction::Approve {
        let leave_type = leave.leave_type.parse::<LeaveType>().map_err(|_| {
            warn!(leave_id, leave_type = %leave.leave_type, "Stored leave has unknown type");
            ApiError::Internal
        })?;

        let columns = match leave_type {
            LeaveType::Annual => Some(("annual_used", "annual_total")),
            LeaveType::Sick => Some(("sick_used", "sick_total")),
            LeaveType::Emergency => None,
        };

        if let Some((used, total)) = columns {
            // Never lets `used` pass `total`; dropping tx rolls the status back.
            let sql = format!(
                "UPDATE leave_balances SET {used} = {used} + ? \
                 WHERE employee_id = ? AND tenant_id = ? AND {total} - {used} >= ?"
            );
            let charged = sqlx::query(&sql)
                .bind(leave.days)
                .bind(leave.employee_id)
                .bind(auth.tenant_id)
                .bind(leave.days)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            if charged == 0 {
                return Err(ApiError::bad_request("Insufficient leave balance to approve this request"));
            }
        }
    }

    let reviewed = find_leave(&mut *tx, leave_id, auth.tenant_id)
        .await?
        .ok_or(ApiError::Internal)?;
    tx.commit().await?;

    info!(leave_id, status = %outcome, "Leave reviewed");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": match action {
            ReviewAction::Approve => "Leave approved",
            ReviewAction::Reject => "Leave rejected",
        },
        "data": reviewed
    })))
}

/* =========================
Own leaves
========================= */
#[utoipa::path(
    get,
    path = "/api/leaves/me",
    responses(
        (status = 200, description = "Own leaves and balance", body = Object, example = json!({
            "success": true,
            "data": {
                "leaves": [],
                "balance": { "annualTotal": 21, "annualUsed": 3, "annualRemaining": 18, "sickTotal": 10, "sickUsed": 0, "sickRemaining": 10 }
            }
        })),
        (status = 404, description = "Employee profile not found")
    ),
    security(("session_cookie" = [])),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let employee = find_own_employee(pool.get_ref(), &auth).await?;

    let leaves = sqlx::query_as::<_, LeaveRequest>(
        "SELECT * FROM leaves WHERE employee_id = ? AND tenant_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(employee.id)
    .bind(auth.tenant_id)
    .fetch_all(pool.get_ref())
    .await?;

    let balance = load_balance(pool.get_ref(), employee.id, auth.tenant_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "leaves": leaves, "balance": balance }
    })))
}

#[utoipa::path(
    post,
    path = "/api/leaves/me",
    request_body = LeaveForm,
    responses(
        (status = 201, description = "Leave submitted as PENDING", body = LeaveRequest),
        (status = 400, description = "Invalid dates, type or insufficient balance"),
        (status = 404, description = "Employee profile or balance not found"),
        (status = 409, description = "Overlaps an existing leave")
    ),
    security(("session_cookie" = [])),
    tag = "Leave"
)]
pub async fn submit_my_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<LeaveForm>,
) -> Result<HttpResponse, ApiError> {
    let draft = body.validate()?;
    let employee = find_own_employee(pool.get_ref(), &auth).await?;

    let leave = submit_leave(pool.get_ref(), auth.tenant_id, employee.id, draft).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Leave request submitted",
        "data": leave
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::role::Role;
    use crate::test_support::{lazy_pool, response_json, seed_employee, seed_tenant, session_for};
    use actix_web::{App, http::StatusCode, test as actix_test};

    fn form(json: serde_json::Value) -> LeaveForm {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn draft_counts_days_inclusively() {
        let draft = form(json!({
            "type": "annual", "startDate": "2026-02-02", "endDate": "2026-02-04", "reason": "  "
        }))
        .validate()
        .unwrap();

        assert_eq!(draft.leave_type, LeaveType::Annual);
        assert_eq!(draft.days, 3);
        assert_eq!(draft.reason, None);
    }

    #[test]
    fn draft_rejects_bad_input() {
        let missing = form(json!({ "type": "SICK", "startDate": "2026-02-02" })).validate();
        assert_eq!(missing.unwrap_err().to_string(), "type, startDate and endDate are required");

        let unknown = form(json!({ "type": "UNPAID", "startDate": "2026-02-02", "endDate": "2026-02-02" })).validate();
        assert_eq!(unknown.unwrap_err().to_string(), "type must be ANNUAL, SICK or EMERGENCY");

        let reversed = form(json!({ "type": "SICK", "startDate": "2026-02-05", "endDate": "2026-02-02" })).validate();
        assert_eq!(reversed.unwrap_err().to_string(), "startDate must be on or before endDate");
    }

    #[test]
    fn review_actions() {
        assert_eq!("approve".parse::<ReviewAction>().unwrap().outcome(), LeaveStatus::Approved);
        assert_eq!("reject".parse::<ReviewAction>().unwrap().outcome(), LeaveStatus::Rejected);
        assert!("cancel".parse::<ReviewAction>().is_err());
    }

    #[actix_web::test]
    async fn rejects_before_touching_db() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(Config::for_tests()))
                .route("/leaves", web::get().to(list_leaves))
                .route("/leaves", web::post().to(create_leave))
                .route("/leaves/me", web::post().to(submit_my_leave))
                .route("/leaves/{id}", web::patch().to(review_leave)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/leaves")
            .cookie(session_for(Role::Employee))
            .set_json(json!({ "employeeId": 1, "type": "ANNUAL", "startDate": "2026-02-02", "endDate": "2026-02-02" }))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = actix_test::TestRequest::patch()
            .uri("/leaves/3")
            .cookie(session_for(Role::Employee))
            .set_json(json!({ "action": "approve" }))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = actix_test::TestRequest::patch()
            .uri("/leaves/3")
            .cookie(session_for(Role::Hr))
            .set_json(json!({ "action": "maybe" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], "action must be approve or reject");

        let req = actix_test::TestRequest::post()
            .uri("/leaves")
            .cookie(session_for(Role::Hr))
            .set_json(json!({ "type": "ANNUAL", "startDate": "2026-02-02", "endDate": "2026-02-02" }))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = actix_test::TestRequest::post()
            .uri("/leaves/me")
            .cookie(session_for(Role::Employee))
            .set_json(json!({ "type": "SICK", "startDate": "2026-02-05", "endDate": "2026-02-02" }))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = actix_test::TestRequest::get()
            .uri("/leaves?status=LOST")
            .cookie(session_for(Role::Admin))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    fn leave(kind: &str, start: &str, end: &str) -> web::Json<LeaveForm> {
        web::Json(form(json!({ "type": kind, "startDate": start, "endDate": end })))
    }

    fn approve() -> web::Json<ReviewLeave> {
        web::Json(ReviewLeave { action: Some("approve".into()), rejection_reason: None })
    }

    async fn submitted_id(resp: HttpResponse) -> u64 {
        assert_eq!(resp.status(), StatusCode::CREATED);
        response_json(resp).await["data"]["id"].as_u64().expect("leave id")
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL pointing at a MySQL server"]
    async fn overlapping_leave_is_a_conflict(pool: MySqlPool) {
        let admin = seed_tenant(&pool, "overlap").await;
        let (_, staff) = seed_employee(&pool, admin.tenant_id, "staff@overlap.test", "E1001").await;
        let data = web::Data::new(pool.clone());

        let resp = submit_my_leave(staff.clone(), data.clone(), leave("ANNUAL", "2026-03-02", "2026-03-04"))
            .await
            .unwrap();
        submitted_id(resp).await;

        let err = submit_my_leave(staff.clone(), data.clone(), leave("SICK", "2026-03-04", "2026-03-06"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)), "{err:?}");

        // The day after the first request ends is free.
        let resp = submit_my_leave(staff, data, leave("SICK", "2026-03-05", "2026-03-05"))
            .await
            .unwrap();
        submitted_id(resp).await;
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL pointing at a MySQL server"]
    async fn approval_never_overdraws_the_balance(pool: MySqlPool) {
        let admin = seed_tenant(&pool, "guard").await;
        let (employee_id, staff) = seed_employee(&pool, admin.tenant_id, "staff@guard.test", "E1001").await;
        let data = web::Data::new(pool.clone());

        // Both fit the 5 annual days on their own; only one can be approved.
        let first = submitted_id(
            submit_my_leave(staff.clone(), data.clone(), leave("ANNUAL", "2026-04-06", "2026-04-08"))
                .await
                .unwrap(),
        )
        .await;
        let second = submitted_id(
            submit_my_leave(staff, data.clone(), leave("ANNUAL", "2026-04-13", "2026-04-15"))
                .await
                .unwrap(),
        )
        .await;

        let resp = review_leave(admin.clone(), data.clone(), web::Path::from(first), approve())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let err = review_leave(admin.clone(), data.clone(), web::Path::from(second), approve())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Insufficient leave balance to approve this request");

        let balance = load_balance(&pool, employee_id, admin.tenant_id).await.unwrap().unwrap();
        assert_eq!(balance.annual_used, 3);

        // The status change was rolled back with the failed charge.
        let second = find_leave(&pool, second, admin.tenant_id).await.unwrap().unwrap();
        assert!(second.is_pending());

        let err = review_leave(admin, data, web::Path::from(first), approve()).await.unwrap_err();
        assert_eq!(err.to_string(), "Leave request has already been reviewed");
    }
}
