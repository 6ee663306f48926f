use crate::{
    api::local_today,
    auth::auth::AuthUser,
    error::ApiError,
    model::{employee::Employee, leave_request::LeaveStatus, user::AccountStatus},
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::json;
use sqlx::{FromRow, MySqlPool};

const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
struct DashboardStats {
    active_employees: i64,
    total_leaves: i64,
    pending_leaves: i64,
    today_attendance: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
struct PendingLeave {
    id: u64,
    employee_id: u64,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days: i32,
    created_at: NaiveDateTime,
    first_name: String,
    last_name: String,
}

/// HR dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Tenant counters and recent activity", body = Object, example = json!({
            "success": true,
            "data": {
                "stats": { "activeEmployees": 12, "totalLeaves": 30, "pendingLeaves": 2, "todayAttendance": 9 },
                "recentEmployees": [],
                "pendingLeaves": []
            }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("session_cookie" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let stats = sqlx::query_as::<_, DashboardStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM employees WHERE tenant_id = ? AND status = ?) AS active_employees,
            (SELECT COUNT(*) FROM leaves WHERE tenant_id = ?) AS total_leaves,
            (SELECT COUNT(*) FROM leaves WHERE tenant_id = ? AND status = ?) AS pending_leaves,
            (SELECT COUNT(*) FROM attendance WHERE tenant_id = ? AND date = ?) AS today_attendance
        "#,
    )
    .bind(auth.tenant_id)
    .bind(AccountStatus::Active.as_ref())
    .bind(auth.tenant_id)
    .bind(auth.tenant_id)
    .bind(LeaveStatus::Pending.as_ref())
    .bind(auth.tenant_id)
    .bind(local_today())
    .fetch_one(pool.get_ref())
    .await?;

    let recent_employees = sqlx::query_as::<_, Employee>(
        "SELECT * FROM employees WHERE tenant_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(auth.tenant_id)
    .bind(RECENT_LIMIT)
    .fetch_all(pool.get_ref())
    .await?;

    let pending = sqlx::query_as::<_, PendingLeave>(
        r#"
        SELECT l.id, l.employee_id, l.leave_type, l.start_date, l.end_date, l.days, l.created_at,
               e.first_name, e.last_name
        FROM leaves l
        JOIN employees e ON e.id = l.employee_id
        WHERE l.tenant_id = ? AND l.status = ?
        ORDER BY l.created_at DESC, l.id DESC
        LIMIT ?
        "#,
    )
    .bind(auth.tenant_id)
    .bind(LeaveStatus::Pending.as_ref())
    .bind(RECENT_LIMIT)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "stats": stats,
            "recentEmployees": recent_employees,
            "pendingLeaves": pending
        }
    })))
}
