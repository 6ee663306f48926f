use crate::{
    api::{employee::find_own_employee, local_now, local_today, settings::load_settings},
    auth::auth::AuthUser,
    error::{ApiError, conflict_or_internal},
    model::attendance::{Attendance, AttendanceStatus, worked_hours},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, MySqlPool, mysql::MySqlExecutor};
use strum_macros::EnumString;
use tracing::{debug, info};
use utoipa::ToSchema;

const HISTORY_DAYS: i64 = 30;

#[derive(Debug, Copy, Clone, Eq, PartialEq, EnumString)]
pub enum AttendanceAction {
    #[strum(serialize = "check-in")]
    CheckIn,
    #[strum(serialize = "check-out")]
    CheckOut,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttendanceActionReq {
    #[serde(rename = "type")]
    #[schema(example = "check-in")]
    pub action: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub date: Option<String>,
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub late: usize,
    pub checked_out: usize,
}

impl AttendanceSummary {
    pub fn of(records: &[Attendance]) -> Self {
        let count = |status: AttendanceStatus| {
            records.iter().filter(|r| r.status == status.as_ref()).count()
        };
        AttendanceSummary {
            total: records.len(),
            present: count(AttendanceStatus::Present),
            late: count(AttendanceStatus::Late),
            checked_out: records.iter().filter(|r| r.is_checked_out()).count(),
        }
    }
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
struct DailyAttendance {
    #[sqlx(flatten)]
    #[serde(flatten)]
    record: Attendance,
    first_name: String,
    last_name: String,
    employee_number: String,
}

async fn record_for_day<'e, E: MySqlExecutor<'e>>(
    exec: E,
    employee_id: u64,
    date: NaiveDate,
) -> Result<Option<Attendance>, sqlx::Error> {
    sqlx::query_as::<_, Attendance>("SELECT * FROM attendance WHERE employee_id = ? AND date = ?")
        .bind(employee_id)
        .bind(date)
        .fetch_optional(exec)
        .await
}

/// Own attendance history
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    responses(
        (status = 200, description = "Last 30 records and today's state", body = Object, example = json!({
            "success": true,
            "data": {
                "history": [],
                "todayRecord": null,
                "canCheckIn": true,
                "canCheckOut": false
            }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee profile not found")
    ),
    security(("session_cookie" = [])),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let employee = find_own_employee(pool.get_ref(), &auth).await?;
    let today = local_today();

    let history = sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendance WHERE employee_id = ? AND tenant_id = ? ORDER BY date DESC LIMIT ?",
    )
    .bind(employee.id)
    .bind(auth.tenant_id)
    .bind(HISTORY_DAYS)
    .fetch_all(pool.get_ref())
    .await?;

    let today_record = history.iter().find(|r| r.date == today);
    let can_check_in = today_record.is_none();
    let can_check_out = today_record.is_some_and(|r| !r.is_checked_out());

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "history": history,
            "todayRecord": today_record,
            "canCheckIn": can_check_in,
            "canCheckOut": can_check_out
        }
    })))
}

/// Check in or check out
///
/// One record per employee per day. Check-in status is LATE past the
/// tenant's start time plus tolerance.
#[utoipa::path(
    post,
    path = "/api/attendance/me",
    request_body = AttendanceActionReq,
    responses(
        (status = 200, description = "Checked in or out", body = Object, example = json!({
            "success": true,
            "message": "Checked in successfully",
            "data": { "record": { "id": 1, "status": "PRESENT" }, "isLate": false, "checkInTime": "08:02" }
        })),
        (status = 400, description = "Unknown type or no check-in today"),
        (status = 404, description = "Employee profile not found"),
        (status = 409, description = "Already checked in or out", body = Object, example = json!({
            "success": false,
            "error": "Already checked in today",
            "details": { "checkIn": "2026-01-05T08:02:11", "alreadyCheckedOut": false }
        }))
    ),
    security(("session_cookie" = [])),
    tag = "Attendance"
)]
pub async fn record_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<AttendanceActionReq>,
) -> Result<HttpResponse, ApiError> {
    let action = body
        .action
        .as_deref()
        .and_then(|a| a.parse::<AttendanceAction>().ok())
        .ok_or_else(|| ApiError::bad_request("type must be check-in or check-out"))?;

    let employee = find_own_employee(pool.get_ref(), &auth).await?;
    let now = local_now();
    let today = now.date();

    let existing = record_for_day(pool.get_ref(), employee.id, today).await?;
    debug!(employee_id = employee.id, ?action, has_record = existing.is_some(), "Attendance action");

    match action {
        AttendanceAction::CheckIn => {
            if let Some(record) = existing {
                return Ok(HttpResponse::Conflict().json(json!({
                    "success": false,
                    "error": "Already checked in today",
                    "details": {
                        "checkIn": record.check_in,
                        "alreadyCheckedOut": record.is_checked_out()
                    }
                })));
            }

            let settings = load_settings(pool.get_ref(), auth.tenant_id).await?;
            let status = AttendanceStatus::for_check_in(now.time(), settings.late_after());
            let is_late = status == AttendanceStatus::Late;

            let id = sqlx::query(
                r#"
                INSERT INTO attendance (tenant_id, employee_id, date, check_in, status, notes)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(auth.tenant_id)
            .bind(employee.id)
            .bind(today)
            .bind(now)
            .bind(status.as_ref())
            .bind(is_late.then_some("Late arrival"))
            .execute(pool.get_ref())
            .await
            .map_err(|e| conflict_or_internal(e, "Already checked in today"))?
            .last_insert_id();

            let record = record_for_day(pool.get_ref(), employee.id, today)
                .await?
                .ok_or(ApiError::Internal)?;

            info!(attendance_id = id, employee_id = employee.id, status = %status, "Checked in");

            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "message": if is_late { "Checked in (late)" } else { "Checked in successfully" },
                "data": {
                    "record": record,
                    "isLate": is_late,
                    "checkInTime": now.format("%H:%M").to_string()
                }
            })))
        }
        AttendanceAction::CheckOut => {
            let record = existing.ok_or_else(|| ApiError::bad_request("You have not checked in today"))?;

            if let Some(check_out) = record.check_out {
                return Ok(HttpResponse::Conflict().json(json!({
                    "success": false,
                    "error": "Already checked out today",
                    "details": { "checkOut": check_out }
                })));
            }

            let total_hours = worked_hours(record.check_in, now);

            let updated = sqlx::query(
                "UPDATE attendance SET check_out = ?, total_hours = ? WHERE id = ? AND check_out IS NULL",
            )
            .bind(now)
            .bind(total_hours)
            .bind(record.id)
            .execute(pool.get_ref())
            .await?
            .rows_affected();

            if updated == 0 {
                return Err(ApiError::conflict("Already checked out today"));
            }

            let record = record_for_day(pool.get_ref(), employee.id, today)
                .await?
                .ok_or(ApiError::Internal)?;

            info!(attendance_id = record.id, employee_id = employee.id, total_hours, "Checked out");

            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "message": "Checked out successfully",
                "data": {
                    "record": record,
                    "totalHours": total_hours,
                    "checkOutTime": now.format("%H:%M").to_string()
                }
            })))
        }
    }
}

/// Tenant attendance for a day
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(("date", Query, description = "Day as YYYY-MM-DD, defaults to today")),
    responses(
        (status = 200, description = "Records for the day with a summary", body = Object, example = json!({
            "success": true,
            "data": {
                "date": "2026-01-05",
                "records": [{ "id": 1, "employeeId": 7, "status": "LATE", "firstName": "John", "employeeNumber": "E1007" }],
                "summary": { "total": 1, "present": 0, "late": 1, "checkedOut": 0 }
            }
        })),
        (status = 400, description = "Invalid date"),
        (status = 403, description = "Forbidden")
    ),
    security(("session_cookie" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let date = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::bad_request("date must be YYYY-MM-DD"))?,
        None => local_today(),
    };

    let rows = sqlx::query_as::<_, DailyAttendance>(
        r#"
        SELECT a.*, e.first_name, e.last_name, e.employee_number
        FROM attendance a
        JOIN employees e ON e.id = a.employee_id
        WHERE a.tenant_id = ? AND a.date = ?
        ORDER BY a.check_in ASC
        "#,
    )
    .bind(auth.tenant_id)
    .bind(date)
    .fetch_all(pool.get_ref())
    .await?;

    let records: Vec<Attendance> = rows.iter().map(|r| r.record.clone()).collect();
    let summary = AttendanceSummary::of(&records);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "date": date, "records": rows, "summary": summary }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::role::Role;
    use crate::test_support::{lazy_pool, response_json, seed_employee, seed_tenant, session_for};
    use actix_web::{App, http::StatusCode, test as actix_test};
    use chrono::NaiveDateTime;

    fn record(status: AttendanceStatus, checked_out: bool) -> Attendance {
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let check_in: NaiveDateTime = day.and_hms_opt(8, 0, 0).unwrap();
        Attendance {
            id: 1,
            tenant_id: 1,
            employee_id: 1,
            date: day,
            check_in,
            check_out: checked_out.then(|| day.and_hms_opt(17, 0, 0).unwrap()),
            total_hours: checked_out.then_some(9.0),
            status: status.as_ref().to_string(),
            notes: None,
        }
    }

    #[test]
    fn action_names() {
        assert_eq!("check-in".parse::<AttendanceAction>().unwrap(), AttendanceAction::CheckIn);
        assert_eq!("check-out".parse::<AttendanceAction>().unwrap(), AttendanceAction::CheckOut);
        assert!("checkin".parse::<AttendanceAction>().is_err());
    }

    #[test]
    fn summary_counts_by_status() {
        let records = vec![
            record(AttendanceStatus::Present, true),
            record(AttendanceStatus::Late, false),
            record(AttendanceStatus::Late, true),
        ];
        assert_eq!(
            AttendanceSummary::of(&records),
            AttendanceSummary { total: 3, present: 1, late: 2, checked_out: 2 }
        );
        assert_eq!(AttendanceSummary::of(&[]), AttendanceSummary::default());
    }

    #[actix_web::test]
    async fn rejects_unknown_action_and_bad_dates() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(Config::for_tests()))
                .route("/attendance", web::get().to(list_attendance))
                .route("/attendance/me", web::post().to(record_attendance)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/attendance/me")
            .cookie(session_for(Role::Employee))
            .set_json(json!({ "type": "lunch" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"], "type must be check-in or check-out");

        let req = actix_test::TestRequest::get()
            .uri("/attendance?date=05-01-2026")
            .cookie(session_for(Role::Hr))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = actix_test::TestRequest::get()
            .uri("/attendance")
            .cookie(session_for(Role::Employee))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL pointing at a MySQL server"]
    async fn one_check_in_and_one_check_out_per_day(pool: MySqlPool) {
        let admin = seed_tenant(&pool, "clock").await;
        let (_, staff) = seed_employee(&pool, admin.tenant_id, "staff@clock.test", "E1001").await;
        let data = web::Data::new(pool.clone());
        let act = |action: &str| web::Json(AttendanceActionReq { action: Some(action.to_string()) });

        let err = record_attendance(staff.clone(), data.clone(), act("check-out")).await.unwrap_err();
        assert_eq!(err.to_string(), "You have not checked in today");

        let resp = record_attendance(staff.clone(), data.clone(), act("check-in")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = record_attendance(staff.clone(), data.clone(), act("check-in")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = response_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["details"]["alreadyCheckedOut"], false);

        let resp = record_attendance(staff.clone(), data.clone(), act("check-out")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = response_json(resp).await;
        assert!(!body["data"]["record"]["checkOut"].is_null());

        let resp = record_attendance(staff.clone(), data.clone(), act("check-out")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let body = response_json(my_attendance(staff, data).await.unwrap()).await;
        assert_eq!(body["data"]["history"].as_array().map(Vec::len), Some(1));
        assert!(!body["data"]["todayRecord"].is_null());
        assert_eq!(body["data"]["canCheckIn"], false);
        assert_eq!(body["data"]["canCheckOut"], false);
    }
}
