use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::{settings::Settings, tenant::Tenant},
    utils::validation::parse_clock,
};
use actix_web::{HttpResponse, web};
use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySqlPool, mysql::MySqlExecutor};
use tracing::info;
use utoipa::ToSchema;

const MAX_LATE_TOLERANCE_MINUTES: i32 = 240;
const MAX_LEAVE_DAYS: i32 = 365;

/// Tenant settings, or the registration defaults when the row is missing.
pub async fn load_settings<'e, E: MySqlExecutor<'e>>(
    exec: E,
    tenant_id: u64,
) -> Result<Settings, sqlx::Error> {
    let row = sqlx::query_as::<_, Settings>(
        r#"
        SELECT id, tenant_id, work_start_time, work_end_time, late_tolerance_minutes,
               annual_leave_days, sick_leave_days, updated_at
        FROM settings
        WHERE tenant_id = ?
        "#,
    )
    .bind(tenant_id)
    .fetch_optional(exec)
    .await?;

    Ok(row.unwrap_or_else(|| Settings::defaults(tenant_id)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettings {
    #[schema(example = "08:30")]
    pub work_start_time: Option<String>,
    #[schema(example = "17:30")]
    pub work_end_time: Option<String>,
    #[schema(example = 10)]
    pub late_tolerance_minutes: Option<i32>,
    #[schema(example = 21)]
    pub annual_leave_days: Option<i32>,
    #[schema(example = 10)]
    pub sick_leave_days: Option<i32>,
}

impl UpdateSettings {
    /// Merge onto `current`, validating every provided field.
    pub fn apply(&self, current: &Settings) -> Result<Settings, ApiError> {
        let mut next = current.clone();

        let parse = |raw: &str, field: &str| -> Result<NaiveTime, ApiError> {
            parse_clock(raw).ok_or_else(|| ApiError::bad_request(format!("{field} must be HH:MM")))
        };

        if let Some(raw) = self.work_start_time.as_deref() {
            next.work_start_time = parse(raw, "workStartTime")?;
        }
        if let Some(raw) = self.work_end_time.as_deref() {
            next.work_end_time = parse(raw, "workEndTime")?;
        }
        if next.work_end_time <= next.work_start_time {
            return Err(ApiError::bad_request("workEndTime must be after workStartTime"));
        }

        if let Some(m) = self.late_tolerance_minutes {
            if !(0..=MAX_LATE_TOLERANCE_MINUTES).contains(&m) {
                return Err(ApiError::bad_request("lateToleranceMinutes must be between 0 and 240"));
            }
            next.late_tolerance_minutes = m;
        }

        for (value, slot, field) in [
            (self.annual_leave_days, &mut next.annual_leave_days, "annualLeaveDays"),
            (self.sick_leave_days, &mut next.sick_leave_days, "sickLeaveDays"),
        ] {
            if let Some(days) = value {
                if !(0..=MAX_LEAVE_DAYS).contains(&days) {
                    return Err(ApiError::bad_request(format!("{field} must be between 0 and 365")));
                }
                *slot = days;
            }
        }

        Ok(next)
    }
}

/// Company profile and settings
#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Tenant profile and settings", body = Object, example = json!({
            "success": true,
            "data": {
                "tenant": { "id": 1, "name": "Acme Corp", "domain": "acme", "status": "ACTIVE" },
                "settings": {
                    "workStartTime": "08:00:00", "workEndTime": "17:00:00",
                    "lateToleranceMinutes": 0, "annualLeaveDays": 21, "sickLeaveDays": 10
                }
            }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("session_cookie" = [])),
    tag = "Settings"
)]
pub async fn get_settings(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let tenant = sqlx::query_as::<_, Tenant>(
        "SELECT id, name, domain, size, industry, status, created_at FROM tenants WHERE id = ?",
    )
    .bind(auth.tenant_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::not_found("Company not found"))?;

    let settings = load_settings(pool.get_ref(), auth.tenant_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": { "tenant": tenant, "settings": settings }
    })))
}

/// Update working hours and leave allowances (Admin)
#[utoipa::path(
    put,
    path = "/api/settings",
    request_body = UpdateSettings,
    responses(
        (status = 200, description = "Settings updated", body = Settings),
        (status = 400, description = "Invalid value"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("session_cookie" = [])),
    tag = "Settings"
)]
pub async fn update_settings(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<UpdateSettings>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let current = load_settings(pool.get_ref(), auth.tenant_id).await?;
    let next = body.apply(&current)?;

    sqlx::query(
        r#"
        INSERT INTO settings
            (tenant_id, work_start_time, work_end_time, late_tolerance_minutes, annual_leave_days, sick_leave_days)
        VALUES (?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            work_start_time = VALUES(work_start_time),
            work_end_time = VALUES(work_end_time),
            late_tolerance_minutes = VALUES(late_tolerance_minutes),
            annual_leave_days = VALUES(annual_leave_days),
            sick_leave_days = VALUES(sick_leave_days)
        "#,
    )
    .bind(auth.tenant_id)
    .bind(next.work_start_time)
    .bind(next.work_end_time)
    .bind(next.late_tolerance_minutes)
    .bind(next.annual_leave_days)
    .bind(next.sick_leave_days)
    .execute(pool.get_ref())
    .await?;

    info!(tenant_id = auth.tenant_id, user_id = auth.user_id, "Settings updated");

    let saved = load_settings(pool.get_ref(), auth.tenant_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Settings updated",
        "data": saved
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::role::Role;
    use crate::test_support::{lazy_pool, session_for};
    use actix_web::{App, http::StatusCode, test as actix_test};

    fn update(json: serde_json::Value) -> UpdateSettings {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn applies_partial_changes() {
        let current = Settings::defaults(1);
        let next = update(serde_json::json!({ "workStartTime": "09:00", "lateToleranceMinutes": 10 }))
            .apply(&current)
            .unwrap();

        assert_eq!(next.work_start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(next.work_end_time, current.work_end_time);
        assert_eq!(next.late_tolerance_minutes, 10);
        assert_eq!(next.annual_leave_days, 21);
    }

    #[test]
    fn rejects_inverted_hours_and_out_of_range_values() {
        let current = Settings::defaults(1);
        assert!(update(serde_json::json!({ "workEndTime": "07:00" })).apply(&current).is_err());
        assert!(update(serde_json::json!({ "workStartTime": "9am" })).apply(&current).is_err());
        assert!(update(serde_json::json!({ "lateToleranceMinutes": -1 })).apply(&current).is_err());
        assert!(update(serde_json::json!({ "sickLeaveDays": 400 })).apply(&current).is_err());
    }

    #[actix_web::test]
    async fn only_admins_update_settings() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(Config::for_tests()))
                .route("/settings", web::get().to(get_settings))
                .route("/settings", web::put().to(update_settings)),
        )
        .await;

        let req = actix_test::TestRequest::put()
            .uri("/settings")
            .cookie(session_for(Role::Hr))
            .set_json(serde_json::json!({ "annualLeaveDays": 30 }))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = actix_test::TestRequest::get()
            .uri("/settings")
            .cookie(session_for(Role::Employee))
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }
}
