use actix_web::HttpResponse;
use actix_web::body::to_bytes;
use actix_web::cookie::Cookie;
use serde_json::Value;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

use crate::auth::auth::{AuthUser, SESSION_COOKIE};
use crate::auth::jwt::generate_session_token;
use crate::config::Config;
use crate::model::role::Role;

/// Pool that never connects; for requests rejected before any query runs.
pub fn lazy_pool() -> MySqlPool {
    MySqlPoolOptions::new()
        .connect_lazy("mysql://root@localhost:3306/hrm_test")
        .expect("valid test url")
}

pub fn session_for(role: Role) -> Cookie<'static> {
    let config = Config::for_tests();
    let (token, _) = generate_session_token(
        1,
        1,
        "tester@acme.com".into(),
        role,
        &config.jwt_secret,
        config.session_ttl,
    )
    .expect("token");
    Cookie::new(SESSION_COOKIE, token)
}

/// JSON body of a handler response.
pub async fn response_json(resp: HttpResponse) -> Value {
    let bytes = to_bytes(resp.into_body()).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

async fn insert_user(pool: &MySqlPool, tenant_id: u64, email: &str, role: Role) -> u64 {
    sqlx::query("INSERT INTO users (tenant_id, email, password, role) VALUES (?, ?, 'unused', ?)")
        .bind(tenant_id)
        .bind(email)
        .bind(role.as_ref())
        .execute(pool)
        .await
        .expect("insert user")
        .last_insert_id()
}

/// Tenant `domain` with its admin; returns the admin's session.
pub async fn seed_tenant(pool: &MySqlPool, domain: &str) -> AuthUser {
    let tenant_id = sqlx::query("INSERT INTO tenants (name, domain) VALUES (?, ?)")
        .bind(format!("{domain} Ltd"))
        .bind(domain)
        .execute(pool)
        .await
        .expect("insert tenant")
        .last_insert_id();

    let email = format!("admin@{domain}.test");
    let user_id = insert_user(pool, tenant_id, &email, Role::Admin).await;
    AuthUser { user_id, tenant_id, email, role: Role::Admin }
}

/// Employee with a login and a balance of 5 annual and 10 sick days.
pub async fn seed_employee(pool: &MySqlPool, tenant_id: u64, email: &str, number: &str) -> (u64, AuthUser) {
    let user_id = insert_user(pool, tenant_id, email, Role::Employee).await;

    let employee_id = sqlx::query(
        r#"
        INSERT INTO employees
            (tenant_id, user_id, employee_number, first_name, email, department, position, hire_date)
        VALUES (?, ?, ?, 'Test', ?, 'General', 'Employee', '2025-01-01')
        "#,
    )
    .bind(tenant_id)
    .bind(user_id)
    .bind(number)
    .bind(email)
    .execute(pool)
    .await
    .expect("insert employee")
    .last_insert_id();

    sqlx::query(
        "INSERT INTO leave_balances (tenant_id, employee_id, year, annual_total, sick_total) VALUES (?, ?, 2026, 5, 10)",
    )
    .bind(tenant_id)
    .bind(employee_id)
    .execute(pool)
    .await
    .expect("insert balance");

    let auth = AuthUser { user_id, tenant_id, email: email.to_string(), role: Role::Employee };
    (employee_id, auth)
}
