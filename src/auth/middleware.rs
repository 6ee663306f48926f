use crate::auth::auth::{AuthUser, SESSION_COOKIE, session_token};
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

/// Rejects requests without a valid session and stores the caller in request extensions.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or(ApiError::Internal)?
        .clone();

    let token = match session_token(req.cookie(SESSION_COOKIE), req.headers()) {
        Some(t) => t,
        None => {
            let resp = ApiError::unauthorized("Login required").error_response();
            return Ok(req.into_response(resp));
        }
    };

    let claims = match verify_token(&token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, path = %req.path(), "Rejected session token");
            let resp = ApiError::unauthorized("Invalid or expired session").error_response();
            return Ok(req.into_response(resp));
        }
    };

    req.extensions_mut().insert(AuthUser::from(claims));

    next.call(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_session_token;
    use crate::model::role::Role;
    use actix_web::{App, HttpResponse, http::StatusCode, middleware::from_fn, test as actix_test, web};

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(format!("{}:{}", user.tenant_id, user.email))
    }

    #[actix_web::test]
    async fn guards_scope_and_exposes_user() {
        let config = Config::for_tests();
        let app = actix_test::init_service(
            App::new().app_data(Data::new(config.clone())).service(
                web::scope("/api")
                    .wrap(from_fn(auth_middleware))
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/whoami").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = actix_test::TestRequest::get()
            .uri("/api/whoami")
            .cookie(actix_web::cookie::Cookie::new(SESSION_COOKIE, "garbage"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let (token, _) = generate_session_token(
            3,
            7,
            "hr@acme.com".into(),
            Role::Hr,
            &config.jwt_secret,
            60,
        )
        .unwrap();
        let req = actix_test::TestRequest::get()
            .uri("/api/whoami")
            .cookie(actix_web::cookie::Cookie::new(SESSION_COOKIE, token))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, "7:hr@acme.com");
    }
}
