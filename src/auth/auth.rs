use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::{error::ApiError, model::role::Role, models::Claims};
use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

pub const SESSION_COOKIE: &str = "auth-token";

/// Authenticated caller, resolved from the session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub tenant_id: u64,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            user_id: claims.user_id,
            tenant_id: claims.tenant_id,
            email: claims.sub,
            role: claims.role,
        }
    }
}

/// Session token from the `auth-token` cookie, falling back to a Bearer header.
pub fn session_token(cookie: Option<Cookie<'static>>, headers: &HeaderMap) -> Option<String> {
    if let Some(c) = cookie.filter(|c| !c.value().is_empty()) {
        return Some(c.value().to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

pub fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(config.session_ttl as i64))
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    // Already resolved by auth_middleware.
    if let Some(user) = req.extensions().get::<AuthUser>() {
        return Ok(user.clone());
    }

    let token = session_token(req.cookie(SESSION_COOKIE), req.headers())
        .ok_or_else(|| ApiError::unauthorized("Login required"))?;

    let config = req
        .app_data::<Data<Config>>()
        .ok_or(ApiError::Internal)?;

    verify_token(&token, &config.jwt_secret)
        .map(AuthUser::from)
        .map_err(|_| ApiError::unauthorized("Invalid or expired session"))
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), ApiError> {
        if matches!(self.role, Role::Admin | Role::Hr) {
            Ok(())
        } else {
            Err(ApiError::forbidden("HR/Admin only"))
        }
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    #[test]
    fn cookie_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        let cookie = Cookie::new(SESSION_COOKIE, "from-cookie");

        assert_eq!(
            session_token(Some(cookie), &headers).as_deref(),
            Some("from-cookie")
        );
        assert_eq!(session_token(None, &headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn missing_or_malformed_credentials() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(None, &headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(session_token(None, &headers), None);

        let empty = Cookie::new(SESSION_COOKIE, "");
        assert_eq!(session_token(Some(empty), &headers), None);
    }

    #[test]
    fn session_cookie_flags() {
        let mut config = Config::for_tests();
        config.cookie_secure = true;
        let c = session_cookie("tok".into(), &config);

        assert_eq!(c.name(), SESSION_COOKIE);
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.secure(), Some(true));
        assert_eq!(c.same_site(), Some(SameSite::Lax));
        assert_eq!(c.max_age(), Some(Duration::seconds(3600)));
    }

    #[test]
    fn role_guards() {
        let mut user = AuthUser {
            user_id: 1,
            tenant_id: 1,
            email: "x@y.z".into(),
            role: Role::Hr,
        };
        assert!(user.require_hr_or_admin().is_ok());
        assert!(user.require_admin().is_err());

        user.role = Role::Employee;
        assert!(user.is_employee());
        assert!(user.require_hr_or_admin().is_err());
    }
}
