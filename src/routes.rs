use crate::{
    api::{attendance, dashboard, employee, leave_request, settings},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::{json_error, path_error, query_error},
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::Context;
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-IP limiters, built once so every worker shares the same buckets.
#[derive(Clone)]
pub struct Limiters {
    login: Limiter,
    register: Limiter,
    protected: Limiter,
}

fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);

    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .with_context(|| format!("invalid rate limit: {requests_per_min}/min"))?;

    Ok(Arc::new(Governor::new(&cfg)))
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            register: build_limiter(config.rate_register_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    let prefix = config.api_prefix.trim_end_matches('/');

    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error));

    // Public auth routes; `me` and `change-password` need a session.
    cfg.service(
        web::scope(&format!("{prefix}/auth"))
            .service(
                web::resource("/register-tenant")
                    .wrap(limiters.register.clone())
                    .route(web::post().to(handlers::register_tenant)),
            )
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            )
            .service(
                web::resource("/me")
                    .wrap(from_fn(auth_middleware))
                    .wrap(limiters.protected.clone())
                    .route(web::get().to(handlers::me)),
            )
            .service(
                web::resource("/change-password")
                    .wrap(from_fn(auth_middleware))
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::change_password)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // before /{id} so "me" is not taken for an id
                    .service(
                        web::resource("/me")
                            .route(web::get().to(employee::get_my_profile))
                            .route(web::put().to(employee::update_my_profile)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(web::resource("").route(web::get().to(attendance::list_attendance)))
                    .service(
                        web::resource("/me")
                            .route(web::get().to(attendance::my_attendance))
                            .route(web::post().to(attendance::record_attendance)),
                    ),
            )
            .service(
                web::scope("/leaves")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::list_leaves))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    .service(
                        web::resource("/me")
                            .route(web::get().to(leave_request::my_leaves))
                            .route(web::post().to(leave_request::submit_my_leave)),
                    )
                    .service(
                        web::resource("/{id}").route(web::patch().to(leave_request::review_leave)),
                    ),
            )
            .service(
                web::resource("/settings")
                    .route(web::get().to(settings::get_settings))
                    .route(web::put().to(settings::update_settings)),
            )
            .service(web::resource("/dashboard").route(web::get().to(dashboard::dashboard))),
    );
}
