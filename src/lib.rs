use axum::{
    http::HeaderValue,
    middleware as axum_mw,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use middleware::rate_limit::RateLimiter;
use services::identity::IdentityClient;
use services::mailer::MailerClient;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub identity: Option<IdentityClient>,
    pub mailer: Option<MailerClient>,
    pub rate_limiter: RateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    // "*" in CORS_ORIGINS opens the API up; anything else is an allow-list
    let origin = if state.config.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            state
                .config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    // --- Public routes (no auth required) ---
    let auth_routes = Router::new().route("/callback", get(routes::auth::callback));

    let discovery_routes = Router::new()
        .route("/classes", get(routes::discovery::list_classes))
        .route("/classes/:id", get(routes::discovery::get_class))
        .route("/sports", get(routes::discovery::list_sports));

    // --- Authenticated routes ---
    let account_routes = Router::new()
        .route(
            "/me",
            get(routes::account::get_me).put(routes::account::update_me),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let booking_routes = Router::new()
        .route(
            "/",
            post(routes::bookings::create_booking).get(routes::bookings::list_my_bookings),
        )
        .route("/:id/cancel", post(routes::bookings::cancel_booking))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let application_routes = Router::new()
        .route(
            "/",
            post(routes::applications::submit_application)
                .get(routes::applications::list_my_applications),
        )
        .route(
            "/pending",
            get(routes::applications::get_pending_application),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let organiser_routes = Router::new()
        .route("/clubs", get(routes::organiser::get_my_clubs))
        .route(
            "/clubs/:id",
            get(routes::organiser::get_org_with_locations),
        )
        .route(
            "/clubs/:id/locations",
            post(routes::organiser::add_location),
        )
        .route(
            "/classes",
            get(routes::organiser::list_my_classes).post(routes::organiser::create_class),
        )
        .route(
            "/classes/bookings",
            get(routes::organiser::get_classes_with_bookings),
        )
        .route(
            "/classes/:id",
            get(routes::organiser::get_class_for_edit).put(routes::organiser::update_class),
        )
        .route(
            "/classes/:id/cancel",
            post(routes::organiser::cancel_class),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let admin_routes = Router::new()
        .route("/accounts", get(routes::admin::list_accounts))
        .route(
            "/applications",
            get(routes::admin::list_applications),
        )
        .route(
            "/applications/:id/approve",
            post(routes::admin::approve_application),
        )
        .route(
            "/applications/:id/reject",
            post(routes::admin::reject_application),
        )
        .route("/classes/drafts", get(routes::admin::list_draft_classes))
        .route(
            "/classes/:id/publish",
            post(routes::admin::publish_class),
        )
        .route(
            "/accounts/platform-admin",
            put(routes::admin::set_platform_admin),
        )
        .route(
            "/accounts/password-reset",
            post(routes::admin::send_password_reset),
        )
        .route(
            "/impersonate",
            post(routes::admin::start_impersonation)
                .delete(routes::admin::stop_impersonation),
        )
        .route("/audit-log", get(routes::admin::list_audit_log))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::admin::require_platform_admin,
        ))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    // --- Compose full API ---
    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/discovery", discovery_routes)
        .nest("/account", account_routes)
        .nest("/bookings", booking_routes)
        .nest("/applications", application_routes)
        .nest("/organiser", organiser_routes)
        .nest("/admin", admin_routes);

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics))
        // Global middleware
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
