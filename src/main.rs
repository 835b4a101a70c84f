use std::net::SocketAddr;
use std::sync::Arc;

use sporthub_api::config::Config;
use sporthub_api::middleware::rate_limit::RateLimiter;
use sporthub_api::services::identity::IdentityClient;
use sporthub_api::services::mailer::MailerClient;
use sporthub_api::{build_router, db, AppState};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .json()
        .init();

    let pool = db::create_pool(&config).await;
    let identity = IdentityClient::new(&config.auth);
    let mailer = MailerClient::new(&config.mail);
    let rate_limiter =
        RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window_secs);

    let port = config.port;
    tracing::info!(port, "SportHub API initialized");

    let state = AppState {
        db: pool,
        config: Arc::new(config),
        identity,
        mailer,
        rate_limiter,
    };

    let router = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
