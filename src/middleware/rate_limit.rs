use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::AppState;

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, WindowEntry>>>,
    max_requests: u32,
    window_secs: u64,
}

struct WindowEntry {
    count: u32,
    reset_at: u64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window_secs,
        }
    }

    pub async fn check(&self, key: &str) -> bool {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let mut windows = self.windows.lock().await;

        // drop expired windows so the map does not grow without bound
        windows.retain(|_, entry| now < entry.reset_at);

        let entry = windows.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            reset_at: now + self.window_secs,
        });

        entry.count += 1;
        entry.count <= self.max_requests
    }

    #[cfg(test)]
    async fn tracked_windows(&self) -> usize {
        self.windows.lock().await.len()
    }
}

// This layer sits outside authentication, so the key is always the client
// address (the socket peer, or x-forwarded-for behind a proxy).
fn get_client_key(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return format!("ip:{}", addr.ip());
    }
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| format!("ip:{}", v.split(',').next().unwrap_or("unknown").trim()))
        .unwrap_or_else(|| "ip:unknown".to_string())
}

/// Middleware: global fixed-window rate limiter.
pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = format!("global:{}", get_client_key(&req));
    if !state.rate_limiter.check(&key).await {
        return Err(AppError::RateLimited);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_max_then_blocks() {
        let limiter = RateLimiter::new(3, 60);
        assert!(limiter.check("k").await);
        assert!(limiter.check("k").await);
        assert!(limiter.check("k").await);
        assert!(!limiter.check("k").await);
        // other keys are unaffected
        assert!(limiter.check("other").await);
    }

    #[tokio::test]
    async fn expired_windows_are_evicted() {
        let limiter = RateLimiter::new(1, 0);
        // zero-length windows expire immediately, so each check starts fresh
        assert!(limiter.check("a").await);
        assert!(limiter.check("b").await);
        assert!(limiter.check("c").await);
        assert!(limiter.tracked_windows().await <= 1);
    }
}
