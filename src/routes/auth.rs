use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;

use crate::services::safe_redirect::sanitize_next_path;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub next: Option<String>,
}

/// Identity-provider callback: exchange the code for a session (best effort,
/// nothing local is mutated) and redirect to a sanitized internal path.
pub async fn callback(State(state): State<AppState>, Query(q): Query<CallbackQuery>) -> Redirect {
    if let (Some(code), Some(identity)) = (q.code.as_deref(), state.identity.as_ref()) {
        if let Err(e) = identity.exchange_code(code).await {
            tracing::warn!("auth callback code exchange failed: {e}");
            return Redirect::to("/login?error=auth_callback_failed");
        }
    }

    let next = sanitize_next_path(q.next.as_deref());
    Redirect::to(&next)
}
