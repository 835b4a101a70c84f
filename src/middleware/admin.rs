use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::AppState;

/// Middleware: requires the REAL caller to be a platform admin. Re-reads the
/// flag so a revoked admin is locked out on their next request, even while
/// impersonating.
pub async fn require_platform_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    let is_admin: bool =
        sqlx::query_scalar("SELECT is_platform_admin FROM accounts WHERE id = $1")
            .bind(ctx.real_account_id)
            .fetch_optional(&state.db)
            .await?
            .unwrap_or(false);

    if !is_admin {
        return Err(AppError::Forbidden("Platform admin only".into()));
    }

    Ok(next.run(req).await)
}
