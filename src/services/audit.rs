use serde_json::Value;
use uuid::Uuid;

use crate::error::AppResult;

/// Append an audit entry. Callers performing multi-step privileged mutations
/// pass their open transaction so the entry commits or rolls back with the
/// rest of the work.
pub async fn record<'c, E>(
    executor: E,
    actor_id: Uuid,
    impersonating_id: Option<Uuid>,
    action: &str,
    target_type: &str,
    target_id: &str,
    metadata: Option<Value>,
) -> AppResult<()>
where
    E: sqlx::PgExecutor<'c>,
{
    sqlx::query(
        r#"INSERT INTO audit_log (account_id, impersonating_id, action, target_type, target_id, metadata, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())"#,
    )
    .bind(actor_id)
    .bind(impersonating_id)
    .bind(action)
    .bind(target_type)
    .bind(target_id)
    .bind(metadata)
    .execute(executor)
    .await?;
    Ok(())
}
