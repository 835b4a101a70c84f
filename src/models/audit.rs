use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Append-only record of a privileged action. `account_id` is always the
/// real actor; `impersonating_id` is set when the action happened under
/// impersonation.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub impersonating_id: Option<Uuid>,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
