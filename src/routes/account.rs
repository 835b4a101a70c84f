use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::models::account::{Account, UpdateAccountRequest};
use crate::services::roles;
use crate::AppState;

fn account_body(account: &Account, types: &roles::AccountTypes) -> Value {
    json!({
        "id": account.id,
        "email": account.email,
        "name": account.name,
        "surname": account.surname,
        "phone": account.phone,
        "gender": account.gender,
        "avatarUrl": account.avatar_url,
        "isPlatformAdmin": account.is_platform_admin,
        "isClubOwner": types.is_club_owner,
        "role": types.label,
        "createdAt": account.created_at,
    })
}

/// Profile of the REAL caller. Impersonation deliberately does not swap the
/// profile view, so an admin can always see who they are.
pub async fn get_me(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
) -> AppResult<Json<Value>> {
    let account: Option<Account> = sqlx::query_as("SELECT * FROM accounts WHERE id = $1")
        .bind(ctx.real_account_id)
        .fetch_optional(&state.db)
        .await?;
    let account = account.ok_or_else(|| AppError::NotFound("Account not found".into()))?;

    let types = roles::account_types(&state.db, account.id).await?;
    Ok(Json(account_body(&account, &types)))
}

pub async fn update_me(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Json(body): Json<UpdateAccountRequest>,
) -> AppResult<Json<Value>> {
    for (field, value, max) in [
        ("name", &body.name, 200usize),
        ("surname", &body.surname, 200),
        ("phone", &body.phone, 50),
        ("gender", &body.gender, 50),
    ] {
        if let Some(v) = value {
            if v.len() > max {
                return Err(AppError::BadRequest(format!(
                    "{} must be at most {} characters",
                    field, max
                )));
            }
        }
    }

    // Omitted fields stay unchanged; provided-but-empty fields are cleared.
    let account: Account = sqlx::query_as(
        r#"UPDATE accounts SET
            name    = CASE WHEN $2::text IS NULL THEN name    ELSE NULLIF($2, '') END,
            surname = CASE WHEN $3::text IS NULL THEN surname ELSE NULLIF($3, '') END,
            phone   = CASE WHEN $4::text IS NULL THEN phone   ELSE NULLIF($4, '') END,
            gender  = CASE WHEN $5::text IS NULL THEN gender  ELSE NULLIF($5, '') END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(ctx.real_account_id)
    .bind(body.name.as_deref().map(str::trim))
    .bind(body.surname.as_deref().map(str::trim))
    .bind(body.phone.as_deref().map(str::trim))
    .bind(body.gender.as_deref().map(str::trim))
    .fetch_one(&state.db)
    .await?;

    let types = roles::account_types(&state.db, account.id).await?;
    Ok(Json(account_body(&account, &types)))
}
