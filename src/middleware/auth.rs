use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Account;
use crate::AppState;

/// Access-token claims as issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<UserMetadata>,
    #[serde(rename = "type")]
    pub token_type: Option<String>, // "access" or "refresh"
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Request identity: the effective account (impersonation target when an
/// admin is impersonating, the caller otherwise) plus the real caller.
/// `is_platform_admin` always refers to the real account, so authorization
/// and audit attribution stay with the admin.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub real_account_id: Uuid,
    pub is_platform_admin: bool,
    pub is_impersonating: bool,
}

impl AuthContext {
    /// The effective account to note in audit metadata, when impersonating.
    pub fn effective(&self) -> Option<Uuid> {
        self.is_impersonating.then_some(self.account_id)
    }
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    let mut validation = Validation::default();
    validation.validate_aud = false;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

fn extract_bearer(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from)
}

fn cookie_value(req: &Request, name: &str) -> Option<String> {
    let raw = req.headers().get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|part| {
        let (k, v) = part.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

/// Identity bridge: map the provider identity to the local account, creating
/// one on first sight. The upsert makes concurrent first requests converge on
/// the primary key instead of racing a separate insert.
pub async fn get_or_create_account(db: &PgPool, claims: &Claims) -> AppResult<Account> {
    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token subject".into()))?;

    if let Some(existing) = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
    {
        return Ok(existing);
    }

    let meta = claims.user_metadata.clone().unwrap_or_default();
    let name = meta.name.or(meta.full_name);
    let email = claims.email.clone().unwrap_or_default();

    let account: Account = sqlx::query_as(
        r#"INSERT INTO accounts (id, email, name, avatar_url, is_platform_admin)
        VALUES ($1, $2, $3, $4, false)
        ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email
        RETURNING *"#,
    )
    .bind(id)
    .bind(&email)
    .bind(&name)
    .bind(&meta.avatar_url)
    .fetch_one(db)
    .await?;

    Ok(account)
}

/// Middleware: requires a valid provider access token. Bridges it to the
/// local account, applies the impersonation overlay and sets `AuthContext`.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token =
        extract_bearer(&req).ok_or_else(|| AppError::Unauthorized("No token provided".into()))?;

    let claims = verify_token(&token, &state.config.auth.jwt_secret)?;

    if claims.token_type.as_deref() == Some("refresh") {
        return Err(AppError::Unauthorized("Access token required".into()));
    }

    let account = get_or_create_account(&state.db, &claims).await?;

    let mut ctx = AuthContext {
        account_id: account.id,
        real_account_id: account.id,
        is_platform_admin: account.is_platform_admin,
        is_impersonating: false,
    };

    // Only honour the impersonation cookie when it names an existing other
    // account, so a stale cookie cannot break the session.
    if account.is_platform_admin {
        if let Some(target) = cookie_value(&req, &state.config.auth.impersonation_cookie)
            .and_then(|v| Uuid::parse_str(&v).ok())
            .filter(|t| *t != account.id)
        {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)")
                .bind(target)
                .fetch_one(&state.db)
                .await?;
            if exists {
                ctx.account_id = target;
                ctx.is_impersonating = true;
            }
        }
    }

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn make_token(token_type: Option<&str>, secret: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: Some("x@example.com".into()),
            user_metadata: None,
            token_type: token_type.map(String::from),
            exp: now + 3600,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verify_round_trips() {
        let token = make_token(Some("access"), "secret");
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.token_type.as_deref(), Some("access"));
        assert_eq!(claims.email.as_deref(), Some("x@example.com"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = make_token(Some("access"), "secret");
        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: None,
            user_metadata: None,
            token_type: None,
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }
}
