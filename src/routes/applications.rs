use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::models::application::{OrganiserApplication, SubmitApplicationRequest};
use crate::AppState;

fn application_body(app: &OrganiserApplication) -> Value {
    json!({
        "id": app.id,
        "organisationName": app.organisation_name,
        "description": app.description,
        "contactEmail": app.contact_email,
        "website": app.website,
        "city": app.city,
        "status": app.status,
        "reviewedAt": app.reviewed_at,
        "rejectionReason": app.rejection_reason,
        "createdAt": app.created_at,
    })
}

/// Apply to become an organiser. An account can hold at most one
/// SUBMITTED/IN_REVIEW application at a time.
pub async fn submit_application(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Json(body): Json<SubmitApplicationRequest>,
) -> AppResult<Json<Value>> {
    let organisation_name = body.organisation_name.trim();
    let description = body.description.trim();
    let contact_email = body.contact_email.trim().to_lowercase();
    let website = body.website.as_deref().map(str::trim).filter(|w| !w.is_empty());
    let city = body.city.as_deref().map(str::trim).filter(|c| !c.is_empty());

    if organisation_name.is_empty() || organisation_name.len() > 200 {
        return Err(AppError::BadRequest(
            "Organisation name must be 1-200 characters".into(),
        ));
    }
    if description.is_empty() || description.len() > 2000 {
        return Err(AppError::BadRequest(
            "Description must be 1-2000 characters".into(),
        ));
    }
    if !is_valid_email(&contact_email) {
        return Err(AppError::BadRequest("Invalid contact email".into()));
    }
    if let Some(w) = website {
        if !is_valid_url(w) {
            return Err(AppError::BadRequest("Invalid website URL".into()));
        }
    }
    if let Some(c) = city {
        if c.len() > 100 {
            return Err(AppError::BadRequest(
                "City must be at most 100 characters".into(),
            ));
        }
    }

    let pending: bool = sqlx::query_scalar(
        r#"SELECT EXISTS(SELECT 1 FROM organiser_applications
        WHERE account_id = $1 AND status IN ('SUBMITTED', 'IN_REVIEW'))"#,
    )
    .bind(ctx.account_id)
    .fetch_one(&state.db)
    .await?;

    if pending {
        return Err(AppError::Conflict(
            "You already have a pending request. View status in My requests.".into(),
        ));
    }

    // The partial unique index backs this up if two submissions race.
    let application: OrganiserApplication = sqlx::query_as(
        r#"INSERT INTO organiser_applications
            (account_id, organisation_name, description, contact_email, website, city, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'SUBMITTED')
        RETURNING *"#,
    )
    .bind(ctx.account_id)
    .bind(organisation_name)
    .bind(description)
    .bind(&contact_email)
    .bind(website)
    .bind(city)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("You already have a pending request. View status in My requests.".into())
        } else {
            e.into()
        }
    })?;

    Ok(Json(application_body(&application)))
}

pub async fn list_my_applications(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
) -> AppResult<Json<Value>> {
    let rows: Vec<OrganiserApplication> = sqlx::query_as(
        "SELECT * FROM organiser_applications WHERE account_id = $1 ORDER BY created_at DESC",
    )
    .bind(ctx.account_id)
    .fetch_all(&state.db)
    .await?;

    let applications: Vec<Value> = rows.iter().map(application_body).collect();
    Ok(Json(json!({ "applications": applications })))
}

/// The caller's current non-terminal application, if any.
pub async fn get_pending_application(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
) -> AppResult<Json<Value>> {
    let row: Option<OrganiserApplication> = sqlx::query_as(
        r#"SELECT * FROM organiser_applications
        WHERE account_id = $1 AND status IN ('SUBMITTED', 'IN_REVIEW')
        ORDER BY created_at DESC"#,
    )
    .bind(ctx.account_id)
    .fetch_optional(&state.db)
    .await?;

    Ok(Json(json!({ "application": row.as_ref().map(application_body) })))
}

fn is_valid_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.contains(char::is_whitespace)
        && !domain.contains('@')
}

fn is_valid_url(s: &str) -> bool {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"));
    match rest {
        Some(host) => !host.is_empty() && !s.contains(char::is_whitespace),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("club@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.co"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("x@nodot"));
        assert!(!is_valid_email("x@.com"));
        assert!(!is_valid_email("x y@example.com"));
    }

    #[test]
    fn url_validation() {
        assert!(is_valid_url("https://club.example"));
        assert!(is_valid_url("http://club.example/about"));
        assert!(!is_valid_url("club.example"));
        assert!(!is_valid_url("ftp://club.example"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("https://club example"));
    }
}
