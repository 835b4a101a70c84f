use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::models::application::{ApplicationStatus, OrganiserApplication, RejectApplicationRequest};
use crate::models::audit::AuditLogEntry;
use crate::services::audit;
use crate::AppState;

fn parse_uuid(raw: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid {} ID", what)))
}

pub async fn list_accounts(
    State(state): State<AppState>,
) -> AppResult<Json<Value>> {
    let rows: Vec<(Uuid, String, Option<String>, Option<String>, bool, chrono::DateTime<chrono::Utc>, i64, i64)> = sqlx::query_as(
        r#"SELECT a.id, a.email, a.name, a.surname, a.is_platform_admin, a.created_at,
            (SELECT COUNT(*)::bigint FROM organisation_members om WHERE om.account_id = a.id),
            (SELECT COUNT(*)::bigint FROM bookings b WHERE b.account_id = a.id AND b.status = 'CONFIRMED')
        FROM accounts a
        ORDER BY a.created_at DESC"#,
    )
    .fetch_all(&state.db)
    .await?;

    let accounts: Vec<Value> = rows
        .iter()
        .map(|(id, email, name, surname, is_admin, created, memberships, bookings)| {
            json!({
                "id": id, "email": email, "name": name, "surname": surname,
                "isPlatformAdmin": is_admin, "createdAt": created,
                "membershipCount": memberships, "confirmedBookingCount": bookings,
            })
        })
        .collect();

    Ok(Json(json!({ "accounts": accounts })))
}

#[derive(Debug, Deserialize)]
pub struct ApplicationsQuery {
    pub status: Option<ApplicationStatus>,
}

fn application_body(app: &OrganiserApplication, email: &str, name: &Option<String>) -> Value {
    json!({
        "id": app.id,
        "accountId": app.account_id,
        "applicant": { "email": email, "name": name },
        "organisationName": app.organisation_name,
        "description": app.description,
        "contactEmail": app.contact_email,
        "website": app.website,
        "city": app.city,
        "status": app.status,
        "reviewedBy": app.reviewed_by,
        "reviewedAt": app.reviewed_at,
        "rejectionReason": app.rejection_reason,
        "createdAt": app.created_at,
    })
}

pub async fn list_applications(
    State(state): State<AppState>,
    Query(q): Query<ApplicationsQuery>,
) -> AppResult<Json<Value>> {
    let rows: Vec<OrganiserApplication> = sqlx::query_as(
        r#"SELECT * FROM organiser_applications
        WHERE ($1::text IS NULL OR status = $1)
        ORDER BY created_at DESC"#,
    )
    .bind(q.status.map(|s| s.as_str()))
    .fetch_all(&state.db)
    .await?;

    // one query for the applicant display data instead of a join row type
    let account_ids: Vec<Uuid> = rows.iter().map(|a| a.account_id).collect();
    let applicants: Vec<(Uuid, String, Option<String>)> =
        sqlx::query_as("SELECT id, email, name FROM accounts WHERE id = ANY($1)")
            .bind(&account_ids)
            .fetch_all(&state.db)
            .await?;

    let applications: Vec<Value> = rows
        .iter()
        .map(|app| {
            let (email, name) = applicants
                .iter()
                .find(|(id, _, _)| *id == app.account_id)
                .map(|(_, email, name)| (email.as_str(), name))
                .unwrap_or(("", &None));
            application_body(app, email, name)
        })
        .collect();

    Ok(Json(json!({ "applications": applications })))
}

/// Approve an application: create the organisation, add the applicant as
/// OWNER, mark the application APPROVED. One transaction, so a crash cannot
/// leave an approved application without its organisation.
pub async fn approve_application(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let application_id = parse_uuid(&id, "application")?;

    let mut tx = state.db.begin().await?;

    let app: Option<OrganiserApplication> = sqlx::query_as(
        "SELECT * FROM organiser_applications WHERE id = $1 FOR UPDATE",
    )
    .bind(application_id)
    .fetch_optional(&mut *tx)
    .await?;
    let app = app.ok_or_else(|| AppError::NotFound("Application not found".into()))?;

    if !ApplicationStatus::is_pending(&app.status) {
        return Err(AppError::BadRequest(
            "Application has already been reviewed".into(),
        ));
    }

    let organisation_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO organisations (name, description)
        VALUES ($1, $2) RETURNING id"#,
    )
    .bind(&app.organisation_name)
    .bind(&app.description)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"INSERT INTO organisation_members (account_id, organisation_id, role)
        VALUES ($1, $2, 'OWNER')"#,
    )
    .bind(app.account_id)
    .bind(organisation_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"UPDATE organiser_applications
        SET status = 'APPROVED', reviewed_by = $2, reviewed_at = NOW(), updated_at = NOW()
        WHERE id = $1"#,
    )
    .bind(application_id)
    .bind(ctx.real_account_id)
    .execute(&mut *tx)
    .await?;

    audit::record(
        &mut *tx,
        ctx.real_account_id,
        ctx.effective(),
        "application.approve",
        "organiser_application",
        &application_id.to_string(),
        Some(json!({ "organisationId": organisation_id, "applicantId": app.account_id })),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        application_id = %application_id,
        organisation_id = %organisation_id,
        "organiser application approved"
    );

    Ok(Json(json!({
        "id": application_id,
        "status": "APPROVED",
        "organisationId": organisation_id,
    })))
}

pub async fn reject_application(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<RejectApplicationRequest>,
) -> AppResult<Json<Value>> {
    let application_id = parse_uuid(&id, "application")?;

    let reason = body
        .rejection_reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if let Some(r) = reason {
        if r.len() > 500 {
            return Err(AppError::BadRequest(
                "Rejection reason must be at most 500 characters".into(),
            ));
        }
    }

    let mut tx = state.db.begin().await?;

    let app: Option<OrganiserApplication> = sqlx::query_as(
        "SELECT * FROM organiser_applications WHERE id = $1 FOR UPDATE",
    )
    .bind(application_id)
    .fetch_optional(&mut *tx)
    .await?;
    let app = app.ok_or_else(|| AppError::NotFound("Application not found".into()))?;

    if !ApplicationStatus::is_pending(&app.status) {
        return Err(AppError::BadRequest(
            "Application has already been reviewed".into(),
        ));
    }

    sqlx::query(
        r#"UPDATE organiser_applications
        SET status = 'REJECTED', reviewed_by = $2, reviewed_at = NOW(),
            rejection_reason = $3, updated_at = NOW()
        WHERE id = $1"#,
    )
    .bind(application_id)
    .bind(ctx.real_account_id)
    .bind(reason)
    .execute(&mut *tx)
    .await?;

    audit::record(
        &mut *tx,
        ctx.real_account_id,
        ctx.effective(),
        "application.reject",
        "organiser_application",
        &application_id.to_string(),
        reason.map(|r| json!({ "reason": r })),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(json!({ "id": application_id, "status": "REJECTED" })))
}

pub async fn list_draft_classes(
    State(state): State<AppState>,
) -> AppResult<Json<Value>> {
    let rows: Vec<(Uuid, String, String, chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>, i32, String, String, String, String)> = sqlx::query_as(
        r#"SELECT c.id, c.title, c.sport_type, c.start_time, c.end_time, c.capacity,
            l.name, l.city, o.name, a.email
        FROM classes c
        JOIN locations l ON l.id = c.location_id
        JOIN organisation_members om ON om.id = c.organiser_id
        JOIN organisations o ON o.id = om.organisation_id
        JOIN accounts a ON a.id = om.account_id
        WHERE c.status = 'DRAFT'
        ORDER BY c.created_at"#,
    )
    .fetch_all(&state.db)
    .await?;

    let classes: Vec<Value> = rows
        .iter()
        .map(|(id, title, sport, start, end, capacity, lname, lcity, org, organiser)| {
            json!({
                "id": id, "title": title, "sportType": sport,
                "startTime": start, "endTime": end, "capacity": capacity,
                "location": { "name": lname, "city": lcity },
                "organisationName": org,
                "organiserEmail": organiser,
            })
        })
        .collect();

    Ok(Json(json!({ "classes": classes })))
}

/// Publish a draft class, making it visible in discovery and bookable.
pub async fn publish_class(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let class_id = parse_uuid(&id, "class")?;

    let mut tx = state.db.begin().await?;

    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM classes WHERE id = $1 FOR UPDATE")
            .bind(class_id)
            .fetch_optional(&mut *tx)
            .await?;
    let status = status.ok_or_else(|| AppError::NotFound("Class not found".into()))?;

    if status != "DRAFT" {
        return Err(AppError::BadRequest(
            "Only draft classes can be published".into(),
        ));
    }

    sqlx::query("UPDATE classes SET status = 'PUBLISHED', updated_at = NOW() WHERE id = $1")
        .bind(class_id)
        .execute(&mut *tx)
        .await?;

    audit::record(
        &mut *tx,
        ctx.real_account_id,
        ctx.effective(),
        "class.publish",
        "class",
        &class_id.to_string(),
        None,
    )
    .await?;

    tx.commit().await?;

    Ok(Json(json!({ "id": class_id, "status": "PUBLISHED" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPlatformAdminRequest {
    pub account_id: String,
    pub is_platform_admin: bool,
}

/// Grant or revoke the platform-admin flag. Self-demotion is refused without
/// erroring so the console can surface it inline.
pub async fn set_platform_admin(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Json(body): Json<SetPlatformAdminRequest>,
) -> AppResult<Json<Value>> {
    let target_id = parse_uuid(&body.account_id, "account")?;

    if target_id == ctx.real_account_id && !body.is_platform_admin {
        return Ok(Json(json!({
            "ok": false,
            "error": "You cannot remove your own admin access",
        })));
    }

    let mut tx = state.db.begin().await?;

    let updated: Option<Uuid> = sqlx::query_scalar(
        "UPDATE accounts SET is_platform_admin = $2, updated_at = NOW() WHERE id = $1 RETURNING id",
    )
    .bind(target_id)
    .bind(body.is_platform_admin)
    .fetch_optional(&mut *tx)
    .await?;

    if updated.is_none() {
        return Ok(Json(json!({ "ok": false, "error": "User not found" })));
    }

    audit::record(
        &mut *tx,
        ctx.real_account_id,
        ctx.effective(),
        "account.set_platform_admin",
        "account",
        &target_id.to_string(),
        Some(json!({ "isPlatformAdmin": body.is_platform_admin })),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub account_id: String,
}

/// Generate a recovery link for an account and email it. Degrades to
/// returning the link for manual delivery when the mailer is unconfigured or
/// fails; generating the link is the part that must succeed.
pub async fn send_password_reset(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Json(body): Json<PasswordResetRequest>,
) -> AppResult<Json<Value>> {
    let target_id = parse_uuid(&body.account_id, "account")?;

    let email: Option<String> = sqlx::query_scalar("SELECT email FROM accounts WHERE id = $1")
        .bind(target_id)
        .fetch_optional(&state.db)
        .await?;
    let email = email.ok_or_else(|| AppError::NotFound("Account not found".into()))?;

    let identity = state
        .identity
        .as_ref()
        .ok_or_else(|| AppError::Internal("Identity provider is not configured".into()))?;

    let redirect_to = format!("{}/account/reset-password", state.config.mail.app_origin);
    let link = identity.generate_recovery_link(&email, &redirect_to).await?;

    audit::record(
        &state.db,
        ctx.real_account_id,
        ctx.effective(),
        "account.password_reset",
        "account",
        &target_id.to_string(),
        None,
    )
    .await?;

    let mailed = match &state.mailer {
        Some(mailer) => {
            let html = format!(
                "<p>A password reset was requested for your account.</p>\
                 <p><a href=\"{}\">Reset your password</a></p>\
                 <p>If you did not expect this, you can ignore this email.</p>",
                link
            );
            match mailer.send(&email, "Reset your password", &html).await {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(account_id = %target_id, error = %err, "password reset mail failed");
                    false
                }
            }
        }
        None => false,
    };

    if mailed {
        Ok(Json(json!({ "ok": true, "sent": true })))
    } else {
        Ok(Json(json!({ "ok": true, "sent": false, "recoveryLink": link })))
    }
}

fn impersonation_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    let mut raw = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        name, value, max_age_secs
    );
    if secure {
        raw.push_str("; Secure");
    }
    // the string is well-formed by construction
    Cookie::parse(raw).unwrap_or_else(|_| Cookie::new(name.to_string(), value.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonateRequest {
    pub account_id: String,
}

/// Start impersonating another account. The cookie carries the target id;
/// the auth middleware only honours it for platform admins.
pub async fn start_impersonation(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    jar: CookieJar,
    Json(body): Json<ImpersonateRequest>,
) -> AppResult<(CookieJar, Json<Value>)> {
    let target_id = parse_uuid(&body.account_id, "account")?;

    if target_id == ctx.real_account_id {
        return Err(AppError::BadRequest("You cannot impersonate yourself".into()));
    }

    let email: Option<String> = sqlx::query_scalar("SELECT email FROM accounts WHERE id = $1")
        .bind(target_id)
        .fetch_optional(&state.db)
        .await?;
    let email = email.ok_or_else(|| AppError::NotFound("Account not found".into()))?;

    audit::record(
        &state.db,
        ctx.real_account_id,
        None,
        "impersonation.start",
        "account",
        &target_id.to_string(),
        Some(json!({ "targetEmail": email })),
    )
    .await?;

    tracing::info!(admin = %ctx.real_account_id, target = %target_id, "impersonation started");

    let cookie = impersonation_cookie(
        &state.config.auth.impersonation_cookie,
        &target_id.to_string(),
        state.config.auth.impersonation_ttl_secs,
        state.config.is_production(),
    );

    Ok((jar.add(cookie), Json(json!({ "ok": true, "impersonating": target_id }))))
}

pub async fn stop_impersonation(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Value>)> {
    if let Some(target) = ctx.effective() {
        audit::record(
            &state.db,
            ctx.real_account_id,
            None,
            "impersonation.stop",
            "account",
            &target.to_string(),
            None,
        )
        .await?;
    }

    // Max-Age=0 clears the cookie
    let cookie = impersonation_cookie(
        &state.config.auth.impersonation_cookie,
        "",
        0,
        state.config.is_production(),
    );

    Ok((jar.add(cookie), Json(json!({ "ok": true }))))
}

#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    pub limit: Option<i64>,
    pub action: Option<String>,
}

/// Recent audit entries, newest first.
pub async fn list_audit_log(
    State(state): State<AppState>,
    Query(q): Query<AuditLogQuery>,
) -> AppResult<Json<Value>> {
    let limit = q.limit.unwrap_or(100).clamp(1, 500);

    let rows: Vec<AuditLogEntry> = sqlx::query_as(
        r#"SELECT * FROM audit_log
        WHERE ($2::text IS NULL OR action = $2)
        ORDER BY created_at DESC
        LIMIT $1"#,
    )
    .bind(limit)
    .bind(q.action.as_deref())
    .fetch_all(&state.db)
    .await?;

    let actor_ids: Vec<Uuid> = rows.iter().map(|e| e.account_id).collect();
    let actors: Vec<(Uuid, String)> =
        sqlx::query_as("SELECT id, email FROM accounts WHERE id = ANY($1)")
            .bind(&actor_ids)
            .fetch_all(&state.db)
            .await?;

    let entries: Vec<Value> = rows
        .iter()
        .map(|e| {
            let actor_email = actors
                .iter()
                .find(|(id, _)| *id == e.account_id)
                .map(|(_, email)| email.as_str());
            json!({
                "id": e.id, "actorId": e.account_id, "actorEmail": actor_email,
                "impersonatingId": e.impersonating_id,
                "action": e.action, "targetType": e.target_type,
                "targetId": e.target_id,
                "metadata": e.metadata, "createdAt": e.created_at,
            })
        })
        .collect();

    Ok(Json(json!({ "entries": entries })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impersonation_cookie_carries_attributes() {
        let c = impersonation_cookie("sporthub_impersonate", "abc", 28800, false);
        assert_eq!(c.name(), "sporthub_impersonate");
        assert_eq!(c.value(), "abc");
        assert!(c.http_only().unwrap_or(false));
        assert_eq!(c.path(), Some("/"));
    }

    #[test]
    fn clearing_cookie_has_zero_max_age() {
        let c = impersonation_cookie("sporthub_impersonate", "", 0, true);
        assert_eq!(c.value(), "");
        assert!(c.secure().unwrap_or(false));
    }
}
