use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::models::class::{Class, ClassStatus, CreateClassRequest, UpdateClassRequest};
use crate::models::organisation::{AddLocationRequest, Location, Organisation};
use crate::AppState;

/// Membership id of the account in the given organisation, if any.
async fn member_in_org(
    db: &sqlx::PgPool,
    account_id: Uuid,
    organisation_id: Uuid,
) -> AppResult<Option<Uuid>> {
    let id: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM organisation_members WHERE account_id = $1 AND organisation_id = $2",
    )
    .bind(account_id)
    .bind(organisation_id)
    .fetch_optional(db)
    .await?;
    Ok(id)
}

fn parse_uuid(raw: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid {} ID", what)))
}

fn class_body(class: &Class) -> Value {
    json!({
        "id": class.id,
        "title": class.title,
        "description": class.description,
        "sportType": class.sport_type,
        "startTime": class.start_time,
        "endTime": class.end_time,
        "capacity": class.capacity,
        "priceCents": class.price_cents,
        "paymentRequired": class.payment_required,
        "status": class.status,
        "locationId": class.location_id,
        "organiserId": class.organiser_id,
        "createdAt": class.created_at,
    })
}

/// Organisations the caller belongs to, with location/class counts.
pub async fn get_my_clubs(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
) -> AppResult<Json<Value>> {
    let rows: Vec<(Uuid, String, Option<String>, Uuid, String, i64, i64)> = sqlx::query_as(
        r#"SELECT o.id, o.name, o.description, om.id, om.role,
            (SELECT COUNT(*)::bigint FROM locations l WHERE l.organisation_id = o.id),
            (SELECT COUNT(*)::bigint FROM classes c
             JOIN organisation_members m2 ON m2.id = c.organiser_id
             WHERE m2.organisation_id = o.id AND m2.account_id = $1)
        FROM organisations o
        JOIN organisation_members om ON om.organisation_id = o.id
        WHERE om.account_id = $1
        ORDER BY o.name"#,
    )
    .bind(ctx.account_id)
    .fetch_all(&state.db)
    .await?;

    let clubs: Vec<Value> = rows
        .iter()
        .map(|(id, name, desc, member_id, role, locations, classes)| {
            json!({
                "id": id, "name": name, "description": desc,
                "myMemberId": member_id, "myRole": role,
                "locationCount": locations, "classCount": classes,
            })
        })
        .collect();

    Ok(Json(json!({ "clubs": clubs })))
}

pub async fn get_org_with_locations(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let organisation_id = parse_uuid(&id, "organisation")?;

    let member_id = member_in_org(&state.db, ctx.account_id, organisation_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Not a member of this organisation".into()))?;

    let org: Option<Organisation> =
        sqlx::query_as("SELECT * FROM organisations WHERE id = $1")
            .bind(organisation_id)
            .fetch_optional(&state.db)
            .await?;
    let org = org.ok_or_else(|| AppError::NotFound("Organisation not found".into()))?;

    let locations: Vec<Location> = sqlx::query_as(
        "SELECT * FROM locations WHERE organisation_id = $1 ORDER BY created_at",
    )
    .bind(organisation_id)
    .fetch_all(&state.db)
    .await?;

    let locations: Vec<Value> = locations
        .iter()
        .map(|l| {
            json!({
                "id": l.id, "name": l.name, "address": l.address, "city": l.city,
                "postalCode": l.postal_code, "country": l.country,
            })
        })
        .collect();

    Ok(Json(json!({
        "organisation": { "id": org.id, "name": org.name, "description": org.description },
        "locations": locations,
        "myMemberId": member_id,
    })))
}

pub async fn add_location(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<AddLocationRequest>,
) -> AppResult<Json<Value>> {
    let organisation_id = parse_uuid(&id, "organisation")?;

    member_in_org(&state.db, ctx.account_id, organisation_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Not a member of this organisation".into()))?;

    let name = body.name.trim();
    let address = body.address.trim();
    let city = body.city.trim();
    let postal_code = body.postal_code.as_deref().map(str::trim).filter(|p| !p.is_empty());
    let country = body.country.as_deref().map(str::trim).unwrap_or("DE");

    if name.is_empty() || name.len() > 200 {
        return Err(AppError::BadRequest("Name must be 1-200 characters".into()));
    }
    if address.is_empty() || address.len() > 500 {
        return Err(AppError::BadRequest("Address must be 1-500 characters".into()));
    }
    if city.is_empty() || city.len() > 100 {
        return Err(AppError::BadRequest("City must be 1-100 characters".into()));
    }
    if let Some(p) = postal_code {
        if p.len() > 20 {
            return Err(AppError::BadRequest("Postal code must be at most 20 characters".into()));
        }
    }
    if country.len() != 2 {
        return Err(AppError::BadRequest("Country must be a 2-letter code".into()));
    }

    let location: Location = sqlx::query_as(
        r#"INSERT INTO locations (organisation_id, name, address, city, postal_code, country)
        VALUES ($1, $2, $3, $4, $5, $6) RETURNING *"#,
    )
    .bind(organisation_id)
    .bind(name)
    .bind(address)
    .bind(city)
    .bind(postal_code)
    .bind(country)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({
        "id": location.id, "name": location.name, "address": location.address,
        "city": location.city, "postalCode": location.postal_code, "country": location.country,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyClassesQuery {
    pub organisation_id: Option<String>,
    pub status: Option<ClassStatus>,
}

pub async fn list_my_classes(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Query(q): Query<MyClassesQuery>,
) -> AppResult<Json<Value>> {
    let organisation_id = q
        .organisation_id
        .as_deref()
        .map(|raw| parse_uuid(raw, "organisation"))
        .transpose()?;

    let rows: Vec<(Uuid, String, String, chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>, i32, String, Uuid, String, String, String)> = sqlx::query_as(
        r#"SELECT c.id, c.title, c.sport_type, c.start_time, c.end_time, c.capacity, c.status,
            l.id, l.name, l.city, o.name
        FROM classes c
        JOIN organisation_members om ON om.id = c.organiser_id
        JOIN locations l ON l.id = c.location_id
        JOIN organisations o ON o.id = om.organisation_id
        WHERE om.account_id = $1
          AND ($2::uuid IS NULL OR om.organisation_id = $2)
          AND ($3::text IS NULL OR c.status = $3)
        ORDER BY c.start_time DESC"#,
    )
    .bind(ctx.account_id)
    .bind(organisation_id)
    .bind(q.status.map(|s| s.as_str()))
    .fetch_all(&state.db)
    .await?;

    let classes: Vec<Value> = rows
        .iter()
        .map(|(id, title, sport, start, end, capacity, status, lid, lname, lcity, org)| {
            json!({
                "id": id, "title": title, "sportType": sport,
                "startTime": start, "endTime": end, "capacity": capacity, "status": status,
                "location": { "id": lid, "name": lname, "city": lcity },
                "organisationName": org,
            })
        })
        .collect();

    Ok(Json(json!({ "classes": classes })))
}

/// The caller's classes with their confirmed bookings and booker contact
/// data, for the organiser bookings overview.
pub async fn get_classes_with_bookings(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
) -> AppResult<Json<Value>> {
    let classes: Vec<(Uuid, String, String, chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>, i32, String, String, String, String)> = sqlx::query_as(
        r#"SELECT c.id, c.title, c.sport_type, c.start_time, c.end_time, c.capacity, c.status,
            l.name, l.city, o.name
        FROM classes c
        JOIN organisation_members om ON om.id = c.organiser_id
        JOIN locations l ON l.id = c.location_id
        JOIN organisations o ON o.id = om.organisation_id
        WHERE om.account_id = $1
        ORDER BY c.start_time DESC"#,
    )
    .bind(ctx.account_id)
    .fetch_all(&state.db)
    .await?;

    let bookings: Vec<(Uuid, Uuid, Uuid, String, Option<String>, Option<String>)> = sqlx::query_as(
        r#"SELECT b.class_id, b.id, a.id, a.email, a.name, a.surname
        FROM bookings b
        JOIN accounts a ON a.id = b.account_id
        JOIN classes c ON c.id = b.class_id
        JOIN organisation_members om ON om.id = c.organiser_id
        WHERE om.account_id = $1 AND b.status = 'CONFIRMED'
        ORDER BY b.created_at"#,
    )
    .bind(ctx.account_id)
    .fetch_all(&state.db)
    .await?;

    let mut by_class: HashMap<Uuid, Vec<Value>> = HashMap::new();
    for (class_id, booking_id, account_id, email, name, surname) in &bookings {
        by_class.entry(*class_id).or_default().push(json!({
            "id": booking_id,
            "account": { "id": account_id, "email": email, "name": name, "surname": surname },
        }));
    }

    let classes: Vec<Value> = classes
        .iter()
        .map(|(id, title, sport, start, end, capacity, status, lname, lcity, org)| {
            let class_bookings = by_class.remove(id).unwrap_or_default();
            json!({
                "id": id, "title": title, "sportType": sport,
                "startTime": start, "endTime": end, "capacity": capacity, "status": status,
                "location": { "name": lname, "city": lcity },
                "organisationName": org,
                "confirmedCount": class_bookings.len(),
                "bookings": class_bookings,
            })
        })
        .collect();

    Ok(Json(json!({ "classes": classes })))
}

fn validate_class_fields(
    title: &str,
    description: Option<&str>,
    capacity: i32,
    start: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
    price_cents: Option<i32>,
) -> AppResult<()> {
    if title.is_empty() || title.len() > 200 {
        return Err(AppError::BadRequest("Title must be 1-200 characters".into()));
    }
    if let Some(d) = description {
        if d.len() > 2000 {
            return Err(AppError::BadRequest(
                "Description must be at most 2000 characters".into(),
            ));
        }
    }
    if !(1..=1000).contains(&capacity) {
        return Err(AppError::BadRequest("Capacity must be 1-1000".into()));
    }
    if end <= start {
        return Err(AppError::BadRequest(
            "End time must be after start time".into(),
        ));
    }
    if let Some(p) = price_cents {
        if p < 0 {
            return Err(AppError::BadRequest("Price must not be negative".into()));
        }
    }
    Ok(())
}

/// Create a class as DRAFT. Visibility stays org-internal until a platform
/// admin publishes it.
pub async fn create_class(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Json(body): Json<CreateClassRequest>,
) -> AppResult<Json<Value>> {
    let organisation_id = parse_uuid(&body.organisation_id, "organisation")?;
    let location_id = parse_uuid(&body.location_id, "location")?;

    let member_id = member_in_org(&state.db, ctx.account_id, organisation_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Not a member of this organisation".into()))?;

    let location_in_org: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM locations WHERE id = $1 AND organisation_id = $2)",
    )
    .bind(location_id)
    .bind(organisation_id)
    .fetch_one(&state.db)
    .await?;
    if !location_in_org {
        return Err(AppError::BadRequest(
            "Location not in this organisation".into(),
        ));
    }

    let title = body.title.trim();
    let description = body.description.as_deref().map(str::trim).filter(|d| !d.is_empty());
    validate_class_fields(
        title,
        description,
        body.capacity,
        body.start_time,
        body.end_time,
        body.price_cents,
    )?;

    let class: Class = sqlx::query_as(
        r#"INSERT INTO classes
            (title, description, sport_type, start_time, end_time, capacity,
             price_cents, payment_required, status, location_id, organiser_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'DRAFT', $9, $10)
        RETURNING *"#,
    )
    .bind(title)
    .bind(description)
    .bind(body.sport_type.as_str())
    .bind(body.start_time)
    .bind(body.end_time)
    .bind(body.capacity)
    .bind(body.price_cents)
    .bind(body.payment_required.unwrap_or(false))
    .bind(location_id)
    .bind(member_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(class_body(&class)))
}

/// Class with the caller's ownership verified, for the edit form.
pub async fn get_class_for_edit(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let class_id = parse_uuid(&id, "class")?;

    let row: Option<(Uuid, Uuid)> = sqlx::query_as(
        r#"SELECT om.account_id, om.organisation_id
        FROM classes c JOIN organisation_members om ON om.id = c.organiser_id
        WHERE c.id = $1"#,
    )
    .bind(class_id)
    .fetch_optional(&state.db)
    .await?;

    let (owner_account, organisation_id) =
        row.ok_or_else(|| AppError::NotFound("Class not found".into()))?;
    if owner_account != ctx.account_id {
        return Err(AppError::Forbidden(
            "You can only edit your own classes".into(),
        ));
    }

    let class: Class = sqlx::query_as("SELECT * FROM classes WHERE id = $1")
        .bind(class_id)
        .fetch_one(&state.db)
        .await?;

    let locations: Vec<Location> =
        sqlx::query_as("SELECT * FROM locations WHERE organisation_id = $1 ORDER BY created_at")
            .bind(organisation_id)
            .fetch_all(&state.db)
            .await?;

    let locations: Vec<Value> = locations
        .iter()
        .map(|l| json!({ "id": l.id, "name": l.name, "city": l.city }))
        .collect();

    let mut body = class_body(&class);
    body["organisationId"] = json!(organisation_id);
    body["locations"] = json!(locations);
    Ok(Json(body))
}

pub async fn update_class(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateClassRequest>,
) -> AppResult<Json<Value>> {
    let class_id = parse_uuid(&id, "class")?;
    let location_id = parse_uuid(&body.location_id, "location")?;

    let row: Option<(Uuid, Uuid)> = sqlx::query_as(
        r#"SELECT om.account_id, om.organisation_id
        FROM classes c JOIN organisation_members om ON om.id = c.organiser_id
        WHERE c.id = $1"#,
    )
    .bind(class_id)
    .fetch_optional(&state.db)
    .await?;

    let (owner_account, organisation_id) =
        row.ok_or_else(|| AppError::NotFound("Class not found".into()))?;
    if owner_account != ctx.account_id {
        return Err(AppError::Forbidden(
            "You can only edit your own classes".into(),
        ));
    }

    let location_in_org: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM locations WHERE id = $1 AND organisation_id = $2)",
    )
    .bind(location_id)
    .bind(organisation_id)
    .fetch_one(&state.db)
    .await?;
    if !location_in_org {
        return Err(AppError::BadRequest("Location not in your organisation".into()));
    }

    let title = body.title.trim();
    let description = body.description.as_deref().map(str::trim).filter(|d| !d.is_empty());
    validate_class_fields(
        title,
        description,
        body.capacity,
        body.start_time,
        body.end_time,
        body.price_cents,
    )?;

    // status is never touched here; publishing stays an admin action
    let class: Class = sqlx::query_as(
        r#"UPDATE classes SET
            title = $2, description = $3, sport_type = $4, start_time = $5, end_time = $6,
            capacity = $7, price_cents = $8, payment_required = $9, location_id = $10,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(class_id)
    .bind(title)
    .bind(description)
    .bind(body.sport_type.as_str())
    .bind(body.start_time)
    .bind(body.end_time)
    .bind(body.capacity)
    .bind(body.price_cents)
    .bind(body.payment_required.unwrap_or(false))
    .bind(location_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(class_body(&class)))
}

/// Cancel an owned class, from DRAFT or PUBLISHED.
pub async fn cancel_class(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let class_id = parse_uuid(&id, "class")?;

    let row: Option<(Uuid, String)> = sqlx::query_as(
        r#"SELECT om.account_id, c.status
        FROM classes c JOIN organisation_members om ON om.id = c.organiser_id
        WHERE c.id = $1"#,
    )
    .bind(class_id)
    .fetch_optional(&state.db)
    .await?;

    let (owner_account, status) =
        row.ok_or_else(|| AppError::NotFound("Class not found".into()))?;
    if owner_account != ctx.account_id {
        return Err(AppError::Forbidden(
            "You can only cancel your own classes".into(),
        ));
    }
    if status != "DRAFT" && status != "PUBLISHED" {
        return Err(AppError::BadRequest(format!(
            "Cannot cancel a {} class",
            status.to_lowercase()
        )));
    }

    sqlx::query("UPDATE classes SET status = 'CANCELLED', updated_at = NOW() WHERE id = $1")
        .bind(class_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "id": class_id, "status": "CANCELLED" })))
}
