use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::models::booking::{BookingDetailRow, BookingStatus, CreateBookingRequest};
use crate::AppState;

const BOOKING_DETAIL_SELECT: &str = r#"
SELECT b.id, b.status, b.created_at,
       c.id AS class_id, c.title AS class_title, c.sport_type, c.start_time, c.end_time,
       c.price_cents, c.payment_required, c.status AS class_status,
       l.name AS location_name, l.city AS location_city,
       o.name AS organisation_name
FROM bookings b
JOIN classes c ON c.id = b.class_id
JOIN locations l ON l.id = c.location_id
JOIN organisation_members om ON om.id = c.organiser_id
JOIN organisations o ON o.id = om.organisation_id
"#;

fn booking_body(row: &BookingDetailRow) -> Value {
    json!({
        "id": row.id,
        "status": row.status,
        "createdAt": row.created_at,
        "class": {
            "id": row.class_id,
            "title": row.class_title,
            "sportType": row.sport_type,
            "startTime": row.start_time,
            "endTime": row.end_time,
            "priceCents": row.price_cents,
            "paymentRequired": row.payment_required,
            "status": row.class_status,
            "location": { "name": row.location_name, "city": row.location_city },
            "organisation": { "name": row.organisation_name },
        },
    })
}

/// Book a spot in a published class. The class row is locked for the
/// duration of the transaction, so the confirmed-count re-check and the
/// insert are serialized against concurrent bookers; the unique
/// (account, class) constraint independently maps insert races to Conflict.
pub async fn create_booking(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Json(body): Json<CreateBookingRequest>,
) -> AppResult<Json<Value>> {
    let class_id = Uuid::parse_str(&body.class_id)
        .map_err(|_| AppError::BadRequest("Invalid class ID".into()))?;
    let account_id = ctx.account_id;

    let mut tx = state.db.begin().await?;

    let class: Option<(i32, String)> =
        sqlx::query_as("SELECT capacity, status FROM classes WHERE id = $1 FOR UPDATE")
            .bind(class_id)
            .fetch_optional(&mut *tx)
            .await?;

    let (capacity, status) =
        class.ok_or_else(|| AppError::NotFound("Class not found or not published".into()))?;
    if status != "PUBLISHED" {
        return Err(AppError::NotFound("Class not found or not published".into()));
    }

    let existing: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, status FROM bookings WHERE account_id = $1 AND class_id = $2")
            .bind(account_id)
            .bind(class_id)
            .fetch_optional(&mut *tx)
            .await?;

    if let Some((_, booking_status)) = &existing {
        if booking_status == BookingStatus::Confirmed.as_str() {
            return Err(AppError::Conflict(
                "You are already booked for this class".into(),
            ));
        }
    }

    let confirmed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::bigint FROM bookings WHERE class_id = $1 AND status = $2",
    )
    .bind(class_id)
    .bind(BookingStatus::Confirmed.as_str())
    .fetch_one(&mut *tx)
    .await?;

    if confirmed >= capacity as i64 {
        return Err(AppError::BadRequest("Class is full".into()));
    }

    let booking_id: Uuid = match existing {
        // re-book after a cancellation: the (account, class) row is reused
        Some((id, _)) => {
            sqlx::query_scalar(
                "UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING id",
            )
            .bind(id)
            .bind(BookingStatus::Confirmed.as_str())
            .fetch_one(&mut *tx)
            .await?
        }
        None => sqlx::query_scalar(
            r#"INSERT INTO bookings (account_id, class_id, status)
            VALUES ($1, $2, $3) RETURNING id"#,
        )
        .bind(account_id)
        .bind(class_id)
        .bind(BookingStatus::Confirmed.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("You are already booked for this class".into())
            } else {
                e.into()
            }
        })?,
    };

    tx.commit().await?;

    let sql = format!("{BOOKING_DETAIL_SELECT} WHERE b.id = $1");
    let row: BookingDetailRow = sqlx::query_as(&sql)
        .bind(booking_id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(booking_body(&row)))
}

/// Cancel one of the caller's own bookings. This only frees a spot, so no
/// capacity check is involved.
pub async fn cancel_booking(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let booking_id =
        Uuid::parse_str(&id).map_err(|_| AppError::BadRequest("Invalid booking ID".into()))?;

    let owner: Option<Uuid> = sqlx::query_scalar("SELECT account_id FROM bookings WHERE id = $1")
        .bind(booking_id)
        .fetch_optional(&state.db)
        .await?;

    let owner = owner.ok_or_else(|| AppError::NotFound("Booking not found".into()))?;
    if owner != ctx.account_id {
        return Err(AppError::Forbidden(
            "You can only cancel your own bookings".into(),
        ));
    }

    sqlx::query("UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(booking_id)
        .bind(BookingStatus::Cancelled.as_str())
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "id": booking_id, "status": BookingStatus::Cancelled.as_str() })))
}

pub async fn list_my_bookings(
    State(state): State<AppState>,
    ctx: axum::Extension<AuthContext>,
) -> AppResult<Json<Value>> {
    let sql = format!("{BOOKING_DETAIL_SELECT} WHERE b.account_id = $1 ORDER BY b.created_at DESC");
    let rows: Vec<BookingDetailRow> = sqlx::query_as(&sql)
        .bind(ctx.account_id)
        .fetch_all(&state.db)
        .await?;

    let bookings: Vec<Value> = rows.iter().map(booking_body).collect();
    Ok(Json(json!({ "bookings": bookings })))
}
