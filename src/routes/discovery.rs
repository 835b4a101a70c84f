use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::class::{DiscoveryClassRow, SportType};
use crate::services::cursor::{self, ClassCursor};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryQuery {
    pub sport_type: Option<SportType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub city: Option<String>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

fn class_item(row: &DiscoveryClassRow) -> Value {
    json!({
        "id": row.id,
        "title": row.title,
        "description": row.description,
        "sportType": row.sport_type,
        "startTime": row.start_time,
        "endTime": row.end_time,
        "capacity": row.capacity,
        "priceCents": row.price_cents,
        "paymentRequired": row.payment_required,
        "spotsLeft": row.spots_left(),
        "location": {
            "id": row.location_id,
            "name": row.location_name,
            "city": row.location_city,
        },
        "organisation": {
            "id": row.organisation_id,
            "name": row.organisation_name,
        },
    })
}

const DISCOVERY_SELECT: &str = r#"
SELECT c.id, c.title, c.description, c.sport_type, c.start_time, c.end_time,
       c.capacity, c.price_cents, c.payment_required,
       l.id AS location_id, l.name AS location_name, l.city AS location_city,
       o.id AS organisation_id, o.name AS organisation_name,
       (SELECT COUNT(*)::bigint FROM bookings b
        WHERE b.class_id = c.id AND b.status = 'CONFIRMED') AS confirmed_count
FROM classes c
JOIN locations l ON l.id = c.location_id
JOIN organisation_members om ON om.id = c.organiser_id
JOIN organisations o ON o.id = om.organisation_id
"#;

/// Public feed of published classes: optional sport/date-range/city filters,
/// keyset pagination ordered by (start_time, id).
pub async fn list_classes(
    State(state): State<AppState>,
    Query(q): Query<DiscoveryQuery>,
) -> AppResult<Json<Value>> {
    let limit = q.limit.unwrap_or(20).clamp(1, 100);

    let after = match q.cursor.as_deref() {
        Some(raw) => Some(
            cursor::decode(raw).ok_or_else(|| AppError::BadRequest("Invalid cursor".into()))?,
        ),
        None => None,
    };

    let sql = format!(
        r#"{DISCOVERY_SELECT}
        WHERE c.status = 'PUBLISHED'
          AND ($1::text IS NULL OR c.sport_type = $1)
          AND ($2::timestamptz IS NULL OR c.start_time >= $2)
          AND ($3::timestamptz IS NULL OR c.end_time <= $3)
          AND ($4::text IS NULL OR l.city = $4)
          AND ($5::timestamptz IS NULL OR (c.start_time, c.id) > ($5, $6))
        ORDER BY c.start_time ASC, c.id ASC
        LIMIT $7"#
    );

    let mut rows: Vec<DiscoveryClassRow> = sqlx::query_as(&sql)
        .bind(q.sport_type.map(|s| s.as_str()))
        .bind(q.from)
        .bind(q.to)
        .bind(q.city.as_deref().filter(|c| !c.is_empty()))
        .bind(after.map(|c| c.start_time))
        .bind(after.map(|c| c.id).unwrap_or_else(Uuid::nil))
        .bind(limit + 1)
        .fetch_all(&state.db)
        .await?;

    let next_cursor = if rows.len() as i64 > limit {
        rows.truncate(limit as usize);
        rows.last().map(|row| {
            cursor::encode(&ClassCursor {
                start_time: row.start_time,
                id: row.id,
            })
        })
    } else {
        None
    };

    let items: Vec<Value> = rows.iter().map(class_item).collect();
    Ok(Json(json!({ "items": items, "nextCursor": next_cursor })))
}

/// Public class detail. Only PUBLISHED classes are visible here; drafts and
/// cancelled classes 404.
pub async fn get_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let class_id =
        Uuid::parse_str(&id).map_err(|_| AppError::BadRequest("Invalid class ID".into()))?;

    let sql = format!("{DISCOVERY_SELECT} WHERE c.id = $1 AND c.status = 'PUBLISHED'");
    let row: Option<DiscoveryClassRow> = sqlx::query_as(&sql)
        .bind(class_id)
        .fetch_optional(&state.db)
        .await?;

    let row = row.ok_or_else(|| AppError::NotFound("Class not found".into()))?;
    Ok(Json(class_item(&row)))
}

/// Sport catalogue with display labels.
pub async fn list_sports() -> Json<Value> {
    let sports: Vec<Value> = SportType::ALL
        .iter()
        .map(|s| json!({ "id": s.as_str(), "label": s.label() }))
        .collect();
    Json(json!({ "sports": sports }))
}
