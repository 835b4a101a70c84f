use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Booking joined with class, location and organisation display data.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingDetailRow {
    pub id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub class_id: Uuid,
    pub class_title: String,
    pub sport_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price_cents: Option<i32>,
    pub payment_required: bool,
    pub class_status: String,
    pub location_name: String,
    pub location_city: String,
    pub organisation_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub class_id: String,
}
