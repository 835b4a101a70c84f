use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassStatus {
    Draft,
    Published,
    Cancelled,
    Completed,
}

impl ClassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassStatus::Draft => "DRAFT",
            ClassStatus::Published => "PUBLISHED",
            ClassStatus::Cancelled => "CANCELLED",
            ClassStatus::Completed => "COMPLETED",
        }
    }
}

/// Sport catalogue. Values match the `sport_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SportType {
    Padel,
    BeachTennis,
    BeachVolleyball,
    Football,
    Yoga,
    MountainBiking,
    Hiking,
    DanceClasses,
    BrazilianJiujitsu,
    Boxing,
}

impl SportType {
    pub const ALL: [SportType; 10] = [
        SportType::Padel,
        SportType::BeachTennis,
        SportType::BeachVolleyball,
        SportType::Football,
        SportType::Yoga,
        SportType::MountainBiking,
        SportType::Hiking,
        SportType::DanceClasses,
        SportType::BrazilianJiujitsu,
        SportType::Boxing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SportType::Padel => "PADEL",
            SportType::BeachTennis => "BEACH_TENNIS",
            SportType::BeachVolleyball => "BEACH_VOLLEYBALL",
            SportType::Football => "FOOTBALL",
            SportType::Yoga => "YOGA",
            SportType::MountainBiking => "MOUNTAIN_BIKING",
            SportType::Hiking => "HIKING",
            SportType::DanceClasses => "DANCE_CLASSES",
            SportType::BrazilianJiujitsu => "BRAZILIAN_JIUJITSU",
            SportType::Boxing => "BOXING",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SportType::Padel => "Padel",
            SportType::BeachTennis => "Beach tennis",
            SportType::BeachVolleyball => "Beach volleyball",
            SportType::Football => "Football",
            SportType::Yoga => "Yoga",
            SportType::MountainBiking => "Mountain biking",
            SportType::Hiking => "Hiking",
            SportType::DanceClasses => "Dance classes",
            SportType::BrazilianJiujitsu => "Brazilian jiu-jitsu",
            SportType::Boxing => "Boxing",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Class {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub sport_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub price_cents: Option<i32>,
    pub payment_required: bool,
    pub status: String,
    pub location_id: Uuid,
    pub organiser_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row for the public discovery feed, joined with location and
/// organisation display data plus the confirmed-booking count.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscoveryClassRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub sport_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub price_cents: Option<i32>,
    pub payment_required: bool,
    pub location_id: Uuid,
    pub location_name: String,
    pub location_city: String,
    pub organisation_id: Uuid,
    pub organisation_name: String,
    pub confirmed_count: i64,
}

impl DiscoveryClassRow {
    pub fn spots_left(&self) -> i64 {
        (self.capacity as i64 - self.confirmed_count).max(0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassRequest {
    pub organisation_id: String,
    pub location_id: String,
    pub title: String,
    pub description: Option<String>,
    pub sport_type: SportType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub price_cents: Option<i32>,
    pub payment_required: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClassRequest {
    pub location_id: String,
    pub title: String,
    pub description: Option<String>,
    pub sport_type: SportType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub price_cents: Option<i32>,
    pub payment_required: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sport_type_wire_names_match_column_values() {
        for sport in SportType::ALL {
            let wire = serde_json::to_value(sport).unwrap();
            assert_eq!(wire, serde_json::Value::String(sport.as_str().to_string()));
        }
    }

    #[test]
    fn class_status_values() {
        assert_eq!(ClassStatus::Draft.as_str(), "DRAFT");
        assert_eq!(ClassStatus::Published.as_str(), "PUBLISHED");
        assert!(serde_json::from_value::<ClassStatus>(serde_json::json!("IN_REVIEW")).is_err());
    }

    #[test]
    fn spots_left_never_negative() {
        let row = DiscoveryClassRow {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: None,
            sport_type: "YOGA".into(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            capacity: 5,
            price_cents: None,
            payment_required: false,
            location_id: Uuid::new_v4(),
            location_name: "l".into(),
            location_city: "c".into(),
            organisation_id: Uuid::new_v4(),
            organisation_name: "o".into(),
            confirmed_count: 7,
        };
        assert_eq!(row.spots_left(), 0);
    }
}
