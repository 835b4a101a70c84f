use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Submitted,
    InReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::InReview => "IN_REVIEW",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }

    /// SUBMITTED and IN_REVIEW are the only states a reviewer may act on.
    pub fn is_pending(s: &str) -> bool {
        s == "SUBMITTED" || s == "IN_REVIEW"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrganiserApplication {
    pub id: Uuid,
    pub account_id: Uuid,
    pub organisation_name: String,
    pub description: String,
    pub contact_email: String,
    pub website: Option<String>,
    pub city: Option<String>,
    pub status: String,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationRequest {
    pub organisation_name: String,
    pub description: String,
    pub contact_email: String,
    pub website: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectApplicationRequest {
    pub rejection_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_review_wire_name() {
        let v = serde_json::to_value(ApplicationStatus::InReview).unwrap();
        assert_eq!(v, serde_json::json!("IN_REVIEW"));
    }

    #[test]
    fn only_submitted_and_in_review_are_pending() {
        assert!(ApplicationStatus::is_pending("SUBMITTED"));
        assert!(ApplicationStatus::is_pending("IN_REVIEW"));
        assert!(!ApplicationStatus::is_pending("APPROVED"));
        assert!(!ApplicationStatus::is_pending("REJECTED"));
    }
}
