use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Public profile row, one per identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A community solution to a [`Question`].
///
/// `upvotes` is a denormalized counter maintained by clients next to the
/// `hack_votes` rows; the two are not written in one transaction and can
/// disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hack {
    pub id: Uuid,
    pub question_id: Uuid,
    pub title: String,
    pub description: String,
    pub why_it_works: Option<String>,
    pub use_when: Option<String>,
    pub avoid_when: Option<String>,
    pub age_range: Option<String>,
    pub time_cost: Option<String>,
    pub money_cost: Option<String>,
    pub intensity: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub upvotes: i64,
    pub created_at: DateTime<Utc>,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HackVote {
    pub id: Uuid,
    pub hack_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedHack {
    pub user_id: Uuid,
    pub hack_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
    /// Any status added by moderators that this client does not know.
    #[serde(other)]
    Unknown,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }
}

/// Moderation queue entry. Never shown in hack listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HackSubmission {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub question_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub why_it_works: Option<String>,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub hack_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// -- Inserts --
//
// Write payloads only carry the columns the client sets; ids and timestamps
// are assigned by the store.

#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewVote {
    pub hack_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSavedHack {
    pub hack_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub hack_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSubmission {
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub title: String,
    pub description: String,
    pub why_it_works: Option<String>,
    pub status: SubmissionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hack_row_decodes_with_nullable_columns() {
        let row = serde_json::json!({
            "id": "7b1a1f2e-4c55-4c2b-9d4e-0d3c9a1b2c3d",
            "question_id": "0f0e0d0c-0b0a-4908-8706-050403020100",
            "title": "White noise",
            "description": "Run a fan",
            "why_it_works": null,
            "use_when": null,
            "avoid_when": null,
            "age_range": "0-2",
            "time_cost": null,
            "money_cost": null,
            "intensity": null,
            "upvotes": 12,
            "created_at": "2024-03-01T10:00:00.123456+00:00"
        });

        let hack: Hack = serde_json::from_value(row).unwrap();
        assert_eq!(hack.upvotes, 12);
        assert_eq!(hack.age_range.as_deref(), Some("0-2"));
        assert!(hack.why_it_works.is_none());
    }

    #[test]
    fn submission_status_is_lowercase_on_the_wire() {
        let json = serde_json::to_value(SubmissionStatus::Pending).unwrap();
        assert_eq!(json, serde_json::json!("pending"));
        assert_eq!(SubmissionStatus::Rejected.as_str(), "rejected");
    }

    #[test]
    fn null_upvote_counter_reads_as_zero() {
        let row = serde_json::json!({
            "id": "7b1a1f2e-4c55-4c2b-9d4e-0d3c9a1b2c3d",
            "question_id": "0f0e0d0c-0b0a-4908-8706-050403020100",
            "title": "Bath before bed",
            "description": "Warm bath at 7pm",
            "why_it_works": null,
            "use_when": null,
            "avoid_when": null,
            "age_range": null,
            "time_cost": null,
            "money_cost": null,
            "intensity": null,
            "upvotes": null,
            "created_at": "2024-03-01T10:00:00+00:00"
        });
        let hack: Hack = serde_json::from_value(row).unwrap();
        assert_eq!(hack.upvotes, 0);
    }

    #[test]
    fn unrecognised_submission_status_still_decodes() {
        let status: SubmissionStatus = serde_json::from_value(serde_json::json!("flagged")).unwrap();
        assert_eq!(status, SubmissionStatus::Unknown);
        let status: SubmissionStatus = serde_json::from_value(serde_json::json!("approved")).unwrap();
        assert_eq!(status, SubmissionStatus::Approved);
    }
}
