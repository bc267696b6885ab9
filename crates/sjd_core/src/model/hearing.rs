//! Hearing domain model.
//!
//! # Responsibility
//! - Describe a scheduled hearing and its participant links.
//!
//! # Invariants
//! - A persisted hearing has at least one participant link.
//! - Participant links are owned by their hearing and removed with it.
//! - `scheduled_at` is stored as `YYYY-MM-DDTHH:MM:SS` text, no timezone.

use crate::model::user::UserId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Store-generated hearing identifier.
pub type HearingId = i64;

/// Storage format for `hearings.scheduled_at`.
pub const SCHEDULED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parent attributes of a hearing to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HearingInput {
    pub scheduled_at: NaiveDateTime,
    /// Room or venue; must not be blank.
    pub location: String,
    pub description: Option<String>,
    /// Owning judge.
    pub judge_id: UserId,
    /// Opaque participant-type tag supplied by the caller.
    pub participant_kind: String,
}

impl HearingInput {
    /// Checks required fields before any write is attempted.
    pub fn validate(&self) -> Result<(), String> {
        if self.location.trim().is_empty() {
            return Err("location must not be blank".to_string());
        }
        Ok(())
    }
}

/// Hearing read model, participants in scheduling order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hearing {
    pub id: HearingId,
    pub scheduled_at: NaiveDateTime,
    pub location: String,
    pub description: Option<String>,
    pub judge_id: UserId,
    pub participant_kind: String,
    pub participant_ids: Vec<UserId>,
}

#[cfg(test)]
mod tests {
    use super::{Hearing, HearingInput};
    use chrono::NaiveDate;

    fn input(location: &str, kind: &str) -> HearingInput {
        HearingInput {
            scheduled_at: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            location: location.to_string(),
            description: None,
            judge_id: 7,
            participant_kind: kind.to_string(),
        }
    }

    #[test]
    fn validate_rejects_blank_location_but_keeps_kind_opaque() {
        assert!(input("Room 3", "party").validate().is_ok());
        assert!(input("  ", "party").validate().is_err());
        assert!(input("Room 3", "").validate().is_ok());
        assert!(input("Room 3", " ").validate().is_ok());
    }

    #[test]
    fn read_model_serializes_timestamp_without_timezone() {
        let hearing = Hearing {
            id: 1,
            scheduled_at: input("Room 3", "party").scheduled_at,
            location: "Room 3".to_string(),
            description: Some("Case review".to_string()),
            judge_id: 7,
            participant_kind: "party".to_string(),
            participant_ids: vec![12, 15, 19],
        };
        let value = serde_json::to_value(&hearing).unwrap();
        assert_eq!(value["scheduled_at"], "2024-03-01T10:00:00");
        assert_eq!(value["participant_ids"], serde_json::json!([12, 15, 19]));
    }
}
