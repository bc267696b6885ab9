//! Hearing scheduling use-case service.
//!
//! # Responsibility
//! - Parse and validate scheduling requests from the request layer.
//! - Check that the owner is a judge before any write starts.
//! - Delegate the atomic hearing + participants write to the repository.
//!
//! # Invariants
//! - Rejected requests never reach the unit of work.
//! - Write failures are surfaced as one `Write` error; nothing is retried.

use crate::db::WriteError;
use crate::model::hearing::{Hearing, HearingId, HearingInput};
use crate::model::user::{Role, UserId};
use crate::repo::hearing_repo::HearingRepository;
use crate::repo::RepoError;
use chrono::NaiveDateTime;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Timestamp layouts accepted from callers, without timezone.
const SCHEDULED_AT_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Errors from hearing use-cases.
#[derive(Debug)]
pub enum HearingServiceError {
    InvalidTimestamp(String),
    JudgeNotFound(UserId),
    /// Owner exists but does not have the judge role.
    NotAJudge(UserId),
    HearingNotFound(HearingId),
    /// The unit of work failed; nothing was persisted unless the variant is
    /// `WriteError::Transaction`.
    Write(WriteError),
    Repo(RepoError),
}

impl Display for HearingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimestamp(value) => write!(f, "invalid hearing timestamp: `{value}`"),
            Self::JudgeNotFound(id) => write!(f, "judge not found: {id}"),
            Self::NotAJudge(id) => write!(f, "user {id} is not a judge"),
            Self::HearingNotFound(id) => write!(f, "hearing not found: {id}"),
            Self::Write(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HearingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Write(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<WriteError> for HearingServiceError {
    fn from(value: WriteError) -> Self {
        Self::Write(value)
    }
}

impl From<RepoError> for HearingServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "hearing",
                id,
            } => Self::HearingNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Raw scheduling input as received from the request layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleHearingRequest {
    pub scheduled_at: String,
    pub location: String,
    pub description: Option<String>,
    pub judge_id: UserId,
    pub participant_kind: String,
    pub participant_ids: Vec<UserId>,
}

/// Hearing service facade.
pub struct HearingService<R: HearingRepository> {
    repo: R,
}

impl<R: HearingRepository> HearingService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Schedules a hearing with its participants and returns it.
    pub fn schedule(
        &self,
        request: ScheduleHearingRequest,
    ) -> Result<Hearing, HearingServiceError> {
        let input = HearingInput {
            scheduled_at: parse_scheduled_at(&request.scheduled_at)?,
            location: request.location.trim().to_string(),
            description: request
                .description
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            judge_id: request.judge_id,
            participant_kind: request.participant_kind,
        };
        input.validate().map_err(WriteError::Validation)?;
        if request.participant_ids.is_empty() {
            return Err(WriteError::Validation(
                "a hearing needs at least one participant".to_string(),
            )
            .into());
        }

        match self.repo.user_role(input.judge_id)? {
            None => return Err(HearingServiceError::JudgeNotFound(input.judge_id)),
            Some(Role::Judge) => {}
            Some(_) => return Err(HearingServiceError::NotAJudge(input.judge_id)),
        }

        let hearing_id = self
            .repo
            .create_with_participants(&input, &request.participant_ids)?;
        self.repo
            .get_hearing(hearing_id)?
            .ok_or(HearingServiceError::HearingNotFound(hearing_id))
    }

    pub fn get(&self, hearing_id: HearingId) -> Result<Hearing, HearingServiceError> {
        self.repo
            .get_hearing(hearing_id)?
            .ok_or(HearingServiceError::HearingNotFound(hearing_id))
    }

    pub fn list_for_judge(&self, judge_id: UserId) -> Result<Vec<Hearing>, HearingServiceError> {
        self.repo.list_for_judge(judge_id).map_err(Into::into)
    }

    pub fn list_for_participant(
        &self,
        participant_id: UserId,
    ) -> Result<Vec<Hearing>, HearingServiceError> {
        self.repo
            .list_for_participant(participant_id)
            .map_err(Into::into)
    }

    /// Cancels a hearing; its participant links are removed with it.
    pub fn delete(&self, hearing_id: HearingId) -> Result<(), HearingServiceError> {
        self.repo.delete_hearing(hearing_id).map_err(Into::into)
    }
}

/// Parses a caller timestamp such as `2024-03-01T10:00:00`.
pub fn parse_scheduled_at(value: &str) -> Result<NaiveDateTime, HearingServiceError> {
    let trimmed = value.trim();
    SCHEDULED_AT_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| HearingServiceError::InvalidTimestamp(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{parse_scheduled_at, HearingServiceError};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn accepts_t_and_space_separated_layouts() {
        assert_eq!(parse_scheduled_at("2024-03-01T10:00:00").unwrap(), at(10, 0, 0));
        assert_eq!(parse_scheduled_at("2024-03-01T10:30").unwrap(), at(10, 30, 0));
        assert_eq!(parse_scheduled_at(" 2024-03-01 14:05:09 ").unwrap(), at(14, 5, 9));
    }

    #[test]
    fn rejects_dates_without_time_and_garbage() {
        assert!(matches!(
            parse_scheduled_at("2024-03-01"),
            Err(HearingServiceError::InvalidTimestamp(_))
        ));
        assert!(parse_scheduled_at("tomorrow").is_err());
        assert!(parse_scheduled_at("2024-02-30T10:00:00").is_err());
    }
}
