use crate::leaderboard::DEFAULT_LIMIT;
use crate::models::{AssignmentStatus, NewAssignment, NewStudySession, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const DEFAULT_STATS_DAYS: u32 = 30;

/// Successful procedure call: `{"result":{"data":...}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    pub result: RpcResult<T>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResult<T> {
    pub data: T,
}

impl<T> RpcResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            result: RpcResult { data },
        }
    }
}

/// Failed procedure call: `{"error":{...}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcErrorResponse {
    pub error: RpcErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcErrorBody {
    pub message: String,
    pub code: String,
    pub http_status: u16,
}

#[derive(Debug, Serialize, Deserialize, Validate, PartialEq, Eq, Clone, Default)]
pub struct LeaderboardInput {
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<u32>,
}

impl LeaderboardInput {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AddFriendInput {
    #[validate(range(min = 1))]
    pub friend_id: i32,
}

impl AddFriendInput {
    pub fn friend(&self) -> UserId {
        UserId(self.friend_id)
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AcceptFriendInput {
    #[validate(range(min = 1))]
    pub friendship_id: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_session_window"))]
pub struct CreateStudySessionInput {
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub duration_minutes: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub pomodoro_count: i32,
}

fn validate_session_window(input: &CreateStudySessionInput) -> Result<(), ValidationError> {
    match input.end_time {
        Some(end_time) if end_time < input.start_time => {
            Err(ValidationError::new("end_time_before_start_time"))
        }
        _ => Ok(()),
    }
}

impl From<CreateStudySessionInput> for NewStudySession {
    fn from(input: CreateStudySessionInput) -> Self {
        Self {
            subject: input.subject,
            start_time: input.start_time,
            end_time: input.end_time,
            duration_minutes: input.duration_minutes,
            pomodoro_count: input.pomodoro_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, PartialEq, Eq, Clone, Default)]
pub struct StudySessionStatsInput {
    #[validate(range(min = 1, max = 365))]
    pub days: Option<u32>,
}

impl StudySessionStatsInput {
    pub fn days(&self) -> u32 {
        self.days.unwrap_or(DEFAULT_STATS_DAYS)
    }

    /// Start of the window ending at `now`.
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.days()))
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    pub due_date: DateTime<Utc>,
}

impl From<CreateAssignmentInput> for NewAssignment {
    fn from(input: CreateAssignmentInput) -> Self {
        Self {
            title: input.title,
            subject: input.subject,
            due_date: input.due_date,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentStatusInput {
    #[validate(range(min = 1))]
    pub assignment_id: i32,
    pub status: AssignmentStatus,
}

#[derive(Debug, Serialize, Deserialize, Validate, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizAttemptInput {
    #[validate(range(min = 1))]
    pub quiz_id: i32,
    #[validate(range(min = 0, max = 100))]
    pub score: i32,
}
