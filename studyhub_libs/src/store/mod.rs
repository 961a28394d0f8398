pub mod memory;
pub mod postgres;

use crate::models::{
    Assignment, AssignmentStatus, FriendSummary, Friendship, NewAssignment, NewStudySession,
    PeerStats, QuizAttempt, SessionStats, StudySession, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type Result<T> = std::result::Result<T, StoreError>;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data store is unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("failed to query data store")]
    Query(#[source] sqlx::Error),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(value.to_string()),
            sqlx::Error::Database(ref e) => {
                let code = e.code().map(|code| code.into_owned());
                let message = e.message().to_string();
                match code.as_deref() {
                    Some(UNIQUE_VIOLATION) | Some(CHECK_VIOLATION) => StoreError::Conflict(message),
                    Some(FOREIGN_KEY_VIOLATION) => StoreError::NotFound(message),
                    _ => StoreError::Query(value),
                }
            }
            _ => StoreError::Query(value),
        }
    }
}

#[async_trait]
pub trait FriendshipStore: Send + Sync {
    /// Ids of the friends `user` has an accepted edge to. Edges owned by other users are ignored.
    async fn accepted_friends(&self, user: UserId) -> Result<BTreeSet<UserId>>;

    async fn add_friend(&self, user: UserId, friend: UserId) -> Result<Friendship>;

    /// Accepts the pending request `friendship_id` if it is addressed to `recipient`.
    async fn accept_friend_request(
        &self,
        friendship_id: i32,
        recipient: UserId,
    ) -> Result<Option<Friendship>>;

    async fn list_friends(&self, user: UserId) -> Result<Vec<FriendSummary>>;
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Aggregates the activity tables over `users` in one pass.
    ///
    /// Users without any activity may be missing from the returned map.
    async fn aggregate_stats(
        &self,
        users: &BTreeSet<UserId>,
    ) -> Result<HashMap<UserId, PeerStats>>;

    async fn create_study_session(
        &self,
        user: UserId,
        session: NewStudySession,
    ) -> Result<StudySession>;

    /// Totals over the sessions of `user` recorded at or after `since`.
    async fn study_session_stats(
        &self,
        user: UserId,
        since: DateTime<Utc>,
    ) -> Result<SessionStats>;

    async fn create_assignment(
        &self,
        user: UserId,
        assignment: NewAssignment,
    ) -> Result<Assignment>;

    /// Moves an assignment owned by `owner` to `status`.
    ///
    /// `completed_at` is stamped on completion and cleared otherwise. Returns `None` when
    /// `owner` has no assignment `assignment_id`.
    async fn update_assignment_status(
        &self,
        assignment_id: i32,
        owner: UserId,
        status: AssignmentStatus,
    ) -> Result<Option<Assignment>>;

    async fn create_quiz_attempt(
        &self,
        user: UserId,
        quiz_id: i32,
        score: i32,
    ) -> Result<QuizAttempt>;
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Display names of `users`. Unknown users and users without a name are missing from the map.
    async fn resolve_names(&self, users: &BTreeSet<UserId>) -> Result<HashMap<UserId, String>>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<()>;
}

pub trait Store: FriendshipStore + ActivityStore + IdentityStore + HealthCheck {}

impl<T> Store for T where T: FriendshipStore + ActivityStore + IdentityStore + HealthCheck {}
