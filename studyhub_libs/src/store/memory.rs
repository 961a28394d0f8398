use crate::models::{
    Assignment, AssignmentStatus, FriendSummary, Friendship, FriendshipStatus, NewAssignment,
    NewStudySession, PeerStats, QuizAttempt, SessionStats, StudySession, User, UserId,
};
use crate::store::{ActivityStore, FriendshipStore, HealthCheck, IdentityStore, Result, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    friendships: Vec<Friendship>,
    study_sessions: Vec<StudySession>,
    assignments: Vec<Assignment>,
    quiz_attempts: Vec<QuizAttempt>,
}

/// In-process store with the same semantics as [`PgStore`](crate::store::PgStore).
///
/// Clones share the same tables. [`MemoryStore::set_offline`] makes every call fail with
/// [`StoreError::Unavailable`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(String::from("memory store is offline")))
        } else {
            Ok(())
        }
    }

    pub async fn add_user(&self, name: Option<&str>) -> UserId {
        let mut tables = self.tables.write().await;
        let id = UserId(tables.users.keys().last().map_or(1, |last| last.0 + 1));
        tables.users.insert(
            id,
            User {
                id,
                name: name.map(String::from),
                email: None,
            },
        );
        id
    }

    pub async fn add_study_session(&self, user: UserId, duration_minutes: i32, pomodoros: i32) {
        let mut tables = self.tables.write().await;
        let session = NewStudySession {
            subject: String::from("General"),
            start_time: Utc::now(),
            end_time: None,
            duration_minutes,
            pomodoro_count: pomodoros,
        };
        insert_study_session(&mut tables, user, session);
    }

    pub async fn add_assignment(&self, user: UserId, status: AssignmentStatus) {
        let mut tables = self.tables.write().await;
        let assignment = NewAssignment {
            title: String::from("Assignment"),
            subject: String::from("General"),
            due_date: Utc::now(),
        };
        let id = insert_assignment(&mut tables, user, assignment).id;
        set_assignment_status(&mut tables, id, user, status);
    }

    pub async fn add_quiz_attempt(&self, user: UserId, score: i32) {
        let mut tables = self.tables.write().await;
        insert_quiz_attempt(&mut tables, user, 1, score);
    }

    /// Inserts an edge with an arbitrary status, bypassing the request/accept flow.
    pub async fn add_friendship(
        &self,
        user: UserId,
        friend: UserId,
        status: FriendshipStatus,
    ) -> Friendship {
        let mut tables = self.tables.write().await;
        insert_friendship(&mut tables, user, friend, status)
    }
}

fn insert_friendship(
    tables: &mut Tables,
    user: UserId,
    friend: UserId,
    status: FriendshipStatus,
) -> Friendship {
    let now = Utc::now();
    let friendship = Friendship {
        id: tables.friendships.len() as i32 + 1,
        user_id: user,
        friend_id: friend,
        status,
        created_at: now,
        updated_at: now,
    };
    tables.friendships.push(friendship.clone());
    friendship
}

fn insert_study_session(
    tables: &mut Tables,
    user: UserId,
    session: NewStudySession,
) -> StudySession {
    let session = StudySession {
        id: tables.study_sessions.len() as i32 + 1,
        user_id: user,
        subject: session.subject,
        start_time: session.start_time,
        end_time: session.end_time,
        duration_minutes: session.duration_minutes,
        pomodoro_count: session.pomodoro_count,
        created_at: Utc::now(),
    };
    tables.study_sessions.push(session.clone());
    session
}

fn insert_assignment(tables: &mut Tables, user: UserId, assignment: NewAssignment) -> Assignment {
    let assignment = Assignment {
        id: tables.assignments.len() as i32 + 1,
        user_id: user,
        title: assignment.title,
        subject: assignment.subject,
        due_date: assignment.due_date,
        status: AssignmentStatus::Pending,
        completed_at: None,
        created_at: Utc::now(),
    };
    tables.assignments.push(assignment.clone());
    assignment
}

fn set_assignment_status(
    tables: &mut Tables,
    assignment_id: i32,
    owner: UserId,
    status: AssignmentStatus,
) -> Option<Assignment> {
    tables
        .assignments
        .iter_mut()
        .find(|assignment| assignment.id == assignment_id && assignment.user_id == owner)
        .map(|assignment| {
            assignment.status = status;
            assignment.completed_at = match status {
                AssignmentStatus::Completed => Some(Utc::now()),
                _ => None,
            };
            assignment.clone()
        })
}

fn insert_quiz_attempt(tables: &mut Tables, user: UserId, quiz_id: i32, score: i32) -> QuizAttempt {
    let attempt = QuizAttempt {
        id: tables.quiz_attempts.len() as i32 + 1,
        user_id: user,
        quiz_id,
        score,
        completed_at: Utc::now(),
    };
    tables.quiz_attempts.push(attempt.clone());
    attempt
}

fn ensure_user(tables: &Tables, user: UserId) -> Result<()> {
    if tables.users.contains_key(&user) {
        Ok(())
    } else {
        Err(StoreError::NotFound(format!("user {} not found", user)))
    }
}

#[async_trait]
impl FriendshipStore for MemoryStore {
    async fn accepted_friends(&self, user: UserId) -> Result<BTreeSet<UserId>> {
        self.ensure_online()?;
        let tables = self.tables.read().await;

        Ok(tables
            .friendships
            .iter()
            .filter(|edge| edge.user_id == user && edge.status == FriendshipStatus::Accepted)
            .map(|edge| edge.friend_id)
            .collect())
    }

    async fn add_friend(&self, user: UserId, friend: UserId) -> Result<Friendship> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        if user == friend {
            return Err(StoreError::Conflict(String::from(
                "a user cannot befriend themselves",
            )));
        }
        ensure_user(&tables, user)?;
        ensure_user(&tables, friend)?;
        if tables
            .friendships
            .iter()
            .any(|edge| edge.user_id == user && edge.friend_id == friend)
        {
            return Err(StoreError::Conflict(format!(
                "friendship {} -> {} already exists",
                user, friend
            )));
        }

        Ok(insert_friendship(
            &mut tables,
            user,
            friend,
            FriendshipStatus::Pending,
        ))
    }

    async fn accept_friend_request(
        &self,
        friendship_id: i32,
        recipient: UserId,
    ) -> Result<Option<Friendship>> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        let accepted = tables
            .friendships
            .iter_mut()
            .find(|edge| {
                edge.id == friendship_id
                    && edge.friend_id == recipient
                    && edge.status == FriendshipStatus::Pending
            })
            .map(|edge| {
                edge.status = FriendshipStatus::Accepted;
                edge.updated_at = Utc::now();
                edge.clone()
            });

        Ok(accepted)
    }

    async fn list_friends(&self, user: UserId) -> Result<Vec<FriendSummary>> {
        self.ensure_online()?;
        let tables = self.tables.read().await;

        let mut friends: Vec<FriendSummary> = tables
            .friendships
            .iter()
            .filter(|edge| edge.user_id == user && edge.status == FriendshipStatus::Accepted)
            .filter_map(|edge| {
                tables.users.get(&edge.friend_id).map(|friend| FriendSummary {
                    id: edge.id,
                    friend_id: edge.friend_id,
                    status: edge.status,
                    friend_name: friend.name.clone(),
                    friend_email: friend.email.clone(),
                })
            })
            .collect();
        friends.sort_by_key(|friend| friend.friend_id);

        Ok(friends)
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn aggregate_stats(
        &self,
        users: &BTreeSet<UserId>,
    ) -> Result<HashMap<UserId, PeerStats>> {
        self.ensure_online()?;
        let tables = self.tables.read().await;

        let mut stats: HashMap<UserId, PeerStats> = HashMap::with_capacity(users.len());
        for session in tables
            .study_sessions
            .iter()
            .filter(|session| users.contains(&session.user_id))
        {
            let entry = stats.entry(session.user_id).or_default();
            entry.study_minutes += i64::from(session.duration_minutes);
            entry.pomodoros += i64::from(session.pomodoro_count);
        }
        for assignment in tables.assignments.iter().filter(|assignment| {
            users.contains(&assignment.user_id) && assignment.status == AssignmentStatus::Completed
        }) {
            stats.entry(assignment.user_id).or_default().completed_assignments += 1;
        }

        let mut scores: HashMap<UserId, (i64, i64)> = HashMap::new();
        for attempt in tables
            .quiz_attempts
            .iter()
            .filter(|attempt| users.contains(&attempt.user_id))
        {
            let (sum, count) = scores.entry(attempt.user_id).or_default();
            *sum += i64::from(attempt.score);
            *count += 1;
        }
        for (user, (sum, count)) in scores {
            stats.entry(user).or_default().avg_quiz_score = sum as f64 / count as f64;
        }

        Ok(stats)
    }

    async fn create_study_session(
        &self,
        user: UserId,
        session: NewStudySession,
    ) -> Result<StudySession> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        ensure_user(&tables, user)?;
        if session.duration_minutes < 0 || session.pomodoro_count < 0 {
            return Err(StoreError::Conflict(String::from(
                "study session totals must not be negative",
            )));
        }

        Ok(insert_study_session(&mut tables, user, session))
    }

    async fn study_session_stats(
        &self,
        user: UserId,
        since: DateTime<Utc>,
    ) -> Result<SessionStats> {
        self.ensure_online()?;
        let tables = self.tables.read().await;

        let mut stats = SessionStats::default();
        for session in tables
            .study_sessions
            .iter()
            .filter(|session| session.user_id == user && session.created_at >= since)
        {
            stats.total_sessions += 1;
            stats.total_minutes += i64::from(session.duration_minutes);
            stats.total_pomodoros += i64::from(session.pomodoro_count);
        }
        if stats.total_sessions > 0 {
            stats.avg_duration = stats.total_minutes as f64 / stats.total_sessions as f64;
        }

        Ok(stats)
    }

    async fn create_assignment(
        &self,
        user: UserId,
        assignment: NewAssignment,
    ) -> Result<Assignment> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        ensure_user(&tables, user)?;
        Ok(insert_assignment(&mut tables, user, assignment))
    }

    async fn update_assignment_status(
        &self,
        assignment_id: i32,
        owner: UserId,
        status: AssignmentStatus,
    ) -> Result<Option<Assignment>> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        Ok(set_assignment_status(&mut tables, assignment_id, owner, status))
    }

    async fn create_quiz_attempt(
        &self,
        user: UserId,
        quiz_id: i32,
        score: i32,
    ) -> Result<QuizAttempt> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        ensure_user(&tables, user)?;
        if !(0..=100).contains(&score) {
            return Err(StoreError::Conflict(format!(
                "quiz score {} is out of range",
                score
            )));
        }

        Ok(insert_quiz_attempt(&mut tables, user, quiz_id, score))
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn resolve_names(&self, users: &BTreeSet<UserId>) -> Result<HashMap<UserId, String>> {
        self.ensure_online()?;
        let tables = self.tables.read().await;

        Ok(users
            .iter()
            .filter_map(|user| {
                tables
                    .users
                    .get(user)
                    .and_then(|record| record.name.clone())
                    .map(|name| (*user, name))
            })
            .collect())
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.ensure_online()
    }
}
