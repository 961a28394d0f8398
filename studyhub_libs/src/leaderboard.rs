use crate::models::{PeerStats, UserId};
use crate::store::{ActivityStore, FriendshipStore, IdentityStore, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio::time::Instant;

pub const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub total_study_minutes: i64,
    pub completed_assignments: i64,
    pub average_quiz_score: f64,
    pub total_pomodoros: i64,
    pub rank: u32,
}

/// Ranks `peers` by total study minutes, highest first.
///
/// Peers missing from `stats` count as having no activity at all. Ties keep ascending user id
/// order, so the same input always yields the same ranking. At most `limit` entries are returned
/// and `rank` is the 1-based position in the returned list.
pub fn rank_peers(
    peers: &BTreeSet<UserId>,
    stats: &HashMap<UserId, PeerStats>,
    names: &HashMap<UserId, String>,
    limit: u32,
) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = peers
        .iter()
        .map(|user| {
            let peer_stats = stats.get(user).copied().unwrap_or_default();
            LeaderboardEntry {
                user_id: *user,
                user_name: names.get(user).cloned(),
                total_study_minutes: peer_stats.study_minutes,
                completed_assignments: peer_stats.completed_assignments,
                average_quiz_score: peer_stats.avg_quiz_score,
                total_pomodoros: peer_stats.pomodoros,
                rank: 0,
            }
        })
        .collect();

    // stable sort: equal minutes stay in ascending id order
    entries.sort_by(|a, b| b.total_study_minutes.cmp(&a.total_study_minutes));
    entries.truncate(limit as usize);
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i as u32 + 1;
    }

    entries
}

/// Computes friend leaderboards on top of a store.
#[derive(Debug, Clone)]
pub struct LeaderboardAggregator<S> {
    store: S,
}

impl<S> LeaderboardAggregator<S>
where
    S: FriendshipStore + ActivityStore + IdentityStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Leaderboard of `user` and the friends `user` has accepted.
    ///
    /// Fails when the store fails; an unreachable store is never reported as an empty board.
    pub async fn compute_leaderboard(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>> {
        let start_process = Instant::now();

        let mut peers: BTreeSet<UserId> = self.store.accepted_friends(user).await?;
        peers.insert(user);
        if peers.is_empty() {
            return Ok(Vec::new());
        }

        let stats = self.store.aggregate_stats(&peers).await?;
        let names = self.store.resolve_names(&peers).await?;
        let entries = rank_peers(&peers, &stats, &names, limit);

        let time = Instant::now().duration_since(start_process).as_millis();
        tracing::info!(
            target: "querylog",
            "user={} peers={} limit={} entries={} elapsed_time={}",
            user,
            peers.len(),
            limit,
            entries.len(),
            time
        );

        Ok(entries)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::{
        Assignment, AssignmentStatus, FriendSummary, Friendship, FriendshipStatus, NewAssignment,
        NewStudySession, QuizAttempt, SessionStats, StudySession,
    };
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    fn stats(
        study_minutes: i64,
        completed_assignments: i64,
        avg_quiz_score: f64,
        pomodoros: i64,
    ) -> PeerStats {
        PeerStats {
            study_minutes,
            completed_assignments,
            avg_quiz_score,
            pomodoros,
        }
    }

    #[test]
    fn test_rank_peers_orders_by_study_minutes() {
        let peers = BTreeSet::from([UserId(1), UserId(2), UserId(3)]);
        let stats = HashMap::from([
            (UserId(1), stats(10, 9, 100.0, 9)),
            (UserId(2), stats(300, 0, 0.0, 1)),
            (UserId(3), stats(150, 1, 50.0, 5)),
        ]);

        let entries = rank_peers(&peers, &stats, &HashMap::new(), 20);
        let order: Vec<(UserId, u32)> = entries.iter().map(|e| (e.user_id, e.rank)).collect();
        assert_eq!(order, vec![(UserId(2), 1), (UserId(3), 2), (UserId(1), 3)]);
        assert!(entries
            .windows(2)
            .all(|pair| pair[0].total_study_minutes >= pair[1].total_study_minutes));
    }

    #[test]
    fn test_rank_peers_breaks_ties_by_user_id() {
        let peers = BTreeSet::from([UserId(7), UserId(3), UserId(5)]);
        let stats = HashMap::from([
            (UserId(7), stats(60, 5, 90.0, 2)),
            (UserId(3), stats(60, 0, 10.0, 2)),
            (UserId(5), stats(60, 1, 0.0, 2)),
        ]);

        let entries = rank_peers(&peers, &stats, &HashMap::new(), 20);
        let ids: Vec<UserId> = entries.iter().map(|e| e.user_id).collect();
        assert_eq!(ids, vec![UserId(3), UserId(5), UserId(7)]);
    }

    #[test]
    fn test_rank_peers_zero_fills_and_truncates() {
        let peers = BTreeSet::from([UserId(1), UserId(2)]);
        let names = HashMap::from([(UserId(1), String::from("alice"))]);

        let entries = rank_peers(&peers, &HashMap::new(), &names, 20);
        assert_eq!(
            entries[0],
            LeaderboardEntry {
                user_id: UserId(1),
                user_name: Some(String::from("alice")),
                total_study_minutes: 0,
                completed_assignments: 0,
                average_quiz_score: 0.0,
                total_pomodoros: 0,
                rank: 1,
            }
        );
        assert_eq!(entries[1].user_name, None);
        assert_eq!(entries[1].rank, 2);

        assert_eq!(rank_peers(&peers, &HashMap::new(), &names, 1).len(), 1);
        assert!(rank_peers(&peers, &HashMap::new(), &names, 0).is_empty());
    }

    #[test]
    fn test_entry_wire_format() {
        let entry = LeaderboardEntry {
            user_id: UserId(4),
            user_name: None,
            total_study_minutes: 45,
            completed_assignments: 1,
            average_quiz_score: 72.5,
            total_pomodoros: 2,
            rank: 1,
        };
        let expected = r#"{"userId":4,"userName":null,"totalStudyMinutes":45,"completedAssignments":1,"averageQuizScore":72.5,"totalPomodoros":2,"rank":1}"#;
        assert_eq!(serde_json::to_string(&entry).unwrap(), expected);
    }

    async fn scenario() -> (MemoryStore, UserId, UserId, UserId) {
        let store = MemoryStore::new();
        let me = store.add_user(Some("me")).await;
        let first = store.add_user(Some("first")).await;
        let second = store.add_user(Some("second")).await;

        store.add_friendship(me, first, FriendshipStatus::Accepted).await;
        store.add_friendship(me, second, FriendshipStatus::Accepted).await;

        store.add_study_session(first, 300, 12).await;
        store.add_assignment(first, AssignmentStatus::Completed).await;
        store.add_assignment(first, AssignmentStatus::Completed).await;
        store.add_assignment(first, AssignmentStatus::InProgress).await;
        store.add_quiz_attempt(first, 80).await;
        store.add_study_session(second, 150, 5).await;
        store.add_assignment(second, AssignmentStatus::Pending).await;

        (store, me, first, second)
    }

    #[tokio::test]
    async fn test_compute_leaderboard_scenario() {
        let (store, me, first, second) = scenario().await;
        let aggregator = LeaderboardAggregator::new(store);

        let entries = aggregator.compute_leaderboard(me, 10).await.unwrap();
        assert_eq!(
            entries,
            vec![
                LeaderboardEntry {
                    user_id: first,
                    user_name: Some(String::from("first")),
                    total_study_minutes: 300,
                    completed_assignments: 2,
                    average_quiz_score: 80.0,
                    total_pomodoros: 12,
                    rank: 1,
                },
                LeaderboardEntry {
                    user_id: second,
                    user_name: Some(String::from("second")),
                    total_study_minutes: 150,
                    completed_assignments: 0,
                    average_quiz_score: 0.0,
                    total_pomodoros: 5,
                    rank: 2,
                },
                LeaderboardEntry {
                    user_id: me,
                    user_name: Some(String::from("me")),
                    total_study_minutes: 0,
                    completed_assignments: 0,
                    average_quiz_score: 0.0,
                    total_pomodoros: 0,
                    rank: 3,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_compute_leaderboard_limit_one() {
        let store = MemoryStore::new();
        let me = store.add_user(Some("me")).await;
        for minutes in [20, 90, 45, 10] {
            let friend = store.add_user(None).await;
            store.add_friendship(me, friend, FriendshipStatus::Accepted).await;
            store.add_study_session(friend, minutes, 1).await;
        }
        let aggregator = LeaderboardAggregator::new(store);

        let entries = aggregator.compute_leaderboard(me, 1).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].total_study_minutes, 90);
        assert_eq!(entries[0].rank, 1);
    }

    #[tokio::test]
    async fn test_compute_leaderboard_without_friends() {
        let store = MemoryStore::new();
        let me = store.add_user(None).await;
        let aggregator = LeaderboardAggregator::new(store);

        let entries = aggregator.compute_leaderboard(me, 20).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, me);
        assert_eq!(entries[0].rank, 1);
    }

    #[tokio::test]
    async fn test_compute_leaderboard_is_idempotent() {
        let (store, me, _, _) = scenario().await;
        let aggregator = LeaderboardAggregator::new(store);

        let first = aggregator.compute_leaderboard(me, 10).await.unwrap();
        let second = aggregator.compute_leaderboard(me, 10).await.unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_compute_leaderboard_propagates_unavailable_store() {
        let (store, me, _, _) = scenario().await;
        store.set_offline(true);
        let aggregator = LeaderboardAggregator::new(store);

        let result = aggregator.compute_leaderboard(me, 10).await;
        assert!(result.unwrap_err().is_unavailable());
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum FailingStep {
        Aggregation,
        Names,
    }

    /// Delegates to a [`MemoryStore`] but loses the connection at one step of the pipeline.
    struct FlakyStore {
        inner: MemoryStore,
        failing: FailingStep,
    }

    impl FlakyStore {
        fn fail_at(&self, step: FailingStep) -> Result<()> {
            if self.failing == step {
                Err(StoreError::Unavailable(String::from("connection reset")))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl FriendshipStore for FlakyStore {
        async fn accepted_friends(&self, user: UserId) -> Result<BTreeSet<UserId>> {
            self.inner.accepted_friends(user).await
        }

        async fn add_friend(&self, user: UserId, friend: UserId) -> Result<Friendship> {
            self.inner.add_friend(user, friend).await
        }

        async fn accept_friend_request(
            &self,
            friendship_id: i32,
            recipient: UserId,
        ) -> Result<Option<Friendship>> {
            self.inner
                .accept_friend_request(friendship_id, recipient)
                .await
        }

        async fn list_friends(&self, user: UserId) -> Result<Vec<FriendSummary>> {
            self.inner.list_friends(user).await
        }
    }

    #[async_trait]
    impl ActivityStore for FlakyStore {
        async fn aggregate_stats(
            &self,
            users: &BTreeSet<UserId>,
        ) -> Result<HashMap<UserId, PeerStats>> {
            self.fail_at(FailingStep::Aggregation)?;
            self.inner.aggregate_stats(users).await
        }

        async fn create_study_session(
            &self,
            user: UserId,
            session: NewStudySession,
        ) -> Result<StudySession> {
            self.inner.create_study_session(user, session).await
        }

        async fn study_session_stats(
            &self,
            user: UserId,
            since: DateTime<Utc>,
        ) -> Result<SessionStats> {
            self.inner.study_session_stats(user, since).await
        }

        async fn create_assignment(
            &self,
            user: UserId,
            assignment: NewAssignment,
        ) -> Result<Assignment> {
            self.inner.create_assignment(user, assignment).await
        }

        async fn update_assignment_status(
            &self,
            assignment_id: i32,
            owner: UserId,
            status: AssignmentStatus,
        ) -> Result<Option<Assignment>> {
            self.inner
                .update_assignment_status(assignment_id, owner, status)
                .await
        }

        async fn create_quiz_attempt(
            &self,
            user: UserId,
            quiz_id: i32,
            score: i32,
        ) -> Result<QuizAttempt> {
            self.inner.create_quiz_attempt(user, quiz_id, score).await
        }
    }

    #[async_trait]
    impl IdentityStore for FlakyStore {
        async fn resolve_names(&self, users: &BTreeSet<UserId>) -> Result<HashMap<UserId, String>> {
            self.fail_at(FailingStep::Names)?;
            self.inner.resolve_names(users).await
        }
    }

    #[tokio::test]
    async fn test_compute_leaderboard_fails_when_a_later_step_fails() {
        for failing in [FailingStep::Aggregation, FailingStep::Names] {
            let (inner, me, first, second) = scenario().await;
            assert_eq!(
                inner.accepted_friends(me).await.unwrap(),
                BTreeSet::from([first, second])
            );
            let aggregator = LeaderboardAggregator::new(FlakyStore { inner, failing });

            let result = aggregator.compute_leaderboard(me, 10).await;
            assert!(result.unwrap_err().is_unavailable(), "{:?}", failing);
        }
    }
}
