//! Ledger storage
//!
//! The `LedgerStore` trait is the seam between the reward engine and its
//! persistence. `MongoLedgerStore` backs production; `MemoryLedgerStore`
//! backs dev mode and tests, mirroring how the service degrades to
//! memory-only operation when MongoDB is unavailable in dev mode.

use async_trait::async_trait;
use std::sync::RwLock;

use super::{ActivityRecord, ActivityType, DayWindow, RewardGrant};
use crate::types::{LedgerError, Result};

/// One page of reward history plus the total entry count for the user
#[derive(Debug, Clone)]
pub struct RewardPage {
    pub items: Vec<RewardGrant>,
    pub total: u64,
}

/// Durable append-only storage for activity observations and reward grants
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Sum of grant amounts for the user within the window, optionally
    /// restricted to one activity type
    async fn sum_rewards_in_window(
        &self,
        user_id: &str,
        activity: Option<ActivityType>,
        window: &DayWindow,
    ) -> Result<u64>;

    /// Sum of raw activity magnitudes for the user and type within the window
    async fn sum_activity_in_window(
        &self,
        user_id: &str,
        activity: ActivityType,
        window: &DayWindow,
    ) -> Result<u64>;

    /// Lifetime sum of grant amounts for the user
    async fn total_rewards(&self, user_id: &str) -> Result<u64>;

    /// Append one activity observation and, if present, one reward grant as
    /// a single all-or-nothing unit
    async fn append(&self, activity: ActivityRecord, grant: Option<RewardGrant>) -> Result<()>;

    /// Reward grants for the user, newest first, with skip/limit paging and
    /// the total count of all entries
    async fn reward_history(&self, user_id: &str, skip: u64, limit: u64) -> Result<RewardPage>;
}

#[derive(Default)]
struct MemoryState {
    activities: Vec<ActivityRecord>,
    grants: Vec<RewardGrant>,
}

/// In-memory ledger store backed by append-only vectors
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: RwLock<MemoryState>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Storage("ledger state lock poisoned".into()))
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn sum_rewards_in_window(
        &self,
        user_id: &str,
        activity: Option<ActivityType>,
        window: &DayWindow,
    ) -> Result<u64> {
        let state = self.read()?;
        Ok(state
            .grants
            .iter()
            .filter(|g| g.user_id == user_id)
            .filter(|g| activity.map_or(true, |t| g.activity_type == t))
            .filter(|g| window.contains(g.granted_at))
            .map(|g| g.amount)
            .sum())
    }

    async fn sum_activity_in_window(
        &self,
        user_id: &str,
        activity: ActivityType,
        window: &DayWindow,
    ) -> Result<u64> {
        let state = self.read()?;
        Ok(state
            .activities
            .iter()
            .filter(|a| a.user_id == user_id && a.activity_type == activity)
            .filter(|a| window.contains(a.recorded_at))
            .map(|a| a.value)
            .sum())
    }

    async fn total_rewards(&self, user_id: &str) -> Result<u64> {
        let state = self.read()?;
        Ok(state
            .grants
            .iter()
            .filter(|g| g.user_id == user_id)
            .map(|g| g.amount)
            .sum())
    }

    async fn append(&self, activity: ActivityRecord, grant: Option<RewardGrant>) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| LedgerError::Storage("ledger state lock poisoned".into()))?;
        // Both pushes happen under the same write guard, so readers observe
        // either neither record or both.
        state.activities.push(activity);
        if let Some(grant) = grant {
            state.grants.push(grant);
        }
        Ok(())
    }

    async fn reward_history(&self, user_id: &str, skip: u64, limit: u64) -> Result<RewardPage> {
        let state = self.read()?;
        let mut items: Vec<RewardGrant> = state
            .grants
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        let total = items.len() as u64;

        items.sort_by(|a, b| b.granted_at.cmp(&a.granted_at));
        let items = items
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect();

        Ok(RewardPage { items, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DayPolicy;
    use chrono::{Duration, TimeZone, Utc};

    fn fixed_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_append_and_sums() {
        let store = MemoryLedgerStore::new();
        let now = fixed_now();
        let window = DayPolicy::utc().window_containing(now);

        let activity = ActivityRecord::new("u1", ActivityType::Steps, 5000, now);
        let grant = RewardGrant::new("u1", ActivityType::Steps, 50, "Walked 5000 steps".into(), now);
        store.append(activity, Some(grant)).await.unwrap();

        assert_eq!(
            store
                .sum_rewards_in_window("u1", Some(ActivityType::Steps), &window)
                .await
                .unwrap(),
            50
        );
        assert_eq!(
            store
                .sum_rewards_in_window("u1", Some(ActivityType::Workout), &window)
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .sum_activity_in_window("u1", ActivityType::Steps, &window)
                .await
                .unwrap(),
            5000
        );
        assert_eq!(store.total_rewards("u1").await.unwrap(), 50);
        assert_eq!(store.total_rewards("someone-else").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_window_excludes_other_days() {
        let store = MemoryLedgerStore::new();
        let now = fixed_now();
        let yesterday = now - Duration::days(1);
        let window = DayPolicy::utc().window_containing(now);

        let activity = ActivityRecord::new("u1", ActivityType::Steps, 3000, yesterday);
        let grant =
            RewardGrant::new("u1", ActivityType::Steps, 30, "Walked 3000 steps".into(), yesterday);
        store.append(activity, Some(grant)).await.unwrap();

        assert_eq!(
            store
                .sum_rewards_in_window("u1", Some(ActivityType::Steps), &window)
                .await
                .unwrap(),
            0
        );
        // Lifetime total still sees yesterday's grant
        assert_eq!(store.total_rewards("u1").await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_sum_across_both_types() {
        let store = MemoryLedgerStore::new();
        let now = fixed_now();
        let window = DayPolicy::utc().window_containing(now);

        store
            .append(
                ActivityRecord::new("u1", ActivityType::Steps, 5000, now),
                Some(RewardGrant::new("u1", ActivityType::Steps, 50, "Walked 5000 steps".into(), now)),
            )
            .await
            .unwrap();
        store
            .append(
                ActivityRecord::new("u1", ActivityType::Workout, 4, now),
                Some(RewardGrant::new("u1", ActivityType::Workout, 20, "Worked out for 4 minutes".into(), now)),
            )
            .await
            .unwrap();

        assert_eq!(
            store.sum_rewards_in_window("u1", None, &window).await.unwrap(),
            70
        );
    }

    #[tokio::test]
    async fn test_history_paging_newest_first() {
        let store = MemoryLedgerStore::new();
        let base = fixed_now();

        for i in 0..5 {
            let at = base + Duration::minutes(i);
            store
                .append(
                    ActivityRecord::new("u1", ActivityType::Steps, 1000, at),
                    Some(RewardGrant::new(
                        "u1",
                        ActivityType::Steps,
                        10,
                        format!("Walked 1000 steps #{i}"),
                        at,
                    )),
                )
                .await
                .unwrap();
        }

        let page = store.reward_history("u1", 0, 3).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 3);
        assert!(page.items[0].granted_at > page.items[1].granted_at);
        assert!(page.items[1].granted_at > page.items[2].granted_at);

        let page2 = store.reward_history("u1", 3, 3).await.unwrap();
        assert_eq!(page2.items.len(), 2);

        // Out-of-range page is empty, not an error
        let page3 = store.reward_history("u1", 100, 3).await.unwrap();
        assert!(page3.items.is_empty());
        assert_eq!(page3.total, 5);
    }

    #[tokio::test]
    async fn test_activity_without_grant() {
        let store = MemoryLedgerStore::new();
        let now = fixed_now();
        let window = DayPolicy::utc().window_containing(now);

        store
            .append(ActivityRecord::new("u1", ActivityType::Steps, 500, now), None)
            .await
            .unwrap();

        assert_eq!(
            store
                .sum_activity_in_window("u1", ActivityType::Steps, &window)
                .await
                .unwrap(),
            500
        );
        assert_eq!(store.total_rewards("u1").await.unwrap(), 0);
    }
}
