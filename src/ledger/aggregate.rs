//! Read-side aggregation over the ledger
//!
//! Today's progress, lifetime totals, and paginated grant history. Shares
//! the day-window policy with the write path so both sides agree on what
//! "today" means. Never mutates state.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{ActivityType, DailyCaps, DayPolicy, LedgerStore, RewardGrant};
use crate::types::{LedgerError, Result};

/// Per-type daily progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeProgress {
    /// Sum of raw magnitudes recorded today
    pub total: u64,
    /// FitCoins earned today from this type
    pub rewards_earned: u64,
    /// Configured daily cap for this type
    pub rewards_max: u64,
}

/// Today's progress across both activity types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodaySummary {
    pub steps: TypeProgress,
    pub workout: TypeProgress,
}

/// Lifetime and daily earnings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSummary {
    /// Equal to total_earned while no spend path exists
    pub total_balance: u64,
    pub total_earned: u64,
    pub earned_today: u64,
}

/// One page of grant history
#[derive(Debug, Clone)]
pub struct AssetHistory {
    pub items: Vec<RewardGrant>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Read-only queries over the ledger store
pub struct AggregationService {
    store: Arc<dyn LedgerStore>,
    caps: DailyCaps,
    days: DayPolicy,
}

impl AggregationService {
    pub fn new(store: Arc<dyn LedgerStore>, caps: DailyCaps, days: DayPolicy) -> Self {
        Self { store, caps, days }
    }

    /// Today's per-type activity totals and earnings
    pub async fn today_summary(&self, user_id: &str, now: DateTime<Utc>) -> Result<TodaySummary> {
        let window = self.days.window_containing(now);

        let steps_total = self
            .store
            .sum_activity_in_window(user_id, ActivityType::Steps, &window)
            .await?;
        let workout_total = self
            .store
            .sum_activity_in_window(user_id, ActivityType::Workout, &window)
            .await?;
        let steps_earned = self
            .store
            .sum_rewards_in_window(user_id, Some(ActivityType::Steps), &window)
            .await?;
        let workout_earned = self
            .store
            .sum_rewards_in_window(user_id, Some(ActivityType::Workout), &window)
            .await?;

        Ok(TodaySummary {
            steps: TypeProgress {
                total: steps_total,
                rewards_earned: steps_earned,
                rewards_max: self.caps.steps,
            },
            workout: TypeProgress {
                total: workout_total,
                rewards_earned: workout_earned,
                rewards_max: self.caps.workout,
            },
        })
    }

    /// Lifetime earnings plus today's total across both types
    pub async fn asset_summary(&self, user_id: &str, now: DateTime<Utc>) -> Result<AssetSummary> {
        let window = self.days.window_containing(now);

        let total_earned = self.store.total_rewards(user_id).await?;
        let earned_today = self
            .store
            .sum_rewards_in_window(user_id, None, &window)
            .await?;

        Ok(AssetSummary {
            total_balance: total_earned,
            total_earned,
            earned_today,
        })
    }

    /// Paginated grant history, newest first. Out-of-range pages return an
    /// empty item list, not an error.
    pub async fn asset_history(&self, user_id: &str, page: u64, limit: u64) -> Result<AssetHistory> {
        if page < 1 {
            return Err(LedgerError::InvalidInput("page must be >= 1".into()));
        }
        if limit < 1 {
            return Err(LedgerError::InvalidInput("limit must be >= 1".into()));
        }

        let skip = (page - 1).saturating_mul(limit);
        let rewards = self.store.reward_history(user_id, skip, limit).await?;

        Ok(AssetHistory {
            items: rewards.items,
            total: rewards.total,
            page,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ActivityRecorder, MemoryLedgerStore, RewardRates};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 9, 30, 0).unwrap()
    }

    fn services() -> (ActivityRecorder, AggregationService) {
        let store = Arc::new(MemoryLedgerStore::new());
        let recorder = ActivityRecorder::new(
            Arc::clone(&store) as Arc<dyn LedgerStore>,
            RewardRates::default(),
            DailyCaps::default(),
            DayPolicy::utc(),
        );
        let aggregator =
            AggregationService::new(store, DailyCaps::default(), DayPolicy::utc());
        (recorder, aggregator)
    }

    #[tokio::test]
    async fn test_today_summary_scenario() {
        let (recorder, aggregator) = services();
        let now = fixed_now();

        recorder
            .record("u1", ActivityType::Steps, 5000, now)
            .await
            .unwrap();
        let summary = aggregator.today_summary("u1", now).await.unwrap();
        assert_eq!(summary.steps.total, 5000);
        assert_eq!(summary.steps.rewards_earned, 50);
        assert_eq!(summary.steps.rewards_max, 100);
        assert_eq!(summary.workout.total, 0);

        recorder
            .record("u1", ActivityType::Steps, 6000, now)
            .await
            .unwrap();
        let summary = aggregator.today_summary("u1", now).await.unwrap();
        assert_eq!(summary.steps.total, 11000);
        assert_eq!(summary.steps.rewards_earned, 100);
    }

    #[tokio::test]
    async fn test_asset_summary_counts_both_types() {
        let (recorder, aggregator) = services();
        let now = fixed_now();

        recorder
            .record("u1", ActivityType::Steps, 5000, now)
            .await
            .unwrap();
        recorder
            .record("u1", ActivityType::Workout, 10, now)
            .await
            .unwrap();

        let summary = aggregator.asset_summary("u1", now).await.unwrap();
        assert_eq!(summary.total_earned, 100);
        assert_eq!(summary.total_balance, 100);
        assert_eq!(summary.earned_today, 100);
    }

    #[tokio::test]
    async fn test_read_side_idempotence() {
        let (recorder, aggregator) = services();
        let now = fixed_now();

        recorder
            .record("u1", ActivityType::Steps, 3000, now)
            .await
            .unwrap();

        let first = aggregator.asset_summary("u1", now).await.unwrap();
        let second = aggregator.asset_summary("u1", now).await.unwrap();
        assert_eq!(first, second);

        let s1 = aggregator.today_summary("u1", now).await.unwrap();
        let s2 = aggregator.today_summary("u1", now).await.unwrap();
        assert_eq!(s1, s2);
    }

    #[tokio::test]
    async fn test_history_pagination_validation() {
        let (_, aggregator) = services();

        assert!(matches!(
            aggregator.asset_history("u1", 0, 20).await.unwrap_err(),
            LedgerError::InvalidInput(_)
        ));
        assert!(matches!(
            aggregator.asset_history("u1", 1, 0).await.unwrap_err(),
            LedgerError::InvalidInput(_)
        ));

        // Empty ledger: valid page returns an empty list
        let history = aggregator.asset_history("u1", 3, 20).await.unwrap();
        assert!(history.items.is_empty());
        assert_eq!(history.total, 0);
        assert_eq!(history.page, 3);
    }
}
