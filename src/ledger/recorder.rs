//! Activity recorder
//!
//! The sole writer of the ledger. Validates input, prices the measurement,
//! clamps it against the daily cap, and appends the observation plus any
//! grant as one atomic unit.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use super::{
    ActivityRecord, ActivityType, CapEnforcer, DailyCaps, DayPolicy, GrantDecision, LedgerStore,
    RewardGrant, RewardPolicy, RewardRates,
};
use crate::types::{LedgerError, Result};

/// Result of one recorder call
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub activity: ActivityRecord,
    pub granted: u64,
    pub decision: GrantDecision,
}

impl RecordOutcome {
    /// Human-readable outcome line, distinguishing a grant from a cap-reached
    /// recording and from a measurement too small to earn anything
    pub fn message(&self) -> String {
        match self.decision {
            GrantDecision::Granted(n) => match self.activity.activity_type {
                ActivityType::Steps => format!("Great job! You earned {} FitCoins!", n),
                ActivityType::Workout => format!("Excellent workout! You earned {} FitCoins!", n),
            },
            GrantDecision::CapReached(n) if n > 0 => {
                format!("You earned {} FitCoins - daily reward limit reached.", n)
            }
            GrantDecision::CapReached(_) => {
                "Activity recorded, but daily reward limit reached.".to_string()
            }
            GrantDecision::NoReward => "Activity recorded.".to_string(),
        }
    }
}

/// Orchestrates validate -> price -> clamp -> append
pub struct ActivityRecorder {
    store: Arc<dyn LedgerStore>,
    policy: RewardPolicy,
    enforcer: CapEnforcer,
    days: DayPolicy,
}

impl ActivityRecorder {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        rates: RewardRates,
        caps: DailyCaps,
        days: DayPolicy,
    ) -> Self {
        Self {
            store,
            policy: RewardPolicy::new(rates),
            enforcer: CapEnforcer::new(caps),
            days,
        }
    }

    /// Record one activity measurement for the user.
    ///
    /// The current instant is passed in by the caller so day-window
    /// resolution stays deterministic under test.
    pub async fn record(
        &self,
        user_id: &str,
        activity: ActivityType,
        magnitude: i64,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome> {
        if magnitude < 1 {
            return Err(LedgerError::InvalidInput(format!(
                "magnitude must be a positive integer, got {}",
                magnitude
            )));
        }
        let magnitude = magnitude as u64;
        let raw = self.policy.raw_reward(activity, magnitude);

        // The guard must span the prior-total read and the append: without
        // it, concurrent calls for the same (user, type) each observe a
        // stale total and jointly overshoot the cap.
        let _guard = self.enforcer.acquire(user_id, activity).await;

        let window = self.days.window_containing(now);
        let prior = self
            .store
            .sum_rewards_in_window(user_id, Some(activity), &window)
            .await?;
        let decision = self.enforcer.clamp(activity, prior, raw);
        let granted = decision.amount();

        let record = ActivityRecord::new(user_id, activity, magnitude, now);
        let grant = (granted > 0).then(|| {
            RewardGrant::new(user_id, activity, granted, reason_for(activity, magnitude), now)
        });

        self.store.append(record.clone(), grant).await?;

        debug!(
            user = user_id,
            activity = %activity,
            magnitude,
            raw,
            prior,
            granted,
            "activity recorded"
        );

        Ok(RecordOutcome {
            activity: record,
            granted,
            decision,
        })
    }
}

/// Grant description, e.g. "Walked 5000 steps"
fn reason_for(activity: ActivityType, magnitude: u64) -> String {
    match activity {
        ActivityType::Steps => format!("Walked {} steps", magnitude),
        ActivityType::Workout => format!("Worked out for {} minutes", magnitude),
    }
}
