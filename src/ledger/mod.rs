//! Reward Ledger Engine
//!
//! Converts raw activity measurements into capped FitCoin grants and serves
//! the read-side aggregates derived from the same ledger. The recorder is
//! the sole writer; aggregation never mutates state.

pub mod aggregate;
pub mod cap;
pub mod day;
pub mod mongo_store;
pub mod pricing;
pub mod recorder;
pub mod store;

pub use aggregate::{AggregationService, AssetHistory, AssetSummary, TodaySummary, TypeProgress};
pub use cap::{CapEnforcer, DailyCaps, GrantDecision};
pub use day::{DayPolicy, DayWindow};
pub use mongo_store::MongoLedgerStore;
pub use pricing::{RewardPolicy, RewardRates};
pub use recorder::{ActivityRecorder, RecordOutcome};
pub use store::{LedgerStore, MemoryLedgerStore, RewardPage};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two supported measurement kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Steps,
    Workout,
}

impl ActivityType {
    /// Stable string tag used in lock keys and storage queries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Steps => "STEPS",
            Self::Workout => "WORKOUT",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw activity observation, created once per accepted recorder call.
/// Informational only - never consulted by the cap check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: String,
    pub user_id: String,
    pub activity_type: ActivityType,
    /// Raw magnitude: step count or workout minutes
    pub value: u64,
    pub recorded_at: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(
        user_id: &str,
        activity_type: ActivityType,
        value: u64,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            activity_type,
            value,
            recorded_at,
        }
    }
}

/// An immutable ledger entry crediting a user with FitCoins.
///
/// Carries an explicit activity type so aggregation never has to recover the
/// source from the free-text reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardGrant {
    pub id: String,
    pub user_id: String,
    pub activity_type: ActivityType,
    pub amount: u64,
    /// Human-readable description, e.g. "Walked 5000 steps"
    pub reason: String,
    pub granted_at: DateTime<Utc>,
}

impl RewardGrant {
    pub fn new(
        user_id: &str,
        activity_type: ActivityType,
        amount: u64,
        reason: String,
        granted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            activity_type,
            amount,
            reason,
            granted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_type_tags() {
        assert_eq!(ActivityType::Steps.as_str(), "STEPS");
        assert_eq!(ActivityType::Workout.as_str(), "WORKOUT");

        let json = serde_json::to_string(&ActivityType::Steps).unwrap();
        assert_eq!(json, "\"STEPS\"");

        let back: ActivityType = serde_json::from_str("\"WORKOUT\"").unwrap();
        assert_eq!(back, ActivityType::Workout);
    }
}
