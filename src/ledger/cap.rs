//! Daily cap enforcement
//!
//! Clamps a proposed reward so the cumulative granted total for a
//! (user, activity type, day) never exceeds the configured cap, and provides
//! the per-key lock that serializes the check-then-append sequence under
//! concurrent requests for the same user and type.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::ActivityType;

/// Configured per-type daily caps
#[derive(Debug, Clone, Copy)]
pub struct DailyCaps {
    pub steps: u64,
    pub workout: u64,
}

impl Default for DailyCaps {
    fn default() -> Self {
        Self {
            steps: 100,
            workout: 100,
        }
    }
}

impl DailyCaps {
    pub fn cap_for(&self, activity: ActivityType) -> u64 {
        match activity {
            ActivityType::Steps => self.steps,
            ActivityType::Workout => self.workout,
        }
    }
}

/// Outcome of clamping a proposed reward against the daily cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantDecision {
    /// The full raw reward fits under the cap
    Granted(u64),
    /// The cap boundary was hit: grants whatever remained (possibly zero)
    CapReached(u64),
    /// The raw reward was zero to begin with
    NoReward,
}

impl GrantDecision {
    /// The amount actually grantable
    pub fn amount(&self) -> u64 {
        match self {
            Self::Granted(n) | Self::CapReached(n) => *n,
            Self::NoReward => 0,
        }
    }

    pub fn cap_reached(&self) -> bool {
        matches!(self, Self::CapReached(_))
    }
}

/// Cap enforcer: clamp decisions plus the per-(user, type) lock table.
///
/// Locking per (user, type) rather than (user, type, day) serializes strictly
/// more than required and leaves no stale day-keyed entries to clean up.
pub struct CapEnforcer {
    caps: DailyCaps,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CapEnforcer {
    pub fn new(caps: DailyCaps) -> Self {
        Self {
            caps,
            locks: DashMap::new(),
        }
    }

    pub fn caps(&self) -> &DailyCaps {
        &self.caps
    }

    /// Acquire the lock serializing all grants for this (user, type).
    ///
    /// The caller must hold the guard from before reading the prior daily
    /// total until after the ledger append - that is what keeps concurrent
    /// requests from jointly overshooting the cap.
    pub async fn acquire(&self, user_id: &str, activity: ActivityType) -> OwnedMutexGuard<()> {
        let key = format!("{}:{}", user_id, activity.as_str());
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Clamp a proposed raw reward given the already-granted total for today
    pub fn clamp(&self, activity: ActivityType, prior_today: u64, raw: u64) -> GrantDecision {
        let cap = self.caps.cap_for(activity);
        if prior_today >= cap {
            return GrantDecision::CapReached(0);
        }
        if raw == 0 {
            return GrantDecision::NoReward;
        }
        let remaining = cap - prior_today;
        if raw > remaining {
            GrantDecision::CapReached(remaining)
        } else {
            GrantDecision::Granted(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enforcer() -> CapEnforcer {
        CapEnforcer::new(DailyCaps::default())
    }

    #[test]
    fn test_full_grant_under_cap() {
        assert_eq!(
            enforcer().clamp(ActivityType::Steps, 0, 50),
            GrantDecision::Granted(50)
        );
        assert_eq!(
            enforcer().clamp(ActivityType::Steps, 40, 50),
            GrantDecision::Granted(50)
        );
    }

    #[test]
    fn test_exact_boundary_grants_full_reward() {
        // prior + raw == cap: the whole raw reward fits
        assert_eq!(
            enforcer().clamp(ActivityType::Steps, 50, 50),
            GrantDecision::Granted(50)
        );
    }

    #[test]
    fn test_one_over_boundary_clamps_to_remainder() {
        assert_eq!(
            enforcer().clamp(ActivityType::Steps, 50, 51),
            GrantDecision::CapReached(50)
        );
        assert_eq!(
            enforcer().clamp(ActivityType::Workout, 99, 5),
            GrantDecision::CapReached(1)
        );
    }

    #[test]
    fn test_cap_already_reached() {
        assert_eq!(
            enforcer().clamp(ActivityType::Steps, 100, 50),
            GrantDecision::CapReached(0)
        );
        assert_eq!(
            enforcer().clamp(ActivityType::Steps, 100, 0),
            GrantDecision::CapReached(0)
        );
    }

    #[test]
    fn test_zero_raw_reward() {
        assert_eq!(
            enforcer().clamp(ActivityType::Steps, 0, 0),
            GrantDecision::NoReward
        );
    }

    #[test]
    fn test_decision_amounts() {
        assert_eq!(GrantDecision::Granted(50).amount(), 50);
        assert_eq!(GrantDecision::CapReached(10).amount(), 10);
        assert_eq!(GrantDecision::CapReached(0).amount(), 0);
        assert_eq!(GrantDecision::NoReward.amount(), 0);
        assert!(GrantDecision::CapReached(0).cap_reached());
        assert!(!GrantDecision::NoReward.cap_reached());
    }

    #[tokio::test]
    async fn test_locks_are_per_user_and_type() {
        let enforcer = enforcer();

        // Different keys must not block each other
        let _a = enforcer.acquire("alice", ActivityType::Steps).await;
        let _b = enforcer.acquire("alice", ActivityType::Workout).await;
        let _c = enforcer.acquire("bob", ActivityType::Steps).await;

        // The same key is held: try_lock through a fresh acquire would block,
        // so verify via the map entry directly
        let key = "alice:STEPS".to_string();
        let entry = enforcer.locks.get(&key).expect("lock entry exists");
        assert!(entry.value().try_lock().is_err());
    }
}
