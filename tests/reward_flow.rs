//! End-to-end tests of the reward ledger engine against the in-memory store

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use fitledger::ledger::{
    ActivityRecorder, ActivityType, AggregationService, DailyCaps, DayPolicy, LedgerStore,
    MemoryLedgerStore, RewardRates,
};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 20, 9, 30, 0).unwrap()
}

struct Harness {
    recorder: Arc<ActivityRecorder>,
    aggregator: AggregationService,
    store: Arc<MemoryLedgerStore>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryLedgerStore::new());
    let recorder = Arc::new(ActivityRecorder::new(
        Arc::clone(&store) as Arc<dyn LedgerStore>,
        RewardRates::default(),
        DailyCaps::default(),
        DayPolicy::utc(),
    ));
    let aggregator = AggregationService::new(
        Arc::clone(&store) as Arc<dyn LedgerStore>,
        DailyCaps::default(),
        DayPolicy::utc(),
    );
    Harness {
        recorder,
        aggregator,
        store,
    }
}

#[tokio::test]
async fn steps_scenario_grants_then_caps() {
    let h = harness();
    let now = fixed_now();

    // 5000 steps at 10/1000: raw 50, granted 50
    let first = h
        .recorder
        .record("u1", ActivityType::Steps, 5000, now)
        .await
        .unwrap();
    assert_eq!(first.granted, 50);

    let summary = h.aggregator.today_summary("u1", now).await.unwrap();
    assert_eq!(summary.steps.rewards_earned, 50);

    // 6000 steps: raw 60, prior 50, clamped to 50, cap reached
    let second = h
        .recorder
        .record("u1", ActivityType::Steps, 6000, now)
        .await
        .unwrap();
    assert_eq!(second.granted, 50);
    assert!(second.decision.cap_reached());
    assert!(second.message().contains("daily reward limit reached"));

    let summary = h.aggregator.today_summary("u1", now).await.unwrap();
    assert_eq!(summary.steps.rewards_earned, 100);

    // Any further call that day grants zero
    let third = h
        .recorder
        .record("u1", ActivityType::Steps, 20000, now)
        .await
        .unwrap();
    assert_eq!(third.granted, 0);

    let summary = h.aggregator.today_summary("u1", now).await.unwrap();
    assert_eq!(summary.steps.rewards_earned, 100);
    assert_eq!(summary.steps.total, 5000 + 6000 + 20000);
}

#[tokio::test]
async fn concurrent_records_never_overshoot_cap() {
    let h = harness();
    let now = fixed_now();

    // 10 concurrent requests, each reward-eligible for 50 coins. Without
    // serialization they could each see prior=0 and jointly grant 500.
    let mut handles = Vec::new();
    for _ in 0..10 {
        let recorder = Arc::clone(&h.recorder);
        handles.push(tokio::spawn(async move {
            recorder
                .record("u1", ActivityType::Steps, 5000, now)
                .await
                .unwrap()
                .granted
        }));
    }

    let mut total_granted = 0u64;
    for handle in handles {
        total_granted += handle.await.unwrap();
    }

    // min(10 x 50, cap) == 100
    assert_eq!(total_granted, 100);

    let window = DayPolicy::utc().window_containing(now);
    let persisted = h
        .store
        .sum_rewards_in_window("u1", Some(ActivityType::Steps), &window)
        .await
        .unwrap();
    assert_eq!(persisted, 100);

    // All ten observations landed even though most earned nothing
    let activity_total = h
        .store
        .sum_activity_in_window("u1", ActivityType::Steps, &window)
        .await
        .unwrap();
    assert_eq!(activity_total, 50000);
}

#[tokio::test]
async fn concurrent_records_under_cap_grant_everything() {
    let h = harness();
    let now = fixed_now();

    // 4 concurrent requests of 20 coins each stay under the cap of 100
    let mut handles = Vec::new();
    for _ in 0..4 {
        let recorder = Arc::clone(&h.recorder);
        handles.push(tokio::spawn(async move {
            recorder
                .record("u1", ActivityType::Workout, 4, now)
                .await
                .unwrap()
                .granted
        }));
    }

    let mut total = 0u64;
    for handle in handles {
        total += handle.await.unwrap();
    }
    assert_eq!(total, 80);
}

#[tokio::test]
async fn concurrent_users_do_not_interfere() {
    let h = harness();
    let now = fixed_now();

    let mut handles = Vec::new();
    for user in ["alice", "bob", "carol"] {
        for _ in 0..3 {
            let recorder = Arc::clone(&h.recorder);
            handles.push(tokio::spawn(async move {
                recorder
                    .record(user, ActivityType::Steps, 5000, now)
                    .await
                    .unwrap();
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Each user hits their own cap independently
    for user in ["alice", "bob", "carol"] {
        let summary = h.aggregator.today_summary(user, now).await.unwrap();
        assert_eq!(summary.steps.rewards_earned, 100);
    }
}

#[tokio::test]
async fn workout_cap_is_independent_of_steps_cap() {
    let h = harness();
    let now = fixed_now();

    // Exhaust steps
    h.recorder
        .record("u1", ActivityType::Steps, 10000, now)
        .await
        .unwrap();

    // 10 minutes at 5/minute grants 50, untouched by the steps cap
    let outcome = h
        .recorder
        .record("u1", ActivityType::Workout, 10, now)
        .await
        .unwrap();
    assert_eq!(outcome.granted, 50);

    let summary = h.aggregator.today_summary("u1", now).await.unwrap();
    assert_eq!(summary.steps.rewards_earned, 100);
    assert_eq!(summary.workout.rewards_earned, 50);

    let assets = h.aggregator.asset_summary("u1", now).await.unwrap();
    assert_eq!(assets.earned_today, 150);
    assert_eq!(assets.total_earned, 150);
    assert_eq!(assets.total_balance, 150);
}

#[tokio::test]
async fn next_day_resets_the_cap() {
    let h = harness();
    let today = fixed_now();
    let tomorrow = today + Duration::days(1);

    h.recorder
        .record("u1", ActivityType::Steps, 10000, today)
        .await
        .unwrap();
    let capped = h
        .recorder
        .record("u1", ActivityType::Steps, 5000, today)
        .await
        .unwrap();
    assert_eq!(capped.granted, 0);

    // A fresh day starts from zero
    let fresh = h
        .recorder
        .record("u1", ActivityType::Steps, 5000, tomorrow)
        .await
        .unwrap();
    assert_eq!(fresh.granted, 50);

    // Lifetime total spans both days
    let assets = h.aggregator.asset_summary("u1", tomorrow).await.unwrap();
    assert_eq!(assets.total_earned, 150);
    assert_eq!(assets.earned_today, 50);
}

#[tokio::test]
async fn history_paginates_newest_first() {
    let h = harness();
    let base = fixed_now();

    // 25 grants, one per day so each clears the cap fresh
    for i in 0..25 {
        let at = base + Duration::days(i);
        let outcome = h
            .recorder
            .record("u1", ActivityType::Workout, 1, at)
            .await
            .unwrap();
        assert_eq!(outcome.granted, 5);
    }

    let page1 = h.aggregator.asset_history("u1", 1, 20).await.unwrap();
    assert_eq!(page1.total, 25);
    assert_eq!(page1.items.len(), 20);
    // Newest first
    for pair in page1.items.windows(2) {
        assert!(pair[0].granted_at >= pair[1].granted_at);
    }
    assert_eq!(page1.items[0].granted_at, base + Duration::days(24));

    let page2 = h.aggregator.asset_history("u1", 2, 20).await.unwrap();
    assert_eq!(page2.items.len(), 5);
    assert_eq!(page2.total, 25);

    // Out-of-range page: empty list, no error
    let page3 = h.aggregator.asset_history("u1", 3, 20).await.unwrap();
    assert!(page3.items.is_empty());
}

#[tokio::test]
async fn grants_carry_typed_source_and_reason() {
    let h = harness();
    let now = fixed_now();

    h.recorder
        .record("u1", ActivityType::Steps, 5000, now)
        .await
        .unwrap();
    h.recorder
        .record("u1", ActivityType::Workout, 10, now)
        .await
        .unwrap();

    let history = h.aggregator.asset_history("u1", 1, 20).await.unwrap();
    assert_eq!(history.items.len(), 2);

    let steps_grant = history
        .items
        .iter()
        .find(|g| g.activity_type == ActivityType::Steps)
        .unwrap();
    assert_eq!(steps_grant.reason, "Walked 5000 steps");
    assert_eq!(steps_grant.amount, 50);

    let workout_grant = history
        .items
        .iter()
        .find(|g| g.activity_type == ActivityType::Workout)
        .unwrap();
    assert_eq!(workout_grant.reason, "Worked out for 10 minutes");
    assert_eq!(workout_grant.amount, 50);
}
