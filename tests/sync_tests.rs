// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental sync and condition scoring against an in-memory store.

use chrono::NaiveDate;
use condition_bot::error::AppError;
use condition_bot::models::activity::ACTIVITY_METRICS;
use condition_bot::models::{ActivityRecord, HeartRecord, SleepRecord};
use condition_bot::services::{compute_condition, ScoreMessages, Synchronizer};
use serde_json::{json, Value};

mod common;
use common::{MemoryStore, ScriptedProvider};

const USER: &str = "U4af4980629";

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn heart_value(resting: i64) -> Value {
    json!({
        "restingHeartRate": resting,
        "heartRateZones": [
            {"name": "Out of Range", "min": 30, "max": 94, "minutes": 1300, "caloriesOut": 1800.5},
            {"name": "Fat Burn", "min": 94, "max": 132, "minutes": 120, "caloriesOut": 540.2}
        ],
        "customHeartRateZones": []
    })
}

/// All nine metrics for one day; `light` drives the activity index.
fn add_activity_day(provider: &ScriptedProvider, date: &str, light: f64) {
    for metric in ACTIVITY_METRICS {
        let value = match metric {
            "minutesLightlyActive" => light,
            "minutesFairlyActive" | "minutesVeryActive" => 0.0,
            "steps" => 8000.0,
            "distance" => 5.62,
            _ => 1500.0,
        };
        provider.add_point(
            &format!("activities/{}", metric),
            date,
            json!(value.to_string()),
        );
    }
}

fn sleep_log(log_id: u64, date: &str, duration: i64) -> Value {
    json!({
        "logId": log_id,
        "dateOfSleep": date,
        "startTime": format!("{}T00:10:00.000", date),
        "endTime": format!("{}T07:00:00.000", date),
        "isMainSleep": true,
        "duration": duration,
        "efficiency": 92,
        "minutesAsleep": duration / 60000,
        "minutesAwake": 20,
        "awakeCount": 1,
        "restlessCount": 6,
        "minuteData": [{"dateTime": "00:10:00", "value": "2"}]
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// HEART
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_heart_first_sync_fetches_full_window() {
    let store = MemoryStore::default();
    let provider = ScriptedProvider::default();
    for (date, rhr) in [("2024-03-08", 60), ("2024-03-09", 61), ("2024-03-10", 59)] {
        provider.add_point("activities/heart", date, heart_value(rhr));
    }

    let sync = Synchronizer::new(&store, &provider, USER, day("2024-03-10"));
    let merged = sync.update_heart().await.unwrap();

    assert_eq!(merged.len(), 3);
    assert_eq!(store.batch_writes(), 1);
    assert_eq!(store.records::<HeartRecord>().len(), 3);
    assert_eq!(
        provider.calls(),
        vec![(
            "activities/heart".to_string(),
            "2023-12-01".to_string(),
            "2024-03-10".to_string()
        )]
    );
}

#[tokio::test]
async fn test_heart_second_sync_writes_nothing() {
    let store = MemoryStore::default();
    let provider = ScriptedProvider::default();
    for (date, rhr) in [("2024-03-09", 61), ("2024-03-10", 59)] {
        provider.add_point("activities/heart", date, heart_value(rhr));
    }

    let sync = Synchronizer::new(&store, &provider, USER, day("2024-03-10"));
    let first = sync.update_heart().await.unwrap();
    let second = sync.update_heart().await.unwrap();

    assert_eq!(store.batch_writes(), 1, "second run must not write");
    assert_eq!(first, second);

    // Resumed from the watermark, not the window start.
    let calls = provider.calls();
    assert_eq!(calls[1].1, "2024-03-10");
}

#[tokio::test]
async fn test_heart_boundary_day_replaced() {
    let store = MemoryStore::default();
    let provider = ScriptedProvider::default();
    provider.add_point("activities/heart", "2024-03-09", heart_value(61));
    provider.add_point("activities/heart", "2024-03-10", heart_value(59));

    Synchronizer::new(&store, &provider, USER, day("2024-03-10"))
        .update_heart()
        .await
        .unwrap();

    // The next day Fitbit has a final value for the 10th and a new day.
    let later = ScriptedProvider::default();
    later.add_point("activities/heart", "2024-03-09", heart_value(61));
    later.add_point("activities/heart", "2024-03-10", heart_value(57));
    later.add_point("activities/heart", "2024-03-11", heart_value(58));

    let merged = Synchronizer::new(&store, &later, USER, day("2024-03-11"))
        .update_heart()
        .await
        .unwrap();

    let dates: Vec<&str> = merged.iter().map(|h| h.date_time.as_str()).collect();
    assert_eq!(dates, vec!["2024-03-09", "2024-03-10", "2024-03-11"]);
    assert_eq!(merged[1].resting_heart_rate, Some(57));
    assert_eq!(store.batch_writes(), 2);

    let stored = store.records::<HeartRecord>();
    assert_eq!(stored.len(), 3);
    assert!(stored
        .iter()
        .any(|h| h.date_time == "2024-03-10" && h.resting_heart_rate == Some(57)));
}

#[tokio::test]
async fn test_empty_provider_window_is_not_an_error() {
    let store = MemoryStore::default();
    let provider = ScriptedProvider::default();

    let merged = Synchronizer::new(&store, &provider, USER, day("2024-03-10"))
        .update_heart()
        .await
        .unwrap();

    assert!(merged.is_empty());
    assert_eq!(store.batch_writes(), 0);
}

#[tokio::test]
async fn test_other_users_records_untouched() {
    let store = MemoryStore::default();
    store.seed(&[HeartRecord {
        user_id: "Uother".to_string(),
        date_time: "2024-03-10".to_string(),
        resting_heart_rate: Some(70),
        heart_rate_zones: vec![],
        custom_heart_rate_zones: vec![],
    }]);
    let provider = ScriptedProvider::default();
    provider.add_point("activities/heart", "2024-03-09", heart_value(61));

    let merged = Synchronizer::new(&store, &provider, USER, day("2024-03-10"))
        .update_heart()
        .await
        .unwrap();

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].user_id, USER);
    // No watermark for this user, so the whole window was requested.
    assert_eq!(provider.calls()[0].1, "2023-12-01");
}

// ═══════════════════════════════════════════════════════════════════════════
// SLEEP
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_sleep_segments_stored_without_minute_data() {
    let store = MemoryStore::default();
    let provider = ScriptedProvider::default();
    provider.add_sleep(sleep_log(1001, "2024-03-09", 25_200_000));
    provider.add_sleep(sleep_log(1002, "2024-03-10", 24_000_000));
    // Nap on the same date is a separate segment.
    provider.add_sleep(sleep_log(1003, "2024-03-10", 1_800_000));

    let merged = Synchronizer::new(&store, &provider, USER, day("2024-03-10"))
        .update_sleep()
        .await
        .unwrap();

    assert_eq!(merged.len(), 3);
    let stored = store.records::<SleepRecord>();
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().all(|s| s.user_id == USER));

    for doc in store.documents::<SleepRecord>() {
        assert!(doc.get("minuteData").is_none());
        assert_eq!(doc["userId"], USER);
    }
}

#[tokio::test]
async fn test_sleep_resync_is_idempotent() {
    let store = MemoryStore::default();
    let provider = ScriptedProvider::default();
    provider.add_sleep(sleep_log(1001, "2024-03-09", 25_200_000));
    provider.add_sleep(sleep_log(1002, "2024-03-10", 24_000_000));
    provider.add_sleep(sleep_log(1003, "2024-03-10", 1_800_000));

    let sync = Synchronizer::new(&store, &provider, USER, day("2024-03-10"));
    sync.update_sleep().await.unwrap();
    let merged = sync.update_sleep().await.unwrap();

    assert_eq!(store.batch_writes(), 1);
    assert_eq!(merged.len(), 3, "both boundary segments kept");
}

// ═══════════════════════════════════════════════════════════════════════════
// ACTIVITY
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_activity_metrics_joined_on_date() {
    let store = MemoryStore::default();
    let provider = ScriptedProvider::default();
    add_activity_day(&provider, "2024-03-09", 200.0);
    add_activity_day(&provider, "2024-03-10", 150.0);
    // Only one metric for the 8th: dropped by the join.
    provider.add_point("activities/steps", "2024-03-08", json!("4000"));

    let merged = Synchronizer::new(&store, &provider, USER, day("2024-03-10"))
        .update_activities()
        .await
        .unwrap();

    let dates: Vec<&str> = merged.iter().map(|a| a.date_time.as_str()).collect();
    assert_eq!(dates, vec!["2024-03-09", "2024-03-10"]);
    assert_eq!(merged[0].minutes_lightly_active, 200.0);
    assert_eq!(merged[0].distance, 5.62);
    assert_eq!(provider.calls().len(), ACTIVITY_METRICS.len());
}

#[tokio::test]
async fn test_activity_second_sync_writes_nothing() {
    let store = MemoryStore::default();
    let provider = ScriptedProvider::default();
    add_activity_day(&provider, "2024-03-09", 200.0);
    add_activity_day(&provider, "2024-03-10", 150.0);

    let sync = Synchronizer::new(&store, &provider, USER, day("2024-03-10"));
    let first = sync.update_activities().await.unwrap();
    let second = sync.update_activities().await.unwrap();

    // The boundary day is refetched but unchanged, so nothing is rewritten.
    assert_eq!(store.batch_writes(), 1, "second run must not write");
    assert_eq!(first, second);
    assert_eq!(second.len(), 2);
    assert_eq!(store.records::<ActivityRecord>().len(), 2);

    let calls = provider.calls();
    assert_eq!(calls.len(), 2 * ACTIVITY_METRICS.len());
    assert!(calls[ACTIVITY_METRICS.len()..]
        .iter()
        .all(|call| call.1 == "2024-03-10"));
}

#[tokio::test]
async fn test_activity_boundary_refreshed_and_new_day_added() {
    let store = MemoryStore::default();
    let provider = ScriptedProvider::default();
    add_activity_day(&provider, "2024-03-09", 200.0);
    add_activity_day(&provider, "2024-03-10", 40.0);

    Synchronizer::new(&store, &provider, USER, day("2024-03-10"))
        .update_activities()
        .await
        .unwrap();

    let later = ScriptedProvider::default();
    add_activity_day(&later, "2024-03-10", 180.0);
    add_activity_day(&later, "2024-03-11", 90.0);

    let merged = Synchronizer::new(&store, &later, USER, day("2024-03-11"))
        .update_activities()
        .await
        .unwrap();

    assert_eq!(merged.len(), 3);
    let boundary: Vec<&ActivityRecord> = merged
        .iter()
        .filter(|a| a.date_time == "2024-03-10")
        .collect();
    assert_eq!(boundary.len(), 1);
    assert_eq!(boundary[0].minutes_lightly_active, 180.0);
    assert_eq!(store.records::<ActivityRecord>().len(), 3);
}

#[tokio::test]
async fn test_provider_failure_propagates() {
    let store = MemoryStore::default();
    let provider = ScriptedProvider::default();
    provider.fail_on("activities/heart");

    let result = Synchronizer::new(&store, &provider, USER, day("2024-03-10"))
        .update_heart()
        .await;

    assert!(matches!(result, Err(AppError::FitbitApi(_))));
    assert_eq!(store.batch_writes(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// CONDITION
// ═══════════════════════════════════════════════════════════════════════════

/// Five joined days, the last one an outlier for both signals.
fn scripted_week() -> ScriptedProvider {
    let provider = ScriptedProvider::default();
    let dates = ["2024-03-06", "2024-03-07", "2024-03-08", "2024-03-09", "2024-03-10"];
    for (i, date) in dates.iter().enumerate() {
        let last = i == dates.len() - 1;
        provider.add_sleep(sleep_log(2000 + i as u64, date, if last { 100 } else { 10 }));
        provider.add_point("activities/heart", date, heart_value(60));
        add_activity_day(&provider, date, if last { 100.0 } else { 10.0 });
    }
    provider
}

#[tokio::test]
async fn test_condition_scores_outlier_day() {
    let store = MemoryStore::default();
    let provider = scripted_week();
    let messages = ScoreMessages::load();

    let prediction = compute_condition(&store, &provider, USER, day("2024-03-10"), &messages)
        .await
        .unwrap();

    // Levels [2,2,2,2,4] for both signals: top level, no sustained trend.
    assert_eq!(prediction.key, "4040");
    assert_eq!(prediction.message, messages.lookup("4040").unwrap());
    assert_eq!(store.batch_writes(), 3);
}

#[tokio::test]
async fn test_condition_domains_run_in_order() {
    let store = MemoryStore::default();
    let provider = scripted_week();

    compute_condition(&store, &provider, USER, day("2024-03-10"), &ScoreMessages::load())
        .await
        .unwrap();

    let resources: Vec<String> = provider.calls().into_iter().map(|c| c.0).collect();
    assert_eq!(resources[0], "sleep");
    assert_eq!(resources[1], "activities/heart");
    assert!(resources[2..].iter().all(|r| r.starts_with("activities/")));
}

#[tokio::test]
async fn test_condition_failure_keeps_earlier_domains() {
    let store = MemoryStore::default();
    let provider = scripted_week();
    provider.fail_on("activities/steps");

    let result =
        compute_condition(&store, &provider, USER, day("2024-03-10"), &ScoreMessages::load()).await;

    assert!(matches!(result, Err(AppError::FitbitApi(_))));
    assert_eq!(store.records::<SleepRecord>().len(), 5);
    assert_eq!(store.records::<HeartRecord>().len(), 5);
    assert!(store.records::<ActivityRecord>().is_empty());
}

#[tokio::test]
async fn test_condition_without_data_is_insufficient() {
    let store = MemoryStore::default();
    let provider = ScriptedProvider::default();

    let result =
        compute_condition(&store, &provider, USER, day("2024-03-10"), &ScoreMessages::load()).await;

    assert!(matches!(result, Err(AppError::InsufficientData)));
}
