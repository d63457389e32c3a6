// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily condition score.
//!
//! Joins sleep, heart and activity records per day, buckets the latest
//! day's activity index and sleep duration against the trailing window,
//! derives a short-term trend for each, and maps the resulting key to a
//! canned message.

use std::collections::{BTreeMap, HashMap};

use crate::error::{AppError, Result};
use crate::models::{ActivityRecord, HeartRecord, SleepRecord};
use crate::services::messages::ScoreMessages;

/// Number of most recent joined days the statistics are computed over.
pub const WINDOW_DAYS: usize = 30;

/// Trend weights, oldest to newest, applied to the last four levels.
pub const TREND_WEIGHTS: [f64; 4] = [0.2, 0.5, 0.7, 1.0];

/// Weighted sum above which the trend flag is set.
pub const TREND_THRESHOLD: f64 = 1.5;

/// Sleep counters summed over every segment of one date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SleepTotals {
    pub awake_count: i64,
    pub awake_duration: i64,
    pub awakenings_count: i64,
    pub duration: i64,
    pub efficiency: i64,
    pub minutes_after_wakeup: i64,
    pub minutes_asleep: i64,
    pub minutes_awake: i64,
    pub minutes_to_fall_asleep: i64,
    pub restless_count: i64,
    pub restless_duration: i64,
}

impl SleepTotals {
    fn add(&mut self, r: &SleepRecord) {
        self.awake_count += r.awake_count;
        self.awake_duration += r.awake_duration;
        self.awakenings_count += r.awakenings_count;
        self.duration += r.duration;
        self.efficiency += r.efficiency;
        self.minutes_after_wakeup += r.minutes_after_wakeup;
        self.minutes_asleep += r.minutes_asleep;
        self.minutes_awake += r.minutes_awake;
        self.minutes_to_fall_asleep += r.minutes_to_fall_asleep;
        self.restless_count += r.restless_count;
        self.restless_duration += r.restless_duration;
    }
}

/// One user-day present in all three domains.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRow {
    pub user_id: String,
    pub date: String,
    pub sleep: SleepTotals,
    pub resting_heart_rate: Option<i64>,
    pub activity: ActivityRecord,
}

/// Sum sleep segments per (user, date of sleep).
pub fn aggregate_sleep(sleep: &[SleepRecord]) -> BTreeMap<(String, String), SleepTotals> {
    let mut totals: BTreeMap<(String, String), SleepTotals> = BTreeMap::new();
    for record in sleep {
        totals
            .entry((record.user_id.clone(), record.date_of_sleep.clone()))
            .or_default()
            .add(record);
    }
    totals
}

/// Inner-join the three domains on (user, date), ordered by date.
pub fn join_daily(
    sleep: &[SleepRecord],
    heart: &[HeartRecord],
    activities: &[ActivityRecord],
) -> Vec<DailyRow> {
    let heart_by_day: HashMap<(&str, &str), &HeartRecord> = heart
        .iter()
        .map(|h| ((h.user_id.as_str(), h.date_time.as_str()), h))
        .collect();
    let activity_by_day: HashMap<(&str, &str), &ActivityRecord> = activities
        .iter()
        .map(|a| ((a.user_id.as_str(), a.date_time.as_str()), a))
        .collect();

    let mut rows: Vec<DailyRow> = aggregate_sleep(sleep)
        .into_iter()
        .filter_map(|((user_id, date), totals)| {
            let key = (user_id.as_str(), date.as_str());
            let heart = heart_by_day.get(&key)?;
            let activity = activity_by_day.get(&key)?;
            Some(DailyRow {
                resting_heart_rate: heart.resting_heart_rate,
                activity: (*activity).clone(),
                sleep: totals,
                user_id,
                date,
            })
        })
        .collect();

    rows.sort_by(|a, b| a.date.cmp(&b.date));
    rows
}

/// Arithmetic mean. NaN for an empty slice.
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1). NaN with fewer than two values.
fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Bucket every value into levels 1–4 against the mean and standard
/// deviation of the whole slice.
///
/// 4: above mean+std, 3: above mean, 2: above mean−std, 1: otherwise.
/// An undefined deviation makes the std comparisons false.
pub fn bucket_levels(values: &[f64]) -> Vec<u8> {
    let m = mean(values);
    let s = sample_std(values, m);
    values
        .iter()
        .map(|&v| {
            if v > m + s {
                4
            } else if v > m {
                3
            } else if v > m - s {
                2
            } else {
                1
            }
        })
        .collect()
}

/// 1 if the recent levels are trending high, else 0.
///
/// The newest level takes the last weight; with fewer than four levels
/// only the newest weights are used.
pub fn trend_flag(levels: &[u8]) -> u8 {
    let recent = &levels[levels.len().saturating_sub(TREND_WEIGHTS.len())..];
    let weights = &TREND_WEIGHTS[TREND_WEIGHTS.len() - recent.len()..];
    let sum: f64 = recent
        .iter()
        .zip(weights)
        .map(|(&level, w)| (f64::from(level) - 2.5) * w)
        .sum();
    u8::from(sum > TREND_THRESHOLD)
}

/// Level and trend of the latest day for each signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub activity_level: u8,
    pub activity_trend: u8,
    pub sleep_level: u8,
    pub sleep_trend: u8,
}

impl Score {
    /// Compute from date-ordered rows using the trailing window.
    pub fn from_rows(rows: &[DailyRow]) -> Result<Self> {
        if rows.is_empty() {
            return Err(AppError::InsufficientData);
        }
        let window = &rows[rows.len().saturating_sub(WINDOW_DAYS)..];

        let activity: Vec<f64> = window.iter().map(|r| r.activity.activity_index()).collect();
        let sleep: Vec<f64> = window.iter().map(|r| r.sleep.duration as f64).collect();

        let activity_levels = bucket_levels(&activity);
        let sleep_levels = bucket_levels(&sleep);

        // Non-empty window, so both level vectors have a last element.
        let last = |levels: &[u8]| levels.last().copied().unwrap_or(1);

        Ok(Self {
            activity_level: last(&activity_levels),
            activity_trend: trend_flag(&activity_levels),
            sleep_level: last(&sleep_levels),
            sleep_trend: trend_flag(&sleep_levels),
        })
    }

    /// Composite key: activity level, activity trend, sleep level, sleep trend.
    pub fn key(&self) -> String {
        format!(
            "{}{}{}{}",
            self.activity_level, self.activity_trend, self.sleep_level, self.sleep_trend
        )
    }
}

/// Score key and the message it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub key: String,
    pub message: &'static str,
}

/// Score the merged records and look up the message.
pub fn predict(
    sleep: &[SleepRecord],
    heart: &[HeartRecord],
    activities: &[ActivityRecord],
    messages: &ScoreMessages,
) -> Result<Prediction> {
    let rows = join_daily(sleep, heart, activities);
    let score = Score::from_rows(&rows)?;
    let key = score.key();
    let message = messages.lookup(&key)?;

    tracing::info!(
        rows = rows.len(),
        score_key = %key,
        "Condition scored"
    );

    Ok(Prediction { key, message })
}
