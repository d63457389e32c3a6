// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental time-series synchronization.
//!
//! For each domain (sleep, heart, activity) the workflow is:
//! 1. Read stored records inside the trailing window
//! 2. Fetch from Fitbit starting at the stored watermark (or the window start)
//! 3. Drop records already stored, replace the boundary date
//! 4. Write only the delta
//! 5. Return the merged view for scoring

use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};

use crate::db::RecordStore;
use crate::error::{AppError, Result};
use crate::models::activity::ACTIVITY_METRICS;
use crate::models::heart::HeartSummary;
use crate::models::{ActivityRecord, HeartRecord, SleepRecord, TimeSeriesRecord};
use crate::services::fitbit::TimeSeriesProvider;

/// Length of the trailing window, in days.
pub const BASE_PERIOD_DAYS: i64 = 100;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// How a fetched record is recognised as already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Only a field-for-field identical record counts as stored.
    WholeRecord,
    /// Any stored record with the same date key counts, except on the
    /// boundary date which is always refreshed.
    DateKey,
}

/// Result of reconciling a fetched window against stored records.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome<R> {
    /// Stored records still current plus the delta.
    pub merged: Vec<R>,
    /// Records to write.
    pub delta: Vec<R>,
}

/// Reconcile `fetched` against `stored`.
///
/// `watermark` is the maximum stored date key. Stored records on that date
/// that did not come back unchanged are evicted when the fetch returned
/// anything for that date, so the refreshed copy replaces them.
pub fn merge_window<R: TimeSeriesRecord>(
    stored: Vec<R>,
    fetched: Vec<R>,
    watermark: Option<&str>,
    policy: DedupPolicy,
) -> MergeOutcome<R> {
    let mut delta: Vec<R> = Vec::new();
    for record in fetched.iter() {
        if stored.contains(record) || delta.contains(record) {
            continue;
        }
        if policy == DedupPolicy::DateKey
            && Some(record.date_key()) != watermark
            && stored.iter().any(|s| s.date_key() == record.date_key())
        {
            continue;
        }
        delta.push(record.clone());
    }

    let refreshed_boundary = watermark
        .filter(|boundary| fetched.iter().any(|r| r.date_key() == *boundary));

    let mut merged: Vec<R> = match refreshed_boundary {
        Some(boundary) => stored
            .into_iter()
            .filter(|s| s.date_key() != boundary || fetched.contains(s))
            .collect(),
        None => stored,
    };
    merged.extend(delta.iter().cloned());

    MergeOutcome { merged, delta }
}

/// Window start (inclusive) for a sync run on `today`.
pub fn window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(BASE_PERIOD_DAYS)
}

/// Synchronizes one user's Fitbit data into the store.
///
/// Domains are synced one at a time; a provider failure aborts the
/// current domain and propagates. Deltas written for earlier domains stay
/// written.
pub struct Synchronizer<'a, S, P> {
    store: &'a S,
    provider: &'a P,
    line_user_id: &'a str,
    today: NaiveDate,
}

impl<'a, S: RecordStore, P: TimeSeriesProvider> Synchronizer<'a, S, P> {
    pub fn new(store: &'a S, provider: &'a P, line_user_id: &'a str, today: NaiveDate) -> Self {
        Self {
            store,
            provider,
            line_user_id,
            today,
        }
    }

    fn window_start(&self) -> String {
        window_start(self.today).format(DATE_FORMAT).to_string()
    }

    fn end_date(&self) -> String {
        self.today.format(DATE_FORMAT).to_string()
    }

    /// Stored records for the window plus the date to resume fetching from.
    async fn load_window<R: TimeSeriesRecord>(
        &self,
        threshold: &str,
    ) -> Result<(Vec<R>, Option<String>)> {
        let stored: Vec<R> = self
            .store
            .query_since(self.line_user_id, R::RANGE_FIELD, threshold)
            .await?;

        let watermark = stored.iter().map(|r| r.date_key()).max().map(str::to_string);
        Ok((stored, watermark))
    }

    /// Merge, persist the delta and return the merged view.
    async fn reconcile<R: TimeSeriesRecord>(
        &self,
        stored: Vec<R>,
        fetched: Vec<R>,
        watermark: Option<&str>,
        policy: DedupPolicy,
    ) -> Result<Vec<R>> {
        let fetched_count = fetched.len();
        let outcome = merge_window(stored, fetched, watermark, policy);

        if !outcome.delta.is_empty() {
            self.store.batch_write(&outcome.delta).await?;
        }

        tracing::info!(
            table = R::COLLECTION,
            user_id = self.line_user_id,
            watermark = watermark.unwrap_or("-"),
            fetched = fetched_count,
            written = outcome.delta.len(),
            merged = outcome.merged.len(),
            "Domain synchronized"
        );

        Ok(outcome.merged)
    }

    /// Sync sleep logs.
    pub async fn update_sleep(&self) -> Result<Vec<SleepRecord>> {
        let threshold = format!("{}T00:00:00.000", self.window_start());
        let (stored, watermark) = self.load_window::<SleepRecord>(&threshold).await?;
        let base = watermark.clone().unwrap_or_else(|| self.window_start());

        let fetched: Vec<SleepRecord> = self
            .provider
            .sleep_range(&base, &self.end_date())
            .await?
            .into_iter()
            .map(|log| log.into_record(self.line_user_id))
            .collect();

        self.reconcile(stored, fetched, watermark.as_deref(), DedupPolicy::WholeRecord)
            .await
    }

    /// Sync daily heart rate summaries.
    pub async fn update_heart(&self) -> Result<Vec<HeartRecord>> {
        let threshold = self.window_start();
        let (stored, watermark) = self.load_window::<HeartRecord>(&threshold).await?;
        let base = watermark.clone().unwrap_or_else(|| self.window_start());

        let points = self
            .provider
            .time_series("activities/heart", &base, &self.end_date())
            .await?;

        let fetched = points
            .into_iter()
            .map(|point| {
                let summary: HeartSummary = serde_json::from_value(point.value).map_err(|e| {
                    AppError::FitbitApi(format!(
                        "Malformed heart summary on {}: {}",
                        point.date_time, e
                    ))
                })?;
                Ok(HeartRecord::from_summary(
                    self.line_user_id,
                    &point.date_time,
                    summary,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        self.reconcile(stored, fetched, watermark.as_deref(), DedupPolicy::WholeRecord)
            .await
    }

    /// Sync daily activity totals.
    pub async fn update_activities(&self) -> Result<Vec<ActivityRecord>> {
        let threshold = self.window_start();
        let (stored, watermark) = self.load_window::<ActivityRecord>(&threshold).await?;
        let base = watermark.clone().unwrap_or_else(|| self.window_start());

        let fetched = self.fetch_activity_records(&base, &self.end_date()).await?;

        self.reconcile(stored, fetched, watermark.as_deref(), DedupPolicy::DateKey)
            .await
    }

    /// Fetch every activity metric and inner-join them on date.
    async fn fetch_activity_records(&self, base: &str, end: &str) -> Result<Vec<ActivityRecord>> {
        let mut by_date: BTreeMap<String, HashMap<String, f64>> = BTreeMap::new();

        for (i, metric) in ACTIVITY_METRICS.iter().enumerate() {
            let resource = format!("activities/{}", metric);
            let points = self.provider.time_series(&resource, base, end).await?;

            let mut values: HashMap<String, f64> = HashMap::with_capacity(points.len());
            for point in &points {
                values.insert(point.date_time.clone(), point.metric_value()?);
            }

            if i == 0 {
                for (date, value) in values {
                    by_date.entry(date).or_default().insert(metric.to_string(), value);
                }
            } else {
                by_date.retain(|date, _| values.contains_key(date));
                for (date, metrics) in by_date.iter_mut() {
                    if let Some(value) = values.get(date) {
                        metrics.insert(metric.to_string(), *value);
                    }
                }
            }
        }

        Ok(by_date
            .iter()
            .filter_map(|(date, metrics)| {
                ActivityRecord::from_metrics(self.line_user_id, date, metrics)
            })
            .collect())
    }
}
