// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily activity model.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::TimeSeriesRecord;
use crate::db::collections;

/// Fitbit activity metrics fetched for every day. The time-series endpoint
/// returns one metric per call, so each is requested separately and the
/// results are joined on date.
pub const ACTIVITY_METRICS: [&str; 9] = [
    "calories",
    "caloriesBMR",
    "steps",
    "distance",
    "minutesSedentary",
    "minutesLightlyActive",
    "minutesFairlyActive",
    "minutesVeryActive",
    "activityCalories",
];

/// Daily activity totals stored in `tbl_activities`, one per user and date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub user_id: String,
    /// Calendar date (`YYYY-MM-DD`)
    pub date_time: String,
    pub calories: f64,
    #[serde(rename = "caloriesBMR")]
    pub calories_bmr: f64,
    pub steps: f64,
    pub distance: f64,
    pub minutes_sedentary: f64,
    pub minutes_lightly_active: f64,
    pub minutes_fairly_active: f64,
    pub minutes_very_active: f64,
    pub activity_calories: f64,
}

impl ActivityRecord {
    /// Build a record from one day's metric values keyed by metric name.
    ///
    /// Returns `None` unless every metric in [`ACTIVITY_METRICS`] is present.
    pub fn from_metrics(user_id: &str, date_time: &str, values: &HashMap<String, f64>) -> Option<Self> {
        let get = |name: &str| values.get(name).copied();
        Some(Self {
            user_id: user_id.to_string(),
            date_time: date_time.to_string(),
            calories: get("calories")?,
            calories_bmr: get("caloriesBMR")?,
            steps: get("steps")?,
            distance: get("distance")?,
            minutes_sedentary: get("minutesSedentary")?,
            minutes_lightly_active: get("minutesLightlyActive")?,
            minutes_fairly_active: get("minutesFairlyActive")?,
            minutes_very_active: get("minutesVeryActive")?,
            activity_calories: get("activityCalories")?,
        })
    }

    /// Intensity-weighted active minutes: light + 2×fair + 3×very.
    pub fn activity_index(&self) -> f64 {
        self.minutes_lightly_active + 2.0 * self.minutes_fairly_active + 3.0 * self.minutes_very_active
    }
}

impl TimeSeriesRecord for ActivityRecord {
    const COLLECTION: &'static str = collections::ACTIVITIES;
    const RANGE_FIELD: &'static str = "dateTime";

    fn date_key(&self) -> &str {
        &self.date_time
    }

    fn document_id(&self) -> String {
        format!("{}_{}", self.user_id, self.date_time)
    }
}
