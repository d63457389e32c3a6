// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily heart rate summary model.

use serde::{Deserialize, Serialize};

use super::TimeSeriesRecord;
use crate::db::collections;

/// Daily heart rate summary stored in `tbl_heart`, one per user and date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRecord {
    pub user_id: String,
    /// Calendar date (`YYYY-MM-DD`)
    pub date_time: String,
    #[serde(default)]
    pub resting_heart_rate: Option<i64>,
    #[serde(default)]
    pub heart_rate_zones: Vec<HeartRateZone>,
    #[serde(default)]
    pub custom_heart_rate_zones: Vec<HeartRateZone>,
}

/// Minutes spent in one heart rate zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateZone {
    pub name: String,
    pub min: i64,
    pub max: i64,
    #[serde(default)]
    pub minutes: Option<i64>,
    #[serde(default)]
    pub calories_out: Option<f64>,
}

/// The `value` object of an `activities-heart` time-series entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartSummary {
    #[serde(default)]
    pub resting_heart_rate: Option<i64>,
    #[serde(default)]
    pub heart_rate_zones: Vec<HeartRateZone>,
    #[serde(default)]
    pub custom_heart_rate_zones: Vec<HeartRateZone>,
}

impl HeartRecord {
    pub fn from_summary(user_id: &str, date_time: &str, summary: HeartSummary) -> Self {
        Self {
            user_id: user_id.to_string(),
            date_time: date_time.to_string(),
            resting_heart_rate: summary.resting_heart_rate,
            heart_rate_zones: summary.heart_rate_zones,
            custom_heart_rate_zones: summary.custom_heart_rate_zones,
        }
    }
}

impl TimeSeriesRecord for HeartRecord {
    const COLLECTION: &'static str = collections::HEART;
    const RANGE_FIELD: &'static str = "dateTime";

    fn date_key(&self) -> &str {
        &self.date_time
    }

    fn document_id(&self) -> String {
        format!("{}_{}", self.user_id, self.date_time)
    }
}
