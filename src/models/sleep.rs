// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sleep log model.

use serde::{Deserialize, Serialize};

use super::TimeSeriesRecord;
use crate::db::collections;

/// One sleep segment stored in `tbl_sleep`.
///
/// A user can have several segments on the same `date_of_sleep` (naps);
/// scoring sums them per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRecord {
    /// LINE user ID (absent in Fitbit payloads, filled in before storage)
    #[serde(default)]
    pub user_id: String,
    pub log_id: u64,
    pub date_of_sleep: String,
    #[serde(default)]
    pub start_time: String,
    /// End of the segment (`YYYY-MM-DDTHH:MM:SS.sss`)
    pub end_time: String,
    #[serde(default)]
    pub is_main_sleep: bool,
    /// Milliseconds
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub efficiency: i64,
    #[serde(default)]
    pub minutes_asleep: i64,
    #[serde(default)]
    pub minutes_awake: i64,
    #[serde(default)]
    pub minutes_after_wakeup: i64,
    #[serde(default)]
    pub minutes_to_fall_asleep: i64,
    #[serde(default)]
    pub time_in_bed: i64,
    #[serde(default)]
    pub awake_count: i64,
    #[serde(default)]
    pub awake_duration: i64,
    #[serde(default)]
    pub awakenings_count: i64,
    #[serde(default)]
    pub restless_count: i64,
    #[serde(default)]
    pub restless_duration: i64,
}

impl TimeSeriesRecord for SleepRecord {
    const COLLECTION: &'static str = collections::SLEEP;
    const RANGE_FIELD: &'static str = "endTime";

    fn date_key(&self) -> &str {
        &self.date_of_sleep
    }

    fn document_id(&self) -> String {
        format!("{}_{}", self.user_id, self.log_id)
    }
}

/// Sleep log as returned by the Fitbit sleep range endpoint.
///
/// `minuteData` holds one entry per minute in bed and is never stored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepLog {
    #[serde(flatten)]
    pub record: SleepRecord,
    #[serde(default)]
    pub minute_data: Vec<serde_json::Value>,
}

impl SleepLog {
    /// Drop the per-minute data and attach the owning user.
    pub fn into_record(self, user_id: &str) -> SleepRecord {
        SleepRecord {
            user_id: user_id.to_string(),
            ..self.record
        }
    }
}
