// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod activity;
pub mod heart;
pub mod sleep;
pub mod user;

pub use activity::ActivityRecord;
pub use heart::{HeartRateZone, HeartRecord};
pub use sleep::{SleepLog, SleepRecord};
pub use user::UserProfile;

use serde::{de::DeserializeOwned, Serialize};

/// A per-user, per-date record stored in one of the time-series collections.
pub trait TimeSeriesRecord:
    Clone + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Collection the record lives in.
    const COLLECTION: &'static str;
    /// Stored field used for the trailing-window range query.
    const RANGE_FIELD: &'static str;

    /// Calendar date (`YYYY-MM-DD`) the record belongs to. Used as the
    /// sync watermark and the scoring join key.
    fn date_key(&self) -> &str;

    /// Firestore document ID. Writing the same ID twice overwrites.
    fn document_id(&self) -> String;
}
