//! Database layer (Firestore).

pub mod decimal;
pub mod firestore;

pub use firestore::FirestoreDb;

use crate::error::AppError;
use crate::models::{TimeSeriesRecord, UserProfile};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// User profiles (keyed by LINE user ID)
    pub const USERS: &str = "m_user";
    pub const SLEEP: &str = "tbl_sleep";
    pub const HEART: &str = "tbl_heart";
    pub const ACTIVITIES: &str = "tbl_activities";
}

/// Stored field holding the owning user on every time-series document.
pub const USER_FIELD: &str = "userId";

/// Key-value and range access to profiles and per-user time series.
///
/// Every operation logs the table, key and record count it touched.
/// Implementations do not retry beyond what the underlying client does.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Get a profile by LINE user ID.
    async fn get_profile(&self, line_user_id: &str) -> Result<Option<UserProfile>, AppError>;

    /// Create or replace a profile.
    async fn put_profile(&self, profile: &UserProfile) -> Result<(), AppError>;

    /// Records of type `R` for a user whose `date_key` field is `>= threshold`,
    /// ordered ascending by that field. Comparison is on the ISO date string.
    async fn query_since<R: TimeSeriesRecord>(
        &self,
        line_user_id: &str,
        date_key: &str,
        threshold: &str,
    ) -> Result<Vec<R>, AppError>;

    /// Write many records. Each record overwrites any document with the
    /// same ID, so replaying a write is harmless.
    async fn batch_write<R: TimeSeriesRecord>(&self, records: &[R]) -> Result<(), AppError>;
}
