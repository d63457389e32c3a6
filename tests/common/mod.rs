// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use condition_bot::config::Config;
use condition_bot::db::{FirestoreDb, RecordStore, USER_FIELD};
use condition_bot::error::AppError;
use condition_bot::models::{SleepLog, TimeSeriesRecord, UserProfile};
use condition_bot::routes::create_router;
use condition_bot::services::fitbit::{TimeSeriesPoint, TokenExchange, TokenResponse};
use condition_bot::services::{Messenger, TimeSeriesProvider};
use condition_bot::AppState;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Config::test_default(), FirestoreDb::new_mock()));
    (create_router(state.clone()), state)
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

/// `RecordStore` backed by maps, counting writes.
#[derive(Default)]
pub struct MemoryStore {
    profiles: Mutex<HashMap<String, UserProfile>>,
    tables: Mutex<HashMap<&'static str, BTreeMap<String, Value>>>,
    batch_writes: AtomicUsize,
    profile_writes: AtomicUsize,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn with_profile(profile: UserProfile) -> Self {
        let store = Self::default();
        store
            .profiles
            .lock()
            .unwrap()
            .insert(profile.line_user_id.clone(), profile);
        store
    }

    /// Seed records without counting a write.
    pub fn seed<R: TimeSeriesRecord>(&self, records: &[R]) {
        let mut tables = self.tables.lock().unwrap();
        let table = tables.entry(R::COLLECTION).or_default();
        for record in records {
            table.insert(record.document_id(), serde_json::to_value(record).unwrap());
        }
    }

    /// Every stored record of type `R`, by document ID.
    pub fn records<R: TimeSeriesRecord>(&self) -> Vec<R> {
        self.tables
            .lock()
            .unwrap()
            .get(R::COLLECTION)
            .map(|t| {
                t.values()
                    .map(|v| serde_json::from_value(v.clone()).unwrap())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stored documents of type `R` exactly as written.
    pub fn documents<R: TimeSeriesRecord>(&self) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(R::COLLECTION)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn profile(&self, line_user_id: &str) -> Option<UserProfile> {
        self.profiles.lock().unwrap().get(line_user_id).cloned()
    }

    pub fn batch_writes(&self) -> usize {
        self.batch_writes.load(Ordering::SeqCst)
    }

    pub fn profile_writes(&self) -> usize {
        self.profile_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_profile(&self, line_user_id: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.profile(line_user_id))
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.profile_writes.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.line_user_id.clone(), profile.clone());
        Ok(())
    }

    async fn query_since<R: TimeSeriesRecord>(
        &self,
        line_user_id: &str,
        date_key: &str,
        threshold: &str,
    ) -> Result<Vec<R>, AppError> {
        let tables = self.tables.lock().unwrap();
        let Some(table) = tables.get(R::COLLECTION) else {
            return Ok(Vec::new());
        };

        let mut docs: Vec<&Value> = table
            .values()
            .filter(|v| v[USER_FIELD] == line_user_id)
            .filter(|v| v[date_key].as_str().is_some_and(|d| d >= threshold))
            .collect();
        docs.sort_by(|a, b| a[date_key].as_str().cmp(&b[date_key].as_str()));

        docs.into_iter()
            .map(|v| serde_json::from_value(v.clone()).map_err(|e| AppError::Database(e.to_string())))
            .collect()
    }

    async fn batch_write<R: TimeSeriesRecord>(&self, records: &[R]) -> Result<(), AppError> {
        self.batch_writes.fetch_add(1, Ordering::SeqCst);
        self.seed(records);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scripted Fitbit data
// ─────────────────────────────────────────────────────────────────────────────

/// Serves canned Fitbit data, honouring the requested date range.
#[derive(Default)]
pub struct ScriptedProvider {
    sleep: Mutex<Vec<Value>>,
    series: Mutex<HashMap<String, Vec<TimeSeriesPoint>>>,
    failing: Mutex<Option<String>>,
    calls: Mutex<Vec<(String, String, String)>>,
}

#[allow(dead_code)]
impl ScriptedProvider {
    /// Add a raw sleep log (Fitbit JSON shape).
    pub fn add_sleep(&self, log: Value) {
        self.sleep.lock().unwrap().push(log);
    }

    /// Add one day of a resource such as `activities/steps`.
    pub fn add_point(&self, resource: &str, date: &str, value: Value) {
        self.series
            .lock()
            .unwrap()
            .entry(resource.to_string())
            .or_default()
            .push(TimeSeriesPoint {
                date_time: date.to_string(),
                value,
            });
    }

    /// Make calls for `resource` (or `sleep`) fail.
    pub fn fail_on(&self, resource: &str) {
        *self.failing.lock().unwrap() = Some(resource.to_string());
    }

    /// `(resource, base_date, end_date)` of every call so far.
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, resource: &str, base: &str, end: &str) -> Result<(), AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((resource.to_string(), base.to_string(), end.to_string()));
        if self.failing.lock().unwrap().as_deref() == Some(resource) {
            return Err(AppError::FitbitApi("HTTP 500 Internal Server Error: boom".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TimeSeriesProvider for ScriptedProvider {
    async fn sleep_range(&self, base_date: &str, end_date: &str) -> Result<Vec<SleepLog>, AppError> {
        self.record_call("sleep", base_date, end_date)?;
        Ok(self
            .sleep
            .lock()
            .unwrap()
            .iter()
            .filter(|log| {
                let date = log["dateOfSleep"].as_str().unwrap_or_default();
                date >= base_date && date <= end_date
            })
            .map(|log| serde_json::from_value(log.clone()).unwrap())
            .collect())
    }

    async fn time_series(
        &self,
        resource: &str,
        base_date: &str,
        end_date: &str,
    ) -> Result<Vec<TimeSeriesPoint>, AppError> {
        self.record_call(resource, base_date, end_date)?;
        Ok(self
            .series
            .lock()
            .unwrap()
            .get(resource)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date_time.as_str() >= base_date && p.date_time.as_str() <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Messaging and token exchange doubles
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Push { to: String, text: String },
    Reply { token: String, text: String },
}

/// Records every message instead of sending it.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
}

#[allow(dead_code)]
impl RecordingMessenger {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn push(&self, to: &str, text: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(Sent::Push {
            to: to.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(Sent::Reply {
            token: reply_token.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Token endpoint double granting a fixed scope, or failing.
pub struct FixedExchange {
    pub scope: Option<String>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl FixedExchange {
    pub fn granting(scope: &str) -> Self {
        Self {
            scope: Some(scope.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            scope: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenExchange for FixedExchange {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scope = self
            .scope
            .clone()
            .ok_or_else(|| AppError::FitbitApi("Token exchange failed with status 400".to_string()))?;

        Ok(serde_json::from_value(serde_json::json!({
            "access_token": format!("access-{}", code),
            "refresh_token": "refresh-1",
            "expires_in": 28800,
            "scope": scope,
            "token_type": "Bearer",
            "user_id": "26FWFL"
        }))
        .unwrap())
    }
}

/// A linked profile whose token is valid for hours.
#[allow(dead_code)]
pub fn linked_profile(line_user_id: &str) -> UserProfile {
    UserProfile {
        line_user_id: line_user_id.to_string(),
        fitbit_user_id: "26FWFL".to_string(),
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        scope: condition_bot::config::DEFAULT_FITBIT_SCOPES.to_string(),
        expires_in: 28800,
        expires_at: condition_bot::services::fitbit::unix_now() + 28800.0,
    }
}
