// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - User profiles (`m_user`)
//! - Time series (`tbl_sleep`, `tbl_heart`, `tbl_activities`)

use crate::db::decimal::{exact_decimal, parse_decimal};
use crate::db::{collections, RecordStore, USER_FIELD};
use crate::error::AppError;
use crate::models::{TimeSeriesRecord, UserProfile};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore database client.
///
/// Constructed once in `main` and handed to handlers through `AppState`.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore (Emulator)");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Release the underlying connection. Called once at shutdown.
    pub fn close(self) {
        if self.client.is_some() {
            tracing::info!("Closing Firestore connection");
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

#[async_trait]
impl RecordStore for FirestoreDb {
    async fn get_profile(&self, line_user_id: &str) -> Result<Option<UserProfile>, AppError> {
        let stored: Option<StoredProfile> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(line_user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            table = collections::USERS,
            key = line_user_id,
            found = stored.is_some(),
            "Profile lookup"
        );

        stored.map(UserProfile::try_from).transpose()
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let stored = StoredProfile::try_from(profile)?;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&profile.line_user_id)
            .object(&stored)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            table = collections::USERS,
            key = %profile.line_user_id,
            fitbit_user_id = %profile.fitbit_user_id,
            expires_at = %stored.expires_at,
            "Profile stored"
        );
        Ok(())
    }

    async fn query_since<R: TimeSeriesRecord>(
        &self,
        line_user_id: &str,
        date_key: &str,
        threshold: &str,
    ) -> Result<Vec<R>, AppError> {
        let user = line_user_id.to_string();
        let field = date_key.to_string();
        let from = threshold.to_string();

        let records: Vec<R> = self
            .get_client()?
            .fluent()
            .select()
            .from(R::COLLECTION)
            .filter(move |q| {
                q.for_all([
                    q.field(USER_FIELD).eq(user.clone()),
                    q.field(field.clone()).greater_than_or_equal(from.clone()),
                ])
            })
            .order_by([(date_key, firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            table = R::COLLECTION,
            user_id = line_user_id,
            date_key,
            threshold,
            count = records.len(),
            "Range query"
        );

        Ok(records)
    }

    async fn batch_write<R: TimeSeriesRecord>(&self, records: &[R]) -> Result<(), AppError> {
        let client = self.get_client()?;

        stream::iter(0..records.len())
            .map(|i| {
                let record = &records[i];
                async move {
                    let _: () = client
                        .fluent()
                        .update()
                        .in_col(R::COLLECTION)
                        .document_id(record.document_id())
                        .object(record)
                        .execute()
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;

                    Ok::<_, AppError>(())
                }
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        tracing::info!(
            table = R::COLLECTION,
            count = records.len(),
            keys = ?records.iter().map(|r| r.document_id()).collect::<Vec<_>>(),
            "Batch write complete"
        );

        Ok(())
    }
}

/// Profile document as persisted. The expiry instant is kept as exact
/// decimal text instead of a double.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredProfile {
    line_user_id: String,
    fitbit_user_id: String,
    access_token: String,
    refresh_token: String,
    scope: String,
    expires_in: i64,
    expires_at: String,
}

impl TryFrom<&UserProfile> for StoredProfile {
    type Error = AppError;

    fn try_from(profile: &UserProfile) -> Result<Self, Self::Error> {
        let expires_at = exact_decimal(profile.expires_at).ok_or_else(|| {
            AppError::Database(format!(
                "Refusing to store non-finite token expiry for {}",
                profile.line_user_id
            ))
        })?;

        Ok(Self {
            line_user_id: profile.line_user_id.clone(),
            fitbit_user_id: profile.fitbit_user_id.clone(),
            access_token: profile.access_token.clone(),
            refresh_token: profile.refresh_token.clone(),
            scope: profile.scope.clone(),
            expires_in: profile.expires_in,
            expires_at,
        })
    }
}

impl TryFrom<StoredProfile> for UserProfile {
    type Error = AppError;

    fn try_from(stored: StoredProfile) -> Result<Self, Self::Error> {
        let expires_at = parse_decimal(&stored.expires_at).ok_or_else(|| {
            AppError::Database(format!(
                "Stored token expiry for {} is not a decimal: {}",
                stored.line_user_id, stored.expires_at
            ))
        })?;

        Ok(Self {
            line_user_id: stored.line_user_id,
            fitbit_user_id: stored.fitbit_user_id,
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
            scope: stored.scope,
            expires_in: stored.expires_in,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(expires_at: f64) -> UserProfile {
        UserProfile {
            line_user_id: "U4af4980629".to_string(),
            fitbit_user_id: "22B9XQ".to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            scope: "sleep activity".to_string(),
            expires_in: 28800,
            expires_at,
        }
    }

    #[test]
    fn test_stored_profile_uses_decimal_text() {
        let stored = StoredProfile::try_from(&profile(1712345678.456)).unwrap();
        assert_eq!(stored.expires_at, "1712345678.456");

        let json = serde_json::to_value(&stored).unwrap();
        assert!(json["expires_at"].is_string());
    }

    #[test]
    fn test_stored_profile_round_trip() {
        let original = profile(1712345678.9876543);
        let stored = StoredProfile::try_from(&original).unwrap();
        let restored = UserProfile::try_from(stored).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_non_finite_expiry_rejected() {
        let result = StoredProfile::try_from(&profile(f64::NAN));
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_offline_mock_errors() {
        let db = FirestoreDb::new_mock();
        let result = db.get_profile("U1").await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
