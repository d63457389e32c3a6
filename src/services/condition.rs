// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync all domains for one user, then score.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::RecordStore;
use crate::error::Result;
use crate::models::UserProfile;
use crate::services::fitbit::{
    FitbitClient, FitbitSession, PersistRefreshedToken, TimeSeriesProvider,
};
use crate::services::messages::ScoreMessages;
use crate::services::scoring::{predict, Prediction};
use crate::services::sync::Synchronizer;

/// Sleep, heart and activity in that order, then the score.
///
/// A failure in any domain stops the run; earlier domains keep what they
/// wrote.
pub async fn compute_condition<S, P>(
    store: &S,
    provider: &P,
    line_user_id: &str,
    today: NaiveDate,
    messages: &ScoreMessages,
) -> Result<Prediction>
where
    S: RecordStore,
    P: TimeSeriesProvider,
{
    let sync = Synchronizer::new(store, provider, line_user_id, today);

    let sleep = sync.update_sleep().await?;
    let heart = sync.update_heart().await?;
    let activities = sync.update_activities().await?;

    predict(&sleep, &heart, &activities, messages)
}

/// Produces the condition score for a registered user.
#[async_trait]
pub trait ConditionSource: Send + Sync {
    async fn condition(&self, profile: &UserProfile) -> Result<Prediction>;
}

/// Scores against live Fitbit data, persisting refreshed tokens.
pub struct FitbitCondition<'a, S> {
    store: &'a S,
    client: &'a FitbitClient,
    messages: &'a ScoreMessages,
}

impl<'a, S: RecordStore> FitbitCondition<'a, S> {
    pub fn new(store: &'a S, client: &'a FitbitClient, messages: &'a ScoreMessages) -> Self {
        Self {
            store,
            client,
            messages,
        }
    }
}

#[async_trait]
impl<S: RecordStore> ConditionSource for FitbitCondition<'_, S> {
    async fn condition(&self, profile: &UserProfile) -> Result<Prediction> {
        let session = FitbitSession::new(
            self.client,
            profile,
            PersistRefreshedToken::new(self.store),
        );
        let today = chrono::Utc::now().date_naive();

        compute_condition(
            self.store,
            &session,
            &profile.line_user_id,
            today,
            self.messages,
        )
        .await
    }
}
