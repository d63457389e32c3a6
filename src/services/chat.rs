// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! LINE chat event handling.

use serde::Deserialize;

use crate::db::RecordStore;
use crate::error::Result;
use crate::services::condition::ConditionSource;
use crate::services::line::Messenger;
use crate::services::oauth_state::sign_state;

/// Phrase that asks the bot for today's condition.
pub const TRIGGER_PHRASE: &str = "おつげちゃん！";

/// One entry of a webhook `events` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl LineEvent {
    /// Sender and text of a text message sent by a user, else `None`.
    pub fn user_text(&self) -> Option<(&str, &str)> {
        if self.kind != "message" {
            return None;
        }
        let source = self.source.as_ref().filter(|s| s.kind == "user")?;
        let message = self.message.as_ref().filter(|m| m.kind == "text")?;
        Some((source.user_id.as_deref()?, message.text.as_deref()?))
    }
}

/// What a chat event led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Ignored,
    RegistrationPrompted,
    ConditionSent { score_key: String },
    Echoed,
}

/// Registration prompt for a user without a profile. `state` is the
/// signed user id.
pub fn registration_message(authorize_url: &str, state: &str) -> String {
    format!(
        "未登録の人は以下のURLからFitbit連携してね。\n\n{}&state={}",
        authorize_url, state
    )
}

/// Handles chat events for the bot.
pub struct ChatHandler<'a, S, M, C> {
    store: &'a S,
    messenger: &'a M,
    condition: &'a C,
    authorize_url: &'a str,
    state_key: &'a [u8],
}

impl<'a, S, M, C> ChatHandler<'a, S, M, C>
where
    S: RecordStore,
    M: Messenger,
    C: ConditionSource,
{
    pub fn new(
        store: &'a S,
        messenger: &'a M,
        condition: &'a C,
        authorize_url: &'a str,
        state_key: &'a [u8],
    ) -> Self {
        Self {
            store,
            messenger,
            condition,
            authorize_url,
            state_key,
        }
    }

    /// Handle one event. Sync, scoring and messaging errors propagate.
    pub async fn handle(&self, event: &LineEvent) -> Result<ChatOutcome> {
        let Some((user_id, text)) = event.user_text() else {
            tracing::debug!(event_type = %event.kind, "Ignoring non-text chat event");
            return Ok(ChatOutcome::Ignored);
        };

        let Some(profile) = self.store.get_profile(user_id).await? else {
            let state = sign_state(self.state_key, user_id)?;
            self.messenger
                .push(user_id, &registration_message(self.authorize_url, &state))
                .await?;
            return Ok(ChatOutcome::RegistrationPrompted);
        };

        if text.contains(TRIGGER_PHRASE) {
            let prediction = self.condition.condition(&profile).await?;
            let reply = format!("{}\n[指標:{}]", prediction.message, prediction.key);
            self.messenger.push(user_id, &reply).await?;
            return Ok(ChatOutcome::ConditionSent {
                score_key: prediction.key,
            });
        }

        match event.reply_token.as_deref() {
            Some(token) => self.messenger.reply(token, text).await?,
            None => self.messenger.push(user_id, text).await?,
        }
        Ok(ChatOutcome::Echoed)
    }
}
