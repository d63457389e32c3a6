// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! LINE Messaging API client.

use crate::config::Config;
use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;

/// Sends text messages to chat users.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Message a user directly.
    async fn push(&self, to: &str, text: &str) -> Result<(), AppError>;

    /// Answer an inbound event using its reply token.
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), AppError>;
}

/// LINE API client.
#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

fn text_message(text: &str) -> [TextMessage<'_>; 1] {
    [TextMessage { kind: "text", text }]
}

impl LineClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.line_api_url.trim_end_matches('/').to_string(),
            access_token: config.line_channel_access_token.clone(),
        }
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::LineApi(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::LineApi(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for LineClient {
    async fn push(&self, to: &str, text: &str) -> Result<(), AppError> {
        tracing::info!(to, text, "LINE push");
        let body = PushRequest {
            to,
            messages: text_message(text),
        };
        self.post("/v2/bot/message/push", &body).await
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), AppError> {
        tracing::info!(text, "LINE reply");
        let body = ReplyRequest {
            reply_token,
            messages: text_message(text),
        };
        self.post("/v2/bot/message/reply", &body).await
    }
}
