// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod chat;
pub mod condition;
pub mod fitbit;
pub mod line;
pub mod messages;
pub mod oauth_state;
pub mod scoring;
pub mod sync;

pub use auth::{AuthError, AuthHandoff, OAuthRedirect};
pub use chat::{ChatHandler, ChatOutcome, LineEvent};
pub use condition::{compute_condition, ConditionSource, FitbitCondition};
pub use fitbit::{FitbitClient, FitbitSession, TimeSeriesProvider, TokenExchange};
pub use line::{LineClient, Messenger};
pub use messages::ScoreMessages;
pub use scoring::{predict, Prediction, Score};
pub use sync::Synchronizer;
