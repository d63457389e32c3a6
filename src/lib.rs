// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Condition-Bot: daily condition messages from Fitbit data over LINE
//!
//! This crate provides the webhook backend that links LINE users to their
//! Fitbit accounts, keeps their sleep, heart and activity history in
//! Firestore, and answers with a score derived from recent days.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::{FitbitClient, LineClient, ScoreMessages};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub fitbit: FitbitClient,
    pub line: LineClient,
    pub messages: ScoreMessages,
}

impl AppState {
    /// Build the API clients from `config` around an existing store handle.
    pub fn new(config: Config, db: FirestoreDb) -> Self {
        Self {
            fitbit: FitbitClient::new(&config),
            line: LineClient::new(&config),
            messages: ScoreMessages::load(),
            config,
            db,
        }
    }
}
