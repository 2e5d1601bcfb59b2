//! Team shift scheduling: members, one shift per member per day, a public
//! month calendar and admin-only edits.

use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;

use config::Config;
use db::{ScheduleStore, SqliteStore};

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    /// Persistence gateway for members and shifts.
    pub store: Arc<dyn ScheduleStore>,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: Config) -> Self {
        let store: Arc<dyn ScheduleStore> = Arc::new(SqliteStore::new(db.clone()));
        Self { db, config, store }
    }
}

/// Application state over a fresh in-memory database.
#[cfg(test)]
pub async fn test_state() -> Arc<AppState> {
    let mut config = Config::default();
    config.jwt.secret = "test-secret".to_string();
    Arc::new(AppState::new(db::test_pool().await, config))
}
