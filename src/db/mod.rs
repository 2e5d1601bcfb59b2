pub mod models;
pub mod repository;
pub mod store;

pub use repository::*;
pub use store::{ScheduleStore, SqliteStore};

/// In-memory database with migrations applied, for tests.
#[cfg(test)]
pub async fn test_pool() -> sqlx::SqlitePool {
    use std::str::FromStr;

    let options = sqlx::sqlite::SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid in-memory sqlite url")
        .foreign_keys(true);

    // A single long-lived connection keeps the in-memory database alive.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("open in-memory sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}
