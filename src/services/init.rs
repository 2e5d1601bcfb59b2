//! Startup helpers: database connection, migrations, admin seeding and the
//! expired-session sweeper.

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Result;

use crate::config::Config;
use crate::db::SessionRepository;
use crate::services::auth::AuthService;
use crate::AppState;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Strip credentials from a database URL before logging.
///
/// Only URLs with an authority (`scheme://host/...`) are rebuilt from their
/// parts; `user:pw@host` parses as scheme `user` with path `pw@host`, so
/// anything without a host goes through the `@` stripping instead.
pub fn redact_db_url(db_url: &str) -> String {
    match url::Url::parse(db_url) {
        Ok(url) if url.has_host() => {
            let host = url.host_str().unwrap_or("");
            let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
            format!("{}://{}{}{}", url.scheme(), host, port_part, url.path())
        }
        _ => match db_url.rfind('@') {
            Some(at_pos) => format!("(redacted){}", &db_url[at_pos + 1..]),
            None => "(redacted)".to_string(),
        },
    }
}

/// Open the SQLite pool and run migrations.
///
/// The database file and its parent directory are created when missing.
/// Foreign keys are enforced on every connection so deleting a member
/// cascades to their shifts.
pub async fn init_db(config: &Config) -> Result<sqlx::SqlitePool> {
    let db_url = &config.database.url;
    tracing::info!("Connecting to database: {}", redact_db_url(db_url));

    let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
    let db_file_path = Path::new(db_path);
    let existed = db_file_path.exists();

    if let Some(parent) = db_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let connect_options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await?;

    if existed {
        tracing::info!("Connected to database file: {}", db_file_path.display());
    } else {
        tracing::info!("Database file created: {}", db_file_path.display());
    }

    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Create or update the configured administrator. Failures are logged and do
/// not stop startup.
pub async fn seed_admin(state: &Arc<AppState>) {
    let admin = &state.config.admin;
    let Some((email, password)) = admin.seed_credentials() else {
        tracing::info!("ADMIN_EMAIL/ADMIN_PASSWORD not set; skipping admin seeding");
        return;
    };

    match AuthService::ensure_admin(state, email, password, &admin.name).await {
        Ok(outcome) if outcome.created => {
            tracing::info!("Seeded administrator {}", outcome.email)
        }
        Ok(outcome) => tracing::info!("Administrator {} already present; credentials refreshed", outcome.email),
        Err(e) => tracing::warn!("Failed to seed administrator: {}", e),
    }
}

/// Periodically delete expired sessions until `shutdown` fires.
pub fn spawn_session_sweeper(
    state: Arc<AppState>,
    shutdown: tokio::sync::broadcast::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    let mut shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        loop {
            match SessionRepository::delete_expired(&state.db).await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Removed {} expired sessions", n),
                Err(e) => tracing::warn!("Failed to remove expired sessions: {}", e),
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Session sweeper shutting down");
                    break;
                }
                _ = tokio::time::sleep(SESSION_SWEEP_INTERVAL) => {}
            }
        }
    })
}
