use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use axum::body::Body;
use http::{HeaderValue, StatusCode};
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::{GovernorError, GovernorLayer};

use shift_scheduler::config::Config;
use shift_scheduler::error::AppError;
use shift_scheduler::services::init;
use shift_scheduler::{middleware, routes, AppState};

fn json_response(status: StatusCode, body: serde_json::Value) -> http::Response<Body> {
    let mut resp = http::Response::new(Body::from(body.to_string()));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    resp
}

/// Render rate limiter rejections with the same envelope as `AppError`.
fn rate_limit_error(error: GovernorError) -> http::Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            let mut resp = AppError::RateLimited.into_response_with_details(Some(
                serde_json::json!({ "retry_after_seconds": wait_time }),
            ));
            if let Some(hmap) = headers {
                for (name, value) in hmap.iter() {
                    resp.headers_mut().append(name.clone(), value.clone());
                }
            }
            resp.headers_mut()
                .insert(http::header::RETRY_AFTER, HeaderValue::from(wait_time));
            resp
        }
        GovernorError::UnableToExtractKey => json_response(
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": {
                    "code": "BAD_REQUEST",
                    "message": "Unable to determine client IP for rate limiting"
                }
            }),
        ),
        GovernorError::Other { code, msg, headers } => {
            let status =
                StatusCode::from_u16(code.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let mut resp = json_response(
                status,
                serde_json::json!({
                    "error": {
                        "code": "RATE_LIMIT_ERROR",
                        "message": msg.unwrap_or_else(|| "Rate limiting error".to_string())
                    }
                }),
            );
            if let Some(hmap) = headers {
                for (name, value) in hmap.iter() {
                    resp.headers_mut().append(name.clone(), value.clone());
                }
            }
            resp
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shift_scheduler=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting shift scheduler");

    let pool = init::init_db(&config).await?;
    let app_state = Arc::new(AppState::new(pool, config.clone()));

    init::seed_admin(&app_state).await;

    // Shutdown notifier for background tasks and std threads
    let (shutdown_tx, _shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);
    let thread_shutdown = Arc::new(AtomicBool::new(false));

    let sweeper = init::spawn_session_sweeper(app_state.clone(), shutdown_tx.clone());

    // Rate limiter for the public auth endpoints (login, admin setup)
    let mut auth_builder = GovernorConfigBuilder::default();
    auth_builder.per_second(config.rate_limit.auth_per_second.into());
    auth_builder.burst_size(config.rate_limit.auth_burst);
    auth_builder.key_extractor(SmartIpKeyExtractor);
    auth_builder.error_handler(rate_limit_error);

    let auth_gov_conf = Arc::new(
        auth_builder
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Failed to build auth governor config"))?,
    );

    // Background cleanup for auth limiter storage
    let auth_cleaner = {
        let limiter = auth_gov_conf.limiter().clone();
        let interval = Duration::from_secs(60);
        let flag = thread_shutdown.clone();
        std::thread::spawn(move || {
            // Small ticks so shutdown is noticed quickly.
            let tick = Duration::from_secs(1);
            loop {
                for _ in 0..interval.as_secs() {
                    if flag.load(Ordering::SeqCst) {
                        tracing::info!("Auth rate limiter cleanup thread exiting");
                        return;
                    }
                    std::thread::sleep(tick);
                }
                tracing::debug!("auth rate limiter size: {}", limiter.len());
                limiter.retain_recent();
            }
        })
    };

    let auth_rate_layer = GovernorLayer {
        config: auth_gov_conf.clone(),
    };

    let frontend_origin = config
        .server
        .frontend_url
        .parse::<HeaderValue>()
        .map_err(|e| anyhow::anyhow!("Invalid FRONTEND_URL for CORS: {}", e))?;

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/auth", routes::auth::router().layer(auth_rate_layer))
        .merge(routes::api_router())
        .with_state(app_state.clone())
        .layer(axum::middleware::from_fn(
            middleware::csp::security_headers,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(frontend_origin)
                .allow_methods([
                    http::Method::GET,
                    http::Method::POST,
                    http::Method::PUT,
                    http::Method::DELETE,
                    http::Method::OPTIONS,
                ])
                .allow_headers([
                    http::header::CONTENT_TYPE,
                    http::header::AUTHORIZATION,
                    http::header::ACCEPT,
                    http::HeaderName::from_static("x-setup-token"),
                ])
                .allow_credentials(true),
        );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    // Serve until a shutdown signal arrives, then notify background tasks and
    // threads and drop the server future.
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server_fut = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );

    let shutdown_tx_clone = shutdown_tx.clone();
    let thread_shutdown_clone = thread_shutdown.clone();

    let signal_fut = async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = ctrl_c => {},
                        _ = term.recv() => {},
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to bind SIGTERM, waiting for Ctrl+C only: {}", e);
                    let _ = ctrl_c.await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = ctrl_c.await {
                tracing::warn!("Failed to bind Ctrl+C: {}", e);
            }
        }

        tracing::info!("Shutdown signal received, notifying background tasks and threads");
        let _ = shutdown_tx_clone.send(());
        thread_shutdown_clone.store(true, Ordering::SeqCst);
    };

    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = signal_fut => {
            tracing::info!("Server stopped accepting new connections");
        }
    }

    let shutdown_wait = Duration::from_secs(15);
    if tokio::time::timeout(shutdown_wait, sweeper).await.is_err() {
        tracing::warn!(
            "Session sweeper did not exit within {}s",
            shutdown_wait.as_secs()
        );
    }

    if let Err(e) = auth_cleaner.join() {
        tracing::warn!("Auth cleanup thread join failed: {:?}", e);
    }

    app_state.db.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn rate_limit_rejection_uses_error_envelope() {
        let resp = rate_limit_error(GovernorError::TooManyRequests {
            wait_time: 7,
            headers: None,
        });
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()[http::header::RETRY_AFTER], "7");

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "RATE_LIMITED");
        assert_eq!(body["error"]["details"]["retry_after_seconds"], 7);
    }
}
