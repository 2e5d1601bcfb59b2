use std::sync::Arc;

use axum::{routing::get, Router};

use crate::AppState;

pub mod auth;
pub mod health;
pub mod members;
pub mod shifts;

/// Schedule routes. `/api/auth` is nested separately so the rate limiter
/// applies to it alone.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api/members", members::router())
        .nest("/api/shifts", shifts::router())
        .route("/api/shift-types", get(shifts::shift_types))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::services::auth::AuthService;
    use crate::test_state;

    async fn app() -> (Router, Arc<AppState>) {
        let state = test_state().await;
        let router = Router::new()
            .route("/health", get(health::health_check))
            .nest("/api/auth", auth::router())
            .merge(api_router())
            .with_state(state.clone());
        (router, state)
    }

    async fn sign_in(state: &Arc<AppState>) -> String {
        AuthService::ensure_admin(state, "admin@example.com", "secret", "Admin")
            .await
            .unwrap();
        AuthService::sign_in(state, "admin@example.com", "secret")
            .await
            .unwrap()
            .token
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_member(app: &Router, token: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/members",
            Some(token),
            Some(json!({ "employee_id": "17006", "name": "A" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["label"], "17006 A");
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_database() {
        let (app, _) = app().await;
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "ok");
    }

    #[tokio::test]
    async fn mutations_require_a_session() {
        let (app, _) = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/members",
            None,
            Some(json!({ "employee_id": "1", "name": "B" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/members/whatever/shifts/2025-03-05",
            Some("garbage"),
            Some(json!({ "shift_type": "Morning" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Reads stay public.
        let (status, body) = send(&app, Method::GET, "/api/members", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn login_session_and_logout() {
        let (app, state) = app().await;
        AuthService::ensure_admin(&state, "admin@example.com", "secret", "Admin")
            .await
            .unwrap();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "admin@example.com", "password": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "admin@example.com", "password": "secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");
        assert!(body["user"].get("password_hash").is_none());
        let token = body["access_token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, Method::GET, "/api/auth/session", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "admin@example.com");

        let (status, _) = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::GET, "/api/auth/session", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_ensure_is_disabled_without_setup_token() {
        let (app, _) = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/admin/ensure",
            None,
            Some(json!({ "email": "admin@example.com", "password": "x", "token": "anything" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn admin_ensure_checks_the_setup_token() {
        let mut config = crate::config::Config::default();
        config.jwt.secret = "test-secret".to_string();
        config.admin.setup_token = Some("let-me-in".to_string());
        let state = Arc::new(AppState::new(crate::db::test_pool().await, config));
        let app = Router::new()
            .nest("/api/auth", auth::router())
            .with_state(state);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/auth/admin/ensure",
            None,
            Some(json!({ "email": "admin@example.com", "password": "x", "token": "let-me-iN" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/admin/ensure",
            None,
            Some(json!({ "email": "admin@example.com", "password": "x", "token": "let-me-in" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["created"], true);
    }

    #[tokio::test]
    async fn assign_toggles_a_cell_over_http() {
        let (app, state) = app().await;
        let token = sign_in(&state).await;
        let member_id = create_member(&app, &token).await;
        let uri = format!("/api/members/{}/shifts/2025-03-05", member_id);

        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "shift_type": "Morning" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "created");
        assert_eq!(body["state"]["shift_type"], "Morning Shift (07:00 - 03:00 PM)");

        let month = format!("/api/members/{}/shifts?year=2025&month=3", member_id);
        let (_, body) = send(&app, Method::GET, &month, None, None).await;
        assert_eq!(body["shifts"].as_array().unwrap().len(), 1);
        assert_eq!(body["end"], "2025-03-31");

        let (_, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "shift_type": "Morning" })),
        )
        .await;
        assert_eq!(body["action"], "deleted");
        assert_eq!(body["state"]["state"], "empty");

        let (_, body) = send(&app, Method::GET, &month, None, None).await;
        assert_eq!(body["shifts"], json!([]));
    }

    #[tokio::test]
    async fn invalid_input_is_a_validation_error() {
        let (app, state) = app().await;
        let token = sign_in(&state).await;
        let member_id = create_member(&app, &token).await;

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/members/{}/shifts/2025-04-31", member_id),
            Some(&token),
            Some(json!({ "shift_type": "Leave" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/members/{}/shifts/2025-04-30", member_id),
            Some(&token),
            Some(json!({ "shift_type": "Siesta" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/members/{}/calendar?year=2025&month=13", member_id),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn duplicate_employee_id_conflicts() {
        let (app, state) = app().await;
        let token = sign_in(&state).await;
        create_member(&app, &token).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/members",
            Some(&token),
            Some(json!({ "employee_id": "17006", "name": "Other" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["message"], "Employee ID already exists");
    }

    #[tokio::test]
    async fn bulk_assign_then_calendar_and_summary() {
        let (app, state) = app().await;
        let token = sign_in(&state).await;
        let member_id = create_member(&app, &token).await;

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/members/{}/shifts/bulk", member_id),
            Some(&token),
            Some(json!({
                "dates": ["2025-03-05", "2025-03-12", "2025-02-30", "2025-03-20"],
                "shift_type": "night"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["succeeded"], 3);
        assert_eq!(body["failed"], 1);
        assert_eq!(body["results"][2]["error_code"], "VALIDATION_ERROR");

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/members/{}/calendar?year=2025&month=3", member_id),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "March 2025");
        assert_eq!(body["leading_blanks"], 6);
        assert_eq!(body["weeks"][0][6]["kind"], "day");
        assert_eq!(body["weeks"][1][3]["day"], 5);
        assert_eq!(body["weeks"][1][3]["shift_type"], "Night Shift (10:30 - 07:00 AM)");
        assert_eq!(body["summary"]["night"], 3);

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/shifts/summary?member_id={}&year=2025&month=3", member_id),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["work_days"], 3);
        assert_eq!(body["summary"]["total"], 3);
    }

    #[tokio::test]
    async fn calendar_links_to_neighbouring_months() {
        let (app, state) = app().await;
        let token = sign_in(&state).await;
        let member_id = create_member(&app, &token).await;

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/members/{}/calendar?year=2025&month=1", member_id),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prev"], json!({ "year": 2024, "month": 12 }));
        assert_eq!(body["next"], json!({ "year": 2025, "month": 2 }));

        let (_, body) = send(
            &app,
            Method::GET,
            &format!("/api/members/{}/calendar?year=2025&month=12", member_id),
            None,
            None,
        )
        .await;
        assert_eq!(body["next"], json!({ "year": 2026, "month": 1 }));
    }

    #[tokio::test]
    async fn deleting_a_member_removes_their_shifts() {
        let (app, state) = app().await;
        let token = sign_in(&state).await;
        let member_id = create_member(&app, &token).await;
        send(
            &app,
            Method::PUT,
            &format!("/api/members/{}/shifts/2025-03-05", member_id),
            Some(&token),
            Some(json!({ "shift_type": "Leave" })),
        )
        .await;

        let (status, body) = send(
            &app,
            Method::DELETE,
            &format!("/api/members/{}", member_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["shifts_removed"], 1);

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/members/{}/shifts?year=2025&month=3", member_id),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn shift_type_catalog_is_public() {
        let (app, _) = app().await;
        let (status, body) = send(&app, Method::GET, "/api/shift-types", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 6);
        assert_eq!(body[2]["label"], "Night Shift (10:30 - 07:00 AM)");
    }
}
