use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::Admin;
use crate::error::{AppError, AppResult};
use crate::services::auth::{secrets_match, Actor, AuthService, EnsureAdminOutcome};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session))
        .route("/admin/ensure", post(ensure_admin))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

impl From<Admin> for AdminResponse {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            email: admin.email,
            full_name: admin.full_name,
            role: admin.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: i64,
    pub user: AdminResponse,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub session_id: String,
    pub user: AdminResponse,
}

#[derive(Debug, Deserialize)]
pub struct EnsureAdminRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    /// Alternative to the `x-setup-token` header.
    pub token: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let signed_in = AuthService::sign_in(&state, &request.email, &request.password).await?;

    Ok(Json(LoginResponse {
        access_token: signed_in.token,
        token_type: "Bearer",
        expires_at: signed_in.expires_at,
        user: signed_in.admin.into(),
    }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    AuthService::sign_out(&state, &actor).await?;
    Ok(Json(serde_json::json!({ "message": "Signed out" })))
}

async fn session(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<SessionResponse>> {
    let admin = crate::db::AdminRepository::find_by_id(&state.db, &actor.admin_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(SessionResponse {
        authenticated: true,
        session_id: actor.session_id,
        user: admin.into(),
    }))
}

/// Create or reset the administrator. Guarded by `ADMIN_SETUP_TOKEN`; disabled
/// when no token is configured.
async fn ensure_admin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<EnsureAdminRequest>,
) -> AppResult<Json<EnsureAdminOutcome>> {
    let expected = state.config.admin.setup_token.as_deref().ok_or_else(|| {
        tracing::debug!("Admin setup requested but ADMIN_SETUP_TOKEN is not configured");
        AppError::Forbidden
    })?;

    let provided = headers
        .get("x-setup-token")
        .and_then(|v| v.to_str().ok())
        .or(request.token.as_deref());

    if !provided.is_some_and(|token| secrets_match(token, expected)) {
        tracing::warn!("Admin setup rejected: invalid setup token");
        return Err(AppError::Forbidden);
    }

    let full_name = request
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(&state.config.admin.name);

    let outcome =
        AuthService::ensure_admin(&state, &request.email, &request.password, full_name).await?;
    Ok(Json(outcome))
}

// ============================================================================
// Auth Extractor
// ============================================================================

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Extractor for the signed-in administrator.
pub struct AuthUser(pub Actor);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::debug!("Missing or invalid Authorization header");
                AppError::Unauthorized
            })?;

        if !auth_header.to_ascii_lowercase().starts_with("bearer ") {
            tracing::debug!("Authorization header doesn't start with 'Bearer '");
            return Err(AppError::Unauthorized);
        }

        let token = auth_header[7..].trim();
        if token.is_empty() {
            tracing::debug!("Empty bearer token in Authorization header");
            return Err(AppError::Unauthorized);
        }

        let actor = AuthService::current(state, token).await.map_err(|e| {
            tracing::debug!("Failed to resolve session from token: {:?}", e);
            e
        })?;

        tracing::debug!("Authenticated admin: {}", actor.admin_id);
        Ok(AuthUser(actor))
    }
}
