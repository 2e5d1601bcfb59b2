use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::models::Admin;
use crate::db::{AdminRepository, SessionRepository};
use crate::error::{AppError, AppResult};
use crate::AppState;

#[cfg(not(test))]
const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// Server-side session id; the token is valid only while that session exists.
    pub sid: String,
    pub exp: usize,
    pub iat: usize,
}

/// The authenticated caller of a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub admin_id: String,
    pub session_id: String,
    pub email: String,
}

#[derive(Debug)]
pub struct SignIn {
    pub token: String,
    pub expires_at: i64,
    pub admin: Admin,
}

#[derive(Debug, Serialize)]
pub struct EnsureAdminOutcome {
    pub created: bool,
    pub admin_id: String,
    pub email: String,
}

pub struct AuthService;

impl AuthService {
    /// Verify email/password and open a new session.
    pub async fn sign_in(state: &Arc<AppState>, email: &str, password: &str) -> AppResult<SignIn> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let admin = AdminRepository::find_by_email(&state.db, &email)
            .await?
            .ok_or_else(|| {
                tracing::debug!("Sign-in for unknown email {}", email);
                AppError::Unauthorized
            })?;

        let valid = bcrypt::verify(password, &admin.password_hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("bcrypt verify failed: {}", e)))?;
        if !valid {
            tracing::debug!("Sign-in with wrong password for {}", email);
            return Err(AppError::Unauthorized);
        }

        let now = Utc::now();
        let expires = now + Duration::hours(state.config.jwt.expiration_hours);
        let session = SessionRepository::create(&state.db, &admin.id, expires.naive_utc()).await?;

        let claims = Claims {
            sub: admin.id.clone(),
            sid: session.id.clone(),
            iat: now.timestamp() as usize,
            exp: expires.timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        )?;

        tracing::info!("Admin {} signed in (session {})", admin.email, session.id);

        Ok(SignIn {
            token,
            expires_at: expires.timestamp(),
            admin,
        })
    }

    /// Decode and validate a JWT, returning the claims
    pub fn decode_jwt(state: &Arc<AppState>, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Resolve a bearer token into the current actor. A token whose session
    /// was closed by sign-out is rejected even if it has not expired.
    pub async fn current(state: &Arc<AppState>, token: &str) -> AppResult<Actor> {
        let claims = Self::decode_jwt(state, token)?;

        let session = SessionRepository::find_active(&state.db, &claims.sid)
            .await?
            .filter(|s| s.admin_id == claims.sub)
            .ok_or(AppError::Unauthorized)?;

        let admin = AdminRepository::find_by_id(&state.db, &session.admin_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(Actor {
            admin_id: admin.id,
            session_id: session.id,
            email: admin.email,
        })
    }

    /// Close the actor's session.
    pub async fn sign_out(state: &Arc<AppState>, actor: &Actor) -> AppResult<()> {
        if SessionRepository::delete(&state.db, &actor.session_id).await? {
            tracing::info!("Admin {} signed out (session {})", actor.email, actor.session_id);
        }
        Ok(())
    }

    /// Create the administrator, or force-set the password and name of an
    /// existing one with the same email.
    pub async fn ensure_admin(
        state: &Arc<AppState>,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> AppResult<EnsureAdminOutcome> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(AppError::Validation(format!("Invalid email: {}", email)));
        }
        let password = password.trim();
        if password.is_empty() {
            return Err(AppError::Validation("Password is required".to_string()));
        }

        let hash = hash_password(password)?;

        let (created, admin) = match AdminRepository::find_by_email(&state.db, &email).await? {
            Some(existing) => {
                let updated =
                    AdminRepository::update_credentials(&state.db, &existing.id, &hash, full_name)
                        .await?;
                (false, updated)
            }
            None => match AdminRepository::create(&state.db, &email, &hash, full_name).await {
                Ok(admin) => (true, admin),
                Err(e) if e.is_conflict() => {
                    // Created concurrently; fall through to the update path.
                    let existing = AdminRepository::find_by_email(&state.db, &email)
                        .await?
                        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;
                    let updated = AdminRepository::update_credentials(
                        &state.db,
                        &existing.id,
                        &hash,
                        full_name,
                    )
                    .await?;
                    (false, updated)
                }
                Err(e) => return Err(e),
            },
        };

        tracing::info!(
            "Admin {} {}",
            admin.email,
            if created { "created" } else { "updated" }
        );

        Ok(EnsureAdminOutcome {
            created,
            admin_id: admin.id,
            email: admin.email,
        })
    }
}

/// Compare secrets without short-circuiting on the first differing byte.
/// Only the length comparison returns early.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> AppResult<String> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bcrypt hash failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_state;

    #[tokio::test]
    async fn ensure_admin_creates_then_updates() {
        let state = test_state().await;

        let first = AuthService::ensure_admin(&state, " Admin@Example.com ", "first", "Admin")
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.email, "admin@example.com");

        let second = AuthService::ensure_admin(&state, "admin@example.com", "second", "Boss")
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.admin_id, first.admin_id);

        // The password was force-set.
        assert!(AuthService::sign_in(&state, "admin@example.com", "first").await.is_err());
        let signed_in = AuthService::sign_in(&state, "admin@example.com", "second")
            .await
            .unwrap();
        assert_eq!(signed_in.admin.full_name, "Boss");
    }

    #[tokio::test]
    async fn sign_in_rejects_bad_credentials() {
        let state = test_state().await;
        AuthService::ensure_admin(&state, "admin@example.com", "secret", "Admin")
            .await
            .unwrap();

        assert!(matches!(
            AuthService::sign_in(&state, "admin@example.com", "wrong").await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            AuthService::sign_in(&state, "nobody@example.com", "secret").await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            AuthService::sign_in(&state, "", "").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn session_lives_until_sign_out() {
        let state = test_state().await;
        AuthService::ensure_admin(&state, "admin@example.com", "secret", "Admin")
            .await
            .unwrap();

        let signed_in = AuthService::sign_in(&state, "ADMIN@example.com", "secret")
            .await
            .unwrap();
        let actor = AuthService::current(&state, &signed_in.token).await.unwrap();
        assert_eq!(actor.email, "admin@example.com");

        AuthService::sign_out(&state, &actor).await.unwrap();
        assert!(matches!(
            AuthService::current(&state, &signed_in.token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn secrets_match_compares_whole_value() {
        assert!(secrets_match("setup-token", "setup-token"));
        assert!(!secrets_match("setup-tokeN", "setup-token"));
        assert!(!secrets_match("setup", "setup-token"));
        assert!(!secrets_match("", "setup-token"));
    }

    #[tokio::test]
    async fn garbage_tokens_are_rejected() {
        let state = test_state().await;
        assert!(matches!(
            AuthService::current(&state, "not-a-jwt").await,
            Err(AppError::Jwt(_))
        ));
    }
}
