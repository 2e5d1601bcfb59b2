use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{Admin, Session};
use crate::error::{AppError, AppResult};

// ============================================================================
// Admin Repository
// ============================================================================

pub struct AdminRepository;

impl AdminRepository {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Admin>> {
        sqlx::query_as::<_, Admin>(
            r#"
            SELECT id, email, password_hash, full_name, role, created_at, updated_at
            FROM admins
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Emails are stored lower-cased; callers pass the normalized form.
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<Admin>> {
        sqlx::query_as::<_, Admin>(
            r#"
            SELECT id, email, password_hash, full_name, role, created_at, updated_at
            FROM admins
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn create(
        pool: &SqlitePool,
        email: &str,
        password_hash: &str,
        full_name: &str,
    ) -> AppResult<Admin> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Admin>(
            r#"
            INSERT INTO admins (id, email, password_hash, full_name, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'admin', ?, ?)
            RETURNING id, email, password_hash, full_name, role, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::from_db(e, "Admin already exists"))
    }

    /// Force-set password and name, and (re)grant the admin role.
    pub async fn update_credentials(
        pool: &SqlitePool,
        id: &str,
        password_hash: &str,
        full_name: &str,
    ) -> AppResult<Admin> {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Admin>(
            r#"
            UPDATE admins
            SET password_hash = ?, full_name = ?, role = 'admin', updated_at = ?
            WHERE id = ?
            RETURNING id, email, password_hash, full_name, role, created_at, updated_at
            "#,
        )
        .bind(password_hash)
        .bind(full_name)
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))
    }
}

// ============================================================================
// Session Repository
// ============================================================================

pub struct SessionRepository;

impl SessionRepository {
    pub async fn create(
        pool: &SqlitePool,
        admin_id: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<Session> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, admin_id, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, admin_id, expires_at, created_at
            "#,
        )
        .bind(&id)
        .bind(admin_id)
        .bind(expires_at)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// A session that exists and has not expired yet.
    pub async fn find_active(pool: &SqlitePool, id: &str) -> AppResult<Option<Session>> {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Session>(
            r#"
            SELECT id, admin_id, expires_at, created_at
            FROM sessions
            WHERE id = ? AND expires_at > ?
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_expired(pool: &SqlitePool) -> AppResult<u64> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
