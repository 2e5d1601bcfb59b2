use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::Member;
use crate::error::{AppError, AppResult};

// ============================================================================
// Member Repository
// ============================================================================

pub struct MemberRepository;

impl MemberRepository {
    /// All members ordered by employee code.
    pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<Member>> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT id, employee_id, name, created_at, updated_at
            FROM members
            ORDER BY employee_id ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Member>> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT id, employee_id, name, created_at, updated_at
            FROM members
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_employee_id(
        pool: &SqlitePool,
        employee_id: &str,
    ) -> AppResult<Option<Member>> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT id, employee_id, name, created_at, updated_at
            FROM members
            WHERE employee_id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Insert a member. A taken employee code is reported as `Conflict`,
    /// whether caught by the pre-check or by the unique index.
    pub async fn create(pool: &SqlitePool, employee_id: &str, name: &str) -> AppResult<Member> {
        if Self::find_by_employee_id(pool, employee_id).await?.is_some() {
            return Err(AppError::Conflict("Employee ID already exists".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (id, employee_id, name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, employee_id, name, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(employee_id)
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::from_db(e, "Employee ID already exists"))
    }

    /// Delete a member and all of their shifts in one transaction.
    /// Returns the number of shifts removed.
    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<u64> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        let shifts = sqlx::query("DELETE FROM shifts WHERE member_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await.map_err(AppError::Database)?;
            return Err(AppError::NotFound("Member not found".to_string()));
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(shifts)
    }
}
