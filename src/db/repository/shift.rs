use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::Shift;
use crate::error::{AppError, AppResult};

// ============================================================================
// Shift Repository
// ============================================================================

pub struct ShiftRepository;

const DUPLICATE_CELL: &str = "A shift already exists for this member and date";

impl ShiftRepository {
    /// Shifts for one member with `start <= date <= end`, ordered by date.
    /// Keys are `YYYY-MM-DD`, so text comparison orders by day.
    pub async fn list_for_member(
        pool: &SqlitePool,
        member_id: &str,
        start: &str,
        end: &str,
    ) -> AppResult<Vec<Shift>> {
        sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, member_id, date, shift_type, created_at, updated_at
            FROM shifts
            WHERE member_id = ? AND date >= ? AND date <= ?
            ORDER BY date ASC
            "#,
        )
        .bind(member_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_cell(
        pool: &SqlitePool,
        member_id: &str,
        date: &str,
    ) -> AppResult<Option<Shift>> {
        sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, member_id, date, shift_type, created_at, updated_at
            FROM shifts
            WHERE member_id = ? AND date = ?
            "#,
        )
        .bind(member_id)
        .bind(date)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn create(
        pool: &SqlitePool,
        member_id: &str,
        date: &str,
        shift_type: &str,
    ) -> AppResult<Shift> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Shift>(
            r#"
            INSERT INTO shifts (id, member_id, date, shift_type, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, member_id, date, shift_type, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(member_id)
        .bind(date)
        .bind(shift_type)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::from_db(e, DUPLICATE_CELL))
    }

    pub async fn update_type(pool: &SqlitePool, id: &str, shift_type: &str) -> AppResult<Shift> {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Shift>(
            r#"
            UPDATE shifts
            SET shift_type = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, member_id, date, shift_type, created_at, updated_at
            "#,
        )
        .bind(shift_type)
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))
    }

    pub async fn update_type_by_cell(
        pool: &SqlitePool,
        member_id: &str,
        date: &str,
        shift_type: &str,
    ) -> AppResult<Shift> {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Shift>(
            r#"
            UPDATE shifts
            SET shift_type = ?, updated_at = ?
            WHERE member_id = ? AND date = ?
            RETURNING id, member_id, date, shift_type, created_at, updated_at
            "#,
        )
        .bind(shift_type)
        .bind(now)
        .bind(member_id)
        .bind(date)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Shift not found".to_string()))
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM shifts WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Shift not found".to_string()));
        }
        Ok(())
    }
}
