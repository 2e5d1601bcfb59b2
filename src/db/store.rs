//! The persistence gateway seen by the scheduling services.
//!
//! Services depend on [`ScheduleStore`] rather than on the pool so the
//! assignment rules can run against any backend (and against failing stores
//! in tests). [`SqliteStore`] is the production implementation.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::models::{Member, Shift};
use crate::db::{MemberRepository, ShiftRepository};
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait ScheduleStore: Send + Sync + 'static {
    /// Members sorted by employee code.
    async fn list_members(&self) -> AppResult<Vec<Member>>;

    async fn find_member(&self, member_id: &str) -> AppResult<Option<Member>>;

    /// Fails with `Conflict` when the employee code is taken.
    async fn create_member(&self, employee_id: &str, name: &str) -> AppResult<Member>;

    /// Removes the member and all of their shifts; returns the number of shifts removed.
    async fn delete_member(&self, member_id: &str) -> AppResult<u64>;

    /// Shifts with `start <= date <= end` (inclusive `YYYY-MM-DD` keys), ordered by date.
    async fn list_shifts(&self, member_id: &str, start: &str, end: &str)
        -> AppResult<Vec<Shift>>;

    async fn find_shift(&self, member_id: &str, date: &str) -> AppResult<Option<Shift>>;

    /// Fails with `Conflict` when the (member, date) cell is already taken.
    async fn create_shift(&self, member_id: &str, date: &str, shift_type: &str)
        -> AppResult<Shift>;

    async fn update_shift(&self, shift_id: &str, shift_type: &str) -> AppResult<Shift>;

    /// Update addressed by cell instead of row id.
    async fn update_shift_by_cell(
        &self,
        member_id: &str,
        date: &str,
        shift_type: &str,
    ) -> AppResult<Shift>;

    async fn delete_shift(&self, shift_id: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    async fn list_members(&self) -> AppResult<Vec<Member>> {
        MemberRepository::list_all(&self.pool).await
    }

    async fn find_member(&self, member_id: &str) -> AppResult<Option<Member>> {
        MemberRepository::find_by_id(&self.pool, member_id).await
    }

    async fn create_member(&self, employee_id: &str, name: &str) -> AppResult<Member> {
        let employee_id = employee_id.trim();
        let name = name.trim();
        if employee_id.is_empty() || name.is_empty() {
            return Err(AppError::Validation(
                "Employee ID and name are required".to_string(),
            ));
        }
        MemberRepository::create(&self.pool, employee_id, name).await
    }

    async fn delete_member(&self, member_id: &str) -> AppResult<u64> {
        MemberRepository::delete(&self.pool, member_id).await
    }

    async fn list_shifts(
        &self,
        member_id: &str,
        start: &str,
        end: &str,
    ) -> AppResult<Vec<Shift>> {
        ShiftRepository::list_for_member(&self.pool, member_id, start, end).await
    }

    async fn find_shift(&self, member_id: &str, date: &str) -> AppResult<Option<Shift>> {
        ShiftRepository::find_by_cell(&self.pool, member_id, date).await
    }

    async fn create_shift(
        &self,
        member_id: &str,
        date: &str,
        shift_type: &str,
    ) -> AppResult<Shift> {
        ShiftRepository::create(&self.pool, member_id, date, shift_type).await
    }

    async fn update_shift(&self, shift_id: &str, shift_type: &str) -> AppResult<Shift> {
        ShiftRepository::update_type(&self.pool, shift_id, shift_type).await
    }

    async fn update_shift_by_cell(
        &self,
        member_id: &str,
        date: &str,
        shift_type: &str,
    ) -> AppResult<Shift> {
        ShiftRepository::update_type_by_cell(&self.pool, member_id, date, shift_type).await
    }

    async fn delete_shift(&self, shift_id: &str) -> AppResult<()> {
        ShiftRepository::delete(&self.pool, shift_id).await
    }
}

/// Store wrapper for tests: counts calls and fails every operation that
/// touches one of `failing_dates` with a transport-style error.
#[cfg(test)]
pub struct FaultyStore<S> {
    inner: S,
    failing_dates: std::collections::HashSet<String>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl<S: ScheduleStore> FaultyStore<S> {
    pub fn new(inner: S, failing_dates: &[&str]) -> Self {
        Self {
            inner,
            failing_dates: failing_dates.iter().map(|d| d.to_string()).collect(),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn check(&self, date: Option<&str>) -> AppResult<()> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match date {
            Some(d) if self.failing_dates.contains(d) => Err(AppError::ServiceUnavailable(
                format!("store unavailable for {}", d),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl<S: ScheduleStore> ScheduleStore for FaultyStore<S> {
    async fn list_members(&self) -> AppResult<Vec<Member>> {
        self.check(None)?;
        self.inner.list_members().await
    }

    async fn find_member(&self, member_id: &str) -> AppResult<Option<Member>> {
        self.check(None)?;
        self.inner.find_member(member_id).await
    }

    async fn create_member(&self, employee_id: &str, name: &str) -> AppResult<Member> {
        self.check(None)?;
        self.inner.create_member(employee_id, name).await
    }

    async fn delete_member(&self, member_id: &str) -> AppResult<u64> {
        self.check(None)?;
        self.inner.delete_member(member_id).await
    }

    async fn list_shifts(
        &self,
        member_id: &str,
        start: &str,
        end: &str,
    ) -> AppResult<Vec<Shift>> {
        self.check(None)?;
        self.inner.list_shifts(member_id, start, end).await
    }

    async fn find_shift(&self, member_id: &str, date: &str) -> AppResult<Option<Shift>> {
        self.check(Some(date))?;
        self.inner.find_shift(member_id, date).await
    }

    async fn create_shift(
        &self,
        member_id: &str,
        date: &str,
        shift_type: &str,
    ) -> AppResult<Shift> {
        self.check(Some(date))?;
        self.inner.create_shift(member_id, date, shift_type).await
    }

    async fn update_shift(&self, shift_id: &str, shift_type: &str) -> AppResult<Shift> {
        self.check(None)?;
        self.inner.update_shift(shift_id, shift_type).await
    }

    async fn update_shift_by_cell(
        &self,
        member_id: &str,
        date: &str,
        shift_type: &str,
    ) -> AppResult<Shift> {
        self.check(Some(date))?;
        self.inner.update_shift_by_cell(member_id, date, shift_type).await
    }

    async fn delete_shift(&self, shift_id: &str) -> AppResult<()> {
        self.check(None)?;
        self.inner.delete_shift(shift_id).await
    }
}
