use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::models::{Member, Shift};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::assignment::{assign, assign_batch, AssignOutcome, BatchItemResult};
use crate::services::calendar::{DaySlot, MonthCursor, MonthView};
use crate::services::shift_types::ShiftType;
use crate::services::summary::MonthlySummary;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_members).post(create_member))
        .route("/:id", axum::routing::delete(delete_member))
        .route("/:id/shifts", get(month_shifts))
        .route("/:id/shifts/bulk", post(bulk_assign))
        .route("/:id/shifts/:date", put(assign_shift))
        .route("/:id/calendar", get(calendar))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// `?year=&month=` with a one-based month. Missing values default to the
/// current UTC month.
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl MonthQuery {
    pub fn cursor(&self) -> AppResult<MonthCursor> {
        let now = MonthCursor::containing(Utc::now().date_naive());
        MonthCursor::from_month(self.year.unwrap_or(now.year), self.month.unwrap_or(now.month0 + 1))
    }
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    #[serde(flatten)]
    pub member: Member,
    pub label: String,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        let label = member.display_label();
        Self { member, label }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    pub employee_id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct MonthShiftsResponse {
    pub member_id: String,
    pub year: i32,
    pub month: u32,
    pub start: String,
    pub end: String,
    pub shifts: Vec<Shift>,
}

/// `shift_type` may be a label or short name; null or empty clears the cell.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub shift_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkAssignRequest {
    pub dates: Vec<String>,
    #[serde(default)]
    pub shift_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkAssignResponse {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

/// A month as exposed over HTTP (one-based month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthRef {
    pub year: i32,
    pub month: u32,
}

impl From<MonthCursor> for MonthRef {
    fn from(cursor: MonthCursor) -> Self {
        Self {
            year: cursor.year,
            month: cursor.month0 + 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub member: MemberResponse,
    pub title: String,
    pub year: i32,
    pub month: u32,
    pub prev: MonthRef,
    pub next: MonthRef,
    pub leading_blanks: u32,
    pub days_in_month: u32,
    pub weeks: Vec<Vec<DaySlot>>,
    pub summary: MonthlySummary,
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_members(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<MemberResponse>>> {
    let members = state.store.list_members().await?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

async fn create_member(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Json(request): Json<CreateMemberRequest>,
) -> AppResult<(StatusCode, Json<MemberResponse>)> {
    let member = state
        .store
        .create_member(&request.employee_id, &request.name)
        .await?;
    tracing::info!(
        "Admin {} added member {} ({})",
        actor.email,
        member.display_label(),
        member.id
    );
    Ok((StatusCode::CREATED, Json(member.into())))
}

async fn delete_member(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let removed = state.store.delete_member(&id).await?;
    tracing::info!(
        "Admin {} deleted member {} and {} shifts",
        actor.email,
        id,
        removed
    );
    Ok(Json(serde_json::json!({
        "deleted": true,
        "shifts_removed": removed,
    })))
}

async fn require_member(state: &AppState, id: &str) -> AppResult<Member> {
    state
        .store
        .find_member(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))
}

async fn load_month(state: &AppState, member_id: &str, cursor: MonthCursor) -> AppResult<Vec<Shift>> {
    let (start, end) = cursor.range()?;
    state
        .store
        .list_shifts(member_id, &start.to_string(), &end.to_string())
        .await
}

async fn month_shifts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<MonthShiftsResponse>> {
    let cursor = query.cursor()?;
    require_member(&state, &id).await?;
    let (start, end) = cursor.range()?;
    let shifts = load_month(&state, &id, cursor).await?;

    Ok(Json(MonthShiftsResponse {
        member_id: id,
        year: cursor.year,
        month: cursor.month0 + 1,
        start: start.to_string(),
        end: end.to_string(),
        shifts,
    }))
}

async fn assign_shift(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path((id, date)): Path<(String, String)>,
    Json(request): Json<AssignRequest>,
) -> AppResult<Json<AssignOutcome>> {
    let requested = ShiftType::parse_requested(request.shift_type.as_deref())?;
    let outcome = assign(state.store.as_ref(), Some(&actor), &id, &date, requested).await?;
    Ok(Json(outcome))
}

async fn bulk_assign(
    State(state): State<Arc<AppState>>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<BulkAssignRequest>,
) -> AppResult<Json<BulkAssignResponse>> {
    if request.dates.is_empty() {
        return Err(AppError::Validation("No dates given".to_string()));
    }
    let requested = ShiftType::parse_requested(request.shift_type.as_deref())?;
    let results = assign_batch(
        state.store.as_ref(),
        Some(&actor),
        &id,
        &request.dates,
        requested,
    )
    .await?;

    let succeeded = results.iter().filter(|r| r.success).count();
    Ok(Json(BulkAssignResponse {
        succeeded,
        failed: results.len() - succeeded,
        results,
    }))
}

async fn calendar(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<CalendarResponse>> {
    let cursor = query.cursor()?;
    let member = require_member(&state, &id).await?;
    let shifts = load_month(&state, &id, cursor).await?;

    let view = MonthView::build(cursor, &shifts, Utc::now().date_naive())?;
    Ok(Json(CalendarResponse {
        member: member.into(),
        title: view.title.clone(),
        year: cursor.year,
        month: cursor.month0 + 1,
        prev: cursor.prev().into(),
        next: cursor.next().into(),
        leading_blanks: view.leading_blanks,
        days_in_month: view.days_in_month,
        weeks: view.weeks(),
        summary: MonthlySummary::from_shifts(&shifts),
    }))
}
