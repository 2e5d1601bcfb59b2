use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::routes::members::MonthQuery;
use crate::services::shift_types::{catalog, ShiftTypeInfo};
use crate::services::summary::{MonthlySummary, TypeCount};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/summary", get(summary))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub member_id: String,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub member_id: String,
    pub year: i32,
    pub month: u32,
    pub summary: MonthlySummary,
    pub by_type: Vec<TypeCount>,
}

async fn summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<SummaryResponse>> {
    let cursor = MonthQuery {
        year: query.year,
        month: query.month,
    }
    .cursor()?;

    state
        .store
        .find_member(&query.member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let (start, end) = cursor.range()?;
    let shifts = state
        .store
        .list_shifts(&query.member_id, &start.to_string(), &end.to_string())
        .await?;
    let summary = MonthlySummary::from_shifts(&shifts);

    Ok(Json(SummaryResponse {
        member_id: query.member_id,
        year: cursor.year,
        month: cursor.month0 + 1,
        by_type: summary.by_type(),
        summary,
    }))
}

pub async fn shift_types() -> Json<Vec<ShiftTypeInfo>> {
    Json(catalog())
}
