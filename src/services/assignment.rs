//! Shift assignment for a single (member, date) cell.
//!
//! A cell is either empty or holds one shift type. Requesting a type moves the
//! cell as follows:
//!
//! | current        | requested | result         |
//! |----------------|-----------|----------------|
//! | any            | none      | `Empty`        |
//! | `Empty`        | `T`       | `Assigned(T)`  |
//! | `Assigned(T)`  | `T`       | `Empty`        |
//! | `Assigned(U)`  | `T`       | `Assigned(T)`  |
//!
//! Selecting the same type twice therefore clears the cell. Batches apply the
//! same rule to every date independently and report one result per date.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::models::Shift;
use crate::db::ScheduleStore;
use crate::error::{AppError, AppResult};
use crate::services::auth::Actor;
use crate::services::date_key::DateKey;
use crate::services::shift_types::ShiftType;

/// State of one (member, date) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "shift_type", rename_all = "snake_case")]
pub enum CellState {
    Empty,
    /// Stored label. Labels outside the catalog are kept verbatim.
    Assigned(String),
}

impl CellState {
    pub fn of(shift: Option<&Shift>) -> Self {
        match shift {
            Some(s) => CellState::Assigned(s.shift_type.clone()),
            None => CellState::Empty,
        }
    }

    pub fn assigned(t: ShiftType) -> Self {
        CellState::Assigned(t.label().to_string())
    }
}

/// Pure transition rule for a cell.
pub fn transition(current: &CellState, requested: Option<ShiftType>) -> CellState {
    match (current, requested) {
        (_, None) => CellState::Empty,
        (CellState::Empty, Some(t)) => CellState::assigned(t),
        (CellState::Assigned(label), Some(t)) if label == t.label() => CellState::Empty,
        (CellState::Assigned(_), Some(t)) => CellState::assigned(t),
    }
}

/// What has to be done to the store to realise a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create(ShiftType),
    Update { shift_id: String, to: ShiftType },
    Delete { shift_id: String },
    Noop,
}

/// Decide the store action for the current record and the requested type.
pub fn plan(current: Option<&Shift>, requested: Option<ShiftType>) -> Action {
    match (current, requested) {
        (None, None) => Action::Noop,
        (Some(shift), None) => Action::Delete {
            shift_id: shift.id.clone(),
        },
        (None, Some(t)) => Action::Create(t),
        (Some(shift), Some(t)) if shift.shift_type == t.label() => Action::Delete {
            shift_id: shift.id.clone(),
        },
        (Some(shift), Some(t)) => Action::Update {
            shift_id: shift.id.clone(),
            to: t,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignAction {
    Created,
    Updated,
    Deleted,
    Unchanged,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignOutcome {
    pub member_id: String,
    pub date: String,
    pub action: AssignAction,
    pub state: CellState,
    /// The record after the operation, if the cell is assigned.
    pub shift: Option<Shift>,
    /// Set when a create hit an existing row and was retried as an update.
    pub recovered_conflict: bool,
}

/// Per-date result of a batch. One failing date never hides the others.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResult {
    pub date: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<AssignOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    fn from_result(date: String, result: AppResult<AssignOutcome>) -> Self {
        match result {
            Ok(outcome) => Self {
                date,
                success: true,
                outcome: Some(outcome),
                error_code: None,
                error: None,
            },
            Err(e) => Self {
                date,
                success: false,
                outcome: None,
                error_code: Some(e.code()),
                error: Some(e.public_message()),
            },
        }
    }
}

fn require_actor(actor: Option<&Actor>) -> AppResult<&Actor> {
    actor.ok_or_else(|| {
        debug!("Rejected shift mutation without a session");
        AppError::Unauthorized
    })
}

/// Apply the assignment rule to one cell.
///
/// Rejections happen before the store is touched: a missing session is
/// `Unauthorized`, a malformed or nonexistent date is `Validation`.
pub async fn assign<S: ScheduleStore + ?Sized>(
    store: &S,
    actor: Option<&Actor>,
    member_id: &str,
    date: &str,
    requested: Option<ShiftType>,
) -> AppResult<AssignOutcome> {
    let actor = require_actor(actor)?;
    let key = DateKey::parse(date)?;
    if member_id.trim().is_empty() {
        return Err(AppError::Validation("No member selected".to_string()));
    }

    if store.find_member(member_id).await?.is_none() {
        return Err(AppError::NotFound("Member not found".to_string()));
    }

    apply_to_cell(store, actor, member_id, &key, requested).await
}

async fn apply_to_cell<S: ScheduleStore + ?Sized>(
    store: &S,
    actor: &Actor,
    member_id: &str,
    key: &DateKey,
    requested: Option<ShiftType>,
) -> AppResult<AssignOutcome> {
    let date = key.to_string();
    let existing = store.find_shift(member_id, &date).await?;
    let action = plan(existing.as_ref(), requested);
    let expected = transition(&CellState::of(existing.as_ref()), requested);

    debug!(
        "Assign {} on {} for member {} by {}: {:?}",
        requested.map(|t| t.short_name()).unwrap_or("(clear)"),
        date,
        member_id,
        actor.email,
        action
    );

    let mut recovered_conflict = false;
    let (assign_action, shift) = match action {
        Action::Noop => (AssignAction::Unchanged, None),
        Action::Delete { shift_id } => {
            store.delete_shift(&shift_id).await?;
            (AssignAction::Deleted, None)
        }
        Action::Update { shift_id, to } => {
            let shift = store.update_shift(&shift_id, to.label()).await?;
            (AssignAction::Updated, Some(shift))
        }
        Action::Create(t) => match store.create_shift(member_id, &date, t.label()).await {
            Ok(shift) => (AssignAction::Created, Some(shift)),
            Err(e) if e.is_conflict() => {
                // Another writer filled the cell between lookup and insert: last writer wins.
                warn!(
                    "Shift for member {} on {} already existed at insert time; updating instead",
                    member_id, date
                );
                recovered_conflict = true;
                let shift = store.update_shift_by_cell(member_id, &date, t.label()).await?;
                (AssignAction::Updated, Some(shift))
            }
            Err(e) => return Err(e),
        },
    };

    info!(
        "Shift {:?} for member {} on {}",
        assign_action, member_id, date
    );

    let state = CellState::of(shift.as_ref());
    debug_assert_eq!(state, expected, "store result diverged from the cell rule");

    Ok(AssignOutcome {
        member_id: member_id.to_string(),
        date,
        action: assign_action,
        state,
        shift,
        recovered_conflict,
    })
}

/// Apply the same requested type to several dates of one member.
///
/// Dates are processed sequentially and independently; duplicates are
/// applied once. Only a missing session or unknown member rejects the whole
/// batch, everything else is reported per date.
pub async fn assign_batch<S: ScheduleStore + ?Sized>(
    store: &S,
    actor: Option<&Actor>,
    member_id: &str,
    dates: &[String],
    requested: Option<ShiftType>,
) -> AppResult<Vec<BatchItemResult>> {
    let actor = require_actor(actor)?;
    if store.find_member(member_id).await?.is_none() {
        return Err(AppError::NotFound("Member not found".to_string()));
    }

    let mut seen = std::collections::HashSet::new();
    let mut results = Vec::with_capacity(dates.len());

    for date in dates {
        if !seen.insert(date.as_str()) {
            continue;
        }

        let result = match DateKey::parse(date) {
            Ok(key) => apply_to_cell(store, actor, member_id, &key, requested).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            warn!(
                "Bulk assignment failed for member {} on {}: {}",
                member_id, date, e
            );
        }
        results.push(BatchItemResult::from_result(date.clone(), result));
    }

    let failed = results.iter().filter(|r| !r.success).count();
    info!(
        "Bulk assignment for member {}: {} dates, {} failed",
        member_id,
        results.len(),
        failed
    );

    Ok(results)
}
