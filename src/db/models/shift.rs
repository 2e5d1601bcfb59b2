use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::services::shift_types::ShiftType;

// ============================================================================
// Shift Models
// ============================================================================

/// One assigned shift. `(member_id, date)` is unique.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Shift {
    pub id: String,
    pub member_id: String,
    /// Calendar day as `YYYY-MM-DD`.
    pub date: String,
    /// Stored label of the shift type.
    pub shift_type: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Shift {
    /// Catalog entry for the stored label, if it is still a known type.
    pub fn kind(&self) -> Option<ShiftType> {
        ShiftType::from_label(&self.shift_type)
    }
}
