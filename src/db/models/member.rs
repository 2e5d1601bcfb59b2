use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub id: String,
    /// Human-readable employee code, unique across members.
    pub employee_id: String,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Member {
    /// Label used in calendar headers, e.g. "17006 A".
    pub fn display_label(&self) -> String {
        format!("{} {}", self.employee_id, self.name)
    }
}
