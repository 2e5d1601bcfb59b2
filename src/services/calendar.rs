//! Month calendar for one member, and the per-session state that drives it.
//!
//! [`MonthView`] is the derived day grid (Sunday-first weeks with leading
//! blanks). [`CalendarState`] is what a client session holds while browsing
//! or editing: the visible member and month, the open editor, the multi-day
//! selection, and the last loaded shifts.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::models::Shift;
use crate::db::ScheduleStore;
use crate::error::{AppError, AppResult};
use crate::services::assignment::{assign_batch, BatchItemResult};
use crate::services::auth::Actor;
use crate::services::date_key::{days_in_month, first_weekday, month_range, DateKey};
use crate::services::shift_types::ShiftType;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// A visible month. `month0` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MonthCursor {
    pub year: i32,
    pub month0: u32,
}

impl MonthCursor {
    pub fn new(year: i32, month0: u32) -> AppResult<Self> {
        // Validates the month and that the year is representable.
        days_in_month(year, month0)?;
        Ok(Self { year, month0 })
    }

    /// From a one-based month as used in query strings.
    pub fn from_month(year: i32, month: u32) -> AppResult<Self> {
        if month == 0 || month > 12 {
            return Err(AppError::Validation(format!(
                "Invalid month {} (expected 1-12)",
                month
            )));
        }
        Self::new(year, month - 1)
    }

    pub fn containing(date: NaiveDate) -> Self {
        let key = DateKey::from_naive(date);
        Self {
            year: key.year(),
            month0: key.month0(),
        }
    }

    pub fn next(self) -> Self {
        if self.month0 == 11 {
            Self {
                year: self.year + 1,
                month0: 0,
            }
        } else {
            Self {
                year: self.year,
                month0: self.month0 + 1,
            }
        }
    }

    pub fn prev(self) -> Self {
        if self.month0 == 0 {
            Self {
                year: self.year - 1,
                month0: 11,
            }
        } else {
            Self {
                year: self.year,
                month0: self.month0 - 1,
            }
        }
    }

    /// e.g. "March 2025".
    pub fn title(&self) -> String {
        format!("{} {}", MONTH_NAMES[self.month0 as usize], self.year)
    }

    pub fn days(&self) -> AppResult<u32> {
        days_in_month(self.year, self.month0)
    }

    /// First and last day keys, inclusive.
    pub fn range(&self) -> AppResult<(DateKey, DateKey)> {
        month_range(self.year, self.month0)
    }

    pub fn date_key(&self, day: u32) -> AppResult<DateKey> {
        DateKey::new(self.year, self.month0, day)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub day: u32,
    pub date: String,
    /// 0 = Sunday.
    pub weekday: u32,
    pub weekday_name: &'static str,
    pub is_today: bool,
    pub shift: Option<Shift>,
    pub shift_type: Option<ShiftType>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DaySlot {
    Blank,
    Day(CalendarDay),
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthView {
    pub cursor: MonthCursor,
    pub title: String,
    pub days_in_month: u32,
    pub leading_blanks: u32,
    pub slots: Vec<DaySlot>,
}

impl MonthView {
    /// Lay out the month. Each day picks the shift whose date key matches
    /// exactly; shifts from other months are ignored.
    pub fn build(cursor: MonthCursor, shifts: &[Shift], today: NaiveDate) -> AppResult<Self> {
        let n = cursor.days()?;
        let leading = first_weekday(cursor.year, cursor.month0)?;

        let by_date: HashMap<&str, &Shift> =
            shifts.iter().map(|s| (s.date.as_str(), s)).collect();

        let mut slots = Vec::with_capacity((leading + n) as usize);
        slots.extend((0..leading).map(|_| DaySlot::Blank));

        for day in 1..=n {
            let key = cursor.date_key(day)?;
            let date = key.to_string();
            let shift = by_date.get(date.as_str()).map(|s| (*s).clone());
            let shift_type = shift.as_ref().and_then(Shift::kind);
            let weekday = key.weekday();

            slots.push(DaySlot::Day(CalendarDay {
                day,
                weekday,
                weekday_name: WEEKDAY_NAMES[weekday as usize],
                is_today: key.as_naive() == today,
                date,
                shift,
                shift_type,
            }));
        }

        Ok(Self {
            cursor,
            title: cursor.title(),
            days_in_month: n,
            leading_blanks: leading,
            slots,
        })
    }

    /// Rows of seven slots; the last row is padded with blanks.
    pub fn weeks(&self) -> Vec<Vec<DaySlot>> {
        self.slots
            .chunks(7)
            .map(|chunk| {
                let mut week = chunk.to_vec();
                week.resize(7, DaySlot::Blank);
                week
            })
            .collect()
    }

    pub fn day(&self, day: u32) -> Option<&CalendarDay> {
        self.days().find(|d| d.day == day)
    }

    pub fn days(&self) -> impl Iterator<Item = &CalendarDay> {
        self.slots.iter().filter_map(|slot| match slot {
            DaySlot::Day(d) => Some(d),
            DaySlot::Blank => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Edit,
    ViewOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Closed,
    OpenFor(u32),
}

/// Identifies what a fetched response belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewKey {
    pub member_id: Option<String>,
    pub cursor: MonthCursor,
}

#[derive(Debug, Clone)]
pub struct CalendarState {
    mode: ViewMode,
    member_id: Option<String>,
    cursor: MonthCursor,
    shifts: Vec<Shift>,
    editor: EditorState,
    selection: BTreeSet<u32>,
    last_error: Option<String>,
}

impl CalendarState {
    pub fn new(mode: ViewMode, cursor: MonthCursor) -> Self {
        Self {
            mode,
            member_id: None,
            cursor,
            shifts: Vec::new(),
            editor: EditorState::Closed,
            selection: BTreeSet::new(),
            last_error: None,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn cursor(&self) -> MonthCursor {
        self.cursor
    }

    pub fn member_id(&self) -> Option<&str> {
        self.member_id.as_deref()
    }

    pub fn editor(&self) -> EditorState {
        self.editor
    }

    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    /// Selected days in ascending order.
    pub fn selection(&self) -> Vec<u32> {
        self.selection.iter().copied().collect()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn view_key(&self) -> ViewKey {
        ViewKey {
            member_id: self.member_id.clone(),
            cursor: self.cursor,
        }
    }

    pub fn view(&self, today: NaiveDate) -> AppResult<MonthView> {
        MonthView::build(self.cursor, &self.shifts, today)
    }

    fn reset_interaction(&mut self) {
        self.editor = EditorState::Closed;
        self.selection.clear();
        self.shifts.clear();
    }

    pub fn select_member(&mut self, member_id: &str) {
        if self.member_id.as_deref() != Some(member_id) {
            self.member_id = Some(member_id.to_string());
            self.reset_interaction();
        }
    }

    pub fn next_month(&mut self) {
        self.cursor = self.cursor.next();
        self.reset_interaction();
    }

    pub fn prev_month(&mut self) {
        self.cursor = self.cursor.prev();
        self.reset_interaction();
    }

    /// Apply fetched shifts if they still belong to the current view.
    /// Returns `false` (and changes nothing) for a stale response.
    pub fn load(&mut self, key: &ViewKey, shifts: Vec<Shift>) -> bool {
        if *key != self.view_key() {
            tracing::debug!(
                "Discarding stale shifts for {:?}; current view is {:?}",
                key,
                self.view_key()
            );
            return false;
        }
        self.shifts = shifts;
        true
    }

    /// Re-fetch the whole visible month.
    pub async fn refresh<S: ScheduleStore + ?Sized>(&mut self, store: &S) -> AppResult<bool> {
        let key = self.view_key();
        let Some(member_id) = key.member_id.as_deref() else {
            return Ok(false);
        };
        let (start, end) = key.cursor.range()?;
        let shifts = store
            .list_shifts(member_id, &start.to_string(), &end.to_string())
            .await?;
        Ok(self.load(&key, shifts))
    }

    /// Handle a click on `day`. A plain click clears the selection and
    /// toggles that day's editor; with `modifier` the day is toggled in the
    /// selection instead. Ignored in view-only mode and outside the month.
    pub fn click_day(&mut self, day: u32, modifier: bool) {
        if self.mode == ViewMode::ViewOnly {
            return;
        }
        match self.cursor.days() {
            Ok(n) if (1..=n).contains(&day) => {}
            _ => return,
        }

        if modifier {
            if !self.selection.remove(&day) {
                self.selection.insert(day);
            }
        } else {
            self.selection.clear();
            self.editor = match self.editor {
                EditorState::OpenFor(open) if open == day => EditorState::Closed,
                _ => EditorState::OpenFor(day),
            };
        }
    }

    /// Open the editor on the first selected day, keeping the selection.
    pub fn open_bulk_editor(&mut self) {
        if let Some(first) = self.selection.iter().next() {
            self.editor = EditorState::OpenFor(*first);
        }
    }

    pub fn close_editor(&mut self) {
        self.editor = EditorState::Closed;
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Days an apply would touch: the selection, or else the open editor's day.
    pub fn pending_days(&self) -> Vec<u32> {
        if !self.selection.is_empty() {
            return self.selection();
        }
        match self.editor {
            EditorState::OpenFor(day) => vec![day],
            EditorState::Closed => Vec::new(),
        }
    }

    /// Commit `requested` to every pending day, then close the editor, clear
    /// the selection and re-fetch the month. Per-day failures are returned in
    /// the result list and summarised in [`last_error`](Self::last_error).
    pub async fn bulk_apply<S: ScheduleStore + ?Sized>(
        &mut self,
        store: &S,
        actor: Option<&Actor>,
        requested: Option<ShiftType>,
    ) -> AppResult<Vec<BatchItemResult>> {
        if self.mode == ViewMode::ViewOnly {
            return Err(AppError::Forbidden);
        }
        let member_id = self
            .member_id
            .clone()
            .ok_or_else(|| AppError::Validation("No member selected".to_string()))?;
        let days = self.pending_days();
        if days.is_empty() {
            return Err(AppError::Validation("No days selected".to_string()));
        }

        let dates = days
            .iter()
            .map(|d| self.cursor.date_key(*d).map(|k| k.to_string()))
            .collect::<AppResult<Vec<_>>>()?;

        let results = match assign_batch(store, actor, &member_id, &dates, requested).await {
            Ok(results) => results,
            Err(e) => {
                self.last_error = Some(e.public_message());
                return Err(e);
            }
        };

        self.editor = EditorState::Closed;
        self.selection.clear();

        let failed: Vec<&str> = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.date.as_str())
            .collect();
        self.last_error = if failed.is_empty() {
            None
        } else {
            Some(format!("Failed to update shifts for {}", failed.join(", ")))
        };

        if let Err(e) = self.refresh(store).await {
            tracing::warn!("Failed to refresh shifts after update: {}", e);
            self.last_error = Some(e.public_message());
        }

        Ok(results)
    }
}
