use serde::Serialize;

use crate::db::models::Shift;
use crate::services::shift_types::ShiftType;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TypeCount {
    pub shift_type: ShiftType,
    pub count: u32,
}

/// Per-type tallies for one member's month. Labels naming a working shift
/// count towards it even when their hours differ from the catalog.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MonthlySummary {
    pub morning: u32,
    pub evening: u32,
    pub night: u32,
    pub offday: u32,
    pub leave: u32,
    pub absent: u32,
    /// Morning, evening and night.
    pub work_days: u32,
    /// Offday and leave.
    pub off_days: u32,
    /// Every stored shift, including labels outside the catalog.
    pub total: u32,
    pub unknown: u32,
}

impl MonthlySummary {
    pub fn from_shifts(shifts: &[Shift]) -> Self {
        let mut summary = Self::default();
        for shift in shifts {
            summary.total += 1;
            match ShiftType::classify(&shift.shift_type) {
                Some(ShiftType::Morning) => summary.morning += 1,
                Some(ShiftType::Evening) => summary.evening += 1,
                Some(ShiftType::Night) => summary.night += 1,
                Some(ShiftType::Offday) => summary.offday += 1,
                Some(ShiftType::Leave) => summary.leave += 1,
                Some(ShiftType::Absent) => summary.absent += 1,
                None => summary.unknown += 1,
            }
        }
        summary.work_days = summary.morning + summary.evening + summary.night;
        summary.off_days = summary.offday + summary.leave;
        summary
    }

    pub fn count(&self, t: ShiftType) -> u32 {
        match t {
            ShiftType::Morning => self.morning,
            ShiftType::Evening => self.evening,
            ShiftType::Night => self.night,
            ShiftType::Offday => self.offday,
            ShiftType::Leave => self.leave,
            ShiftType::Absent => self.absent,
        }
    }

    /// Counts in catalog order.
    pub fn by_type(&self) -> Vec<TypeCount> {
        ShiftType::ALL
            .into_iter()
            .map(|shift_type| TypeCount {
                shift_type,
                count: self.count(shift_type),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(date: &str, label: &str) -> Shift {
        let now = chrono::Utc::now().naive_utc();
        Shift {
            id: date.to_string(),
            member_id: "m1".to_string(),
            date: date.to_string(),
            shift_type: label.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn counts_per_type_and_totals() {
        let shifts = vec![
            shift("2025-03-01", ShiftType::Morning.label()),
            shift("2025-03-02", ShiftType::Morning.label()),
            shift("2025-03-03", ShiftType::Night.label()),
            shift("2025-03-04", ShiftType::Offday.label()),
            shift("2025-03-05", ShiftType::Leave.label()),
            shift("2025-03-06", ShiftType::Absent.label()),
            shift("2025-03-07", "Training"),
            shift("2025-03-08", "Evening Shift (03:00 - 11:30 PM)"),
        ];
        let summary = MonthlySummary::from_shifts(&shifts);

        assert_eq!(summary.morning, 2);
        assert_eq!(summary.evening, 1);
        assert_eq!(summary.work_days, 4);
        assert_eq!(summary.off_days, 2);
        assert_eq!(summary.absent, 1);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.total, 8);
        assert_eq!(summary.by_type()[0].count, 2);
    }

    #[test]
    fn empty_month_is_all_zero() {
        assert_eq!(MonthlySummary::from_shifts(&[]), MonthlySummary::default());
    }
}
