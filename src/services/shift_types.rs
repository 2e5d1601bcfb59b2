use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

/// The closed set of assignable shift types.
///
/// A shift type is persisted as its [`label`](ShiftType::label); parsing also
/// accepts the short name (`"morning"`, `"Offday"`, ...), case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftType {
    Morning,
    Evening,
    Night,
    Offday,
    Leave,
    Absent,
}

/// Text color to use on top of a shift type's background color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTone {
    Dark,
    Light,
}

impl ShiftType {
    pub const ALL: [ShiftType; 6] = [
        ShiftType::Morning,
        ShiftType::Evening,
        ShiftType::Night,
        ShiftType::Offday,
        ShiftType::Leave,
        ShiftType::Absent,
    ];

    /// Stored label.
    pub fn label(&self) -> &'static str {
        match self {
            ShiftType::Morning => "Morning Shift (07:00 - 03:00 PM)",
            ShiftType::Evening => "Evening Shift (02:50 - 11:00 PM)",
            ShiftType::Night => "Night Shift (10:30 - 07:00 AM)",
            ShiftType::Offday => "Offday",
            ShiftType::Leave => "Leave",
            ShiftType::Absent => "Absent",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            ShiftType::Morning => "Morning",
            ShiftType::Evening => "Evening",
            ShiftType::Night => "Night",
            ShiftType::Offday => "Offday",
            ShiftType::Leave => "Leave",
            ShiftType::Absent => "Absent",
        }
    }

    /// Background color as a hex string.
    pub fn color(&self) -> &'static str {
        match self {
            ShiftType::Morning => "#fad664",
            ShiftType::Evening => "#a8f15a",
            ShiftType::Night => "#108858",
            ShiftType::Offday => "#9febfb",
            ShiftType::Leave => "#dd9bfc",
            ShiftType::Absent => "#d21904",
        }
    }

    pub fn text_tone(&self) -> TextTone {
        match self {
            ShiftType::Night | ShiftType::Absent => TextTone::Light,
            _ => TextTone::Dark,
        }
    }

    /// Working hours, for the three working shifts only.
    pub fn time_range(&self) -> Option<&'static str> {
        match self {
            ShiftType::Morning => Some("7:00 AM - 3:00 PM"),
            ShiftType::Evening => Some("2:50 PM - 11:00 PM"),
            ShiftType::Night => Some("10:30 PM - 7:00 AM"),
            _ => None,
        }
    }

    pub fn is_working(&self) -> bool {
        self.time_range().is_some()
    }

    /// Resolve a stored label. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<ShiftType> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    /// Bucket a stored label for reporting. Exact labels resolve as usual;
    /// any other label naming a working shift ("Morning", "Evening", "Night")
    /// is counted as that shift, so older hour ranges still tally.
    pub fn classify(label: &str) -> Option<ShiftType> {
        Self::from_label(label).or_else(|| {
            [ShiftType::Morning, ShiftType::Evening, ShiftType::Night]
                .into_iter()
                .find(|t| label.contains(t.short_name()))
        })
    }

    /// Parse an optional requested type: empty or whitespace means "clear".
    pub fn parse_requested(raw: Option<&str>) -> Result<Option<ShiftType>, AppError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ShiftType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s) || t.short_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::Validation(format!("Unknown shift type: {}", s)))
    }
}

impl Serialize for ShiftType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ShiftType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|e: AppError| serde::de::Error::custom(e.public_message()))
    }
}

/// Catalog entry returned by `GET /api/shift-types`.
#[derive(Debug, Serialize)]
pub struct ShiftTypeInfo {
    pub key: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    pub text_tone: TextTone,
    pub time_range: Option<&'static str>,
}

impl From<ShiftType> for ShiftTypeInfo {
    fn from(t: ShiftType) -> Self {
        Self {
            key: t.short_name(),
            label: t.label(),
            color: t.color(),
            text_tone: t.text_tone(),
            time_range: t.time_range(),
        }
    }
}

pub fn catalog() -> Vec<ShiftTypeInfo> {
    ShiftType::ALL.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_unique_and_resolve_back() {
        for t in ShiftType::ALL {
            assert_eq!(ShiftType::from_label(t.label()), Some(t));
        }
        assert_eq!(ShiftType::from_label("Holiday"), None);
    }

    #[test]
    fn parses_short_names_and_labels_case_insensitively() {
        assert_eq!("morning".parse::<ShiftType>().unwrap(), ShiftType::Morning);
        assert_eq!("OFFDAY".parse::<ShiftType>().unwrap(), ShiftType::Offday);
        assert_eq!(
            "night shift (10:30 - 07:00 am)".parse::<ShiftType>().unwrap(),
            ShiftType::Night
        );
        assert!("Siesta".parse::<ShiftType>().is_err());
    }

    #[test]
    fn classify_counts_legacy_working_labels() {
        assert_eq!(
            ShiftType::classify("Morning Shift (06:00 - 02:00 PM)"),
            Some(ShiftType::Morning)
        );
        assert_eq!(ShiftType::classify("Night"), Some(ShiftType::Night));
        assert_eq!(ShiftType::classify("Leave"), Some(ShiftType::Leave));
        assert_eq!(ShiftType::classify("Sick leave"), None);
    }

    #[test]
    fn empty_request_means_clear() {
        assert_eq!(ShiftType::parse_requested(None).unwrap(), None);
        assert_eq!(ShiftType::parse_requested(Some("")).unwrap(), None);
        assert_eq!(ShiftType::parse_requested(Some("  ")).unwrap(), None);
        assert_eq!(
            ShiftType::parse_requested(Some("Leave")).unwrap(),
            Some(ShiftType::Leave)
        );
    }

    #[test]
    fn only_working_shifts_have_hours() {
        let working: Vec<_> = ShiftType::ALL.into_iter().filter(|t| t.is_working()).collect();
        assert_eq!(
            working,
            vec![ShiftType::Morning, ShiftType::Evening, ShiftType::Night]
        );
        assert_eq!(ShiftType::Absent.text_tone(), TextTone::Light);
    }

    #[test]
    fn catalog_serializes_with_labels() {
        let json = serde_json::to_value(catalog()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 6);
        assert_eq!(json[0]["key"], "Morning");
        assert_eq!(json[0]["color"], "#fad664");
        assert_eq!(json[3]["time_range"], serde_json::Value::Null);
        assert_eq!(json[5]["text_tone"], "light");
    }
}
