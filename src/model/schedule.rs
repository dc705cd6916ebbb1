use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter, EnumString};
use utoipa::ToSchema;

/// Shift a worker is rostered on, derived from the `*_shift` role names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, EnumIter, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ShiftType {
    Early,
    Day,
    Afternoon,
    Night,
    Evening,
}

impl ShiftType {
    /// Role name carried by workers assigned to this shift.
    pub fn role_name(&self) -> &'static str {
        match self {
            ShiftType::Early => "early_shift",
            ShiftType::Day => "day_shift",
            ShiftType::Afternoon => "afternoon_shift",
            ShiftType::Night => "night_shift",
            ShiftType::Evening => "evening_shift",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, EnumIter, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
}

impl EmploymentType {
    pub fn role_name(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "full_time",
            EmploymentType::PartTime => "part_time",
        }
    }
}

/// Official start and end of a shift as wall-clock times.
///
/// `end_time < start_time` marks an overnight shift whose end falls on the
/// following day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Schedule {
    #[schema(example = "09:00:00", value_type = String, format = "time")]
    pub start_time: NaiveTime,
    #[schema(example = "17:00:00", value_type = String, format = "time")]
    pub end_time: NaiveTime,
}

impl Schedule {
    pub fn new(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self { start_time, end_time }
    }

    pub fn is_overnight(&self) -> bool {
        self.end_time < self.start_time
    }
}

/// Per-tenant scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// When true shift times come from the global catalog, otherwise from
    /// the custom full-time/part-time pairs below.
    pub strict_schedule: bool,
    pub custom_shift_full_time: Option<Schedule>,
    pub custom_shift_part_time: Option<Schedule>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            strict_schedule: true,
            custom_shift_full_time: None,
            custom_shift_part_time: None,
        }
    }
}

impl ScheduleSettings {
    pub fn custom_for(&self, employment: EmploymentType) -> Option<Schedule> {
        match employment {
            EmploymentType::FullTime => self.custom_shift_full_time,
            EmploymentType::PartTime => self.custom_shift_part_time,
        }
    }
}

/// Row of `schedule_settings`.
#[derive(Debug, sqlx::FromRow)]
pub struct ScheduleSettingsRow {
    pub strict_schedule: bool,
    pub custom_full_time_start: Option<NaiveTime>,
    pub custom_full_time_end: Option<NaiveTime>,
    pub custom_part_time_start: Option<NaiveTime>,
    pub custom_part_time_end: Option<NaiveTime>,
}

impl From<ScheduleSettingsRow> for ScheduleSettings {
    fn from(row: ScheduleSettingsRow) -> Self {
        let pair = |start: Option<NaiveTime>, end: Option<NaiveTime>| match (start, end) {
            (Some(s), Some(e)) => Some(Schedule::new(s, e)),
            _ => None,
        };

        Self {
            strict_schedule: row.strict_schedule,
            custom_shift_full_time: pair(row.custom_full_time_start, row.custom_full_time_end),
            custom_shift_part_time: pair(row.custom_part_time_start, row.custom_part_time_end),
        }
    }
}

/// Row of `shift_schedules`; type columns hold the lowercase/snake_case names.
#[derive(Debug, sqlx::FromRow)]
pub struct ShiftScheduleRow {
    pub shift_type: String,
    pub employment_type: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn type_names_parse_from_table_values() {
        assert_eq!(ShiftType::from_str("night").unwrap(), ShiftType::Night);
        assert_eq!(
            EmploymentType::from_str("part_time").unwrap(),
            EmploymentType::PartTime
        );
        assert!(ShiftType::from_str("graveyard").is_err());
    }

    #[test]
    fn settings_row_requires_both_ends_of_a_custom_pair() {
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        let settings: ScheduleSettings = ScheduleSettingsRow {
            strict_schedule: false,
            custom_full_time_start: Some(t(8)),
            custom_full_time_end: Some(t(16)),
            custom_part_time_start: Some(t(8)),
            custom_part_time_end: None,
        }
        .into();

        assert_eq!(settings.custom_for(EmploymentType::FullTime), Some(Schedule::new(t(8), t(16))));
        assert_eq!(settings.custom_for(EmploymentType::PartTime), None);
    }
}
