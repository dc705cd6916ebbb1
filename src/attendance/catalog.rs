use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveTime;
use once_cell::sync::Lazy;

use crate::model::schedule::{EmploymentType, Schedule, ShiftScheduleRow, ShiftType};

/// Built-in shift table, used when `shift_schedules` holds no rows.
pub static DEFAULT_CATALOG: Lazy<ShiftScheduleCatalog> = Lazy::new(|| {
    use EmploymentType::*;
    use ShiftType::*;

    let hm = |h: u32, m: u32| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
    let mut catalog = ShiftScheduleCatalog::default();
    for (shift, employment, start, end) in [
        (Early, FullTime, hm(6, 0), hm(14, 0)),
        (Early, PartTime, hm(6, 0), hm(10, 0)),
        (Day, FullTime, hm(9, 0), hm(17, 0)),
        (Day, PartTime, hm(9, 0), hm(13, 0)),
        (Afternoon, FullTime, hm(13, 0), hm(21, 0)),
        (Afternoon, PartTime, hm(13, 0), hm(17, 0)),
        (Night, FullTime, hm(22, 0), hm(6, 0)),
        (Night, PartTime, hm(22, 0), hm(2, 0)),
        (Evening, FullTime, hm(18, 0), hm(2, 0)),
        (Evening, PartTime, hm(18, 0), hm(22, 0)),
    ] {
        catalog.insert(shift, employment, Schedule::new(start, end));
    }
    catalog
});

/// (shift type × employment type) → schedule table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShiftScheduleCatalog {
    entries: HashMap<(ShiftType, EmploymentType), Schedule>,
}

impl ShiftScheduleCatalog {
    pub fn insert(&mut self, shift: ShiftType, employment: EmploymentType, schedule: Schedule) {
        self.entries.insert((shift, employment), schedule);
    }

    /// `None` means the combination is unconfigured, not that it is unrestricted.
    pub fn lookup(&self, shift: ShiftType, employment: EmploymentType) -> Option<Schedule> {
        self.entries.get(&(shift, employment)).copied()
    }

    /// Builds a catalog from table rows, skipping rows with unknown type names.
    pub fn from_rows(rows: Vec<ShiftScheduleRow>) -> Self {
        let mut catalog = Self::default();
        for row in rows {
            match (
                ShiftType::from_str(&row.shift_type),
                EmploymentType::from_str(&row.employment_type),
            ) {
                (Ok(shift), Ok(employment)) => {
                    catalog.insert(shift, employment, Schedule::new(row.start_time, row.end_time))
                }
                _ => tracing::warn!(
                    shift_type = %row.shift_type,
                    employment_type = %row.employment_type,
                    "Skipping unrecognised shift schedule row"
                ),
            }
        }
        catalog
    }
}
