use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::attendance::catalog::ShiftScheduleCatalog;
use crate::attendance::error::AttendanceError;
use crate::model::schedule::{EmploymentType, Schedule, ScheduleSettings, ShiftType};
use crate::model::worker::Worker;

/// Tolerance around a shift's start and end for time-in.
pub const GRACE_PERIOD_MINUTES: i64 = 30;

/// Checked in this order; the first role the worker holds wins.
const SHIFT_PRECEDENCE: [ShiftType; 5] = [
    ShiftType::Early,
    ShiftType::Day,
    ShiftType::Afternoon,
    ShiftType::Night,
    ShiftType::Evening,
];

const EMPLOYMENT_PRECEDENCE: [EmploymentType; 2] =
    [EmploymentType::FullTime, EmploymentType::PartTime];

/// Schedule configuration in effect for one request.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub catalog: Arc<ShiftScheduleCatalog>,
    pub settings: Arc<ScheduleSettings>,
}

/// Permitted time-in interval for one calendar day, grace included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInWindow {
    pub opens_at: NaiveDateTime,
    pub closes_at: NaiveDateTime,
}

impl TimeInWindow {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.opens_at <= at && at <= self.closes_at
    }
}

pub fn resolve_shift(worker: &Worker) -> Option<ShiftType> {
    SHIFT_PRECEDENCE
        .into_iter()
        .find(|shift| worker.has_role(shift.role_name()))
}

pub fn resolve_employment_type(worker: &Worker) -> Option<EmploymentType> {
    EMPLOYMENT_PRECEDENCE
        .into_iter()
        .find(|employment| worker.has_role(employment.role_name()))
}

/// Picks the schedule that governs `worker`. Strict tenants read the
/// catalog; the others use their custom pair for the employment type.
pub fn applicable_schedule(
    worker: &Worker,
    config: &ScheduleConfig,
) -> Result<Schedule, AttendanceError> {
    let (Some(shift), Some(employment)) = (resolve_shift(worker), resolve_employment_type(worker))
    else {
        return Err(AttendanceError::ConfigUnresolvable);
    };

    let schedule = if config.settings.strict_schedule {
        config.catalog.lookup(shift, employment)
    } else {
        config.settings.custom_for(employment)
    };

    schedule.ok_or(AttendanceError::ConfigUnresolvable)
}

/// Time-in window on `date`: the shift start minus the grace period up to
/// the shift end plus the grace period. An overnight shift ends on the
/// following day.
pub fn time_in_window(
    worker: &Worker,
    config: &ScheduleConfig,
    date: NaiveDate,
) -> Result<TimeInWindow, AttendanceError> {
    let schedule = applicable_schedule(worker, config)?;
    let grace = Duration::minutes(GRACE_PERIOD_MINUTES);

    let start = date.and_time(schedule.start_time);
    let mut end = date.and_time(schedule.end_time);
    if schedule.is_overnight() {
        end += Duration::hours(24);
    }

    Ok(TimeInWindow {
        opens_at: start - grace,
        closes_at: end + grace,
    })
}

/// Fail-closed: an unresolvable schedule is never within the window.
pub fn is_within_time_in_window(worker: &Worker, config: &ScheduleConfig, now: NaiveDateTime) -> bool {
    match time_in_window(worker, config, now.date()) {
        Ok(window) => window.contains(now),
        Err(_) => {
            tracing::warn!(worker_id = worker.id, "Schedule unresolvable for time-in window check");
            false
        }
    }
}

/// Whether `time_in` came before the shift's nominal start on the same
/// day. For an overnight shift the nominal start is moved a day ahead.
/// No grace period applies. Unresolvable schedules answer `false`.
pub fn is_late_time_in(worker: &Worker, config: &ScheduleConfig, time_in: NaiveDateTime) -> bool {
    let Ok(schedule) = applicable_schedule(worker, config) else {
        return false;
    };

    let mut start = time_in.date().and_time(schedule.start_time);
    if schedule.end_time < schedule.start_time {
        start += Duration::hours(24);
    }

    start > time_in
}
