use chrono::{Duration, NaiveDateTime};

use crate::attendance::evaluator::resolve_employment_type;
use crate::model::attendance::BreakInterval;
use crate::model::schedule::EmploymentType;
use crate::model::worker::Worker;

/// Minimum worked time before a worker may time out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkHoursPolicy {
    pub full_time: Duration,
    pub part_time: Duration,
}

impl Default for WorkHoursPolicy {
    fn default() -> Self {
        Self {
            full_time: Duration::hours(8),
            part_time: Duration::hours(4),
        }
    }
}

impl WorkHoursPolicy {
    pub fn from_hours(full_time: i64, part_time: i64) -> Self {
        Self {
            full_time: Duration::hours(full_time),
            part_time: Duration::hours(part_time),
        }
    }

    pub fn required_hours(&self, employment: EmploymentType) -> Duration {
        match employment {
            EmploymentType::FullTime => self.full_time,
            EmploymentType::PartTime => self.part_time,
        }
    }

    /// Fails closed when the employment type cannot be resolved.
    pub fn has_sufficient_hours(
        &self,
        worker: &Worker,
        time_in: NaiveDateTime,
        time_out: NaiveDateTime,
        breaks: &[BreakInterval],
    ) -> bool {
        match resolve_employment_type(worker) {
            Some(employment) => {
                worked_duration(time_in, time_out, breaks) >= self.required_hours(employment)
            }
            None => false,
        }
    }
}

/// Elapsed session time minus closed breaks. Open breaks are not counted;
/// callers reject time-out while one exists. A break resumed before it
/// started pauses nothing.
pub fn worked_duration(
    time_in: NaiveDateTime,
    time_out: NaiveDateTime,
    breaks: &[BreakInterval],
) -> Duration {
    let paused = breaks
        .iter()
        .filter_map(|b| b.resume_time.map(|resume| resume - b.break_time))
        .filter(|paused| *paused > Duration::zero())
        .fold(Duration::zero(), |acc, d| acc + d);

    (time_out - time_in) - paused
}
