use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{info, instrument, warn};

use crate::attendance::error::AttendanceError;
use crate::attendance::evaluator::{self, TimeInWindow};
use crate::attendance::store::{AttendanceStore, WorkerTx};
use crate::attendance::work_hours::{WorkHoursPolicy, worked_duration};
use crate::model::attendance::{AttendanceRecord, BreakInterval, DayRecord, LeaveDay};
use crate::model::schedule::Schedule;
use crate::model::worker::Worker;
use crate::utils::file_storage::FileStorage;
use crate::utils::schedule_cache::ScheduleCache;

/// A file handed in with the end-of-day report.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct LifecycleOptions {
    pub enforce_schedule: bool,
    pub enforce_work_hours: bool,
    pub policy: WorkHoursPolicy,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            enforce_schedule: true,
            enforce_work_hours: true,
            policy: WorkHoursPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimedOut {
    pub record: AttendanceRecord,
    pub worked: Duration,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SessionView {
    pub record: AttendanceRecord,
    pub breaks: Vec<BreakInterval>,
    /// Up to time-out, or up to now while the session is open.
    pub worked: Duration,
    pub late_entry: bool,
}

#[derive(Debug, Clone)]
pub struct DayView {
    pub date: NaiveDate,
    pub approved_leave: Option<LeaveDay>,
    pub pending_leave: Option<LeaveDay>,
    pub sessions: Vec<SessionView>,
}

/// Runs the time-in / break / resume / time-out state machine.
pub struct AttendanceService<S, F> {
    store: S,
    files: F,
    schedules: ScheduleCache,
    options: LifecycleOptions,
}

fn rejected(err: AttendanceError) -> AttendanceError {
    info!(code = err.code(), "Attendance transition rejected");
    err
}

/// The record if it belongs to the locked worker and is an open session.
async fn open_session<T: WorkerTx>(tx: &mut T, record_id: u64) -> Result<AttendanceRecord, AttendanceError> {
    match tx.find_record(record_id).await? {
        Some(DayRecord::Attendance(record)) if record.is_open() => Ok(record),
        _ => Err(rejected(AttendanceError::RecordNotFound)),
    }
}

impl<S, F> AttendanceService<S, F>
where
    S: AttendanceStore,
    F: FileStorage,
{
    pub fn new(store: S, files: F, schedules: ScheduleCache, options: LifecycleOptions) -> Self {
        Self {
            store,
            files,
            schedules,
            options,
        }
    }

    pub fn schedules(&self) -> &ScheduleCache {
        &self.schedules
    }

    #[instrument(name = "attendance_time_in", skip(self, worker), fields(worker_id = worker.id))]
    pub async fn time_in(&self, worker: &Worker, now: NaiveDateTime) -> Result<AttendanceRecord, AttendanceError> {
        let config = if self.options.enforce_schedule {
            Some(self.schedules.config_for(worker.company_id).await?)
        } else {
            None
        };

        let mut tx = self.store.begin(worker.id).await?;

        let today = tx.day_records_on(now.date()).await?;
        if today.iter().any(|r| r.is_approved_absence_on(now.date())) {
            return Err(rejected(AttendanceError::AbsenceConflict));
        }

        if tx.open_record().await?.is_some() {
            return Err(rejected(AttendanceError::OpenSessionExists));
        }

        if let Some(config) = &config {
            if !evaluator::is_within_time_in_window(worker, config, now) {
                return Err(rejected(AttendanceError::OutsideScheduleWindow));
            }
        }

        let record = tx.insert_record(now).await?;
        tx.commit().await?;

        info!(record_id = record.id, "Timed in");
        Ok(record)
    }

    #[instrument(name = "attendance_start_break", skip(self, worker), fields(worker_id = worker.id))]
    pub async fn start_break(
        &self,
        worker: &Worker,
        record_id: u64,
        now: NaiveDateTime,
    ) -> Result<BreakInterval, AttendanceError> {
        let mut tx = self.store.begin(worker.id).await?;
        let record = open_session(&mut tx, record_id).await?;

        if now < record.time_in {
            return Err(rejected(AttendanceError::RecordNotFound));
        }

        if tx.breaks(record.id).await?.iter().any(BreakInterval::is_open) {
            return Err(rejected(AttendanceError::OpenBreakExists));
        }

        let interval = tx.insert_break(record.id, now).await?;
        tx.commit().await?;

        info!(record_id, break_id = interval.id, "Break started");
        Ok(interval)
    }

    #[instrument(name = "attendance_resume_break", skip(self, worker), fields(worker_id = worker.id))]
    pub async fn resume_break(
        &self,
        worker: &Worker,
        record_id: u64,
        now: NaiveDateTime,
    ) -> Result<BreakInterval, AttendanceError> {
        let mut tx = self.store.begin(worker.id).await?;
        let record = open_session(&mut tx, record_id).await?;

        let open: Vec<BreakInterval> = tx
            .breaks(record.id)
            .await?
            .into_iter()
            .filter(BreakInterval::is_open)
            .collect();

        let [interval] = open.as_slice() else {
            return Err(rejected(AttendanceError::NoOpenBreak));
        };
        let mut interval = interval.clone();

        if now < interval.break_time {
            return Err(rejected(AttendanceError::NoOpenBreak));
        }

        tx.resume_break(interval.id, now).await?;
        tx.commit().await?;

        interval.resume_time = Some(now);
        info!(record_id, break_id = interval.id, "Break resumed");
        Ok(interval)
    }

    /// Closes the session. Attachments are written before the row commits;
    /// if anything after that fails they are deleted again.
    #[instrument(
        name = "attendance_time_out",
        skip(self, worker, end_of_day_report, attachments),
        fields(worker_id = worker.id, attachments = attachments.len())
    )]
    pub async fn time_out(
        &self,
        worker: &Worker,
        record_id: u64,
        now: NaiveDateTime,
        end_of_day_report: Option<String>,
        attachments: Vec<Attachment>,
    ) -> Result<TimedOut, AttendanceError> {
        let mut tx = self.store.begin(worker.id).await?;

        let mut record = match tx.find_record(record_id).await? {
            Some(DayRecord::Attendance(record)) => record,
            _ => return Err(rejected(AttendanceError::RecordNotFound)),
        };

        if !record.is_open() {
            return Err(rejected(AttendanceError::AlreadyTimedOut));
        }

        let breaks = tx.breaks(record.id).await?;
        if breaks.iter().any(BreakInterval::is_open) {
            return Err(rejected(AttendanceError::OpenBreakMustResume));
        }

        let last_resume = breaks.iter().filter_map(|b| b.resume_time).max();
        if now < record.time_in || last_resume.is_some_and(|resumed| now < resumed) {
            return Err(rejected(AttendanceError::InsufficientHours));
        }

        if self.options.enforce_work_hours
            && !self
                .options
                .policy
                .has_sufficient_hours(worker, record.time_in, now, &breaks)
        {
            if evaluator::resolve_employment_type(worker).is_none() {
                warn!(code = AttendanceError::ConfigUnresolvable.code(), "Employment type unresolvable");
            }
            return Err(rejected(AttendanceError::InsufficientHours));
        }

        let stored = self.store_attachments(&attachments).await?;

        if let Err(e) = commit_time_out(tx, record.id, now, end_of_day_report.as_deref(), &stored).await {
            self.discard_files(&stored).await;
            return Err(e);
        }

        record.time_out = Some(now);
        record.end_of_day_report = end_of_day_report;
        let worked = worked_duration(record.time_in, now, &breaks);

        info!(record_id, worked_minutes = worked.num_minutes(), "Timed out");
        Ok(TimedOut {
            record,
            worked,
            attachments: stored,
        })
    }

    /// Files a pending absence. One leave row per worker and day.
    #[instrument(name = "attendance_request_leave", skip(self, worker), fields(worker_id = worker.id))]
    pub async fn request_leave(
        &self,
        worker: &Worker,
        date: NaiveDate,
        reason: &str,
    ) -> Result<LeaveDay, AttendanceError> {
        let mut tx = self.store.begin(worker.id).await?;

        let existing = tx.day_records_on(date).await?;
        if existing.iter().any(|r| !matches!(r, DayRecord::Attendance(_))) {
            return Err(rejected(AttendanceError::LeaveExists));
        }

        let leave = tx.insert_leave(date, reason).await?;
        tx.commit().await?;

        info!(leave_id = leave.id, %date, "Leave request submitted");
        Ok(leave)
    }

    /// Today's sessions and leave for the worker, as of `now`.
    #[instrument(name = "attendance_day_view", skip(self, worker), fields(worker_id = worker.id))]
    pub async fn day_view(&self, worker: &Worker, now: NaiveDateTime) -> Result<DayView, AttendanceError> {
        let config = self.schedules.config_for(worker.company_id).await?;
        let date = now.date();

        // read only; dropped without commit
        let mut tx = self.store.begin(worker.id).await?;
        let records = tx.day_records_on(date).await?;

        let mut view = DayView {
            date,
            approved_leave: None,
            pending_leave: None,
            sessions: Vec::new(),
        };

        for day_record in records {
            match day_record {
                DayRecord::Attendance(record) => {
                    let breaks = tx.breaks(record.id).await?;
                    let until = record.time_out.unwrap_or(now);
                    let settled: Vec<BreakInterval> = breaks
                        .iter()
                        .cloned()
                        .map(|mut b| {
                            b.resume_time.get_or_insert(until);
                            b
                        })
                        .collect();

                    view.sessions.push(SessionView {
                        worked: worked_duration(record.time_in, until, &settled),
                        late_entry: evaluator::is_late_time_in(worker, &config, record.time_in),
                        record,
                        breaks,
                    });
                }
                DayRecord::ApprovedLeave { leave, .. } => view.approved_leave = Some(leave),
                DayRecord::PendingLeave(leave) => view.pending_leave = Some(leave),
            }
        }

        Ok(view)
    }

    /// The schedule governing the worker and its time-in window on `date`.
    pub async fn schedule_for(
        &self,
        worker: &Worker,
        date: NaiveDate,
    ) -> Result<(Schedule, TimeInWindow), AttendanceError> {
        let config = self.schedules.config_for(worker.company_id).await?;
        let schedule = evaluator::applicable_schedule(worker, &config)?;
        let window = evaluator::time_in_window(worker, &config, date)?;
        Ok((schedule, window))
    }

    async fn store_attachments(&self, attachments: &[Attachment]) -> Result<Vec<String>, AttendanceError> {
        let mut stored = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            match self.files.store(&attachment.file_name, &attachment.bytes).await {
                Ok(path) => stored.push(path),
                Err(e) => {
                    self.discard_files(&stored).await;
                    return Err(AttendanceError::Storage(e));
                }
            }
        }
        Ok(stored)
    }

    /// Best-effort: failures are logged and never replace the caller's error.
    async fn discard_files(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = self.files.delete(path).await {
                warn!(error = %e, path = %path, "Failed to remove attachment after rollback");
            }
        }
    }
}

async fn commit_time_out<T: WorkerTx>(
    mut tx: T,
    record_id: u64,
    now: NaiveDateTime,
    end_of_day_report: Option<&str>,
    paths: &[String],
) -> Result<(), AttendanceError> {
    tx.close_record(record_id, now, end_of_day_report).await?;
    for path in paths {
        tx.insert_attachment(record_id, path).await?;
    }
    tx.commit().await
}
