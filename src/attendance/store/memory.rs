// In memory implementation of the AttendanceStore port, for lifecycle tests.
//
// A transaction works on a private copy of the tables taken under the
// worker's lock; commit writes the worker's rows back.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::OwnedMutexGuard;

use super::{AttendanceStore, StoreResult, WorkerTx};
use crate::attendance::error::AttendanceError;
use crate::model::attendance::{AttendanceRecord, AttendanceRow, BreakInterval, DayRecord, LeaveDay};

#[derive(Clone, Default)]
struct Tables {
    records: BTreeMap<u64, AttendanceRow>,
    breaks: BTreeMap<u64, BreakInterval>,
    attachments: Vec<(u64, String)>,
}

impl Tables {
    fn owns_record(&self, worker_id: u64, record_id: u64) -> bool {
        self.records
            .get(&record_id)
            .is_some_and(|r| r.employee_id == worker_id)
    }
}

#[derive(Default)]
pub struct InMemoryAttendanceStore {
    tables: Arc<Mutex<Tables>>,
    locks: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
    next_id: Arc<AtomicU64>,
    fail_attachments: Arc<AtomicBool>,
}

impl InMemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `insert_attachment` fail.
    pub fn fail_attachment_writes(&self) {
        self.fail_attachments.store(true, Ordering::SeqCst);
    }

    pub fn seed_leave(
        &self,
        worker_id: u64,
        date: NaiveDate,
        reason: &str,
        approved_at: Option<NaiveDateTime>,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.tables.lock().unwrap().records.insert(
            id,
            AttendanceRow {
                id,
                employee_id: worker_id,
                time_in: None,
                time_out: None,
                end_of_day_report: None,
                absence_date: Some(date),
                absence_reason: Some(reason.to_string()),
                absence_approved_at: approved_at,
            },
        );
        id
    }

    pub fn records_of(&self, worker_id: u64) -> Vec<DayRecord> {
        self.tables
            .lock()
            .unwrap()
            .records
            .values()
            .filter(|r| r.employee_id == worker_id)
            .cloned()
            .filter_map(|r| DayRecord::try_from(r).ok())
            .collect()
    }

    pub fn breaks_of(&self, record_id: u64) -> Vec<BreakInterval> {
        self.tables
            .lock()
            .unwrap()
            .breaks
            .values()
            .filter(|b| b.record_id == record_id)
            .cloned()
            .collect()
    }

    pub fn attachments_of(&self, record_id: u64) -> Vec<String> {
        self.tables
            .lock()
            .unwrap()
            .attachments
            .iter()
            .filter(|(id, _)| *id == record_id)
            .map(|(_, path)| path.clone())
            .collect()
    }

    fn worker_lock(&self, worker_id: u64) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(worker_id)
            .or_default()
            .clone()
    }
}

pub struct InMemoryWorkerTx {
    _guard: OwnedMutexGuard<()>,
    worker_id: u64,
    shared: Arc<Mutex<Tables>>,
    working: Tables,
    next_id: Arc<AtomicU64>,
    fail_attachments: Arc<AtomicBool>,
}

impl InMemoryWorkerTx {
    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn day_record(&self, row: &AttendanceRow) -> StoreResult<DayRecord> {
        DayRecord::try_from(row.clone())
            .map_err(|e| AttendanceError::store(anyhow!("malformed attendance row {}", e.0)))
    }
}

#[async_trait]
impl AttendanceStore for InMemoryAttendanceStore {
    type Tx = InMemoryWorkerTx;

    async fn begin(&self, worker_id: u64) -> StoreResult<Self::Tx> {
        let guard = self.worker_lock(worker_id).lock_owned().await;
        let working = self.tables.lock().unwrap().clone();

        Ok(InMemoryWorkerTx {
            _guard: guard,
            worker_id,
            shared: self.tables.clone(),
            working,
            next_id: self.next_id.clone(),
            fail_attachments: self.fail_attachments.clone(),
        })
    }
}

#[async_trait]
impl WorkerTx for InMemoryWorkerTx {
    async fn day_records_on(&mut self, date: NaiveDate) -> StoreResult<Vec<DayRecord>> {
        self.working
            .records
            .values()
            .filter(|r| r.employee_id == self.worker_id)
            .filter(|r| r.absence_date == Some(date) || r.time_in.map(|t| t.date()) == Some(date))
            .map(|r| self.day_record(r))
            .collect()
    }

    async fn open_record(&mut self) -> StoreResult<Option<AttendanceRecord>> {
        for row in self.working.records.values().rev() {
            if row.employee_id != self.worker_id {
                continue;
            }
            if let DayRecord::Attendance(record) = self.day_record(row)? {
                if record.is_open() {
                    return Ok(Some(record));
                }
            }
        }
        Ok(None)
    }

    async fn find_record(&mut self, record_id: u64) -> StoreResult<Option<DayRecord>> {
        match self.working.records.get(&record_id) {
            Some(row) if row.employee_id == self.worker_id => Ok(Some(self.day_record(row)?)),
            _ => Ok(None),
        }
    }

    async fn breaks(&mut self, record_id: u64) -> StoreResult<Vec<BreakInterval>> {
        Ok(self
            .working
            .breaks
            .values()
            .filter(|b| b.record_id == record_id)
            .cloned()
            .collect())
    }

    async fn insert_record(&mut self, time_in: NaiveDateTime) -> StoreResult<AttendanceRecord> {
        let id = self.allocate_id();
        self.working.records.insert(
            id,
            AttendanceRow {
                id,
                employee_id: self.worker_id,
                time_in: Some(time_in),
                time_out: None,
                end_of_day_report: None,
                absence_date: None,
                absence_reason: None,
                absence_approved_at: None,
            },
        );

        Ok(AttendanceRecord {
            id,
            worker_id: self.worker_id,
            time_in,
            time_out: None,
            end_of_day_report: None,
        })
    }

    async fn insert_leave(&mut self, date: NaiveDate, reason: &str) -> StoreResult<LeaveDay> {
        let id = self.allocate_id();
        self.working.records.insert(
            id,
            AttendanceRow {
                id,
                employee_id: self.worker_id,
                time_in: None,
                time_out: None,
                end_of_day_report: None,
                absence_date: Some(date),
                absence_reason: Some(reason.to_string()),
                absence_approved_at: None,
            },
        );

        Ok(LeaveDay {
            id,
            worker_id: self.worker_id,
            absence_date: date,
            absence_reason: reason.to_string(),
        })
    }

    async fn insert_break(&mut self, record_id: u64, break_time: NaiveDateTime) -> StoreResult<BreakInterval> {
        let interval = BreakInterval {
            id: self.allocate_id(),
            record_id,
            break_time,
            resume_time: None,
        };
        self.working.breaks.insert(interval.id, interval.clone());
        Ok(interval)
    }

    async fn resume_break(&mut self, break_id: u64, resume_time: NaiveDateTime) -> StoreResult<()> {
        match self.working.breaks.get_mut(&break_id) {
            Some(b) if b.is_open() => {
                b.resume_time = Some(resume_time);
                Ok(())
            }
            _ => Err(AttendanceError::NoOpenBreak),
        }
    }

    async fn close_record(
        &mut self,
        record_id: u64,
        time_out: NaiveDateTime,
        end_of_day_report: Option<&str>,
    ) -> StoreResult<()> {
        match self.working.records.get_mut(&record_id) {
            Some(row) if row.employee_id == self.worker_id && row.time_out.is_none() => {
                row.time_out = Some(time_out);
                row.end_of_day_report = end_of_day_report.map(str::to_string);
                Ok(())
            }
            _ => Err(AttendanceError::AlreadyTimedOut),
        }
    }

    async fn insert_attachment(&mut self, record_id: u64, path: &str) -> StoreResult<()> {
        if self.fail_attachments.load(Ordering::SeqCst) {
            return Err(AttendanceError::store(anyhow!("attachment insert rejected")));
        }
        self.working.attachments.push((record_id, path.to_string()));
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        let worker_id = self.worker_id;
        let working = self.working;
        let mut shared = self.shared.lock().unwrap();

        shared.records.retain(|_, r| r.employee_id != worker_id);
        shared.records.extend(
            working
                .records
                .iter()
                .filter(|(_, r)| r.employee_id == worker_id)
                .map(|(id, r)| (*id, r.clone())),
        );

        let owned: Vec<BreakInterval> = working
            .breaks
            .values()
            .filter(|b| working.owns_record(worker_id, b.record_id))
            .cloned()
            .collect();
        let snapshot = shared.clone();
        shared
            .breaks
            .retain(|_, b| !snapshot.owns_record(worker_id, b.record_id));
        shared.breaks.extend(owned.into_iter().map(|b| (b.id, b)));

        shared
            .attachments
            .retain(|(id, _)| !snapshot.owns_record(worker_id, *id));
        shared.attachments.extend(
            working
                .attachments
                .iter()
                .filter(|(id, _)| working.owns_record(worker_id, *id))
                .cloned(),
        );

        Ok(())
    }
}
