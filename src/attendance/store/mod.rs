//! Persistence seam for the attendance lifecycle.
//!
//! Every lifecycle operation runs inside one [`WorkerTx`]. Opening it takes
//! the worker's lock, so read-check-write sequences of the same worker never
//! interleave. Dropping a transaction without [`WorkerTx::commit`] discards
//! all of its writes.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::attendance::error::AttendanceError;
use crate::model::attendance::{AttendanceRecord, BreakInterval, DayRecord, LeaveDay};

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub type StoreResult<T> = Result<T, AttendanceError>;

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    type Tx: WorkerTx;

    async fn begin(&self, worker_id: u64) -> StoreResult<Self::Tx>;
}

#[async_trait]
pub trait WorkerTx: Send {
    /// Records of the locked worker touching `date`: sessions that started
    /// on it and absences dated on it.
    async fn day_records_on(&mut self, date: NaiveDate) -> StoreResult<Vec<DayRecord>>;

    async fn open_record(&mut self) -> StoreResult<Option<AttendanceRecord>>;

    /// Looks the record up among the locked worker's rows only.
    async fn find_record(&mut self, record_id: u64) -> StoreResult<Option<DayRecord>>;

    async fn breaks(&mut self, record_id: u64) -> StoreResult<Vec<BreakInterval>>;

    async fn insert_record(&mut self, time_in: NaiveDateTime) -> StoreResult<AttendanceRecord>;

    /// Pending absence on `date`.
    async fn insert_leave(&mut self, date: NaiveDate, reason: &str) -> StoreResult<LeaveDay>;

    async fn insert_break(&mut self, record_id: u64, break_time: NaiveDateTime) -> StoreResult<BreakInterval>;

    async fn resume_break(&mut self, break_id: u64, resume_time: NaiveDateTime) -> StoreResult<()>;

    async fn close_record(
        &mut self,
        record_id: u64,
        time_out: NaiveDateTime,
        end_of_day_report: Option<&str>,
    ) -> StoreResult<()>;

    async fn insert_attachment(&mut self, record_id: u64, path: &str) -> StoreResult<()>;

    async fn commit(self) -> StoreResult<()>;
}
