use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{MySql, MySqlPool, Transaction};

use super::{AttendanceStore, StoreResult, WorkerTx};
use crate::attendance::error::AttendanceError;
use crate::model::attendance::{AttendanceRecord, AttendanceRow, BreakInterval, DayRecord, LeaveDay};

const RECORD_COLUMNS: &str = r#"
    id, employee_id, time_in, time_out, end_of_day_report,
    absence_date, absence_reason, absence_approved_at
"#;

#[derive(Clone)]
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

pub struct MySqlWorkerTx {
    tx: Transaction<'static, MySql>,
    worker_id: u64,
}

fn to_day_record(row: AttendanceRow) -> StoreResult<DayRecord> {
    DayRecord::try_from(row)
        .map_err(|e| AttendanceError::store(anyhow!("malformed attendance row {}", e.0)))
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    type Tx = MySqlWorkerTx;

    async fn begin(&self, worker_id: u64) -> StoreResult<Self::Tx> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the employee serialises this worker's lifecycle operations
        let locked = sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE id = ? FOR UPDATE")
            .bind(worker_id)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Err(AttendanceError::store(anyhow!("employee {worker_id} does not exist")));
        }

        Ok(MySqlWorkerTx { tx, worker_id })
    }
}

#[async_trait]
impl WorkerTx for MySqlWorkerTx {
    async fn day_records_on(&mut self, date: NaiveDate) -> StoreResult<Vec<DayRecord>> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance_records
            WHERE employee_id = ?
            AND deleted_at IS NULL
            AND (absence_date = ? OR DATE(time_in) = ?)
            ORDER BY id
            "#
        );

        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(self.worker_id)
            .bind(date)
            .bind(date)
            .fetch_all(&mut *self.tx)
            .await?;

        rows.into_iter().map(to_day_record).collect()
    }

    async fn open_record(&mut self) -> StoreResult<Option<AttendanceRecord>> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance_records
            WHERE employee_id = ?
            AND deleted_at IS NULL
            AND absence_date IS NULL
            AND time_in IS NOT NULL
            AND time_out IS NULL
            ORDER BY time_in DESC
            LIMIT 1
            "#
        );

        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(self.worker_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        match row.map(to_day_record).transpose()? {
            Some(DayRecord::Attendance(record)) => Ok(Some(record)),
            _ => Ok(None),
        }
    }

    async fn find_record(&mut self, record_id: u64) -> StoreResult<Option<DayRecord>> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance_records
            WHERE id = ?
            AND employee_id = ?
            AND deleted_at IS NULL
            "#
        );

        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(record_id)
            .bind(self.worker_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(to_day_record).transpose()
    }

    async fn breaks(&mut self, record_id: u64) -> StoreResult<Vec<BreakInterval>> {
        let breaks = sqlx::query_as::<_, BreakInterval>(
            r#"
            SELECT id, record_id, break_time, resume_time
            FROM attendance_breaks
            WHERE record_id = ?
            ORDER BY break_time, id
            "#,
        )
        .bind(record_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(breaks)
    }

    async fn insert_record(&mut self, time_in: NaiveDateTime) -> StoreResult<AttendanceRecord> {
        let result = sqlx::query("INSERT INTO attendance_records (employee_id, time_in) VALUES (?, ?)")
            .bind(self.worker_id)
            .bind(time_in)
            .execute(&mut *self.tx)
            .await?;

        Ok(AttendanceRecord {
            id: result.last_insert_id(),
            worker_id: self.worker_id,
            time_in,
            time_out: None,
            end_of_day_report: None,
        })
    }

    async fn insert_leave(&mut self, date: NaiveDate, reason: &str) -> StoreResult<LeaveDay> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_records
                (employee_id, absence_date, absence_reason)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(self.worker_id)
        .bind(date)
        .bind(reason)
        .execute(&mut *self.tx)
        .await?;

        Ok(LeaveDay {
            id: result.last_insert_id(),
            worker_id: self.worker_id,
            absence_date: date,
            absence_reason: reason.to_string(),
        })
    }

    async fn insert_break(&mut self, record_id: u64, break_time: NaiveDateTime) -> StoreResult<BreakInterval> {
        let result = sqlx::query("INSERT INTO attendance_breaks (record_id, break_time) VALUES (?, ?)")
            .bind(record_id)
            .bind(break_time)
            .execute(&mut *self.tx)
            .await?;

        Ok(BreakInterval {
            id: result.last_insert_id(),
            record_id,
            break_time,
            resume_time: None,
        })
    }

    async fn resume_break(&mut self, break_id: u64, resume_time: NaiveDateTime) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE attendance_breaks SET resume_time = ? WHERE id = ? AND resume_time IS NULL",
        )
        .bind(resume_time)
        .bind(break_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AttendanceError::NoOpenBreak);
        }
        Ok(())
    }

    async fn close_record(
        &mut self,
        record_id: u64,
        time_out: NaiveDateTime,
        end_of_day_report: Option<&str>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_records
            SET time_out = ?, end_of_day_report = ?
            WHERE id = ?
            AND employee_id = ?
            AND time_out IS NULL
            "#,
        )
        .bind(time_out)
        .bind(end_of_day_report)
        .bind(record_id)
        .bind(self.worker_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AttendanceError::AlreadyTimedOut);
        }
        Ok(())
    }

    async fn insert_attachment(&mut self, record_id: u64, path: &str) -> StoreResult<()> {
        sqlx::query("INSERT INTO attendance_attachments (record_id, path) VALUES (?, ?)")
            .bind(record_id)
            .bind(path)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
