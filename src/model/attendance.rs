use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One worker's time-in to time-out session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub worker_id: u64,
    #[schema(example = "2026-01-05T09:05:00", value_type = String, format = "date-time")]
    pub time_in: NaiveDateTime,
    #[schema(example = "2026-01-05T17:10:00", value_type = String, format = "date-time", nullable = true)]
    pub time_out: Option<NaiveDateTime>,
    pub end_of_day_report: Option<String>,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.time_out.is_none()
    }
}

/// One pause-and-resume pair within an attendance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct BreakInterval {
    pub id: u64,
    pub record_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub break_time: NaiveDateTime,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub resume_time: Option<NaiveDateTime>,
}

impl BreakInterval {
    pub fn is_open(&self) -> bool {
        self.resume_time.is_none()
    }
}

/// A leave request occupying a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LeaveDay {
    pub id: u64,
    pub worker_id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub absence_date: NaiveDate,
    pub absence_reason: String,
}

/// What a row of `attendance_records` represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayRecord {
    Attendance(AttendanceRecord),
    ApprovedLeave {
        leave: LeaveDay,
        approved_at: NaiveDateTime,
    },
    PendingLeave(LeaveDay),
}

impl DayRecord {
    pub fn is_approved_absence_on(&self, date: NaiveDate) -> bool {
        matches!(self, DayRecord::ApprovedLeave { leave, .. } if leave.absence_date == date)
    }
}

/// Raw row of `attendance_records`. Absence columns and session columns
/// share one table; [`DayRecord`] is the only shape handed to callers.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub employee_id: u64,
    pub time_in: Option<NaiveDateTime>,
    pub time_out: Option<NaiveDateTime>,
    pub end_of_day_report: Option<String>,
    pub absence_date: Option<NaiveDate>,
    pub absence_reason: Option<String>,
    pub absence_approved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRow(pub u64);

impl TryFrom<AttendanceRow> for DayRecord {
    type Error = MalformedRow;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        match (row.absence_date, row.absence_reason, row.absence_approved_at, row.time_in) {
            (Some(absence_date), Some(absence_reason), approved_at, _) => {
                let leave = LeaveDay {
                    id: row.id,
                    worker_id: row.employee_id,
                    absence_date,
                    absence_reason,
                };
                Ok(match approved_at {
                    Some(approved_at) => DayRecord::ApprovedLeave { leave, approved_at },
                    None => DayRecord::PendingLeave(leave),
                })
            }
            (_, _, _, Some(time_in)) => Ok(DayRecord::Attendance(AttendanceRecord {
                id: row.id,
                worker_id: row.employee_id,
                time_in,
                time_out: row.time_out,
                end_of_day_report: row.end_of_day_report,
            })),
            _ => Err(MalformedRow(row.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> AttendanceRow {
        AttendanceRow {
            id: 7,
            employee_id: 1000,
            time_in: None,
            time_out: None,
            end_of_day_report: None,
            absence_date: None,
            absence_reason: None,
            absence_approved_at: None,
        }
    }

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn full_absence_triple_maps_to_approved_leave() {
        let record = DayRecord::try_from(AttendanceRow {
            absence_date: Some(at(0).date()),
            absence_reason: Some("sick".into()),
            absence_approved_at: Some(at(8)),
            ..row()
        })
        .unwrap();

        assert!(record.is_approved_absence_on(at(0).date()));
        assert!(!record.is_approved_absence_on(at(0).date().succ_opt().unwrap()));
    }

    #[test]
    fn unapproved_absence_maps_to_pending_leave() {
        let record = DayRecord::try_from(AttendanceRow {
            absence_date: Some(at(0).date()),
            absence_reason: Some("annual".into()),
            ..row()
        })
        .unwrap();

        assert!(matches!(record, DayRecord::PendingLeave(_)));
        assert!(!record.is_approved_absence_on(at(0).date()));
    }

    #[test]
    fn session_row_maps_to_attendance() {
        let record = DayRecord::try_from(AttendanceRow {
            time_in: Some(at(9)),
            ..row()
        })
        .unwrap();

        match record {
            DayRecord::Attendance(r) => assert!(r.is_open()),
            other => panic!("expected attendance, got {other:?}"),
        }
    }

    #[test]
    fn row_without_time_in_or_absence_is_malformed() {
        assert_eq!(DayRecord::try_from(row()), Err(MalformedRow(7)));
    }
}
