use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use strum_macros::IntoStaticStr;

/// Why an attendance operation was refused.
#[derive(Debug, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceError {
    #[display(fmt = "An approved absence is recorded for today")]
    AbsenceConflict,

    #[display(fmt = "An attendance session is already open")]
    OpenSessionExists,

    #[display(fmt = "Time-in is outside the permitted schedule window")]
    OutsideScheduleWindow,

    #[display(fmt = "Attendance record not found")]
    RecordNotFound,

    #[display(fmt = "A break is already in progress")]
    OpenBreakExists,

    #[display(fmt = "No break in progress")]
    NoOpenBreak,

    #[display(fmt = "Attendance record is already timed out")]
    AlreadyTimedOut,

    #[display(fmt = "Resume the open break before timing out")]
    OpenBreakMustResume,

    #[display(fmt = "Required work hours not yet reached")]
    InsufficientHours,

    #[display(fmt = "No schedule is configured for the worker's shift and employment type")]
    ConfigUnresolvable,

    #[display(fmt = "A leave request already exists for that date")]
    LeaveExists,

    #[display(fmt = "Invalid attachment: {}", _0)]
    InvalidAttachment(String),

    #[display(fmt = "Persistence failure: {}", _0)]
    Store(anyhow::Error),

    #[display(fmt = "File storage failure: {}", _0)]
    Storage(anyhow::Error),
}

impl std::error::Error for AttendanceError {}

impl AttendanceError {
    /// Stable machine-readable kind, e.g. `open_session_exists`.
    pub fn code(&self) -> &'static str {
        self.into()
    }

    pub fn store(err: impl Into<anyhow::Error>) -> Self {
        AttendanceError::Store(err.into())
    }
}

impl From<sqlx::Error> for AttendanceError {
    fn from(err: sqlx::Error) -> Self {
        AttendanceError::Store(err.into())
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        use AttendanceError::*;
        match self {
            AbsenceConflict | OpenSessionExists | OpenBreakExists | NoOpenBreak | AlreadyTimedOut
            | OpenBreakMustResume | LeaveExists => StatusCode::CONFLICT,
            OutsideScheduleWindow | InsufficientHours | InvalidAttachment(_) => {
                StatusCode::BAD_REQUEST
            }
            RecordNotFound => StatusCode::NOT_FOUND,
            ConfigUnresolvable => StatusCode::UNPROCESSABLE_ENTITY,
            Store(_) | Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AttendanceError::Store(e) | AttendanceError::Storage(e) => {
                tracing::error!(error = %e, code = self.code(), "Attendance operation failed");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": message,
        }))
    }
}
