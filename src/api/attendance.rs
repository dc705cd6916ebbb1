use crate::attendance::error::AttendanceError;
use crate::attendance::lifecycle::{Attachment, AttendanceService, DayView, TimedOut};
use crate::attendance::store::mysql::MySqlAttendanceStore;
use crate::auth::auth::AuthUser;
use crate::db;
use crate::model::attendance::{AttendanceRecord, BreakInterval, LeaveDay};
use crate::model::schedule::Schedule;
use crate::model::worker::Worker;
use crate::utils::file_storage::LocalFileStorage;
use actix_web::{HttpResponse, Responder, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

pub type AttendanceApi = AttendanceService<MySqlAttendanceStore, LocalFileStorage>;

#[derive(Deserialize, ToSchema)]
pub struct AttachmentUpload {
    #[schema(example = "standup-notes.pdf")]
    pub file_name: String,
    /// base64 encoded file content
    #[schema(example = "SGVsbG8=")]
    pub content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct TimeOutRequest {
    #[schema(example = "Closed three tickets")]
    pub end_of_day_report: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentUpload>,
}

#[derive(Serialize, ToSchema)]
pub struct TimeOutResponse {
    pub record: AttendanceRecord,
    #[schema(example = 480)]
    pub worked_minutes: i64,
    pub attachments: Vec<String>,
}

impl From<TimedOut> for TimeOutResponse {
    fn from(t: TimedOut) -> Self {
        Self {
            record: t.record,
            worked_minutes: t.worked.num_minutes(),
            attachments: t.attachments,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub record: AttendanceRecord,
    pub breaks: Vec<BreakInterval>,
    #[schema(example = 215)]
    pub worked_minutes: i64,
    /// time-in came before the shift's nominal start
    pub late_entry: bool,
}

#[derive(Serialize, ToSchema)]
pub struct DayViewResponse {
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: chrono::NaiveDate,
    pub approved_leave: Option<LeaveDay>,
    pub pending_leave: Option<LeaveDay>,
    pub sessions: Vec<SessionResponse>,
}

impl From<DayView> for DayViewResponse {
    fn from(view: DayView) -> Self {
        Self {
            date: view.date,
            approved_leave: view.approved_leave,
            pending_leave: view.pending_leave,
            sessions: view
                .sessions
                .into_iter()
                .map(|s| SessionResponse {
                    record: s.record,
                    breaks: s.breaks,
                    worked_minutes: s.worked.num_minutes(),
                    late_entry: s.late_entry,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ScheduleResponse {
    pub schedule: Schedule,
    #[schema(example = "2026-01-05T08:30:00", value_type = String, format = "date-time")]
    pub window_opens_at: NaiveDateTime,
    #[schema(example = "2026-01-05T17:30:00", value_type = String, format = "date-time")]
    pub window_closes_at: NaiveDateTime,
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Resolves the authenticated user to the worker the operation acts for.
pub(crate) async fn current_worker(auth: &AuthUser, pool: &MySqlPool) -> actix_web::Result<Worker> {
    let employee_id: u64 = auth
        .employee_id
        .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))?;

    db::load_worker(pool, employee_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id, "Failed to load worker");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))
}

fn decode_attachments(uploads: Vec<AttachmentUpload>) -> Result<Vec<Attachment>, AttendanceError> {
    uploads
        .into_iter()
        .map(|u| match STANDARD.decode(u.content.as_bytes()) {
            Ok(bytes) => Ok(Attachment {
                file_name: u.file_name,
                bytes,
            }),
            Err(_) => Err(AttendanceError::InvalidAttachment(u.file_name)),
        })
        .collect()
}

/// Time-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance",
    responses(
        (status = 201, description = "Session opened", body = AttendanceRecord),
        (status = 400, description = "Outside the schedule window", body = Object, example = json!({
            "error": "outside_schedule_window",
            "message": "Time-in is outside the permitted schedule window"
        })),
        (status = 409, description = "Open session or approved absence", body = Object, example = json!({
            "error": "open_session_exists",
            "message": "An attendance session is already open"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn time_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    service: web::Data<AttendanceApi>,
) -> actix_web::Result<impl Responder> {
    let worker = current_worker(&auth, pool.get_ref()).await?;
    let record = service.time_in(&worker, now()).await?;

    Ok(HttpResponse::Created().json(record))
}

/// Break-start endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/{record_id}/break",
    params(
        ("record_id" = u64, Path, description = "Open attendance record")
    ),
    responses(
        (status = 201, description = "Break started", body = BreakInterval),
        (status = 404, description = "No open session with that id"),
        (status = 409, description = "A break is already in progress")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn start_break(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    service: web::Data<AttendanceApi>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let worker = current_worker(&auth, pool.get_ref()).await?;
    let interval = service.start_break(&worker, path.into_inner(), now()).await?;

    Ok(HttpResponse::Created().json(interval))
}

/// Resume endpoint
#[utoipa::path(
    put,
    path = "/api/attendance/{record_id}/resume",
    params(
        ("record_id" = u64, Path, description = "Open attendance record")
    ),
    responses(
        (status = 200, description = "Break resumed", body = BreakInterval),
        (status = 404, description = "No open session with that id"),
        (status = 409, description = "No break in progress")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn resume_break(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    service: web::Data<AttendanceApi>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let worker = current_worker(&auth, pool.get_ref()).await?;
    let interval = service.resume_break(&worker, path.into_inner(), now()).await?;

    Ok(HttpResponse::Ok().json(interval))
}

/// Time-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance/{record_id}",
    params(
        ("record_id" = u64, Path, description = "Open attendance record")
    ),
    request_body(
        content = TimeOutRequest,
        description = "End of day report and attachments",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Session closed", body = TimeOutResponse),
        (status = 400, description = "Required hours not reached or bad attachment", body = Object, example = json!({
            "error": "insufficient_hours",
            "message": "Required work hours not yet reached"
        })),
        (status = 404, description = "No session with that id"),
        (status = 409, description = "Already timed out or break still open")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn time_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    service: web::Data<AttendanceApi>,
    path: web::Path<u64>,
    payload: web::Json<TimeOutRequest>,
) -> actix_web::Result<impl Responder> {
    let worker = current_worker(&auth, pool.get_ref()).await?;
    let TimeOutRequest {
        end_of_day_report,
        attachments,
    } = payload.into_inner();

    // reject bad payloads before anything is written
    let attachments = decode_attachments(attachments)?;

    let closed = service
        .time_out(&worker, path.into_inner(), now(), end_of_day_report, attachments)
        .await?;

    Ok(HttpResponse::Ok().json(TimeOutResponse::from(closed)))
}

/// Today's sessions and leave for the caller
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Day view", body = DayViewResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    service: web::Data<AttendanceApi>,
) -> actix_web::Result<impl Responder> {
    let worker = current_worker(&auth, pool.get_ref()).await?;
    let view = service.day_view(&worker, now()).await?;

    Ok(HttpResponse::Ok().json(DayViewResponse::from(view)))
}

/// The caller's schedule and today's time-in window
#[utoipa::path(
    get,
    path = "/api/attendance/schedule",
    responses(
        (status = 200, description = "Applicable schedule", body = ScheduleResponse),
        (status = 422, description = "No schedule for the worker's roles", body = Object, example = json!({
            "error": "config_unresolvable",
            "message": "No schedule is configured for the worker's shift and employment type"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    service: web::Data<AttendanceApi>,
) -> actix_web::Result<impl Responder> {
    let worker = current_worker(&auth, pool.get_ref()).await?;
    let (schedule, window) = service.schedule_for(&worker, now().date()).await?;

    Ok(HttpResponse::Ok().json(ScheduleResponse {
        schedule,
        window_opens_at: window.opens_at,
        window_closes_at: window.closes_at,
    }))
}

/// Drops cached schedule configuration (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/attendance/schedule/refresh",
    responses(
        (status = 200, description = "Cached schedules dropped", body = Object, example = json!({
            "message": "Schedule cache refreshed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn refresh_schedules(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    service: web::Data<AttendanceApi>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let worker = current_worker(&auth, pool.get_ref()).await?;

    service.schedules().invalidate_catalog().await;
    service.schedules().invalidate_tenant(worker.company_id).await;
    tracing::info!(company_id = worker.company_id, "Schedule cache refreshed");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Schedule cache refreshed"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachments_decode_from_base64() {
        let decoded = decode_attachments(vec![AttachmentUpload {
            file_name: "notes.txt".into(),
            content: "SGVsbG8=".into(),
        }])
        .unwrap();

        assert_eq!(decoded[0].bytes, b"Hello");
    }

    #[test]
    fn malformed_attachment_is_rejected_by_name() {
        let err = decode_attachments(vec![AttachmentUpload {
            file_name: "broken.pdf".into(),
            content: "not base64!".into(),
        }])
        .err()
        .unwrap();

        assert!(matches!(err, AttendanceError::InvalidAttachment(name) if name == "broken.pdf"));
    }
}
