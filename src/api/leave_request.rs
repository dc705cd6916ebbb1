use crate::api::attendance::{AttendanceApi, current_worker};
use crate::auth::auth::AuthUser;
use crate::db;
use crate::model::attendance::{AttendanceRow, DayRecord};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
}

impl LeaveType {
    fn as_str(&self) -> &str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Sick => "sick",
            LeaveType::Unpaid => "unpaid",
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub absence_date: NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: LeaveType, // enum ensures Swagger dropdown
}

#[derive(Serialize, ToSchema)]
pub struct LeaveResponse {
    #[schema(example = 1)]
    /// attendance row holding the leave
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub absence_date: NaiveDate,
    #[schema(example = "sick")]
    pub absence_reason: String,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "2026-01-04T16:00:00", format = "date-time", value_type = String, nullable = true)]
    pub approved_at: Option<NaiveDateTime>,
}

impl LeaveResponse {
    fn from_record(record: DayRecord) -> Option<Self> {
        match record {
            DayRecord::ApprovedLeave { leave, approved_at } => Some(Self {
                id: leave.id,
                employee_id: leave.worker_id,
                absence_date: leave.absence_date,
                absence_reason: leave.absence_reason,
                status: "approved".to_string(),
                approved_at: Some(approved_at),
            }),
            DayRecord::PendingLeave(leave) => Some(Self {
                id: leave.id,
                employee_id: leave.worker_id,
                absence_date: leave.absence_date,
                absence_reason: leave.absence_reason,
                status: "pending".to_string(),
                approved_at: None,
            }),
            DayRecord::Attendance(_) => None,
        }
    }
}

/* =========================
Create leave request
========================= */
/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted successfully",
         body = Object,
         example = json!({
            "message": "Leave request submitted",
            "status": "pending"
         })
        ),
        (status = 409, description = "A leave already exists for that date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    service: web::Data<AttendanceApi>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let worker = current_worker(&auth, pool.get_ref()).await?;

    // checked and inserted under the worker's lock
    let leave = service
        .request_leave(&worker, payload.absence_date, payload.leave_type.as_str())
        .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "id": leave.id,
        "message": "Leave request submitted",
        "status": "pending"
    })))
}

/// Tenant of the HR/Admin caller; moderation never crosses it.
async fn caller_company(auth: &AuthUser, pool: &MySqlPool) -> actix_web::Result<u64> {
    let employee_id: u64 = auth
        .employee_id
        .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))?;

    db::company_of(pool, employee_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id, "Failed to load caller company");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))
}

/// Answer for an approve/reject UPDATE. Rows of another tenant match nothing.
fn moderation_response(rows_affected: u64, done: &str) -> HttpResponse {
    if rows_affected == 0 {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Leave request not found or already processed"
        }));
    }

    HttpResponse::Ok().json(serde_json::json!({
        "message": done
    }))
}

fn leave_lookup_response(leave: Option<LeaveResponse>) -> HttpResponse {
    match leave {
        Some(data) => HttpResponse::Ok().json(data),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave request not found"
        })),
    }
}

/* =========================
Approve leave (HR/Admin)
========================= */
/// Swagger doc for approve_leave endpoint
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 400, description = "Leave request not found or already processed", body = Object, example = json!({
            "message": "Leave request not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let company_id = caller_company(&auth, pool.get_ref()).await?;

    let leave_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE attendance_records ar
        JOIN employees e ON e.id = ar.employee_id AND e.company_id = ?
        SET ar.absence_approved_at = NOW()
        WHERE ar.id = ?
        AND ar.absence_date IS NOT NULL
        AND ar.absence_approved_at IS NULL
        AND ar.deleted_at IS NULL
        "#,
    )
    .bind(company_id)
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Approve leave failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    tracing::info!(
        leave_id,
        company_id,
        moderator_id = auth.user_id,
        moderator = %auth.username,
        approved = result.rows_affected() > 0,
        "Leave approval"
    );

    Ok(moderation_response(result.rows_affected(), "Leave approved"))
}

/* =========================
Reject leave (HR/Admin)
========================= */
/// Rejection soft-deletes the pending absence row
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 400, description = "Leave request not found or already processed", body = Object, example = json!({
            "message": "Leave request not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let company_id = caller_company(&auth, pool.get_ref()).await?;

    let leave_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE attendance_records ar
        JOIN employees e ON e.id = ar.employee_id AND e.company_id = ?
        SET ar.deleted_at = NOW()
        WHERE ar.id = ?
        AND ar.absence_date IS NOT NULL
        AND ar.absence_approved_at IS NULL
        AND ar.deleted_at IS NULL
        "#,
    )
    .bind(company_id)
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Reject leave failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    tracing::info!(
        leave_id,
        company_id,
        moderator_id = auth.user_id,
        moderator = %auth.username,
        rejected = result.rows_affected() > 0,
        "Leave rejection"
    );

    Ok(moderation_response(result.rows_affected(), "Leave rejected"))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let company_id = caller_company(&auth, pool.get_ref()).await?;

    let leave_id = path.into_inner();

    let row = sqlx::query_as::<_, AttendanceRow>(
        r#"
        SELECT ar.id, ar.employee_id, ar.time_in, ar.time_out, ar.end_of_day_report,
               ar.absence_date, ar.absence_reason, ar.absence_approved_at
        FROM attendance_records ar
        JOIN employees e ON e.id = ar.employee_id AND e.company_id = ?
        WHERE ar.id = ?
        AND ar.deleted_at IS NULL
        "#,
    )
    .bind(company_id)
    .bind(leave_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Failed to fetch leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let leave = row
        .and_then(|r| DayRecord::try_from(r).ok())
        .and_then(LeaveResponse::from_record);

    Ok(leave_lookup_response(leave))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{AttendanceRecord, LeaveDay};

    fn leave() -> LeaveDay {
        LeaveDay {
            id: 3,
            worker_id: 1000,
            absence_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            absence_reason: "sick".into(),
        }
    }

    #[test]
    fn leave_status_follows_the_record_variant() {
        let pending = LeaveResponse::from_record(DayRecord::PendingLeave(leave())).unwrap();
        assert_eq!(pending.status, "pending");

        let approved_at = leave().absence_date.and_hms_opt(8, 0, 0).unwrap();
        let approved = LeaveResponse::from_record(DayRecord::ApprovedLeave {
            leave: leave(),
            approved_at,
        })
        .unwrap();
        assert_eq!(approved.status, "approved");
        assert_eq!(approved.approved_at, Some(approved_at));
    }

    #[test]
    fn moderation_outside_the_callers_company_is_refused() {
        // the tenant join leaves other companies' rows unmatched
        let resp = moderation_response(0, "Leave approved");
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

        let resp = moderation_response(1, "Leave approved");
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    }

    #[test]
    fn lookup_outside_the_callers_company_is_not_found() {
        let resp = leave_lookup_response(None);
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);

        let found = LeaveResponse::from_record(DayRecord::PendingLeave(leave()));
        assert_eq!(leave_lookup_response(found).status(), actix_web::http::StatusCode::OK);
    }

    #[actix_web::test]
    async fn moderators_without_an_employee_profile_have_no_company() {
        let pool = MySqlPool::connect_lazy("mysql://hr@localhost/hrm").unwrap();
        let hr = AuthUser {
            user_id: 7,
            username: "hr".into(),
            role: crate::model::role::Role::Hr,
            employee_id: None,
        };

        let err = caller_company(&hr, &pool).await.unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            actix_web::http::StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn sessions_are_not_leave() {
        let session = DayRecord::Attendance(AttendanceRecord {
            id: 4,
            worker_id: 1000,
            time_in: leave().absence_date.and_hms_opt(9, 0, 0).unwrap(),
            time_out: None,
            end_of_day_report: None,
        });
        assert!(LeaveResponse::from_record(session).is_none());
    }
}
