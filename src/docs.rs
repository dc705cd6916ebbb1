use crate::api::attendance::{
    AttachmentUpload, DayViewResponse, ScheduleResponse, SessionResponse, TimeOutRequest,
    TimeOutResponse,
};
use crate::api::leave_request::{CreateLeave, LeaveResponse, LeaveType};
use crate::model::attendance::{AttendanceRecord, BreakInterval, LeaveDay};
use crate::model::schedule::Schedule;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance

Daily time-in, breaks and time-out for employees, checked against their
shift schedule and the minimum work hours of their employment type.

### 🔹 Key Features
- **Time tracking**
  - Time-in inside the shift's grace window, break and resume, time-out with an end-of-day report and attachments
- **Schedules**
  - Strict catalog schedules or per-company custom schedules
- **Leave**
  - File a leave day, approve or reject it (HR/Admin)

### 🔐 Security
Every endpoint requires a **JWT Bearer** access token.

### 📦 Errors
Rejected transitions answer with a stable `error` code and a readable `message`.
"#,
    ),
    paths(
        crate::api::attendance::time_in,
        crate::api::attendance::start_break,
        crate::api::attendance::resume_break,
        crate::api::attendance::time_out,
        crate::api::attendance::today,
        crate::api::attendance::schedule,
        crate::api::attendance::refresh_schedules,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
    ),
    components(
        schemas(
            AttendanceRecord,
            BreakInterval,
            LeaveDay,
            Schedule,
            AttachmentUpload,
            TimeOutRequest,
            TimeOutResponse,
            SessionResponse,
            DayViewResponse,
            ScheduleResponse,
            CreateLeave,
            LeaveType,
            LeaveResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Attendance", description = "Attendance lifecycle APIs"),
        (name = "Leave", description = "Leave management APIs"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
