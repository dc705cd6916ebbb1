use sqlx::MySqlPool;

use crate::model::schedule::{ScheduleSettingsRow, ShiftScheduleRow};
use crate::model::worker::Worker;

pub async fn init_db(database_url: &str) -> MySqlPool {
    MySqlPool::connect(database_url)
        .await
        .expect("Failed to connect to database")
}

pub async fn company_of(pool: &MySqlPool, employee_id: u64) -> Result<Option<u64>, sqlx::Error> {
    sqlx::query_scalar::<_, u64>("SELECT company_id FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await
}

/// Loads the employee with its tenant and assigned role names.
pub async fn load_worker(pool: &MySqlPool, employee_id: u64) -> Result<Option<Worker>, sqlx::Error> {
    let Some(company_id) = company_of(pool, employee_id).await? else {
        return Ok(None);
    };

    let roles = sqlx::query_scalar::<_, String>(
        "SELECT role_name FROM employee_roles WHERE employee_id = ?",
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(Worker::new(employee_id, company_id, roles)))
}

pub async fn load_shift_schedules(pool: &MySqlPool) -> Result<Vec<ShiftScheduleRow>, sqlx::Error> {
    sqlx::query_as::<_, ShiftScheduleRow>(
        "SELECT shift_type, employment_type, start_time, end_time FROM shift_schedules",
    )
    .fetch_all(pool)
    .await
}

pub async fn load_schedule_settings(
    pool: &MySqlPool,
    company_id: u64,
) -> Result<Option<ScheduleSettingsRow>, sqlx::Error> {
    sqlx::query_as::<_, ScheduleSettingsRow>(
        r#"
        SELECT strict_schedule,
               custom_full_time_start, custom_full_time_end,
               custom_part_time_start, custom_part_time_end
        FROM schedule_settings
        WHERE company_id = ?
        "#,
    )
    .bind(company_id)
    .fetch_optional(pool)
    .await
}
