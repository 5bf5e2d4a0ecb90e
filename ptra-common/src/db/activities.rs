//! Monthly summary and planned activity queries
//!
//! Both logs share one shape. Serial numbers are per (project, month) and
//! are assigned as `MAX + 1` inside the insert statement itself.

use super::models::{Activity, ActivityKind, NewActivity};
use crate::Result;
use sqlx::SqlitePool;

/// Activities of one project for one month, in serial order
pub async fn list_activities(
    pool: &SqlitePool,
    kind: ActivityKind,
    project_id: i64,
    month_year: &str,
) -> Result<Vec<Activity>> {
    let extra = match kind {
        ActivityKind::Monthly => "NULL AS responsible_party, NULL AS remarks",
        ActivityKind::Planned => "responsible_party, remarks",
    };

    let sql = format!(
        "SELECT id, project_id, month_year, serial_number, activity_description, duration_weeks, \
         {}, created_at FROM {} WHERE project_id = ? AND month_year = ? ORDER BY serial_number",
        extra,
        kind.table_name()
    );

    let rows = sqlx::query_as::<_, Activity>(&sql)
        .bind(project_id)
        .bind(month_year)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Append an activity and return its serial number
pub async fn add_activity(
    pool: &SqlitePool,
    kind: ActivityKind,
    project_id: i64,
    month_year: &str,
    activity: &NewActivity,
) -> Result<i64> {
    let table = kind.table_name();

    let serial: i64 = match kind {
        ActivityKind::Monthly => {
            sqlx::query_scalar(&format!(
                r#"
                INSERT INTO {table} (project_id, month_year, serial_number, activity_description, duration_weeks)
                SELECT ?, ?, COALESCE(MAX(serial_number), 0) + 1, ?, ?
                FROM {table} WHERE project_id = ? AND month_year = ?
                RETURNING serial_number
                "#
            ))
            .bind(project_id)
            .bind(month_year)
            .bind(&activity.description)
            .bind(activity.duration_weeks)
            .bind(project_id)
            .bind(month_year)
            .fetch_one(pool)
            .await?
        }
        ActivityKind::Planned => {
            sqlx::query_scalar(&format!(
                r#"
                INSERT INTO {table} (project_id, month_year, serial_number, activity_description,
                                     duration_weeks, responsible_party, remarks)
                SELECT ?, ?, COALESCE(MAX(serial_number), 0) + 1, ?, ?, ?, ?
                FROM {table} WHERE project_id = ? AND month_year = ?
                RETURNING serial_number
                "#
            ))
            .bind(project_id)
            .bind(month_year)
            .bind(&activity.description)
            .bind(activity.duration_weeks)
            .bind(&activity.responsible_party)
            .bind(&activity.remarks)
            .bind(project_id)
            .bind(month_year)
            .fetch_one(pool)
            .await?
        }
    };

    Ok(serial)
}

/// Delete an activity. The project id must match; returns `false` otherwise.
pub async fn delete_activity(
    pool: &SqlitePool,
    kind: ActivityKind,
    activity_id: i64,
    project_id: i64,
) -> Result<bool> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE id = ? AND project_id = ?",
        kind.table_name()
    ))
    .bind(activity_id)
    .bind(project_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
