//! Progress row queries

use super::models::{ProgressInput, ProgressRecord};
use crate::Result;
use sqlx::SqlitePool;

pub async fn get_progress(pool: &SqlitePool, project_id: i64) -> Result<Option<ProgressRecord>> {
    let record = sqlx::query_as::<_, ProgressRecord>(
        r#"
        SELECT project_id, engineering_design, procurement, civil, installation,
               testing_commissioning, disbursement_progress, planned_progress,
               actual_progress, updated_by, updated_at
        FROM project_progress
        WHERE project_id = ?
        "#,
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}

/// Insert or replace a project's progress. Values are clamped to [0, 100].
pub async fn save_progress(
    pool: &SqlitePool,
    project_id: i64,
    input: ProgressInput,
    updated_by: i64,
) -> Result<()> {
    let input = input.clamped();

    sqlx::query(
        r#"
        INSERT INTO project_progress (
            project_id, engineering_design, procurement, civil, installation,
            testing_commissioning, disbursement_progress, planned_progress,
            actual_progress, updated_by, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(project_id) DO UPDATE SET
            engineering_design = excluded.engineering_design,
            procurement = excluded.procurement,
            civil = excluded.civil,
            installation = excluded.installation,
            testing_commissioning = excluded.testing_commissioning,
            disbursement_progress = excluded.disbursement_progress,
            planned_progress = excluded.planned_progress,
            actual_progress = excluded.actual_progress,
            updated_by = excluded.updated_by,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(project_id)
    .bind(input.phases.engineering_design)
    .bind(input.phases.procurement)
    .bind(input.phases.civil)
    .bind(input.phases.installation)
    .bind(input.phases.testing_commissioning)
    .bind(input.disbursement_progress)
    .bind(input.planned_progress)
    .bind(input.actual_progress)
    .bind(updated_by)
    .execute(pool)
    .await?;

    Ok(())
}
