//! Project queries
//!
//! Projects are soft-deleted (`is_active = 0`) and every read filters on
//! the active flag, so a deleted project behaves as missing everywhere.

use super::models::{Project, ProjectDetail, ProjectInput, ProjectOverview, ReportStats};
use super::progress::get_progress;
use crate::Result;
use sqlx::SqlitePool;

const PROJECT_COLUMNS: &str = "id, project_name, contract_description, scope_of_work, \
    contract_value_ngn, contract_value_usd, notice_of_award, contract_signed, \
    commencement_date, proposed_completion, contractual_completion, is_active, \
    created_by, created_at, updated_at";

/// Active projects with their progress, newest first
pub async fn list_project_overviews(pool: &SqlitePool) -> Result<Vec<ProjectOverview>> {
    let rows = sqlx::query_as::<_, ProjectOverview>(
        r#"
        SELECT p.id, p.project_name, p.contract_value_ngn, p.contract_value_usd,
               p.commencement_date, p.proposed_completion, p.contractual_completion,
               p.created_at, u.full_name AS created_by_name,
               pp.engineering_design, pp.procurement, pp.civil, pp.installation,
               pp.testing_commissioning, pp.disbursement_progress,
               pp.planned_progress, pp.actual_progress
        FROM projects p
        LEFT JOIN project_progress pp ON pp.project_id = p.id
        LEFT JOIN users u ON u.id = p.created_by
        WHERE p.is_active = 1
        ORDER BY p.created_at DESC, p.id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_active_project(pool: &SqlitePool, id: i64) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>(&format!(
        "SELECT {} FROM projects WHERE id = ? AND is_active = 1",
        PROJECT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(project)
}

pub async fn find_project_detail(pool: &SqlitePool, id: i64) -> Result<Option<ProjectDetail>> {
    let Some(project) = find_active_project(pool, id).await? else {
        return Ok(None);
    };

    let progress = get_progress(pool, id).await?;

    let created_by_name: Option<String> = match project.created_by {
        Some(user_id) => {
            sqlx::query_scalar("SELECT full_name FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    Ok(Some(ProjectDetail {
        project,
        progress,
        created_by_name,
    }))
}

/// Insert a project together with its zeroed progress row
pub async fn create_project(pool: &SqlitePool, input: &ProjectInput, created_by: i64) -> Result<i64> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO projects (
            project_name, contract_description, scope_of_work,
            contract_value_ngn, contract_value_usd,
            notice_of_award, contract_signed, commencement_date,
            proposed_completion, contractual_completion, created_by
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.project_name)
    .bind(&input.contract_description)
    .bind(&input.scope_of_work)
    .bind(input.contract_value_ngn)
    .bind(input.contract_value_usd)
    .bind(input.notice_of_award)
    .bind(input.contract_signed)
    .bind(input.commencement_date)
    .bind(input.proposed_completion)
    .bind(input.contractual_completion)
    .bind(created_by)
    .execute(&mut *tx)
    .await?;

    let project_id = result.last_insert_rowid();

    sqlx::query("INSERT INTO project_progress (project_id, updated_by) VALUES (?, ?)")
        .bind(project_id)
        .bind(created_by)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(project_id)
}

/// Update an active project. Returns `false` when it is missing or deleted.
pub async fn update_project(pool: &SqlitePool, id: i64, input: &ProjectInput) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE projects
        SET project_name = ?, contract_description = ?, scope_of_work = ?,
            contract_value_ngn = ?, contract_value_usd = ?,
            notice_of_award = ?, contract_signed = ?, commencement_date = ?,
            proposed_completion = ?, contractual_completion = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND is_active = 1
        "#,
    )
    .bind(&input.project_name)
    .bind(&input.contract_description)
    .bind(&input.scope_of_work)
    .bind(input.contract_value_ngn)
    .bind(input.contract_value_usd)
    .bind(input.notice_of_award)
    .bind(input.contract_signed)
    .bind(input.commencement_date)
    .bind(input.proposed_completion)
    .bind(input.contractual_completion)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Soft-delete a project. Returns `false` when it was already gone.
pub async fn soft_delete_project(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE projects SET is_active = 0, updated_at = CURRENT_TIMESTAMP WHERE id = ? AND is_active = 1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Portfolio-wide aggregates over active projects
pub async fn report_stats(pool: &SqlitePool) -> Result<ReportStats> {
    let stats = sqlx::query_as::<_, ReportStats>(
        r#"
        SELECT
            COUNT(p.id) AS total_projects,
            COALESCE(SUM(CASE WHEN pp.engineering_design >= 100 AND pp.procurement >= 100
                               AND pp.civil >= 100 AND pp.installation >= 100
                               AND pp.testing_commissioning >= 100
                          THEN 1 ELSE 0 END), 0) AS completed_projects,
            CAST(COALESCE(SUM(p.contract_value_ngn), 0) AS REAL) AS total_value_ngn,
            CAST(COALESCE(SUM(p.contract_value_usd), 0) AS REAL) AS total_value_usd,
            CAST(COALESCE(AVG(
                COALESCE(pp.engineering_design, 0) * 0.20
                + COALESCE(pp.procurement, 0) * 0.25
                + COALESCE(pp.civil, 0) * 0.25
                + COALESCE(pp.installation, 0) * 0.25
                + COALESCE(pp.testing_commissioning, 0) * 0.05
            ), 0) AS REAL) AS avg_progress
        FROM projects p
        LEFT JOIN project_progress pp ON pp.project_id = p.id
        WHERE p.is_active = 1
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(stats)
}
