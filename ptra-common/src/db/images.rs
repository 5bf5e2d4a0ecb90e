//! Project image records

use super::models::ProjectImage;
use crate::Result;
use sqlx::SqlitePool;

pub async fn insert_image(
    pool: &SqlitePool,
    project_id: i64,
    filename: &str,
    caption: Option<&str>,
    uploaded_by: i64,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO project_images (project_id, image_filename, image_caption, uploaded_by) VALUES (?, ?, ?, ?)",
    )
    .bind(project_id)
    .bind(filename)
    .bind(caption)
    .bind(uploaded_by)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Images of a project, newest first
pub async fn list_images(pool: &SqlitePool, project_id: i64) -> Result<Vec<ProjectImage>> {
    let images = sqlx::query_as::<_, ProjectImage>(
        r#"
        SELECT i.id, i.project_id, i.image_filename, i.image_caption, i.uploaded_by,
               u.full_name AS uploaded_by_name, i.uploaded_at
        FROM project_images i
        LEFT JOIN users u ON u.id = i.uploaded_by
        WHERE i.project_id = ?
        ORDER BY i.uploaded_at DESC, i.id DESC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(images)
}
