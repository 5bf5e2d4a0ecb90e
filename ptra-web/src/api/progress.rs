//! Progress update

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
    Extension, Form,
};
use ptra_common::db::{progress, projects, ProgressInput, Project};
use ptra_common::validation::ProgressForm;
use ptra_common::Role;
use tracing::info;

use super::parse_id;
use crate::error::{redirect_with, PageError, PageResult};
use crate::session::RequestContext;
use crate::views::{self, Flash};
use crate::AppState;

async fn render(
    ctx: &RequestContext,
    flash: &Flash,
    project: &Project,
    current: &ProgressInput,
) -> PageResult<Html<String>> {
    let user = ctx.require_login()?;
    let token = ctx.csrf_token().await;
    Ok(Html(views::progress::progress_form_page(
        user, flash, project, current, &token,
    )))
}

/// GET /admin/projects/:id/progress
pub async fn progress_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
) -> PageResult<Html<String>> {
    ctx.require_role(Role::Pm)?;
    let project_id = parse_id(&raw_id).ok_or(PageError::ProjectNotFound)?;
    let project = projects::find_active_project(&state.db, project_id)
        .await?
        .ok_or(PageError::ProjectNotFound)?;

    let current = progress::get_progress(&state.db, project_id)
        .await?
        .map(|record| ProgressInput::from(&record))
        .unwrap_or_default();

    render(&ctx, &Flash::default(), &project, &current).await
}

/// POST /admin/projects/:id/progress
pub async fn progress_submit(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
    Form(form): Form<ProgressForm>,
) -> PageResult<Response> {
    let user = ctx.require_role(Role::Pm)?;
    let project_id = parse_id(&raw_id).ok_or(PageError::ProjectNotFound)?;
    let project = projects::find_active_project(&state.db, project_id)
        .await?
        .ok_or(PageError::ProjectNotFound)?;

    let input = form.to_input();

    if !ctx.verify_csrf(&form.csrf_token).await {
        let flash = Flash::error("Security token validation failed.");
        return Ok(render(&ctx, &flash, &project, &input).await?.into_response());
    }

    progress::save_progress(&state.db, project_id, input, user.id).await?;
    info!(
        "Progress for project {} updated by '{}' (overall {:.1}%)",
        project_id,
        user.username,
        input.phases.overall()
    );

    Ok(redirect_with(&format!("/projects/{}", project_id), "success", "progress_updated").into_response())
}
