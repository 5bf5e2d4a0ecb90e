//! Project list, create/edit, soft delete and detail

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use ptra_common::db::{activities, images, projects, ActivityKind};
use ptra_common::validation::ProjectForm;
use ptra_common::Role;
use serde::Deserialize;
use tracing::info;

use super::{parse_id, today};
use crate::error::{redirect_with, PageError, PageResult};
use crate::session::RequestContext;
use crate::views::{self, projects::ProjectDetailView, Flash, FlashParams};
use crate::AppState;

const CSRF_FAILED: &str = "Security token validation failed.";

/// GET /admin/projects
pub async fn projects_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(flash): Query<FlashParams>,
) -> PageResult<Html<String>> {
    let user = ctx.require_login()?;
    let projects = projects::list_project_overviews(&state.db).await?;
    let token = ctx.csrf_token().await;

    Ok(Html(views::projects::projects_page(
        user,
        &flash.resolve(),
        &projects,
        &token,
    )))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteProjectForm {
    pub csrf_token: String,
    pub project_id: String,
}

/// POST /admin/projects/delete
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<DeleteProjectForm>,
) -> PageResult<Redirect> {
    let user = ctx.require_role(Role::Admin)?;

    if !ctx.verify_csrf(&form.csrf_token).await {
        return Ok(redirect_with("/admin/projects", "error", "invalid_token"));
    }

    let project_id: i64 = form
        .project_id
        .trim()
        .parse()
        .map_err(|_| PageError::ProjectNotFound)?;

    if !projects::soft_delete_project(&state.db, project_id).await? {
        return Err(PageError::ProjectNotFound);
    }

    info!("Project {} deleted by '{}'", project_id, user.username);
    Ok(redirect_with("/admin/projects", "success", "project_deleted"))
}

async fn render_form(
    ctx: &RequestContext,
    flash: &Flash,
    project_id: Option<i64>,
    form: &ProjectForm,
) -> PageResult<Html<String>> {
    let user = ctx.require_login()?;
    let token = ctx.csrf_token().await;
    Ok(Html(views::projects::project_form_page(
        user, flash, project_id, form, &token,
    )))
}

/// GET /admin/projects/new
pub async fn new_project_page(Extension(ctx): Extension<RequestContext>) -> PageResult<Html<String>> {
    ctx.require_role(Role::Pm)?;
    render_form(&ctx, &Flash::default(), None, &ProjectForm::default()).await
}

/// POST /admin/projects/new
pub async fn new_project_submit(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<ProjectForm>,
) -> PageResult<Response> {
    let user = ctx.require_role(Role::Pm)?;

    if !ctx.verify_csrf(&form.csrf_token).await {
        return Ok(render_form(&ctx, &Flash::error(CSRF_FAILED), None, &form).await?.into_response());
    }

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            let flash = Flash::error(errors.message());
            return Ok(render_form(&ctx, &flash, None, &form).await?.into_response());
        }
    };

    let project_id = projects::create_project(&state.db, &input, user.id).await?;
    info!("Project {} '{}' created by '{}'", project_id, input.project_name, user.username);

    Ok(redirect_with(&format!("/projects/{}", project_id), "success", "project_created").into_response())
}

/// GET /admin/projects/:id/edit
pub async fn edit_project_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
) -> PageResult<Html<String>> {
    ctx.require_role(Role::Pm)?;
    let project_id = parse_id(&raw_id).ok_or(PageError::ProjectNotFound)?;
    let project = projects::find_active_project(&state.db, project_id)
        .await?
        .ok_or(PageError::ProjectNotFound)?;

    let form = ProjectForm::from_input(&(&project).into());
    render_form(&ctx, &Flash::default(), Some(project_id), &form).await
}

/// POST /admin/projects/:id/edit
pub async fn edit_project_submit(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
    Form(form): Form<ProjectForm>,
) -> PageResult<Response> {
    let user = ctx.require_role(Role::Pm)?;
    let project_id = parse_id(&raw_id).ok_or(PageError::ProjectNotFound)?;

    if projects::find_active_project(&state.db, project_id).await?.is_none() {
        return Err(PageError::ProjectNotFound);
    }

    if !ctx.verify_csrf(&form.csrf_token).await {
        let flash = Flash::error(CSRF_FAILED);
        return Ok(render_form(&ctx, &flash, Some(project_id), &form).await?.into_response());
    }

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            let flash = Flash::error(errors.message());
            return Ok(render_form(&ctx, &flash, Some(project_id), &form).await?.into_response());
        }
    };

    if !projects::update_project(&state.db, project_id, &input).await? {
        return Err(PageError::ProjectNotFound);
    }
    info!("Project {} updated by '{}'", project_id, user.username);

    Ok(redirect_with(&format!("/projects/{}", project_id), "success", "project_updated").into_response())
}

/// GET /projects/:id
pub async fn project_detail(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
    Query(flash): Query<FlashParams>,
) -> PageResult<Html<String>> {
    let user = ctx.require_login()?;
    let project_id = parse_id(&raw_id).ok_or(PageError::ProjectNotFound)?;
    let detail = projects::find_project_detail(&state.db, project_id)
        .await?
        .ok_or(PageError::ProjectNotFound)?;

    let today = today();
    let monthly_key = ActivityKind::Monthly.month_year(today);
    let planned_key = ActivityKind::Planned.month_year(today);
    let monthly =
        activities::list_activities(&state.db, ActivityKind::Monthly, project_id, &monthly_key).await?;
    let planned =
        activities::list_activities(&state.db, ActivityKind::Planned, project_id, &planned_key).await?;
    let images = images::list_images(&state.db, project_id).await?;
    let token = ctx.csrf_token().await;

    let view = ProjectDetailView {
        detail: &detail,
        monthly: &monthly,
        monthly_key: &monthly_key,
        planned: &planned,
        planned_key: &planned_key,
        images: &images,
        today,
    };

    Ok(Html(views::projects::project_detail_page(
        user,
        &flash.resolve(),
        &view,
        &token,
    )))
}
