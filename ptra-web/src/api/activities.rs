//! Monthly summary and planned activity editing

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
    Extension, Form,
};
use ptra_common::db::{activities, projects, ActivityKind, Project};
use ptra_common::validation::ActivityForm;
use ptra_common::Role;
use serde::Deserialize;
use tracing::info;

use super::{parse_id, today};
use crate::error::{redirect_with, PageError, PageResult};
use crate::session::RequestContext;
use crate::views::{self, activities::ActivitiesView, Flash, FlashParams};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActivitiesQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl ActivitiesQuery {
    /// Unknown or missing `type` falls back to the monthly log
    fn kind(&self) -> ActivityKind {
        self.kind
            .as_deref()
            .and_then(ActivityKind::parse)
            .unwrap_or(ActivityKind::Monthly)
    }

    fn flash(&self) -> Flash {
        FlashParams {
            error: self.error.clone(),
            success: self.success.clone(),
            message: None,
        }
        .resolve()
    }
}

async fn render(
    state: &AppState,
    ctx: &RequestContext,
    flash: &Flash,
    project: &Project,
    kind: ActivityKind,
    form: &ActivityForm,
) -> PageResult<Html<String>> {
    let user = ctx.require_login()?;
    let month_year = kind.month_year(today());
    let list = activities::list_activities(&state.db, kind, project.id, &month_year).await?;
    let token = ctx.csrf_token().await;

    let view = ActivitiesView {
        project,
        kind,
        month_year: &month_year,
        activities: &list,
        form,
    };
    Ok(Html(views::activities::activities_page(user, flash, &view, &token)))
}

/// GET /admin/projects/:id/activities
pub async fn activities_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
    Query(query): Query<ActivitiesQuery>,
) -> PageResult<Html<String>> {
    ctx.require_role(Role::Pm)?;
    let project_id = parse_id(&raw_id).ok_or(PageError::ProjectNotFound)?;
    let project = projects::find_active_project(&state.db, project_id)
        .await?
        .ok_or(PageError::ProjectNotFound)?;

    render(
        &state,
        &ctx,
        &query.flash(),
        &project,
        query.kind(),
        &ActivityForm::default(),
    )
    .await
}

/// POST /admin/projects/:id/activities
pub async fn activities_submit(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
    Query(query): Query<ActivitiesQuery>,
    Form(form): Form<ActivityForm>,
) -> PageResult<Response> {
    let user = ctx.require_role(Role::Pm)?;
    let project_id = parse_id(&raw_id).ok_or(PageError::ProjectNotFound)?;
    let project = projects::find_active_project(&state.db, project_id)
        .await?
        .ok_or(PageError::ProjectNotFound)?;
    let kind = query.kind();
    let back = format!("/admin/projects/{}/activities?type={}", project_id, kind.as_str());

    if !ctx.verify_csrf(&form.csrf_token).await {
        let flash = Flash::error("Security token validation failed.");
        return Ok(render(&state, &ctx, &flash, &project, kind, &form).await?.into_response());
    }

    match form.action.as_str() {
        "delete" => {
            let deleted = match form.activity_id() {
                Some(activity_id) => {
                    activities::delete_activity(&state.db, kind, activity_id, project_id).await?
                }
                None => false,
            };
            if deleted {
                info!("{} activity deleted from project {} by '{}'", kind.label(), project_id, user.username);
                Ok(redirect_with(&back, "success", "activity_deleted").into_response())
            } else {
                Ok(redirect_with(&back, "error", "Activity not found.").into_response())
            }
        }
        _ => {
            let activity = match form.validate() {
                Ok(activity) => activity,
                Err(errors) => {
                    let flash = Flash::error(errors.message());
                    return Ok(render(&state, &ctx, &flash, &project, kind, &form).await?.into_response());
                }
            };

            let month_year = kind.month_year(today());
            let serial =
                activities::add_activity(&state.db, kind, project_id, &month_year, &activity).await?;
            info!(
                "{} activity #{} for {} added to project {} by '{}'",
                kind.label(),
                serial,
                month_year,
                project_id,
                user.username
            );
            Ok(redirect_with(&back, "success", "activity_added").into_response())
        }
    }
}
