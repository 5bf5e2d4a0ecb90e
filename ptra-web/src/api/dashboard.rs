//! Dashboard

use axum::{
    extract::{Query, State},
    response::Html,
    Extension,
};
use ptra_common::db::projects;

use super::today;
use crate::error::PageResult;
use crate::session::RequestContext;
use crate::views::{self, FlashParams};
use crate::AppState;

/// GET /admin/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(flash): Query<FlashParams>,
) -> PageResult<Html<String>> {
    let user = ctx.require_login()?;
    let projects = projects::list_project_overviews(&state.db).await?;

    Ok(Html(views::dashboard::dashboard_page(
        user,
        &flash.resolve(),
        &projects,
        today(),
    )))
}
