//! Reports

use axum::{
    extract::{Query, State},
    response::Html,
    Extension,
};
use ptra_common::db::projects;

use crate::error::PageResult;
use crate::session::RequestContext;
use crate::views::{self, FlashParams};
use crate::AppState;

/// GET /admin/reports
pub async fn reports(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(flash): Query<FlashParams>,
) -> PageResult<Html<String>> {
    let user = ctx.require_login()?;
    let stats = projects::report_stats(&state.db).await?;
    let projects = projects::list_project_overviews(&state.db).await?;

    Ok(Html(views::reports::reports_page(
        user,
        &flash.resolve(),
        &stats,
        &projects,
    )))
}
