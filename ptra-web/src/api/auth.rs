//! Login and logout

use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use ptra_common::db::users;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::PageResult;
use crate::session::{RequestContext, SessionUser};
use crate::views::{self, Flash, FlashParams};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub csrf_token: String,
    pub username: String,
    pub password: String,
}

async fn render_login(state: &AppState, ctx: &RequestContext, flash: &Flash, username: &str) -> Html<String> {
    let token = ctx.csrf_token().await;
    Html(views::login::login_page(&state.config.app_name, flash, &token, username))
}

/// GET /
pub async fn login_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(flash): Query<FlashParams>,
) -> Response {
    if ctx.user.is_some() {
        return Redirect::to("/admin/dashboard").into_response();
    }
    render_login(&state, &ctx, &flash.resolve(), "").await.into_response()
}

/// POST /
pub async fn login_submit(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<LoginForm>,
) -> PageResult<Response> {
    if ctx.user.is_some() {
        return Ok(Redirect::to("/admin/dashboard").into_response());
    }

    let username = form.username.trim();

    if !ctx.verify_csrf(&form.csrf_token).await {
        let flash = Flash::error("Security token validation failed. Please try again.");
        return Ok(render_login(&state, &ctx, &flash, username).await.into_response());
    }

    if username.is_empty() || form.password.is_empty() {
        let flash = Flash::error("Please enter both username and password.");
        return Ok(render_login(&state, &ctx, &flash, username).await.into_response());
    }

    let Some(user) = users::authenticate(&state.db, username, &form.password).await? else {
        warn!("Failed login attempt for '{}'", username);
        let flash = Flash::error("Invalid username or password.");
        return Ok(render_login(&state, &ctx, &flash, username).await.into_response());
    };

    info!("User '{}' logged in ({})", user.username, user.role);
    let cookie = ctx.login(SessionUser::from(&user)).await;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to("/admin/dashboard"),
    )
        .into_response())
}

/// GET /logout
pub async fn logout(Extension(ctx): Extension<RequestContext>) -> Response {
    if let Some(user) = &ctx.user {
        info!("User '{}' logged out", user.username);
    }
    let cookie = ctx.logout().await;
    (
        [(header::SET_COOKIE, cookie)],
        Redirect::to("/?message=logged_out"),
    )
        .into_response()
}
