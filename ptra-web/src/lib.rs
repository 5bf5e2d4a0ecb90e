//! ptra-web library interface
//!
//! Exposes the router and state so integration tests can drive the
//! service without binding a socket.

pub mod api;
pub mod error;
pub mod session;
pub mod upload;
pub mod views;

pub use crate::error::{PageError, PageResult};

/// `<commit>[+dirty] <profile> <utc timestamp>`, stamped by the build script
pub const BUILD_ID: &str = env!("PTRA_BUILD_ID");

use axum::{extract::DefaultBodyLimit, middleware, Router};
use ptra_common::config::AppConfig;
use session::SessionStore;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Room for the non-file multipart fields and part headers
const MULTIPART_SLACK_BYTES: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
            sessions: SessionStore::new(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let upload_limit = state.config.uploads.max_file_size + MULTIPART_SLACK_BYTES;

    Router::new()
        .route("/", get(api::login_page).post(api::login_submit))
        .route("/logout", get(api::logout))
        .route("/admin/dashboard", get(api::dashboard))
        .route("/admin/projects", get(api::projects_list))
        .route("/admin/projects/delete", post(api::delete_project))
        .route(
            "/admin/projects/new",
            get(api::new_project_page).post(api::new_project_submit),
        )
        .route(
            "/admin/projects/:id/edit",
            get(api::edit_project_page).post(api::edit_project_submit),
        )
        .route(
            "/admin/projects/:id/progress",
            get(api::progress_page).post(api::progress_submit),
        )
        .route(
            "/admin/projects/:id/activities",
            get(api::activities_page).post(api::activities_submit),
        )
        .route("/admin/reports", get(api::reports))
        .route("/admin/users", get(api::users_list))
        .route("/admin/users/toggle", post(api::toggle_user))
        .route(
            "/admin/users/new",
            get(api::new_user_page).post(api::new_user_submit),
        )
        .route(
            "/admin/users/:id/edit",
            get(api::edit_user_page).post(api::edit_user_submit),
        )
        .route(
            "/admin/account",
            get(api::account_page).post(api::account_submit),
        )
        .route("/projects/:id", get(api::project_detail))
        .route(
            "/projects/:id/images",
            post(api::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .nest_service("/uploads", ServeDir::new(state.config.upload_dir()))
        .merge(api::health_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
