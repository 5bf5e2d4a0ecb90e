//! Page error type
//!
//! Access-control and not-found failures become redirects carrying an
//! `error` code; storage failures are logged and rendered as a 500 page.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::error;

use crate::views;

#[derive(Debug, Error)]
pub enum PageError {
    /// No logged-in user, or the session timed out
    #[error("Not logged in")]
    Unauthenticated,

    /// Logged in without the required role
    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Project not found")]
    ProjectNotFound,

    #[error("User not found")]
    UserNotFound,

    /// Redirect elsewhere (already URL-encoded target)
    #[error("Redirect to {0}")]
    Redirect(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Common error: {0}")]
    Common(#[from] ptra_common::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::Unauthenticated => Redirect::to("/?error=session_expired").into_response(),
            PageError::Forbidden => {
                Redirect::to("/admin/dashboard?error=insufficient_permissions").into_response()
            }
            PageError::ProjectNotFound => {
                Redirect::to("/admin/dashboard?error=project_not_found").into_response()
            }
            PageError::UserNotFound => {
                Redirect::to("/admin/users?error=user_not_found").into_response()
            }
            PageError::Redirect(to) => Redirect::to(&to).into_response(),
            other => {
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(views::error_page("Something went wrong while processing your request.")),
                )
                    .into_response()
            }
        }
    }
}

/// Result type for page handlers
pub type PageResult<T> = Result<T, PageError>;

/// Redirect to `path` with a flash parameter, URL-encoding the value
pub fn redirect_with(path: &str, key: &str, value: &str) -> Redirect {
    let sep = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{}{}{}={}", path, sep, key, urlencoding::encode(value)))
}
