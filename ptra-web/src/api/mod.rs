//! HTTP page handlers for ptra-web

pub mod activities;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod images;
pub mod progress;
pub mod projects;
pub mod reports;
pub mod users;

pub use activities::{activities_page, activities_submit};
pub use auth::{login_page, login_submit, logout};
pub use dashboard::dashboard;
pub use health::health_routes;
pub use images::upload_image;
pub use progress::{progress_page, progress_submit};
pub use projects::{
    delete_project, edit_project_page, edit_project_submit, new_project_page, new_project_submit,
    project_detail, projects_list,
};
pub use reports::reports;
pub use users::{
    account_page, account_submit, edit_user_page, edit_user_submit, new_user_page,
    new_user_submit, toggle_user, users_list,
};

/// Today's date in server local time
pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Numeric id from a path segment. Anything unparseable yields `None` so the
/// caller can answer with its not-found redirect once the gates have run.
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok().filter(|id: &i64| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_lenient() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("-3"), None);
        assert_eq!(parse_id("7x"), None);
    }
}
