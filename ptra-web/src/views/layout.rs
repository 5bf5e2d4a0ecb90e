//! Page shell, navigation and flash messages

use ptra_common::Role;
use serde::Deserialize;

use super::format::escape;
use crate::session::SessionUser;

/// Flash parameters carried in a redirect query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlashParams {
    pub error: Option<String>,
    pub success: Option<String>,
    pub message: Option<String>,
}

/// Human-readable flash messages ready to render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flash {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            success: None,
        }
    }
}

/// Text for a known flash code, or the raw value for anything else
pub fn flash_text(code: &str) -> String {
    let text = match code {
        "session_expired" => "Your session has expired. Please log in again.",
        "insufficient_permissions" => "You do not have permission to access that resource.",
        "project_not_found" => "Project not found.",
        "user_not_found" => "User not found.",
        "invalid_token" => "Security token validation failed.",
        "logged_out" => "You have been successfully logged out.",
        "project_created" => "Project created successfully.",
        "project_updated" => "Project updated successfully.",
        "project_deleted" => "Project deleted successfully.",
        "progress_updated" => "Progress updated successfully.",
        "activity_added" => "Activity added successfully.",
        "activity_deleted" => "Activity deleted successfully.",
        "image_uploaded" => "Image uploaded successfully.",
        "user_created" => "User created successfully.",
        "user_updated" => "User updated successfully.",
        "user_activated" => "User activated successfully.",
        "user_deactivated" => "User deactivated successfully.",
        "account_updated" => "Your account has been updated.",
        "cannot_deactivate_self" => "You cannot deactivate your own account.",
        other => return other.to_string(),
    };
    text.to_string()
}

impl FlashParams {
    pub fn resolve(&self) -> Flash {
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(flash_text);
        Flash {
            error: non_empty(&self.error),
            success: non_empty(&self.success).or_else(|| non_empty(&self.message)),
        }
    }
}

/// Navigation entry to highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Dashboard,
    Projects,
    Reports,
    Users,
    Account,
    None,
}

fn nav_link(href: &str, label: &str, item: Nav, active: Nav) -> String {
    let class = if item == active { "nav-link active" } else { "nav-link" };
    format!(r#"<a class="{}" href="{}">{}</a>"#, class, href, label)
}

fn navigation(user: &SessionUser, active: Nav) -> String {
    let mut links = vec![
        nav_link("/admin/dashboard", "Dashboard", Nav::Dashboard, active),
        nav_link("/admin/projects", "Projects", Nav::Projects, active),
        nav_link("/admin/reports", "Reports", Nav::Reports, active),
    ];
    if user.role == Role::Admin {
        links.push(nav_link("/admin/users", "Users", Nav::Users, active));
    }
    links.push(nav_link("/admin/account", "My Account", Nav::Account, active));

    format!(
        r#"<nav class="navbar">
    <a class="brand" href="/admin/dashboard">PTRA</a>
    <div class="nav-links">{}</div>
    <div class="nav-user">{} <span class="badge">{}</span> <a class="nav-link" href="/logout">Logout</a></div>
</nav>"#,
        links.join(""),
        escape(&user.full_name),
        user.role.label()
    )
}

pub fn flash_html(flash: &Flash) -> String {
    let mut html = String::new();
    if let Some(error) = &flash.error {
        html.push_str(&format!(
            r#"<div class="alert alert-danger" role="alert">{}</div>"#,
            escape(error)
        ));
    }
    if let Some(success) = &flash.success {
        html.push_str(&format!(
            r#"<div class="alert alert-success" role="alert">{}</div>"#,
            escape(success)
        ));
    }
    html
}

const STYLES: &str = r#"
        * { box-sizing: border-box; }
        body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 0; background: #f5f7fb; color: #1e293b; }
        .navbar { display: flex; align-items: center; gap: 24px; background: #1e3a5f; color: #fff; padding: 12px 24px; }
        .navbar .brand { color: #fff; font-weight: 700; text-decoration: none; }
        .nav-links { display: flex; gap: 12px; flex: 1; }
        .nav-link { color: #cbd5e1; text-decoration: none; }
        .nav-link.active, .nav-link:hover { color: #fff; }
        .container { max-width: 1200px; margin: 24px auto; padding: 0 16px; }
        .card { background: #fff; border-radius: 8px; padding: 16px; margin-bottom: 16px; box-shadow: 0 1px 3px rgba(0,0,0,.1); }
        .cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(320px, 1fr)); gap: 16px; }
        .stats { display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 16px; margin-bottom: 16px; }
        .stat .value { font-size: 28px; font-weight: 700; }
        table { width: 100%; border-collapse: collapse; background: #fff; }
        th, td { text-align: left; padding: 8px; border-bottom: 1px solid #e2e8f0; }
        .progress { background: #e2e8f0; border-radius: 4px; overflow: hidden; height: 18px; }
        .progress-bar { height: 100%; color: #fff; font-size: 12px; text-align: center; white-space: nowrap; }
        .bg-success { background: #16a34a; } .bg-info { background: #0891b2; }
        .bg-warning { background: #d97706; } .bg-danger { background: #dc2626; }
        .badge { display: inline-block; padding: 2px 8px; border-radius: 10px; font-size: 12px; background: #64748b; color: #fff; }
        .alert { padding: 12px; border-radius: 6px; margin-bottom: 16px; }
        .alert-danger { background: #fee2e2; color: #991b1b; }
        .alert-success { background: #dcfce7; color: #166534; }
        label { display: block; font-weight: 600; margin-top: 12px; }
        input, textarea, select { width: 100%; padding: 8px; border: 1px solid #cbd5e1; border-radius: 4px; }
        input[type=checkbox] { width: auto; }
        .btn { display: inline-block; padding: 8px 14px; border: none; border-radius: 4px; background: #1e3a5f; color: #fff; text-decoration: none; cursor: pointer; }
        .btn-danger { background: #dc2626; } .btn-secondary { background: #64748b; }
        .inline { display: inline; }
        .gallery { display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 12px; }
        .gallery img { width: 100%; border-radius: 6px; }
        .muted { color: #64748b; }
"#;

/// Full HTML document. `body` is trusted markup built by the page modules.
pub fn page(title: &str, user: Option<&SessionUser>, active: Nav, flash: &Flash, body: &str) -> String {
    let nav = user.map(|u| navigation(u, active)).unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - PTRA</title>
    <style>{styles}</style>
</head>
<body>
{nav}
<main class="container">
    <h1>{title}</h1>
    {flash}
    {body}
</main>
</body>
</html>"#,
        title = escape(title),
        styles = STYLES,
        nav = nav,
        flash = flash_html(flash),
        body = body,
    )
}

/// Hidden CSRF field for a form
pub fn csrf_field(token: &str) -> String {
    format!(
        r#"<input type="hidden" name="{}" value="{}">"#,
        ptra_common::csrf::CSRF_FIELD_NAME,
        super::format::attr(token)
    )
}

/// Standalone error page (no navigation)
pub fn error_page(message: &str) -> String {
    page(
        "Error",
        None,
        Nav::None,
        &Flash::error(message),
        r#"<p><a class="btn" href="/admin/dashboard">Back to dashboard</a></p>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_map_to_text() {
        let flash = FlashParams {
            error: Some("session_expired".into()),
            message: Some("logged_out".into()),
            ..Default::default()
        }
        .resolve();
        assert_eq!(
            flash.error.as_deref(),
            Some("Your session has expired. Please log in again.")
        );
        assert_eq!(
            flash.success.as_deref(),
            Some("You have been successfully logged out.")
        );
    }

    #[test]
    fn test_unknown_text_is_escaped_when_rendered() {
        let flash = FlashParams {
            error: Some("<script>alert(1)</script>".into()),
            ..Default::default()
        }
        .resolve();
        let html = flash_html(&flash);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_admin_nav_includes_users() {
        let mut user = SessionUser {
            id: 1,
            username: "a".into(),
            email: "a@example.com".into(),
            full_name: "A".into(),
            role: Role::Admin,
        };
        assert!(navigation(&user, Nav::None).contains("/admin/users"));
        user.role = Role::Pm;
        assert!(!navigation(&user, Nav::None).contains("/admin/users"));
    }
}
