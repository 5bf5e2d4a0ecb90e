//! Login page

use super::format::attr;
use super::layout::{csrf_field, page, Flash, Nav};

pub fn login_page(app_name: &str, flash: &Flash, csrf_token: &str, username: &str) -> String {
    let body = format!(
        r#"<div class="card" style="max-width: 420px; margin: 0 auto;">
    <p class="muted">{app_name}</p>
    <form method="post" action="/">
        {csrf}
        <label for="username">Username</label>
        <input type="text" id="username" name="username" value="{username}" required autofocus>
        <label for="password">Password</label>
        <input type="password" id="password" name="password" required>
        <p><button class="btn" type="submit">Sign in</button></p>
    </form>
</div>"#,
        app_name = super::format::escape(app_name),
        csrf = csrf_field(csrf_token),
        username = attr(username),
    );
    page("Sign in", None, Nav::None, flash, &body)
}
