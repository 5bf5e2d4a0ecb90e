//! User management pages and the self-service account form

use ptra_common::db::UserSummary;
use ptra_common::validation::UserForm;
use ptra_common::Role;

use super::format::{attr, escape, timestamp};
use super::layout::{csrf_field, page, Flash, Nav};
use crate::session::SessionUser;

pub fn users_page(user: &SessionUser, flash: &Flash, users: &[UserSummary], csrf_token: &str) -> String {
    let rows: Vec<String> = users
        .iter()
        .map(|u| {
            let status = if u.is_active {
                r#"<span class="badge bg-success">Active</span>"#
            } else {
                r#"<span class="badge bg-danger">Inactive</span>"#
            };
            let toggle = if u.id == user.id {
                String::new()
            } else {
                let (label, class) = if u.is_active {
                    ("Deactivate", "btn btn-danger")
                } else {
                    ("Activate", "btn")
                };
                format!(
                    r#" <form class="inline" method="post" action="/admin/users/toggle">{}<input type="hidden" name="user_id" value="{}"><button class="{}" type="submit">{}</button></form>"#,
                    csrf_field(csrf_token),
                    u.id,
                    class,
                    label
                )
            };
            format!(
                r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><a class="btn btn-secondary" href="/admin/users/{}/edit">Edit</a>{}</td></tr>"#,
                escape(&u.username),
                escape(&u.full_name),
                escape(&u.email),
                u.role.label(),
                status,
                u.project_count,
                timestamp(u.created_at),
                u.id,
                toggle
            )
        })
        .collect();

    let body = format!(
        r#"<p><a class="btn" href="/admin/users/new">New user</a></p>
<table><thead><tr><th>Username</th><th>Name</th><th>Email</th><th>Role</th><th>Status</th><th>Projects</th><th>Created</th><th></th></tr></thead>
<tbody>{}</tbody></table>"#,
        rows.join("\n")
    );

    page("User Management", Some(user), Nav::Users, flash, &body)
}

/// Where a user form posts and which fields it offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFormMode {
    Create,
    Edit(i64),
    /// The actor's own account; role and status are fixed
    Account,
}

pub fn user_form_page(
    user: &SessionUser,
    flash: &Flash,
    mode: UserFormMode,
    form: &UserForm,
    csrf_token: &str,
) -> String {
    let (title, action, nav) = match mode {
        UserFormMode::Create => ("New User".to_string(), "/admin/users/new".to_string(), Nav::Users),
        UserFormMode::Edit(id) => ("Edit User".to_string(), format!("/admin/users/{}/edit", id), Nav::Users),
        UserFormMode::Account => ("My Account".to_string(), "/admin/account".to_string(), Nav::Account),
    };

    let role_and_status = if mode == UserFormMode::Account {
        format!(
            r#"<input type="hidden" name="role" value="{}"><input type="hidden" name="is_active" value="1">
    <p class="muted">Role: {}</p>"#,
            attr(&form.role),
            form.role.parse::<Role>().map(|r| r.label()).unwrap_or("Unknown")
        )
    } else {
        let options: Vec<String> = Role::ALL
            .iter()
            .map(|role| {
                let selected = if form.role == role.as_str() { " selected" } else { "" };
                format!(
                    r#"<option value="{}"{}>{}</option>"#,
                    role.as_str(),
                    selected,
                    role.label()
                )
            })
            .collect();
        let checked = if form.is_active_checked() { " checked" } else { "" };
        format!(
            r#"<label for="role">Role</label><select id="role" name="role">{}</select>
    <label><input type="checkbox" name="is_active" value="1"{}> Active</label>"#,
            options.join(""),
            checked
        )
    };

    let password_hint = if mode == UserFormMode::Create {
        ""
    } else {
        r#"<p class="muted">Leave blank to keep the current password.</p>"#
    };

    let cancel = match mode {
        UserFormMode::Account => "/admin/dashboard",
        _ => "/admin/users",
    };

    let body = format!(
        r#"<div class="card"><form method="post" action="{action}">
    {csrf}
    <label for="username">Username</label><input type="text" id="username" name="username" value="{username}" required>
    <label for="email">Email</label><input type="email" id="email" name="email" value="{email}" required>
    <label for="full_name">Full name</label><input type="text" id="full_name" name="full_name" value="{full_name}" required>
    {role_and_status}
    <label for="password">Password</label><input type="password" id="password" name="password">
    <label for="confirm_password">Confirm password</label><input type="password" id="confirm_password" name="confirm_password">
    {password_hint}
    <p><button class="btn" type="submit">Save</button> <a class="btn btn-secondary" href="{cancel}">Cancel</a></p>
</form></div>"#,
        action = action,
        csrf = csrf_field(csrf_token),
        username = attr(&form.username),
        email = attr(&form.email),
        full_name = attr(&form.full_name),
        role_and_status = role_and_status,
        password_hint = password_hint,
        cancel = cancel,
    );

    page(&title, Some(user), nav, flash, &body)
}
