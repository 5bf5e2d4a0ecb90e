//! User management (admin) and self-service account editing

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use ptra_common::db::{users, NewUser, User, UserUpdate};
use ptra_common::password::hash_password;
use ptra_common::validation::{UserForm, UserFormContext, ValidUser, ValidationErrors};
use ptra_common::Role;
use serde::Deserialize;
use tracing::{info, warn};

use super::parse_id;
use crate::error::{redirect_with, PageError, PageResult};
use crate::session::{RequestContext, SessionUser};
use crate::views::{self, users::UserFormMode, Flash, FlashParams};
use crate::AppState;

const CSRF_FAILED: &str = "Security token validation failed.";

/// GET /admin/users
pub async fn users_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(flash): Query<FlashParams>,
) -> PageResult<Html<String>> {
    let user = ctx.require_role(Role::Admin)?;
    let list = users::list_users(&state.db).await?;
    let token = ctx.csrf_token().await;

    Ok(Html(views::users::users_page(user, &flash.resolve(), &list, &token)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ToggleUserForm {
    pub csrf_token: String,
    pub user_id: String,
}

/// POST /admin/users/toggle
pub async fn toggle_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<ToggleUserForm>,
) -> PageResult<Redirect> {
    let actor = ctx.require_role(Role::Admin)?;

    if !ctx.verify_csrf(&form.csrf_token).await {
        return Ok(redirect_with("/admin/users", "error", "invalid_token"));
    }

    let user_id: i64 = form.user_id.trim().parse().map_err(|_| PageError::UserNotFound)?;
    if user_id == actor.id {
        return Ok(redirect_with("/admin/users", "error", "cannot_deactivate_self"));
    }

    let target = users::find_user(&state.db, user_id)
        .await?
        .ok_or(PageError::UserNotFound)?;

    let activate = !target.is_active;
    users::set_user_active(&state.db, user_id, activate).await?;

    if activate {
        info!("User '{}' activated by '{}'", target.username, actor.username);
        Ok(redirect_with("/admin/users", "success", "user_activated"))
    } else {
        state.sessions.logout_user(user_id).await;
        info!("User '{}' deactivated by '{}'", target.username, actor.username);
        Ok(redirect_with("/admin/users", "success", "user_deactivated"))
    }
}

fn form_from_user(user: &User) -> UserForm {
    UserForm {
        username: user.username.clone(),
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        role: user.role.as_str().to_string(),
        is_active: user.is_active.then(|| "1".to_string()),
        ..Default::default()
    }
}

async fn render_form(
    ctx: &RequestContext,
    flash: &Flash,
    mode: UserFormMode,
    form: &UserForm,
) -> PageResult<Html<String>> {
    let user = ctx.require_login()?;
    let token = ctx.csrf_token().await;

    // Never echo passwords back into the page
    let sticky = UserForm {
        password: String::new(),
        confirm_password: String::new(),
        ..form.clone()
    };
    Ok(Html(views::users::user_form_page(user, flash, mode, &sticky, &token)))
}

async fn hash_blocking(password: String) -> PageResult<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PageError::Internal(e.to_string()))??;
    Ok(hash)
}

/// Run form validation plus the uniqueness check
async fn validate_user_form(
    state: &AppState,
    form: &UserForm,
    ctx: UserFormContext,
    exclude_id: Option<i64>,
) -> PageResult<Result<ValidUser, ValidationErrors>> {
    let mut errors = match form.validate(ctx) {
        Ok(valid) => {
            if users::username_or_email_taken(&state.db, &valid.username, &valid.email, exclude_id).await? {
                let mut errors = ValidationErrors::new();
                errors.push("Username or email already exists.");
                errors
            } else {
                return Ok(Ok(valid));
            }
        }
        Err(errors) => errors,
    };

    // Report a clash alongside the other problems when the fields are usable
    let username = form.username.trim();
    let email = form.email.trim();
    if !errors.messages().iter().any(|m| m.starts_with("Username or email"))
        && !username.is_empty()
        && !email.is_empty()
        && users::username_or_email_taken(&state.db, username, email, exclude_id).await?
    {
        errors.push("Username or email already exists.");
    }

    Ok(Err(errors))
}

/// GET /admin/users/new
pub async fn new_user_page(Extension(ctx): Extension<RequestContext>) -> PageResult<Html<String>> {
    ctx.require_role(Role::Admin)?;
    let form = UserForm {
        role: Role::Viewer.as_str().to_string(),
        is_active: Some("1".to_string()),
        ..Default::default()
    };
    render_form(&ctx, &Flash::default(), UserFormMode::Create, &form).await
}

/// POST /admin/users/new
pub async fn new_user_submit(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<UserForm>,
) -> PageResult<Response> {
    let actor = ctx.require_role(Role::Admin)?;

    if !ctx.verify_csrf(&form.csrf_token).await {
        let flash = Flash::error(CSRF_FAILED);
        return Ok(render_form(&ctx, &flash, UserFormMode::Create, &form).await?.into_response());
    }

    let form_ctx = UserFormContext {
        is_new: true,
        own_role: None,
    };
    let valid = match validate_user_form(&state, &form, form_ctx, None).await? {
        Ok(valid) => valid,
        Err(errors) => {
            let flash = Flash::error(errors.message());
            return Ok(render_form(&ctx, &flash, UserFormMode::Create, &form).await?.into_response());
        }
    };

    let password_hash = hash_blocking(valid.password.clone().unwrap_or_default()).await?;
    let user_id = users::create_user(
        &state.db,
        &NewUser {
            username: valid.username.clone(),
            email: valid.email,
            full_name: valid.full_name,
            role: valid.role,
            password_hash,
            is_active: valid.is_active,
        },
    )
    .await?;

    info!(
        "User {} '{}' ({}) created by '{}'",
        user_id, valid.username, valid.role, actor.username
    );
    Ok(redirect_with("/admin/users", "success", "user_created").into_response())
}

/// Apply a validated edit and keep live sessions consistent with it
async fn apply_update(state: &AppState, user_id: i64, valid: ValidUser) -> PageResult<()> {
    let password_hash = match valid.password {
        Some(password) => Some(hash_blocking(password).await?),
        None => None,
    };

    let update = UserUpdate {
        username: valid.username.clone(),
        email: valid.email.clone(),
        full_name: valid.full_name.clone(),
        role: valid.role,
        password_hash,
        is_active: valid.is_active,
    };
    if !users::update_user(&state.db, user_id, &update).await? {
        return Err(PageError::UserNotFound);
    }

    if valid.is_active {
        state
            .sessions
            .update_user(&SessionUser {
                id: user_id,
                username: valid.username,
                email: valid.email,
                full_name: valid.full_name,
                role: valid.role,
            })
            .await;
    } else {
        state.sessions.logout_user(user_id).await;
    }
    Ok(())
}

/// GET /admin/users/:id/edit
pub async fn edit_user_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
) -> PageResult<Html<String>> {
    ctx.require_role(Role::Admin)?;
    let user_id = parse_id(&raw_id).ok_or(PageError::UserNotFound)?;
    let target = users::find_user(&state.db, user_id)
        .await?
        .ok_or(PageError::UserNotFound)?;

    render_form(&ctx, &Flash::default(), UserFormMode::Edit(user_id), &form_from_user(&target)).await
}

/// POST /admin/users/:id/edit
pub async fn edit_user_submit(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
    Form(form): Form<UserForm>,
) -> PageResult<Response> {
    let actor = ctx.require_role(Role::Admin)?;
    let user_id = parse_id(&raw_id).ok_or(PageError::UserNotFound)?;
    let mode = UserFormMode::Edit(user_id);

    if users::find_user(&state.db, user_id).await?.is_none() {
        return Err(PageError::UserNotFound);
    }

    if !ctx.verify_csrf(&form.csrf_token).await {
        let flash = Flash::error(CSRF_FAILED);
        return Ok(render_form(&ctx, &flash, mode, &form).await?.into_response());
    }

    let form_ctx = UserFormContext {
        is_new: false,
        own_role: (user_id == actor.id).then_some(actor.role),
    };
    let valid = match validate_user_form(&state, &form, form_ctx, Some(user_id)).await? {
        Ok(valid) => valid,
        Err(errors) => {
            if form_ctx.own_role.is_some() {
                warn!("User '{}' rejected editing own account: {}", actor.username, errors);
            }
            let flash = Flash::error(errors.message());
            return Ok(render_form(&ctx, &flash, mode, &form).await?.into_response());
        }
    };

    let username = valid.username.clone();
    apply_update(&state, user_id, valid).await?;
    info!("User {} '{}' updated by '{}'", user_id, username, actor.username);

    Ok(redirect_with("/admin/users", "success", "user_updated").into_response())
}

/// GET /admin/account
pub async fn account_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(flash): Query<FlashParams>,
) -> PageResult<Html<String>> {
    let actor = ctx.require_login()?;
    let me = users::find_user(&state.db, actor.id)
        .await?
        .ok_or(PageError::Unauthenticated)?;

    render_form(&ctx, &flash.resolve(), UserFormMode::Account, &form_from_user(&me)).await
}

/// POST /admin/account
///
/// Same rules as an admin edit of the actor's own record: role and active
/// status cannot be changed here.
pub async fn account_submit(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<UserForm>,
) -> PageResult<Response> {
    let actor = ctx.require_login()?;
    let mode = UserFormMode::Account;

    if !ctx.verify_csrf(&form.csrf_token).await {
        let flash = Flash::error(CSRF_FAILED);
        return Ok(render_form(&ctx, &flash, mode, &form).await?.into_response());
    }

    let form_ctx = UserFormContext {
        is_new: false,
        own_role: Some(actor.role),
    };
    let valid = match validate_user_form(&state, &form, form_ctx, Some(actor.id)).await? {
        Ok(valid) => valid,
        Err(errors) => {
            warn!("User '{}' account update rejected: {}", actor.username, errors);
            let flash = Flash::error(errors.message());
            return Ok(render_form(&ctx, &flash, mode, &form).await?.into_response());
        }
    };

    apply_update(&state, actor.id, valid).await?;
    info!("User '{}' updated own account", actor.username);

    Ok(redirect_with("/admin/account", "success", "account_updated").into_response())
}
