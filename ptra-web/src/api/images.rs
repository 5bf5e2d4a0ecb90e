//! Project image upload (multipart)

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::Redirect,
    Extension,
};
use ptra_common::config::UploadLimits;
use ptra_common::db::projects;
use ptra_common::Role;
use tracing::{info, warn};

use super::parse_id;
use crate::error::{redirect_with, PageError, PageResult};
use crate::session::RequestContext;
use crate::upload::{self, PendingUpload, UploadError};
use crate::AppState;

#[derive(Debug, Default)]
struct UploadFields {
    csrf_token: String,
    caption: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

fn multipart_error(err: MultipartError, limits: &UploadLimits) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::too_large(limits)
    } else {
        warn!("Multipart read failed: {}", err);
        UploadError::Missing
    }
}

async fn read_fields(
    multipart: &mut Multipart,
    limits: &UploadLimits,
) -> Result<UploadFields, UploadError> {
    let mut fields = UploadFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limits))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "csrf_token" => {
                fields.csrf_token = field.text().await.map_err(|e| multipart_error(e, limits))?;
            }
            "caption" => {
                fields.caption = Some(field.text().await.map_err(|e| multipart_error(e, limits))?);
            }
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, limits))?;
                fields.file = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    Ok(fields)
}

/// POST /projects/:id/images
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(raw_id): Path<String>,
    mut multipart: Multipart,
) -> PageResult<Redirect> {
    let user = ctx.require_role(Role::Pm)?;
    let project_id = parse_id(&raw_id).ok_or(PageError::ProjectNotFound)?;
    if projects::find_active_project(&state.db, project_id).await?.is_none() {
        return Err(PageError::ProjectNotFound);
    }

    let back = format!("/projects/{}", project_id);
    let limits = &state.config.uploads;

    let fields = match read_fields(&mut multipart, limits).await {
        Ok(fields) => fields,
        Err(e) => return Ok(redirect_with(&back, "error", &e.to_string())),
    };

    if !ctx.verify_csrf(&fields.csrf_token).await {
        return Ok(redirect_with(&back, "error", "invalid_token"));
    }

    let Some((filename, bytes)) = fields.file else {
        return Ok(redirect_with(&back, "error", &UploadError::Missing.to_string()));
    };

    let pending = PendingUpload {
        filename,
        bytes,
        caption: fields.caption,
    };
    match upload::store_upload(
        &state.db,
        &state.config.upload_dir(),
        limits,
        project_id,
        user.id,
        pending,
    )
    .await
    {
        Ok(stored) => {
            info!("Image {} uploaded to project {} by '{}'", stored, project_id, user.username);
            Ok(redirect_with(&back, "success", "image_uploaded"))
        }
        Err(UploadError::Storage(detail)) => {
            warn!("Image upload for project {} failed: {}", project_id, detail);
            Ok(redirect_with(&back, "error", &UploadError::Storage(detail).to_string()))
        }
        Err(e) => {
            info!("Image upload for project {} rejected: {}", project_id, e);
            Ok(redirect_with(&back, "error", &e.to_string()))
        }
    }
}
