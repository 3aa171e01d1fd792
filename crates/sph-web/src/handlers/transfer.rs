//! CSV export and the two spreadsheet importers.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::Extension;
use sph_core::{Dataset, ImportLayout, write_contacts_csv};
use sph_db::Contact;

use crate::auth::Session;
use crate::error::{Result, WebError};
use crate::state::AppState;
use crate::views;
use crate::views::transfer::UploadOutcome;

pub async fn export(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    let contacts = state.db.list_contacts(session.user_id()).await?;
    let body = write_contacts_csv(Vec::new(), contacts.iter().map(Contact::export_row))?;
    tracing::info!(user_id = session.user_id(), count = contacts.len(), "Contacts exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, r#"attachment; filename="contacts.csv""#),
        ],
        body,
    )
        .into_response())
}

/// Pulls the file named `field_name` out of the form and decodes it off the
/// async runtime. `Err` carries a human readable reason.
async fn read_dataset(
    multipart: &mut Multipart,
    field_name: &str,
) -> std::result::Result<Dataset, String> {
    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read multipart body");
                return Err("the upload could not be read".into());
            }
        };
        if field.name() != Some(field_name) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        match field.bytes().await {
            Ok(bytes) => upload = Some((filename, bytes)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read upload file bytes");
                return Err("the upload could not be read".into());
            }
        }
        break;
    }

    let Some((filename, bytes)) = upload.filter(|(_, bytes)| !bytes.is_empty()) else {
        return Err("no file was submitted".into());
    };

    tokio::task::spawn_blocking(move || Dataset::load(&bytes, filename.as_deref()))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Spreadsheet decode task failed");
            "the file could not be decoded".to_string()
        })?
        .map_err(|e| {
            tracing::debug!(error = %e, "Unreadable spreadsheet");
            e.to_string()
        })
}

fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, "Bad Request").into_response()
}

pub async fn import_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let page = session.page(&state).await?;
    Ok(views::transfer::import_form(&page))
}

/// Positional sheet import. Plain-text `OK` or `Bad Request`; nothing is
/// written unless every row is valid.
pub async fn import(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let user_id = session.user_id();
    let Ok(mut multipart) = multipart else {
        return Ok(bad_request());
    };
    let dataset = match read_dataset(&mut multipart, "file").await {
        Ok(dataset) => dataset,
        Err(reason) => {
            tracing::debug!(user_id, %reason, "Sheet import rejected");
            return Ok(bad_request());
        }
    };

    let groups = state.db.group_ids(user_id).await?;
    let report = ImportLayout::SHEET.dry_run(&dataset, &groups);
    if report.has_errors() {
        tracing::debug!(user_id, invalid = report.errors.len(), "Sheet import rejected");
        return Ok(bad_request());
    }

    match state.db.import_contacts(user_id, &report.contacts).await {
        Ok(_) => Ok((StatusCode::OK, "OK").into_response()),
        Err(e) if e.is_integrity() => {
            tracing::warn!(user_id, error = %e, "Sheet import rolled back");
            Ok(bad_request())
        }
        Err(e) => Err(WebError::from(e)),
    }
}

pub async fn upload_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let page = session.page(&state).await?;
    Ok(views::transfer::upload(&page, None))
}

/// Dry run over the whole file, then one all-or-nothing insert.
pub async fn upload(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let user_id = session.user_id();
    let dataset = match multipart {
        Ok(mut multipart) => read_dataset(&mut multipart, "myfile").await,
        Err(rejection) => Err(rejection.body_text()),
    };

    let outcome = match dataset {
        Err(reason) => UploadOutcome::Failed(reason),
        Ok(dataset) => {
            let groups = state.db.group_ids(user_id).await?;
            let report = ImportLayout::EXPORT.dry_run(&dataset, &groups);
            if report.has_errors() {
                UploadOutcome::Rejected(report.errors)
            } else {
                match state.db.import_contacts(user_id, &report.contacts).await {
                    Ok(count) => UploadOutcome::Imported(count),
                    Err(e) if e.is_integrity() => {
                        tracing::warn!(user_id, error = %e, "Upload rolled back");
                        UploadOutcome::Failed(
                            "some rows clash with existing contacts; nothing was imported".into(),
                        )
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    };

    let status = match outcome {
        UploadOutcome::Imported(_) => StatusCode::OK,
        UploadOutcome::Rejected(_) | UploadOutcome::Failed(_) => StatusCode::BAD_REQUEST,
    };
    let page = session.page(&state).await?;
    Ok((status, views::transfer::upload(&page, Some(&outcome))).into_response())
}
