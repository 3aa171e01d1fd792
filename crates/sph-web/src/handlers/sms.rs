use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use sph_core::{FieldErrors, SmsForm, SmsSettingsForm};
use sph_db::FlashLevel;

use crate::auth::Session;
use crate::error::{Result, WebError};
use crate::state::AppState;
use crate::views;

pub async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let messages = state.db.list_sms(session.user_id()).await?;
    let page = session.page(&state).await?;
    Ok(views::sms::list(&page, &messages))
}

pub async fn compose_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let groups = state.db.list_groups(session.user_id()).await?;
    let page = session.page(&state).await?;
    Ok(views::sms::compose(&page, &SmsForm::default(), &groups, &FieldErrors::new()))
}

/// Records the message against one of the user's groups. Delivery to the
/// provider is not attempted here.
pub async fn compose(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<SmsForm>,
) -> Result<Response> {
    let user_id = session.user_id();
    let groups = state.db.list_groups(user_id).await?;
    let group_ids: Vec<i64> = groups.iter().map(|g| g.id).collect();

    match form.clean(&group_ids) {
        Ok(input) => {
            let sms = state.db.create_sms(user_id, &input).await?;
            tracing::info!(user_id, sms_id = sms.id, group_id = sms.category_id, "Message recorded");
            session
                .flash(&state, FlashLevel::Success, "Message saved")
                .await?;
            Ok(Redirect::to("/messages").into_response())
        }
        Err(errors) => {
            let page = session.page(&state).await?;
            Ok(views::sms::compose(&page, &form, &groups, &errors).into_response())
        }
    }
}

fn require_admin(session: &Session) -> Result<()> {
    if session.user.is_admin {
        Ok(())
    } else {
        Err(WebError::Forbidden(format!(
            "user {} opened the SMS settings",
            session.user_id()
        )))
    }
}

/// The stored API key is never sent back to the browser.
pub async fn settings_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    require_admin(&session)?;
    let form = state
        .db
        .sms_settings()
        .await?
        .map(|settings| SmsSettingsForm {
            user_name: settings.user_name,
            api_key: String::new(),
        })
        .unwrap_or_default();
    let page = session.page(&state).await?;
    Ok(views::sms::settings(&page, &form, &FieldErrors::new()))
}

/// A blank API key keeps the stored one.
pub async fn settings(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(mut form): Form<SmsSettingsForm>,
) -> Result<Response> {
    require_admin(&session)?;
    if form.api_key.trim().is_empty() {
        if let Some(current) = state.db.sms_settings().await? {
            form.api_key = current.api_key;
        }
    }

    match form.clean() {
        Ok(input) => {
            state.db.save_sms_settings(&input).await?;
            tracing::info!(user_id = session.user_id(), "SMS settings updated");
            session
                .flash(&state, FlashLevel::Success, "SMS settings saved")
                .await?;
            Ok(Redirect::to("/settings/sms").into_response())
        }
        Err(errors) => {
            let page = session.page(&state).await?;
            Ok(views::sms::settings(&page, &form, &errors).into_response())
        }
    }
}
