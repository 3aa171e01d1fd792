use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use sph_core::{FieldErrors, GroupForm};
use sph_db::FlashLevel;

use crate::auth::Session;
use crate::error::Result;
use crate::state::AppState;
use crate::views;

const NAME_TAKEN: &str = "You already have a group with that name.";

fn name_taken() -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.add("name", NAME_TAKEN);
    errors
}

pub async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let groups = state.db.list_groups(session.user_id()).await?;
    let page = session.page(&state).await?;
    Ok(views::groups::list(&page, &groups))
}

pub async fn count(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let count = state.db.count_groups(session.user_id()).await?;
    Ok(views::groups::count(count))
}

pub async fn create_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let page = session.page(&state).await?;
    Ok(views::groups::form(&page, None, &GroupForm::default(), &FieldErrors::new()))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<GroupForm>,
) -> Result<Response> {
    let user_id = session.user_id();
    let errors = match form.clean() {
        Ok(name) if state.db.group_name_taken(user_id, &name, None).await? => {
            session.flash(&state, FlashLevel::Error, NAME_TAKEN).await?;
            FieldErrors::new()
        }
        Ok(name) => match state.db.create_group(user_id, &name).await {
            Ok(group) => {
                tracing::info!(user_id, group_id = group.id, "Group created");
                session
                    .flash(&state, FlashLevel::Success, "Group Successfully Created")
                    .await?;
                return Ok(Redirect::to("/groups").into_response());
            }
            // Lost a race with a concurrent insert of the same name.
            Err(e) if e.is_integrity() => {
                session.flash(&state, FlashLevel::Error, NAME_TAKEN).await?;
                FieldErrors::new()
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let page = session.page(&state).await?;
    Ok(views::groups::form(&page, None, &form, &errors).into_response())
}

pub async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    let group = state.db.get_group(session.user_id(), id).await?;
    let form = GroupForm { name: group.name };
    let page = session.page(&state).await?;
    Ok(views::groups::form(&page, Some(id), &form, &FieldErrors::new()))
}

pub async fn edit(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Form(form): Form<GroupForm>,
) -> Result<Response> {
    let user_id = session.user_id();
    state.db.get_group(user_id, id).await?;

    let errors = match form.clean() {
        Ok(name) if state.db.group_name_taken(user_id, &name, Some(id)).await? => name_taken(),
        Ok(name) => match state.db.update_group(user_id, id, &name).await {
            Ok(_) => {
                session
                    .flash(&state, FlashLevel::Success, "Group Successfully Updated")
                    .await?;
                return Ok(Redirect::to("/groups").into_response());
            }
            Err(e) if e.is_integrity() => name_taken(),
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let page = session.page(&state).await?;
    Ok(views::groups::form(&page, Some(id), &form, &errors).into_response())
}

pub async fn delete_confirm(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    let group = state.db.get_group(session.user_id(), id).await?;
    let members = state.db.count_group_contacts(session.user_id(), id).await?;
    let page = session.page(&state).await?;
    Ok(views::groups::confirm_delete(&page, &group, members))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> Result<Redirect> {
    state.db.delete_group(session.user_id(), id).await?;
    tracing::info!(user_id = session.user_id(), group_id = id, "Group deleted");
    session
        .flash(&state, FlashLevel::Success, "Group Successfully Deleted")
        .await?;
    Ok(Redirect::to("/groups"))
}
