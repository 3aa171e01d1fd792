use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::Deserialize;
use sph_core::{ContactForm, ContactFormset, FieldErrors, FormsetErrors};
use sph_db::FlashLevel;

use crate::auth::Session;
use crate::error::{Result, WebError};
use crate::state::AppState;
use crate::views;

const DUPLICATE_MOBILE: &str = "Contact with this Mobile already exists.";

pub async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let contacts = state.db.list_contacts(session.user_id()).await?;
    let groups = state.db.list_groups(session.user_id()).await?;
    let page = session.page(&state).await?;
    Ok(views::contacts::list(&page, &contacts, &groups))
}

pub async fn count(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let count = state.db.count_contacts(session.user_id()).await?;
    Ok(views::contacts::count(count))
}

pub async fn bulk_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let groups = state.db.list_groups(session.user_id()).await?;
    let formset = ContactFormset::blank(state.config.formset_extra);
    let page = session.page(&state).await?;
    Ok(views::contacts::formset(
        &page,
        &formset,
        &groups,
        &FormsetErrors::default(),
    ))
}

/// Replaces the user's whole contact list with the complete rows of the
/// submitted formset.
pub async fn bulk_replace(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let user_id = session.user_id();
    let groups = state.db.list_groups(user_id).await?;
    let group_ids: Vec<i64> = groups.iter().map(|g| g.id).collect();

    let cleaned = ContactFormset::from_pairs(&pairs)
        .and_then(|formset| formset.clean(&group_ids).map(|contacts| (formset, contacts)));
    let (formset, contacts) = match cleaned {
        Ok(bound) => bound,
        Err(errors) => {
            tracing::debug!(user_id, "Contact formset rejected");
            let formset = ContactFormset::from_pairs(&pairs).unwrap_or_default();
            let page = session.page(&state).await?;
            return Ok(views::contacts::formset(&page, &formset, &groups, &errors).into_response());
        }
    };

    match state.db.replace_contacts(user_id, &contacts).await {
        Ok(_) => {
            session
                .flash(&state, FlashLevel::Success, "You have created contacts")
                .await?;
            let page = session.page(&state).await?;
            Ok(views::contacts::formset(&page, &formset, &groups, &FormsetErrors::default())
                .into_response())
        }
        Err(e) if e.is_integrity() => {
            tracing::warn!(user_id, error = %e, "Bulk contact save rolled back");
            session
                .flash(&state, FlashLevel::Error, "There was an error saving your contacts.")
                .await?;
            Ok(Redirect::to("/contacts/new").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn detail(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    let contact = state.db.get_contact(session.user_id(), id).await?;
    let group = state.db.get_group(session.user_id(), contact.category_id).await?;
    let page = session.page(&state).await?;
    Ok(views::contacts::detail(&page, &contact, &group))
}

pub async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    let contact = state.db.get_contact(session.user_id(), id).await?;
    let groups = state.db.list_groups(session.user_id()).await?;
    let form = ContactForm {
        first_name: contact.first_name,
        last_name: contact.last_name,
        email: contact.email,
        mobile: contact.mobile,
        id_number: contact.id_number.unwrap_or_default(),
        category: contact.category_id.to_string(),
    };
    let page = session.page(&state).await?;
    Ok(views::contacts::edit(&page, id, &form, &groups, &FieldErrors::new()))
}

pub async fn edit(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Form(form): Form<ContactForm>,
) -> Result<Response> {
    let user_id = session.user_id();
    // 404 before validating someone else's contact.
    state.db.get_contact(user_id, id).await?;
    let groups = state.db.list_groups(user_id).await?;
    let group_ids: Vec<i64> = groups.iter().map(|g| g.id).collect();

    let errors = match form.clean(&group_ids) {
        Ok(input) => match state.db.update_contact(user_id, id, &input).await {
            Ok(contact) => {
                session
                    .flash(&state, FlashLevel::Success, "Contact Successfully Updated")
                    .await?;
                return Ok(Redirect::to(&format!("/contacts/{}", contact.id)).into_response());
            }
            Err(e) if e.is_integrity() => {
                let mut errors = FieldErrors::new();
                errors.add("mobile", DUPLICATE_MOBILE);
                errors
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let page = session.page(&state).await?;
    Ok(views::contacts::edit(&page, id, &form, &groups, &errors).into_response())
}

pub async fn delete_confirm(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    let contact = state.db.get_contact(session.user_id(), id).await?;
    let page = session.page(&state).await?;
    Ok(views::contacts::confirm_delete(&page, &contact))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> Result<Redirect> {
    state.db.delete_contact(session.user_id(), id).await?;
    session
        .flash(&state, FlashLevel::Success, "Contact Successfully Deleted")
        .await?;
    Ok(Redirect::to("/contacts"))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>> {
    let term = query
        .q
        .ok_or_else(|| WebError::BadRequest("Missing search term".into()))?;
    let contacts = state.db.search_contacts(session.user_id(), &term).await?;
    let groups = state.db.list_groups(session.user_id()).await?;
    let page = session.page(&state).await?;
    Ok(views::contacts::search(&page, &term, &contacts, &groups))
}
