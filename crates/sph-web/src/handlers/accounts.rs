use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::Deserialize;
use sph_core::{FieldErrors, LoginForm, ProfileForm, SignUpForm};
use sph_db::FlashLevel;

use crate::auth::{Session, expired_cookie, safe_next, session_cookie};
use crate::error::Result;
use crate::state::AppState;
use crate::views;

const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Opens a session for `user_id` and sends the browser on to `next`.
async fn start_session(state: &AppState, user_id: i64, next: &str) -> Result<Response> {
    let token = state.db.create_session(user_id).await?;
    Ok((
        [(header::SET_COOKIE, session_cookie(&token, &state.config))],
        Redirect::to(safe_next(next)),
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    next: String,
}

pub async fn login_form(Query(query): Query<LoginQuery>) -> Html<String> {
    let form = LoginForm {
        next: query.next,
        ..LoginForm::default()
    };
    views::accounts::login(&form, &FieldErrors::new())
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response> {
    let errors = match form.clean() {
        Ok((username, password)) => match state.db.authenticate(&username, &password).await? {
            Some(user) => {
                tracing::info!(user_id = user.id, "User logged in");
                return start_session(&state, user.id, &form.next).await;
            }
            None => {
                tracing::debug!(%username, "Login failed");
                let mut errors = FieldErrors::new();
                errors.add(FieldErrors::NON_FIELD, BAD_CREDENTIALS);
                errors
            }
        },
        Err(errors) => errors,
    };
    Ok(views::accounts::login(&form, &errors).into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    state.db.delete_session(&session.token).await?;
    tracing::info!(user_id = session.user_id(), "User logged out");
    Ok((
        [(header::SET_COOKIE, expired_cookie())],
        Redirect::to("/login"),
    )
        .into_response())
}

pub async fn signup_form() -> Html<String> {
    views::accounts::signup(&SignUpForm::default(), &FieldErrors::new())
}

pub async fn signup(State(state): State<AppState>, Form(form): Form<SignUpForm>) -> Result<Response> {
    let mut errors = match form.clean() {
        Ok(input) => {
            if state.db.find_user(&input.username).await?.is_none() {
                match state
                    .db
                    .create_user(&input.username, &input.email, &input.password)
                    .await
                {
                    Ok(user) => {
                        tracing::info!(user_id = user.id, "User signed up");
                        return start_session(&state, user.id, "/contacts").await;
                    }
                    // Lost a race against a concurrent sign-up.
                    Err(e) if e.is_integrity() => {}
                    Err(e) => return Err(e.into()),
                }
            }
            FieldErrors::new()
        }
        Err(errors) => errors,
    };
    if errors.is_empty() {
        errors.add("username", USERNAME_TAKEN);
    }
    Ok(views::accounts::signup(&form, &errors).into_response())
}

pub async fn profile_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Html<String>> {
    let profile = state.db.profile(session.user_id()).await?;
    let form = ProfileForm {
        first_name: session.user.first_name.clone(),
        last_name: session.user.last_name.clone(),
        public_email: profile.public_email,
        institution: profile.institution,
        location: profile.location,
    };
    let page = session.page(&state).await?;
    Ok(views::accounts::profile(
        &page,
        &form,
        &FieldErrors::new(),
        session.user.is_admin,
    ))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    match form.clean() {
        Ok(input) => {
            state.db.save_profile(session.user_id(), &input).await?;
            session
                .flash(&state, FlashLevel::Success, "Your profile was successfully updated!")
                .await?;
            Ok(Redirect::to("/profile").into_response())
        }
        Err(errors) => {
            let page = session.page(&state).await?;
            let html = views::accounts::profile(&page, &form, &errors, session.user.is_admin);
            Ok(html.into_response())
        }
    }
}
