use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::handlers::{self, accounts, contacts, groups, sms, transfer};
use crate::state::AppState;

/// Every route except sign-up, login and health runs behind the login gate.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(handlers::index_handler))
        .route("/contacts", get(contacts::list))
        .route("/contacts/count", get(contacts::count))
        .route("/contacts/new", get(contacts::bulk_form).post(contacts::bulk_replace))
        .route("/contacts/search", get(contacts::search))
        .route("/contacts/export", get(transfer::export))
        .route("/contacts/import", get(transfer::import_form).post(transfer::import))
        .route("/contacts/upload", get(transfer::upload_form).post(transfer::upload))
        .route("/contacts/{id}", get(contacts::detail))
        .route("/contacts/{id}/edit", get(contacts::edit_form).post(contacts::edit))
        .route(
            "/contacts/{id}/delete",
            get(contacts::delete_confirm).post(contacts::delete),
        )
        .route("/groups", get(groups::list))
        .route("/groups/count", get(groups::count))
        .route("/groups/new", get(groups::create_form).post(groups::create))
        .route("/groups/{id}/edit", get(groups::edit_form).post(groups::edit))
        .route(
            "/groups/{id}/delete",
            get(groups::delete_confirm).post(groups::delete),
        )
        .route("/messages", get(sms::list))
        .route("/messages/new", get(sms::compose_form).post(sms::compose))
        .route("/settings/sms", get(sms::settings_form).post(sms::settings))
        .route("/profile", get(accounts::profile_form).post(accounts::profile))
        .route("/logout", post(accounts::logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_login,
        ));

    let public = Router::new()
        .route("/login", get(accounts::login_form).post(accounts::login))
        .route("/signup", get(accounts::signup_form).post(accounts::signup))
        .route("/health", get(handlers::health_handler));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
