pub mod accounts;
pub mod contacts;
pub mod groups;
pub mod sms;
pub mod transfer;

use axum::response::Redirect;

pub async fn health_handler() -> &'static str {
    "OK"
}

pub async fn index_handler() -> Redirect {
    Redirect::to("/contacts")
}
