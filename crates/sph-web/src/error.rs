use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sph_core::CoreError;
use sph_db::DbError;
use thiserror::Error;

use crate::views;

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Db(#[source] DbError),

    #[error("Data error: {0}")]
    Core(#[from] CoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DbError> for WebError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => Self::NotFound(what),
            other => Self::Db(other),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(what) => {
                tracing::debug!(%what, "Not found");
                (
                    StatusCode::NOT_FOUND,
                    views::error_page("Not found", "The requested item does not exist."),
                )
                    .into_response()
            }
            Self::BadRequest(reason) => {
                tracing::debug!(%reason, "Bad request");
                (StatusCode::BAD_REQUEST, views::error_page("Bad request", &reason)).into_response()
            }
            Self::Forbidden(reason) => {
                tracing::warn!(%reason, "Forbidden");
                (
                    StatusCode::FORBIDDEN,
                    views::error_page("Forbidden", "You do not have permission to view this page."),
                )
                    .into_response()
            }
            Self::Db(e) => {
                tracing::error!("Database error: {}", e);
                internal_error()
            }
            Self::Core(e) => {
                tracing::error!("Data error: {}", e);
                internal_error()
            }
            Self::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        views::error_page("Server error", "Something went wrong. Please try again."),
    )
        .into_response()
}

pub type Result<T> = std::result::Result<T, WebError>;
