//! HTTP front end of the contacts service: server-rendered pages for
//! contacts, groups, imports and exports, accounts and SMS records.

mod auth;
mod config;
mod error;
mod handlers;
mod router;
mod state;
mod views;

pub use auth::{Session, SESSION_COOKIE};
pub use config::ServerConfig;
pub use error::{Result, WebError};
pub use router::router;
pub use state::AppState;
