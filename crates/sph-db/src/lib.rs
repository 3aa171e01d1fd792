mod error;
mod models;
mod password;
mod repository;
mod schema;

pub use error::{DbError, Result};
pub use models::*;
pub use password::{hash_password, verify_password};
pub use repository::SphDb;
