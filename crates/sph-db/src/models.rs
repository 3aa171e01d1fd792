use serde::{Deserialize, Serialize};
use sph_core::ExportRow;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// May edit installation-wide settings. Only granted from the console.
    pub is_admin: bool,
    pub created_at: i64,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: i64,
    pub public_email: String,
    pub institution: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactGroup {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub id_number: Option<String>,
    pub category_id: i64,
    pub created_at: i64,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn export_row(&self) -> ExportRow<'_> {
        ExportRow {
            first_name: &self.first_name,
            last_name: &self.last_name,
            email: &self.email,
            mobile: &self.mobile,
            category: self.category_id,
        }
    }
}

/// A sent-message record with the recipient group's name joined in.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sms {
    pub id: i64,
    pub category_id: i64,
    pub group_name: String,
    pub message: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SmsSettings {
    pub user_name: String,
    pub api_key: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        }
    }

    fn parse(level: &str) -> Self {
        match level {
            "success" => Self::Success,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

impl FlashMessage {
    pub(crate) fn from_row((level, message): (String, String)) -> Self {
        Self {
            level: FlashLevel::parse(&level),
            message,
        }
    }
}
