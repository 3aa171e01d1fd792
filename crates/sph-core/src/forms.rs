use serde::{Deserialize, Serialize};

use crate::validate::{self, FieldErrors};

/// A contact that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub id_number: Option<String>,
    pub category_id: i64,
}

/// Single contact edit form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub id_number: String,
    pub category: String,
}

impl ContactForm {
    /// `groups` holds the ids of the requesting user's groups, the only
    /// acceptable categories.
    pub fn clean(&self, groups: &[i64]) -> Result<ContactInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let first_name = validate::text(&mut errors, "first_name", &self.first_name, 30, false);
        let last_name = validate::text(&mut errors, "last_name", &self.last_name, 30, false);
        let email = validate::email(&mut errors, "email", &self.email, false);
        let mobile = validate::mobile(&mut errors, "mobile", &self.mobile);
        let id_number = validate::text(&mut errors, "id_number", &self.id_number, 20, false);
        let category_id = validate::choice(&mut errors, "category", &self.category, groups);

        errors.finish(ContactInput {
            first_name,
            last_name,
            email,
            mobile,
            id_number: (!id_number.is_empty()).then_some(id_number),
            category_id,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupForm {
    pub name: String,
}

impl GroupForm {
    pub fn clean(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = validate::text(&mut errors, "name", &self.name, 100, true);
        errors.finish(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInput {
    pub first_name: String,
    pub last_name: String,
    pub public_email: String,
    pub institution: String,
    pub location: String,
}

/// Profile form; the names are written back to the user record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub public_email: String,
    pub institution: String,
    pub location: String,
}

impl ProfileForm {
    pub fn clean(&self) -> Result<ProfileInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let input = ProfileInput {
            first_name: validate::text(&mut errors, "first_name", &self.first_name, 30, false),
            last_name: validate::text(&mut errors, "last_name", &self.last_name, 30, false),
            public_email: validate::email(&mut errors, "public_email", &self.public_email, false),
            institution: validate::text(&mut errors, "institution", &self.institution, 50, false),
            location: validate::text(&mut errors, "location", &self.location, 50, false),
        };
        errors.finish(input)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignUpForm {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

impl SignUpForm {
    pub fn clean(&self) -> Result<SignUpInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = validate::text(&mut errors, "username", &self.username, 150, true);
        if !username.is_empty()
            && !username
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        let email = validate::email(&mut errors, "email", &self.email, true);

        // Passwords are never trimmed.
        if self.password1.is_empty() {
            errors.add("password1", validate::REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", validate::REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        } else {
            check_password_strength(&mut errors, &self.password2);
        }

        errors.finish(SignUpInput {
            username,
            email,
            password: self.password1.clone(),
        })
    }
}

fn check_password_strength(errors: &mut FieldErrors, password: &str) {
    if password.chars().count() < 8 {
        errors.add(
            "password2",
            "This password is too short. It must contain at least 8 characters.",
        );
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        errors.add("password2", "This password is entirely numeric.");
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(String, String), FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = validate::text(&mut errors, "username", &self.username, 150, true);
        if self.password.is_empty() {
            errors.add("password", validate::REQUIRED);
        }
        errors.finish((username, self.password.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsInput {
    pub category_id: i64,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsForm {
    pub category: String,
    pub message: String,
}

impl SmsForm {
    pub fn clean(&self, groups: &[i64]) -> Result<SmsInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let category_id = validate::choice(&mut errors, "category", &self.category, groups);
        let message = validate::text(&mut errors, "message", &self.message, 1600, true);
        errors.finish(SmsInput {
            category_id,
            message,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsSettingsInput {
    pub user_name: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsSettingsForm {
    pub user_name: String,
    pub api_key: String,
}

impl SmsSettingsForm {
    pub fn clean(&self) -> Result<SmsSettingsInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let user_name = validate::text(&mut errors, "user_name", &self.user_name, 255, true);
        let api_key = validate::text(&mut errors, "api_key", &self.api_key, 256, true);
        errors.finish(SmsSettingsInput { user_name, api_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_form() -> ContactForm {
        ContactForm {
            first_name: " Jane ".into(),
            last_name: "Wanjiru".into(),
            email: "jane@example.com".into(),
            mobile: "+254 712 345 678".into(),
            id_number: String::new(),
            category: "4".into(),
        }
    }

    #[test]
    fn test_contact_form_cleans_values() {
        let input = contact_form().clean(&[4]).unwrap();
        assert_eq!(input.first_name, "Jane");
        assert_eq!(input.mobile, "+254712345678");
        assert_eq!(input.id_number, None);
        assert_eq!(input.category_id, 4);
    }

    #[test]
    fn test_contact_form_rejects_foreign_category() {
        let errors = contact_form().clean(&[1, 2]).unwrap_err();
        assert!(errors.has("category"));
        assert!(!errors.has("mobile"));
    }

    #[test]
    fn test_contact_form_requires_mobile() {
        let mut form = contact_form();
        form.mobile = "  ".into();
        form.email = "not-an-email".into();
        let errors = form.clean(&[4]).unwrap_err();
        assert!(errors.has("mobile"));
        assert!(errors.has("email"));
    }

    #[test]
    fn test_group_form_requires_name() {
        assert!(GroupForm { name: "  ".into() }.clean().is_err());
        assert_eq!(GroupForm { name: " Parents ".into() }.clean().unwrap(), "Parents");
    }

    #[test]
    fn test_profile_form_lengths() {
        let form = ProfileForm {
            institution: "x".repeat(51),
            public_email: "bad".into(),
            ..ProfileForm::default()
        };
        let errors = form.clean().unwrap_err();
        assert!(errors.has("institution"));
        assert!(errors.has("public_email"));
        assert!(ProfileForm::default().clean().is_ok());
    }

    #[test]
    fn test_sign_up_password_rules() {
        let mut form = SignUpForm {
            username: "jane".into(),
            email: "jane@example.com".into(),
            password1: "correct horse".into(),
            password2: "correct horse".into(),
        };
        assert_eq!(form.clean().unwrap().password, "correct horse");

        form.password2 = "correct h0rse".into();
        assert!(form.clean().unwrap_err().has("password2"));

        form.password1 = "12345678901".into();
        form.password2 = "12345678901".into();
        assert_eq!(
            form.clean().unwrap_err().get("password2"),
            &["This password is entirely numeric.".to_string()]
        );

        form.username = "jane doe".into();
        form.password1 = "a long passphrase".into();
        form.password2 = "a long passphrase".into();
        assert!(form.clean().unwrap_err().has("username"));
    }

    #[test]
    fn test_sms_forms() {
        let sms = SmsForm {
            category: "2".into(),
            message: "Meeting at 10".into(),
        };
        assert_eq!(sms.clean(&[2]).unwrap().category_id, 2);
        assert!(sms.clean(&[]).is_err());

        let settings = SmsSettingsForm {
            user_name: "sandbox".into(),
            api_key: String::new(),
        };
        assert!(settings.clean().unwrap_err().has("api_key"));
    }
}
