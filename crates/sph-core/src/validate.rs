use std::collections::BTreeMap;
use std::fmt;

pub(crate) const REQUIRED: &str = "This field is required.";
pub(crate) const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub(crate) const INVALID_EMAIL: &str = "Enter a valid email address.";
pub(crate) const INVALID_MOBILE: &str = "Enter a valid mobile number.";

/// Field-level validation messages, keyed by form field name.
///
/// Messages that do not belong to a single field are stored under
/// [`FieldErrors::NON_FIELD`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns `value` when no error was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Trims `raw` and checks presence and length.
pub(crate) fn text(
    errors: &mut FieldErrors,
    field: &str,
    raw: &str,
    max_len: usize,
    required: bool,
) -> String {
    let value = raw.trim();
    if required && value.is_empty() {
        errors.add(field, REQUIRED);
    }
    let len = value.chars().count();
    if len > max_len {
        errors.add(
            field,
            format!("Ensure this value has at most {max_len} characters (it has {len})."),
        );
    }
    value.to_string()
}

pub(crate) fn email(errors: &mut FieldErrors, field: &str, raw: &str, required: bool) -> String {
    let value = text(errors, field, raw, 254, required);
    if !value.is_empty() && !is_valid_email(&value) {
        errors.add(field, INVALID_EMAIL);
    }
    value
}

/// Validates a mobile number and returns it without spaces or dashes.
pub(crate) fn mobile(errors: &mut FieldErrors, field: &str, raw: &str) -> String {
    let value = text(errors, field, raw, 20, true);
    if value.is_empty() {
        return value;
    }
    match normalize_mobile(&value) {
        Some(normalized) => normalized,
        None => {
            errors.add(field, INVALID_MOBILE);
            value
        }
    }
}

/// Parses a group id and checks it belongs to `choices`.
pub(crate) fn choice(errors: &mut FieldErrors, field: &str, raw: &str, choices: &[i64]) -> i64 {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return 0;
    }
    match value.parse::<i64>() {
        Ok(id) if choices.contains(&id) => id,
        _ => {
            errors.add(field, INVALID_CHOICE);
            0
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// Accepts an optional leading `+` followed by 7 to 15 digits; spaces,
/// dashes and dots between digits are dropped.
pub fn normalize_mobile(value: &str) -> Option<String> {
    let (plus, rest) = match value.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", value),
    };
    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' => {}
            _ => return None,
        }
    }
    if (7..=15).contains(&digits.len()) {
        Some(format!("{plus}{digits}"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("jane.doe+sms@mail.example.co.ke"));
        assert!(!is_valid_email("jane@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jane@localhost"));
        assert!(!is_valid_email("jane doe@example.com"));
        assert!(!is_valid_email("jane@-example.com"));
    }

    #[test]
    fn test_mobile_normalization() {
        assert_eq!(normalize_mobile("+254 712-345-678").as_deref(), Some("+254712345678"));
        assert_eq!(normalize_mobile("0712345678").as_deref(), Some("0712345678"));
        assert_eq!(normalize_mobile("12345"), None);
        assert_eq!(normalize_mobile("07123abc45"), None);
        assert_eq!(normalize_mobile("++254712345678"), None);
    }

    #[test]
    fn test_text_length_and_presence() {
        let mut errors = FieldErrors::new();
        let value = text(&mut errors, "name", "   ", 10, true);
        assert_eq!(value, "");
        assert_eq!(errors.get("name"), &[REQUIRED.to_string()]);

        let mut errors = FieldErrors::new();
        text(&mut errors, "name", "abcdefghijk", 10, false);
        assert_eq!(
            errors.get("name"),
            &["Ensure this value has at most 10 characters (it has 11).".to_string()]
        );
    }

    #[test]
    fn test_choice_rejects_foreign_ids() {
        let mut errors = FieldErrors::new();
        assert_eq!(choice(&mut errors, "category", " 7 ", &[3, 7]), 7);
        assert!(errors.is_empty());

        choice(&mut errors, "category", "9", &[3, 7]);
        choice(&mut errors, "category", "abc", &[3, 7]);
        assert_eq!(errors.get("category").len(), 2);
    }

    #[test]
    fn test_display_joins_messages() {
        let mut errors = FieldErrors::new();
        errors.add("mobile", INVALID_MOBILE);
        errors.add(FieldErrors::NON_FIELD, "Nope.");
        assert_eq!(
            errors.to_string(),
            "__all__: Nope.; mobile: Enter a valid mobile number."
        );
    }
}
