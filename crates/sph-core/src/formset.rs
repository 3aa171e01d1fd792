//! Bulk contact entry: a batch of `(full name, mobile, category)` rows
//! posted together as `form-<i>-<field>` pairs.

use crate::forms::ContactInput;
use crate::validate::{self, FieldErrors};

pub const FORMSET_PREFIX: &str = "form";
pub const MAX_FORMS: usize = 1000;

const MANAGEMENT_TAMPERED: &str = "ManagementForm data is missing or has been tampered with.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactRow {
    pub full_name: String,
    pub mobile: String,
    pub category: String,
}

impl ContactRow {
    fn is_complete(&self) -> bool {
        !self.full_name.trim().is_empty()
            && !self.mobile.trim().is_empty()
            && !self.category.trim().is_empty()
    }

    fn clean(&self, groups: &[i64]) -> Result<ContactInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let full_name = validate::text(&mut errors, "full_name", &self.full_name, 61, true);
        let (first_name, last_name) = split_full_name(&full_name);
        if first_name.chars().count() > 30 || last_name.chars().count() > 30 {
            errors.add(
                "full_name",
                "First and last name must each be at most 30 characters.",
            );
        }
        let mobile = validate::mobile(&mut errors, "mobile", &self.mobile);
        let category_id = validate::choice(&mut errors, "category", &self.category, groups);

        errors.finish(ContactInput {
            first_name,
            last_name,
            email: String::new(),
            mobile,
            id_number: None,
            category_id,
        })
    }
}

/// Errors of a submitted formset: management-level messages plus one
/// `FieldErrors` per submitted row (empty for valid or dropped rows).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormsetErrors {
    pub non_form: Vec<String>,
    pub rows: Vec<FieldErrors>,
}

impl FormsetErrors {
    pub fn is_empty(&self) -> bool {
        self.non_form.is_empty() && self.rows.iter().all(FieldErrors::is_empty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFormset {
    rows: Vec<ContactRow>,
}

impl ContactFormset {
    /// An unbound formset with `extra` empty rows.
    pub fn blank(extra: usize) -> Self {
        Self {
            rows: vec![ContactRow::default(); extra],
        }
    }

    pub fn from_rows(rows: Vec<ContactRow>) -> Self {
        Self { rows }
    }

    /// Binds posted `form-*` pairs. Fails when the management field
    /// `form-TOTAL_FORMS` is missing, unparsable or above [`MAX_FORMS`].
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, FormsetErrors> {
        let value_of = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let total_key = format!("{FORMSET_PREFIX}-TOTAL_FORMS");
        let total = value_of(&total_key)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .ok_or_else(|| FormsetErrors {
                non_form: vec![MANAGEMENT_TAMPERED.to_string()],
                rows: Vec::new(),
            })?;
        if total > MAX_FORMS {
            return Err(FormsetErrors {
                non_form: vec![format!("Please submit at most {MAX_FORMS} forms.")],
                rows: Vec::new(),
            });
        }

        let rows = (0..total)
            .map(|i| {
                let field = |name: &str| {
                    value_of(&format!("{FORMSET_PREFIX}-{i}-{name}"))
                        .unwrap_or_default()
                        .to_string()
                };
                ContactRow {
                    full_name: field("full_name"),
                    mobile: field("mobile"),
                    category: field("category"),
                }
            })
            .collect();

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[ContactRow] {
        &self.rows
    }

    /// Cleans every row. Incomplete rows are dropped without an error;
    /// complete rows with malformed values fail the whole formset.
    pub fn clean(&self, groups: &[i64]) -> Result<Vec<ContactInput>, FormsetErrors> {
        let mut contacts = Vec::new();
        let mut errors = FormsetErrors {
            non_form: Vec::new(),
            rows: Vec::with_capacity(self.rows.len()),
        };

        for row in &self.rows {
            if !row.is_complete() {
                errors.rows.push(FieldErrors::new());
                continue;
            }
            match row.clean(groups) {
                Ok(contact) => {
                    contacts.push(contact);
                    errors.rows.push(FieldErrors::new());
                }
                Err(row_errors) => errors.rows.push(row_errors),
            }
        }

        if errors.is_empty() {
            tracing::debug!(
                submitted = self.rows.len(),
                kept = contacts.len(),
                "Contact formset cleaned"
            );
            Ok(contacts)
        } else {
            Err(errors)
        }
    }
}

/// Splits at the first whitespace run: `"Mary Jane Doe"` becomes
/// `("Mary", "Jane Doe")`.
pub(crate) fn split_full_name(full_name: &str) -> (String, String) {
    let full_name = full_name.trim();
    match full_name.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (full_name.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_split_full_name() {
        assert_eq!(split_full_name("Mary Jane  Doe"), ("Mary".into(), "Jane  Doe".into()));
        assert_eq!(split_full_name(" Cher "), ("Cher".into(), String::new()));
    }

    #[test]
    fn test_from_pairs_requires_management_form() {
        let err = ContactFormset::from_pairs(&pairs(&[("form-0-mobile", "0712345678")]))
            .unwrap_err();
        assert_eq!(err.non_form, vec![MANAGEMENT_TAMPERED.to_string()]);

        let err = ContactFormset::from_pairs(&pairs(&[("form-TOTAL_FORMS", "1001")])).unwrap_err();
        assert_eq!(err.non_form, vec!["Please submit at most 1000 forms.".to_string()]);
    }

    #[test]
    fn test_incomplete_rows_are_dropped() {
        let formset = ContactFormset::from_pairs(&pairs(&[
            ("form-TOTAL_FORMS", "3"),
            ("form-0-full_name", "Jane Wanjiru"),
            ("form-0-mobile", "0712345678"),
            ("form-0-category", "1"),
            ("form-1-full_name", "John Otieno"),
            ("form-1-category", "1"),
            ("form-2-full_name", "Amina"),
            ("form-2-mobile", "0722000111"),
            ("form-2-category", "1"),
        ]))
        .unwrap();
        assert_eq!(formset.rows().len(), 3);

        let contacts = formset.clean(&[1]).unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].first_name, "Jane");
        assert_eq!(contacts[0].last_name, "Wanjiru");
        assert_eq!(contacts[1].first_name, "Amina");
        assert_eq!(contacts[1].last_name, "");
    }

    #[test]
    fn test_malformed_complete_row_fails_formset() {
        let formset = ContactFormset::from_rows(vec![
            ContactRow {
                full_name: "Jane Wanjiru".into(),
                mobile: "0712345678".into(),
                category: "1".into(),
            },
            ContactRow {
                full_name: "John Otieno".into(),
                mobile: "call me".into(),
                category: "99".into(),
            },
        ]);
        let errors = formset.clean(&[1]).unwrap_err();
        assert!(errors.rows[0].is_empty());
        assert!(errors.rows[1].has("mobile"));
        assert!(errors.rows[1].has("category"));
    }

    #[test]
    fn test_blank_formset_cleans_to_nothing() {
        assert_eq!(ContactFormset::blank(3).clean(&[1]).unwrap(), Vec::new());
    }
}
