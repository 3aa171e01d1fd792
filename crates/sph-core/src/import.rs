use crate::dataset::Dataset;
use crate::forms::{ContactForm, ContactInput};
use crate::validate::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportField {
    FirstName,
    LastName,
    Email,
    Mobile,
    IdNumber,
    Category,
}

impl ImportField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Mobile => "mobile",
            Self::IdNumber => "id_number",
            Self::Category => "category",
        }
    }
}

/// Positional column mapping: column `i` of every row feeds `columns[i]`.
/// Header names are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportLayout {
    columns: &'static [ImportField],
}

impl ImportLayout {
    /// Same order as the CSV export, so an export can be uploaded back.
    pub const EXPORT: Self = Self {
        columns: &[
            ImportField::FirstName,
            ImportField::LastName,
            ImportField::Email,
            ImportField::Mobile,
            ImportField::Category,
        ],
    };

    /// Layout of the sheet importer.
    pub const SHEET: Self = Self {
        columns: &[
            ImportField::FirstName,
            ImportField::LastName,
            ImportField::Mobile,
            ImportField::IdNumber,
            ImportField::Category,
        ],
    };

    pub fn columns(&self) -> &'static [ImportField] {
        self.columns
    }

    fn form_for(&self, row: &[String]) -> ContactForm {
        let mut form = ContactForm::default();
        for (field, cell) in self.columns.iter().zip(row) {
            let slot = match field {
                ImportField::FirstName => &mut form.first_name,
                ImportField::LastName => &mut form.last_name,
                ImportField::Email => &mut form.email,
                ImportField::Mobile => &mut form.mobile,
                ImportField::IdNumber => &mut form.id_number,
                ImportField::Category => &mut form.category,
            };
            slot.clone_from(cell);
        }
        form
    }

    /// Validates every row without touching storage.
    pub fn dry_run(&self, dataset: &Dataset, groups: &[i64]) -> ImportReport {
        let mut report = ImportReport::default();
        for (index, row) in dataset.rows.iter().enumerate() {
            match self.form_for(row).clean(groups) {
                Ok(contact) => report.contacts.push(contact),
                Err(errors) => report.errors.push(RowError {
                    // Sheet line number: the header is line 1.
                    line: index + 2,
                    errors,
                }),
            }
        }
        tracing::debug!(
            rows = dataset.len(),
            valid = report.contacts.len(),
            invalid = report.errors.len(),
            "Import dry run finished"
        );
        report
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub errors: FieldErrors,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub contacts: Vec<ContactInput>,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(rows: &[&[&str]]) -> Dataset {
        Dataset {
            headers: vec!["h".into(); 5],
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| (*c).to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_export_layout_maps_positionally() {
        let data = dataset(&[&["Jane", "Wanjiru", "jane@example.com", "0712345678", "3"]]);
        let report = ImportLayout::EXPORT.dry_run(&data, &[3]);
        assert!(!report.has_errors());
        let contact = &report.contacts[0];
        assert_eq!(contact.email, "jane@example.com");
        assert_eq!(contact.mobile, "0712345678");
        assert_eq!(contact.category_id, 3);
    }

    #[test]
    fn test_sheet_layout_reads_id_number() {
        let data = dataset(&[&["Jane", "Wanjiru", "0712345678", "28776123", "3"]]);
        let report = ImportLayout::SHEET.dry_run(&data, &[3]);
        assert_eq!(report.contacts[0].id_number.as_deref(), Some("28776123"));
        assert_eq!(report.contacts[0].email, "");
    }

    #[test]
    fn test_errors_carry_sheet_line_numbers() {
        let data = dataset(&[
            &["Jane", "Wanjiru", "jane@example.com", "0712345678", "3"],
            &["John", "Otieno", "john@example.com", "", "3"],
            &["Short"],
        ]);
        let report = ImportLayout::EXPORT.dry_run(&data, &[3]);
        assert!(report.has_errors());
        assert_eq!(report.contacts.len(), 1);
        let lines: Vec<usize> = report.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4]);
        assert!(report.errors[1].errors.has("category"));
    }
}
