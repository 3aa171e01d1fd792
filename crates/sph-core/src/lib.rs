mod dataset;
mod error;
mod export;
mod forms;
mod formset;
mod import;
mod validate;

pub use dataset::{Dataset, SheetFormat};
pub use error::{CoreError, Result};
pub use export::{write_contacts_csv, ExportRow, EXPORT_HEADER};
pub use forms::*;
pub use formset::{ContactFormset, ContactRow, FormsetErrors, FORMSET_PREFIX, MAX_FORMS};
pub use import::{ImportField, ImportLayout, ImportReport, RowError};
pub use validate::FieldErrors;
