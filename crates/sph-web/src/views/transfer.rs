use std::fmt::Write;

use axum::response::Html;
use sph_core::{ImportLayout, RowError};

use super::{Page, escape, layout};

fn column_names(layout: ImportLayout) -> String {
    layout
        .columns()
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn upload_form(action: &str, field: &str, columns: ImportLayout) -> String {
    format!(
        r#"<p>Accepted formats: CSV, XLS, XLSX, ODS. The first row is a header; columns are read in this order: {columns}.</p>
<form method="post" action="{action}" enctype="multipart/form-data">
<input type="file" name="{field}">
<button type="submit">Upload</button>
</form>"#,
        columns = escape(&column_names(columns)),
    )
}

pub fn import_form(page: &Page) -> Html<String> {
    layout(
        page,
        "Import sheet",
        &upload_form("/contacts/import", "file", ImportLayout::SHEET),
    )
}

/// Result of a posted upload.
#[derive(Debug, Clone)]
pub enum UploadOutcome {
    Imported(usize),
    Rejected(Vec<RowError>),
    Failed(String),
}

pub fn upload(page: &Page, outcome: Option<&UploadOutcome>) -> Html<String> {
    let mut body = String::new();
    match outcome {
        Some(UploadOutcome::Imported(count)) => {
            let _ = write!(body, r#"<p class="flash flash-success">Imported {count} contact(s).</p>"#);
        }
        Some(UploadOutcome::Rejected(errors)) => {
            body.push_str(r#"<div class="flash flash-error"><p>Nothing was imported. Fix these rows and upload again:</p><ul>"#);
            for row in errors {
                let _ = write!(
                    body,
                    "<li>Line {}: {}</li>",
                    row.line,
                    escape(&row.errors.to_string())
                );
            }
            body.push_str("</ul></div>");
        }
        Some(UploadOutcome::Failed(reason)) => {
            let _ = write!(
                body,
                r#"<p class="flash flash-error">Upload failed: {}</p>"#,
                escape(reason)
            );
        }
        None => {}
    }
    body.push_str(&upload_form("/contacts/upload", "myfile", ImportLayout::EXPORT));
    layout(page, "Upload contacts", &body)
}
