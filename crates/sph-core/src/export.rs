use std::io::Write;

use crate::error::{CoreError, Result};

pub const EXPORT_HEADER: [&str; 5] = ["first_name", "last_name", "email", "mobile", "category"];

/// One exported contact. `category` is the raw group id, not its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRow<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub mobile: &'a str,
    pub category: i64,
}

/// Writes the header and one record per row, returning the inner writer.
pub fn write_contacts_csv<'a, W, I>(out: W, rows: I) -> Result<W>
where
    W: Write,
    I: IntoIterator<Item = ExportRow<'a>>,
{
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(EXPORT_HEADER)?;
    let mut count = 0usize;
    for row in rows {
        let category = row.category.to_string();
        writer.write_record([
            row.first_name,
            row.last_name,
            row.email,
            row.mobile,
            category.as_str(),
        ])?;
        count += 1;
    }
    tracing::debug!(count, "Contacts written as CSV");
    writer
        .into_inner()
        .map_err(|e| CoreError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_only_when_empty() {
        let out = write_contacts_csv(Vec::new(), std::iter::empty()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "first_name,last_name,email,mobile,category\n");
    }

    #[test]
    fn test_rows_are_quoted_when_needed() {
        let rows = [
            ExportRow {
                first_name: "Jane",
                last_name: "Wanjiru",
                email: "jane@example.com",
                mobile: "0712345678",
                category: 3,
            },
            ExportRow {
                first_name: "John",
                last_name: "Otieno, Jr",
                email: "",
                mobile: "+254722000111",
                category: 12,
            },
        ];
        let out = String::from_utf8(write_contacts_csv(Vec::new(), rows).unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "Jane,Wanjiru,jane@example.com,0712345678,3");
        assert_eq!(lines[2], "John,\"Otieno, Jr\",,+254722000111,12");
    }
}
