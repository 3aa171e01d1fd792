use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::error::{CoreError, Result};

/// OLE Compound Document magic bytes (legacy .xls)
const OLE_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];
/// ZIP archive magic bytes (.xlsx, .xlsm, .xlsb, .ods)
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Workbook,
}

impl SheetFormat {
    /// Magic bytes win over the filename; anything unrecognised is CSV.
    pub fn detect(bytes: &[u8], filename: Option<&str>) -> Self {
        if bytes.starts_with(&OLE_MAGIC) || bytes.starts_with(&ZIP_MAGIC) {
            return Self::Workbook;
        }
        let ext = filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        match ext.as_deref() {
            Some("xls" | "xlsx" | "xlsm" | "xlsb" | "ods") => Self::Workbook,
            _ => Self::Csv,
        }
    }
}

/// A header row plus data rows, every cell rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn load(bytes: &[u8], filename: Option<&str>) -> Result<Self> {
        let format = SheetFormat::detect(bytes, filename);
        tracing::debug!(?format, size = bytes.len(), "Loading dataset");
        match format {
            SheetFormat::Csv => Self::from_csv(bytes),
            SheetFormat::Workbook => Self::from_workbook(bytes),
        }
    }

    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut lines = Vec::new();
        for record in reader.records() {
            let record = record?;
            lines.push(record.iter().map(|cell| cell.trim().to_string()).collect());
        }
        Self::from_lines(lines)
    }

    /// Reads the first worksheet of an Excel or OpenDocument workbook.
    pub fn from_workbook(bytes: &[u8]) -> Result<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(CoreError::NoWorksheet)??;

        let lines = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        Self::from_lines(lines)
    }

    fn from_lines(lines: Vec<Vec<String>>) -> Result<Self> {
        let mut lines = lines
            .into_iter()
            .filter(|line| line.iter().any(|cell| !cell.is_empty()));
        let headers = lines.next().ok_or(CoreError::EmptyDataset)?;
        Ok(Self {
            headers,
            rows: lines.collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        // Phone numbers typed into a sheet usually come back as floats.
        Data::Float(f) if f.fract() == 0.0 => format!("{f:.0}"),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::Error(e) => format!("#ERROR: {e:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(SheetFormat::detect(b"a,b\n1,2", None), SheetFormat::Csv);
        assert_eq!(SheetFormat::detect(b"a,b", Some("people.CSV")), SheetFormat::Csv);
        assert_eq!(SheetFormat::detect(b"", Some("people.xlsx")), SheetFormat::Workbook);
        assert_eq!(
            SheetFormat::detect(&[0x50, 0x4B, 0x03, 0x04, 0x00], Some("people.csv")),
            SheetFormat::Workbook
        );
    }

    #[test]
    fn test_csv_skips_blank_lines_and_bom() {
        let data = "\u{feff}first_name,last_name,mobile\nJane,Wanjiru,0712345678\n,,\nJohn,\"Otieno, Jr\",0722000111\n";
        let dataset = Dataset::load(data.as_bytes(), Some("contacts.csv")).unwrap();
        assert_eq!(dataset.headers, vec!["first_name", "last_name", "mobile"]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows[1][1], "Otieno, Jr");
    }

    #[test]
    fn test_csv_ragged_rows_are_kept() {
        let dataset = Dataset::from_csv(b"a,b,c\n1\n1,2,3,4\n").unwrap();
        assert_eq!(dataset.rows, vec![vec!["1".to_string()], vec!["1".into(), "2".into(), "3".into(), "4".into()]]);
    }

    #[test]
    fn test_empty_upload_is_an_error() {
        assert!(matches!(Dataset::from_csv(b""), Err(CoreError::EmptyDataset)));
        assert!(matches!(Dataset::from_csv(b"\n\n"), Err(CoreError::EmptyDataset)));
    }

    #[test]
    fn test_garbage_workbook_is_an_error() {
        let bytes = [0x50, 0x4B, 0x03, 0x04, 0x01, 0x02, 0x03];
        assert!(Dataset::load(&bytes, None).is_err());
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Float(254_712_345_678.0)), "254712345678");
        assert_eq!(cell_to_string(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_to_string(&Data::Int(3)), "3");
        assert_eq!(cell_to_string(&Data::String(" Jane ".into())), "Jane");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }
}
