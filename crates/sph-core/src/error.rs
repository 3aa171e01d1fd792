use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset has no header row")]
    EmptyDataset,

    #[error("Workbook has no worksheets")]
    NoWorksheet,
}

pub type Result<T> = std::result::Result<T, CoreError>;
