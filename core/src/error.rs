use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Input file not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("Cannot parse {what}: {value:?}")]
    Parse { what: &'static str, value: String },

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TrackResult<T> = Result<T, TrackError>;
