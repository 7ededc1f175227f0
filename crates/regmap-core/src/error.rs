//! Error types for regmap-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in regmap-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input workbook could not be parsed
    #[error("failed to read workbook '{path}': {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },

    /// The output workbook could not be built or saved
    #[error("failed to write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// The workbook has no sheets
    #[error("workbook '{0}' contains no sheets")]
    EmptyWorkbook(PathBuf),

    /// A sheet referenced by name does not exist
    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    /// A selected source column lies outside the sheet
    #[error("column index {index} is out of range for sheet '{sheet}' ({width} columns)")]
    ColumnOutOfRange {
        sheet: String,
        index: i32,
        width: usize,
    },

    /// Keyed address mapping has no entry for a module
    #[error("no address entry for module '{0}'")]
    MissingAddress(String),

    /// A cell reference such as "AO256" could not be parsed
    #[error("invalid cell reference '{0}'")]
    InvalidCellRef(String),

    /// An override cannot be written where it points
    #[error("override of '{cell}' rejected: {reason}")]
    OverrideRejected { cell: String, reason: String },

    /// CSV writing error from the csv crate
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
