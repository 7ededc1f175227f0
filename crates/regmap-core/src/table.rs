//! Core grid types for representing a source register workbook

use calamine::Data;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

static EMPTY: CellValue = CellValue::Empty;

/// All sheets of an input workbook, in workbook order
#[derive(Debug, Clone)]
pub struct SourceWorkbook {
    /// Sheets in the order they appear in the file
    pub sheets: Vec<SourceSheet>,
    /// Source file path
    pub source_path: PathBuf,
}

impl SourceWorkbook {
    /// Create a new empty workbook
    pub fn new(source_path: PathBuf) -> Self {
        Self {
            sheets: Vec::new(),
            source_path,
        }
    }

    /// Find a sheet by name
    pub fn find_sheet(&self, name: &str) -> Option<&SourceSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Get all sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// A single worksheet: a dense grid of cells plus its merge regions.
///
/// Row 0 is the header row. Rows may be ragged; missing cells read as
/// [`CellValue::Empty`].
#[derive(Debug, Clone)]
pub struct SourceSheet {
    /// Sheet name
    pub name: String,
    /// Cell values, row-major
    pub rows: Vec<Vec<CellValue>>,
    /// Merged regions declared on the sheet
    pub merges: Vec<MergeRegion>,
}

impl SourceSheet {
    /// Create a new empty sheet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            merges: Vec::new(),
        }
    }

    /// Get the number of rows, header included
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns (widest row)
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Get a cell value; out-of-range positions are empty
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Header names from row 0, padded to the sheet width
    pub fn headers(&self) -> Vec<String> {
        (0..self.column_count())
            .map(|col| self.get(0, col).to_string_value())
            .collect()
    }

    /// Find a column by its header name
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.headers().iter().position(|h| h == name)
    }

    /// Find the merge region covering a cell, if any
    pub fn merge_at(&self, row: usize, col: usize) -> Option<&MergeRegion> {
        self.merges.iter().find(|m| m.contains(row, col))
    }

    /// Get the displayed value of a cell: the anchor value when the cell
    /// belongs to a merge region, the cell's own value otherwise
    pub fn resolved(&self, row: usize, col: usize) -> &CellValue {
        match self.merge_at(row, col) {
            Some(region) => self.get(region.first_row, region.first_col),
            None => self.get(row, col),
        }
    }
}

/// A rectangular merged region, inclusive on both corners (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRegion {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

impl MergeRegion {
    /// Create a new merge region
    pub fn new(first_row: usize, first_col: usize, last_row: usize, last_col: usize) -> Self {
        Self {
            first_row,
            first_col,
            last_row,
            last_col,
        }
    }

    /// Check whether a cell lies inside the region
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }
}

/// A cell value with type detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    String(String),
    /// Empty/null cell
    Empty,
}

impl CellValue {
    /// Build a string cell
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::String(s.into())
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Interpret the cell as an integer.
    ///
    /// Floats are truncated; strings are parsed after trimming.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            CellValue::Float(_) => None,
            CellValue::String(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().map(|f| f.trunc() as i64))
            }
            CellValue::Empty => None,
        }
    }

    /// Convert to a display string
    pub fn to_string_value(&self) -> String {
        match self {
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::String(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Empty => write!(f, ""),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::Int(i) => CellValue::Integer(*i),
            Data::Float(f) => CellValue::Float(*f),
            Data::String(s) if s.trim().is_empty() => CellValue::Empty,
            Data::String(s) => CellValue::String(s.clone()),
            Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
            other => CellValue::String(other.to_string()),
        }
    }
}
