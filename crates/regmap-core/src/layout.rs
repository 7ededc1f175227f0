//! In-memory model of the consolidated output sheet
//!
//! Everything the composer produces lands here first: values, styles, merge
//! ranges, notes, table objects and dimensions. The writer turns the finished
//! model into an `.xlsx` file.

use crate::table::CellValue;
use std::collections::BTreeMap;

/// 0-based output row
pub type RowNum = u32;
/// 0-based output column
pub type ColNum = u16;

/// Background fills used by the layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// A bit cell holding a field name, and the title bar
    Defined,
    /// A bit cell not covered by any field
    Unused,
}

impl Fill {
    /// RGB color of the fill
    pub fn rgb(self) -> u32 {
        match self {
            Fill::Defined => 0xADD8E6,
            Fill::Unused => 0xFFFF00,
        }
    }
}

/// Cell alignment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    /// Horizontally and vertically centered
    Center,
    /// Left, top
    TopLeft,
}

/// Visual style of one output cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStyle {
    pub bold: bool,
    pub font_size: Option<f64>,
    pub fill: Option<Fill>,
    pub border: bool,
    pub align: Option<Align>,
}

impl CellStyle {
    /// Whether nothing has been styled
    pub fn is_default(&self) -> bool {
        *self == CellStyle::default()
    }
}

/// A value plus its style
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputCell {
    pub value: CellValue,
    pub style: CellStyle,
}

/// An inclusive rectangular cell range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_row: RowNum,
    pub first_col: ColNum,
    pub last_row: RowNum,
    pub last_col: ColNum,
}

impl CellRange {
    /// Create a range; corners are normalized so first <= last
    pub fn new(first_row: RowNum, first_col: ColNum, last_row: RowNum, last_col: ColNum) -> Self {
        Self {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        }
    }

    /// A range within a single row
    pub fn row_span(row: RowNum, first_col: ColNum, last_col: ColNum) -> Self {
        Self::new(row, first_col, row, last_col)
    }

    pub fn contains(&self, row: RowNum, col: ColNum) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }

    /// A one-cell range cannot be merged
    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }
}

/// A note (comment) attached to a cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellNote {
    pub row: RowNum,
    pub col: ColNum,
    pub text: String,
    pub author: String,
    pub width: u32,
    pub height: u32,
}

/// A worksheet table object over a header row and its data rows
#[derive(Debug, Clone, PartialEq)]
pub struct TableObject {
    pub name: String,
    pub range: CellRange,
    /// Column headers, unique within the table
    pub headers: Vec<String>,
}

/// The consolidated output sheet
#[derive(Debug, Clone, Default)]
pub struct OutputSheet {
    pub name: String,
    pub cells: BTreeMap<(RowNum, ColNum), OutputCell>,
    pub merges: Vec<CellRange>,
    pub notes: Vec<CellNote>,
    pub tables: Vec<TableObject>,
    pub column_widths: BTreeMap<ColNum, f64>,
    pub row_heights: BTreeMap<RowNum, f64>,
}

impl OutputSheet {
    /// Create a new empty sheet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get a cell, if it has been touched
    pub fn cell(&self, row: RowNum, col: ColNum) -> Option<&OutputCell> {
        self.cells.get(&(row, col))
    }

    /// Get a cell value; untouched cells are empty
    pub fn value(&self, row: RowNum, col: ColNum) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells
            .get(&(row, col))
            .map(|c| &c.value)
            .unwrap_or(&EMPTY)
    }

    /// Whether a cell holds a non-empty value
    pub fn has_value(&self, row: RowNum, col: ColNum) -> bool {
        match self.value(row, col) {
            CellValue::Empty => false,
            CellValue::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Set a cell value, keeping its style
    pub fn set_value(&mut self, row: RowNum, col: ColNum, value: CellValue) {
        self.cells.entry((row, col)).or_default().value = value;
    }

    /// Get a mutable style for a cell, creating the cell if needed
    pub fn style_mut(&mut self, row: RowNum, col: ColNum) -> &mut CellStyle {
        &mut self.cells.entry((row, col)).or_default().style
    }

    /// Find the merge range covering a cell
    pub fn merge_at(&self, row: RowNum, col: ColNum) -> Option<&CellRange> {
        self.merges.iter().find(|m| m.contains(row, col))
    }

    /// Whether a cell is covered by a merge but is not its top-left anchor
    pub fn is_hidden(&self, row: RowNum, col: ColNum) -> bool {
        self.merge_at(row, col)
            .is_some_and(|m| (m.first_row, m.first_col) != (row, col))
    }

    /// Merge a range.
    ///
    /// Returns false (and records nothing) for single cells and for ranges
    /// overlapping an existing merge or table.
    pub fn merge(&mut self, range: CellRange) -> bool {
        if range.is_single_cell() {
            return false;
        }
        if self.merges.iter().any(|m| m.overlaps(&range))
            || self.tables.iter().any(|t| t.range.overlaps(&range))
        {
            tracing::trace!(?range, "skipping overlapping merge");
            return false;
        }
        self.merges.push(range);
        true
    }

    /// Attach a note to a cell, replacing any previous note there
    pub fn add_note(&mut self, note: CellNote) {
        self.notes.retain(|n| (n.row, n.col) != (note.row, note.col));
        self.notes.push(note);
    }

    /// Add a table object
    pub fn add_table(&mut self, table: TableObject) {
        self.tables.push(table);
    }

    /// Last used row, including merge ranges
    pub fn max_row(&self) -> Option<RowNum> {
        let cells = self.cells.keys().map(|&(r, _)| r);
        let merges = self.merges.iter().map(|m| m.last_row);
        cells.chain(merges).max()
    }

    /// Last used column, including merge ranges
    pub fn max_col(&self) -> Option<ColNum> {
        let cells = self.cells.keys().map(|&(_, c)| c);
        let merges = self.merges.iter().map(|m| m.last_col);
        cells.chain(merges).max()
    }

    /// Size every column to its longest value plus a margin of two
    pub fn autofit_columns(&mut self) {
        let Some(max_col) = self.max_col() else {
            return;
        };

        let mut longest: BTreeMap<ColNum, usize> = (0..=max_col).map(|c| (c, 0)).collect();
        for (&(_, col), cell) in &self.cells {
            let len = cell.value.to_string_value().chars().count();
            let entry = longest.entry(col).or_default();
            *entry = (*entry).max(len);
        }

        self.column_widths = longest
            .into_iter()
            .map(|(col, len)| (col, (len + 2) as f64))
            .collect();
    }

    /// Give every row up to the last used one the same height
    pub fn set_uniform_row_height(&mut self, height: f64) {
        if let Some(max_row) = self.max_row() {
            self.row_heights = (0..=max_row).map(|r| (r, height)).collect();
        }
    }
}
