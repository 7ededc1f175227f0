//! Literal cell overrides applied to the finished output sheet
//!
//! Overrides correct known-bad values in the consolidated sheet. They are
//! plain data (an A1 reference and a value) so a second input workbook only
//! needs a different configuration.

use crate::cellref::{cell_ref, parse_cell_ref};
use crate::error::{Error, Result};
use crate::layout::{ColNum, OutputSheet, RowNum};
use crate::table::CellValue;
use serde::{Deserialize, Serialize};

/// A single cell override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellOverride {
    /// A1 reference, e.g. "AO256"
    pub cell: String,
    /// Value written as text
    pub value: String,
}

impl CellOverride {
    /// Create a new override
    pub fn new(cell: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            cell: cell.into(),
            value: value.into(),
        }
    }

    /// Resolve the 0-based position of the target cell
    pub fn position(&self) -> Result<(RowNum, ColNum)> {
        parse_cell_ref(&self.cell)
    }
}

/// Apply overrides in order, returning how many were written.
///
/// A cell hidden under a merge is written to the merge's top-left cell. A
/// table header cell renames the table column, which must stay unique.
pub fn apply_overrides(sheet: &mut OutputSheet, overrides: &[CellOverride]) -> Result<usize> {
    let mut applied = 0;

    for over in overrides {
        let (row, col) = resolve_target(sheet, over)?;
        rename_table_header(sheet, over, row, col)?;

        let previous = sheet.value(row, col).to_string_value();
        sheet.set_value(row, col, CellValue::text(over.value.as_str()));
        tracing::debug!(cell = %cell_ref(row, col), %previous, value = %over.value, "applied override");
        applied += 1;
    }

    Ok(applied)
}

fn resolve_target(sheet: &OutputSheet, over: &CellOverride) -> Result<(RowNum, ColNum)> {
    let (row, col) = over.position()?;
    match sheet.merge_at(row, col) {
        Some(m) if (m.first_row, m.first_col) != (row, col) => {
            let anchor = (m.first_row, m.first_col);
            tracing::warn!(
                cell = %over.cell,
                anchor = %cell_ref(anchor.0, anchor.1),
                "override targets a merged cell, writing its anchor"
            );
            Ok(anchor)
        }
        _ => Ok((row, col)),
    }
}

fn rename_table_header(sheet: &mut OutputSheet, over: &CellOverride, row: RowNum, col: ColNum) -> Result<()> {
    let Some(table) = sheet
        .tables
        .iter_mut()
        .find(|t| t.range.first_row == row && t.range.contains(row, col))
    else {
        return Ok(());
    };

    let index = usize::from(col - table.range.first_col);
    let clash = table
        .headers
        .iter()
        .enumerate()
        .any(|(i, h)| i != index && h.eq_ignore_ascii_case(&over.value));
    if clash || over.value.trim().is_empty() {
        return Err(Error::OverrideRejected {
            cell: over.cell.clone(),
            reason: format!("'{}' is not a unique header for {}", over.value, table.name),
        });
    }

    if let Some(header) = table.headers.get_mut(index) {
        *header = over.value.clone();
    }
    Ok(())
}
