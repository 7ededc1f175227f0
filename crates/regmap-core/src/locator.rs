//! Module span locator: groups source rows into named register modules

use crate::table::{SourceSheet, SourceWorkbook};
use indexmap::IndexMap;
use serde::Serialize;

/// The rows of one module on a sheet, from the first to the last row carrying the name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSpan {
    /// Module name as displayed in the module column
    pub name: String,
    /// First row carrying the module name (0-based, header is row 0)
    pub first: usize,
    /// Last row carrying the module name
    pub last: usize,
}

impl ModuleSpan {
    /// Number of rows between first and last, inclusive
    pub fn row_count(&self) -> usize {
        self.last - self.first + 1
    }
}

/// Modules found on one sheet, in order of first appearance
#[derive(Debug, Clone, Serialize)]
pub struct SheetModules {
    pub sheet: String,
    pub modules: Vec<ModuleSpan>,
}

/// Result of locating modules across a workbook
#[derive(Debug, Clone, Serialize)]
pub struct ModuleIndex {
    /// Sheets in workbook order
    pub sheets: Vec<SheetModules>,
}

impl ModuleIndex {
    /// Find the modules of a sheet by name
    pub fn find_sheet(&self, name: &str) -> Option<&SheetModules> {
        self.sheets.iter().find(|s| s.sheet == name)
    }

    /// Get the total number of modules
    pub fn total_modules(&self) -> usize {
        self.sheets.iter().map(|s| s.modules.len()).sum()
    }

    /// Sheets in processing order (see [`processing_order`])
    pub fn ordered_sheets(&self) -> Vec<&SheetModules> {
        processing_order(&self.sheets)
    }
}

/// Resolve the module-name column of a sheet into `(row, name)` pairs.
///
/// Cells inside a merge region take the anchor's value. Blank names become
/// `None`. The header row is skipped.
pub fn normalize_module_column(sheet: &SourceSheet, column: usize) -> Vec<(usize, Option<String>)> {
    (1..sheet.row_count())
        .map(|row| {
            let name = sheet.resolved(row, column).to_string_value();
            let name = name.trim();
            (row, (!name.is_empty()).then(|| name.to_string()))
        })
        .collect()
}

/// Find the first and last row of every module on a sheet.
///
/// A module seen again after other modules extends its first span.
pub fn find_module_spans(sheet: &SourceSheet, column: usize) -> Vec<ModuleSpan> {
    let mut spans: IndexMap<String, ModuleSpan> = IndexMap::new();

    for (row, name) in normalize_module_column(sheet, column) {
        let Some(name) = name else {
            continue;
        };

        spans
            .entry(name.clone())
            .and_modify(|span| span.last = row)
            .or_insert(ModuleSpan {
                name,
                first: row,
                last: row,
            });
    }

    spans.into_values().collect()
}

/// Locate modules on every sheet of a workbook
pub fn locate_modules(workbook: &SourceWorkbook, column: usize) -> ModuleIndex {
    let sheets = workbook
        .sheets
        .iter()
        .map(|sheet| SheetModules {
            sheet: sheet.name.clone(),
            modules: find_module_spans(sheet, column),
        })
        .collect();

    ModuleIndex { sheets }
}

/// Order items as: first, last, then everything in between
pub fn processing_order<T>(items: &[T]) -> Vec<&T> {
    match items {
        [] => Vec::new(),
        [only] => vec![only],
        [first, middle @ .., last] => {
            let mut ordered = vec![first, last];
            ordered.extend(middle);
            ordered
        }
    }
}
