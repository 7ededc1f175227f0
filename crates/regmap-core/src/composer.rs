//! Stacks register blocks onto the consolidated sheet

use crate::bitfield::{paint_fields, BitGrid, PaintSummary};
use crate::layout::{Align, CellRange, ColNum, Fill, OutputSheet, RowNum, TableObject};
use crate::shaper::RegisterBlock;
use crate::table::CellValue;
use serde::Serialize;
use std::collections::HashSet;

/// Leading columns covered by each block's table object
pub const TABLE_COLUMNS: ColNum = 4;
pub const TITLE_FONT_SIZE: f64 = 14.0;
pub const TABLE_NAME_PREFIX: &str = "Table";

/// Where a block ended up on the output sheet (0-based rows)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockPlacement {
    pub sheet: String,
    pub module: String,
    pub title_row: RowNum,
    pub heading_row: RowNum,
    pub last_row: RowNum,
    pub table: Option<String>,
    pub fields_painted: usize,
    pub fields_skipped: usize,
}

/// Builds the output sheet one block at a time
#[derive(Debug)]
pub struct Composer {
    sheet: OutputSheet,
    cursor: RowNum,
    table_counter: usize,
    merge_columns: Vec<ColNum>,
}

impl Composer {
    /// Start an empty sheet
    pub fn new(sheet_name: impl Into<String>, merge_columns: Vec<ColNum>) -> Self {
        Self {
            sheet: OutputSheet::new(sheet_name),
            cursor: 0,
            table_counter: 1,
            merge_columns,
        }
    }

    /// The sheet built so far
    pub fn sheet(&self) -> &OutputSheet {
        &self.sheet
    }

    /// Append a block two rows below the previous one
    pub fn append_block(&mut self, block: &RegisterBlock) -> BlockPlacement {
        self.cursor += 2;
        let heading_row = self.cursor + 1;
        let title_row = heading_row - 1;
        let data_rows = block.row_count() as RowNum;
        let last_row = heading_row + data_rows;
        let last_col = block.column_count().saturating_sub(1) as ColNum;

        write_block(&mut self.sheet, block, heading_row);

        let table = if data_rows > 0 {
            let name = format!("{}{}", TABLE_NAME_PREFIX, self.table_counter);
            self.table_counter += 1;
            let table_last_col = last_col.min(TABLE_COLUMNS - 1);
            self.sheet.add_table(TableObject {
                name: name.clone(),
                range: CellRange::new(heading_row, 0, last_row, table_last_col),
                headers: unique_headers(&block.headers[..=table_last_col as usize]),
            });
            Some(name)
        } else {
            tracing::warn!(module = %block.module, "module has no register rows, no table added");
            None
        };

        let grid = BitGrid {
            first_row: heading_row + 1,
            last_row,
            first_col: block.bit_column as ColNum,
        };
        let paint: PaintSummary = paint_fields(&mut self.sheet, &block.fields, &grid);

        insert_title(&mut self.sheet, &block.module, title_row, last_col);
        merge_adjacent_empty_cells(&mut self.sheet, heading_row, last_row, TABLE_COLUMNS, last_col);
        apply_border_and_alignment(&mut self.sheet, CellRange::new(heading_row, 0, last_row, last_col));
        apply_column_merges(&mut self.sheet, heading_row + 1, last_row, &self.merge_columns);

        self.cursor = heading_row + data_rows + 1;

        tracing::debug!(
            module = %block.module,
            title_row,
            last_row,
            painted = paint.painted,
            skipped = paint.skipped,
            "placed block"
        );

        BlockPlacement {
            sheet: block.sheet.clone(),
            module: block.module.clone(),
            title_row,
            heading_row,
            last_row,
            table,
            fields_painted: paint.painted,
            fields_skipped: paint.skipped,
        }
    }

    /// Size columns and rows and hand over the sheet
    pub fn finish(mut self, row_height: f64) -> OutputSheet {
        self.sheet.autofit_columns();
        self.sheet.set_uniform_row_height(row_height);
        self.sheet
    }
}

/// Write the header row and the data rows of a block
fn write_block(sheet: &mut OutputSheet, block: &RegisterBlock, heading_row: RowNum) {
    for (col, header) in block.headers.iter().enumerate() {
        let col = col as ColNum;
        sheet.set_value(heading_row, col, CellValue::text(header.as_str()));
        sheet.style_mut(heading_row, col).bold = true;
    }

    for (offset, values) in block.rows.iter().enumerate() {
        let row = heading_row + 1 + offset as RowNum;
        for (col, value) in values.iter().enumerate() {
            if !value.is_empty() {
                sheet.set_value(row, col as ColNum, value.clone());
            }
        }
    }
}

/// Table column names must be unique and non-empty
fn unique_headers(headers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let base = if header.trim().is_empty() {
                format!("Column{}", i + 1)
            } else {
                header.clone()
            };
            let mut name = base.clone();
            let mut n = 2;
            while !seen.insert(name.to_lowercase()) {
                name = format!("{}{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// Merge the title row across the block and write the module name into it
pub fn insert_title(sheet: &mut OutputSheet, module: &str, row: RowNum, last_col: ColNum) {
    sheet.merge(CellRange::row_span(row, 0, last_col));
    sheet.set_value(row, 0, CellValue::text(module));

    let style = sheet.style_mut(row, 0);
    style.bold = true;
    style.font_size = Some(TITLE_FONT_SIZE);
    style.fill = Some(Fill::Defined);
    style.align = Some(Align::TopLeft);
}

/// Merge runs of adjacent empty cells in each row between `first_col` and `last_col`.
///
/// Cells that already belong to a merge end a run, as do cells with a value.
pub fn merge_adjacent_empty_cells(
    sheet: &mut OutputSheet,
    first_row: RowNum,
    last_row: RowNum,
    first_col: ColNum,
    last_col: ColNum,
) -> usize {
    let mut merged = 0;
    if first_col > last_col {
        return merged;
    }

    for row in first_row..=last_row {
        let mut run_start: Option<ColNum> = None;
        for col in first_col..=last_col {
            let mergeable = !sheet.has_value(row, col) && sheet.merge_at(row, col).is_none();
            match (mergeable, run_start) {
                (true, None) => run_start = Some(col),
                (false, Some(start)) => {
                    if sheet.merge(CellRange::row_span(row, start, col - 1)) {
                        merged += 1;
                    }
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            if sheet.merge(CellRange::row_span(row, start, last_col)) {
                merged += 1;
            }
        }
    }
    merged
}

/// Thin border and centered text over a range
pub fn apply_border_and_alignment(sheet: &mut OutputSheet, range: CellRange) {
    for row in range.first_row..=range.last_row {
        for col in range.first_col..=range.last_col {
            let style = sheet.style_mut(row, col);
            style.border = true;
            style.align = Some(Align::Center);
        }
    }
}

/// Merge each listed column top to bottom over the block's data rows
pub fn apply_column_merges(sheet: &mut OutputSheet, first_row: RowNum, last_row: RowNum, columns: &[ColNum]) {
    if last_row <= first_row {
        return;
    }
    for &col in columns {
        if !sheet.merge(CellRange::new(first_row, col, last_row, col)) {
            tracing::debug!(col, first_row, last_row, "column merge skipped");
        }
    }
}
