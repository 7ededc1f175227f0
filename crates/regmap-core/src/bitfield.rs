//! Bit-field painter
//!
//! Lays register fields out over 32 bit columns, bit 31 leftmost and bit 0
//! rightmost. Fields arrive as one flat list per module; a field at offset 0
//! that is not the first field starts the next register row.

use crate::config::FieldColumns;
use crate::layout::{CellNote, CellRange, ColNum, Fill, OutputSheet, RowNum};
use crate::locator::ModuleSpan;
use crate::table::{CellValue, SourceSheet};
use serde::{Deserialize, Serialize};

/// Number of bits in a register
pub const REGISTER_BITS: u16 = 32;

pub const NOTE_AUTHOR: &str = "Author";
pub const NOTE_WIDTH: u32 = 500;
pub const NOTE_HEIGHT: u32 = 100;

/// One field row from the source sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitField {
    pub offset: Option<i64>,
    pub width: Option<i64>,
    pub name: String,
    pub access: String,
    pub description: String,
}

impl BitField {
    /// Create a field with the given position and name
    pub fn new(offset: i64, width: i64, name: impl Into<String>) -> Self {
        Self {
            offset: Some(offset),
            width: Some(width),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Text of the note attached to the field cell, if there is anything to say
    pub fn note_text(&self) -> Option<String> {
        if self.access.is_empty() && self.description.is_empty() {
            return None;
        }
        Some(format!(
            "Bit permission: {}\nBit Description:\n{}",
            self.access, self.description
        ))
    }
}

/// Read the field list of a module from every row of its span.
///
/// Missing columns read as absent values, which leaves the module without
/// fields rather than failing.
pub fn read_bit_fields(sheet: &SourceSheet, span: &ModuleSpan, columns: &FieldColumns) -> Vec<BitField> {
    let offset_col = sheet.find_column(&columns.offset);
    let width_col = sheet.find_column(&columns.width);
    let name_col = sheet.find_column(&columns.name);
    let access_col = sheet.find_column(&columns.access);
    let description_col = sheet.find_column(&columns.description);

    let read = |row: usize, col: Option<usize>| {
        col.map(|c| sheet.get(row, c).clone()).unwrap_or_default()
    };

    (span.first..=span.last)
        .map(|row| BitField {
            offset: read(row, offset_col).as_int(),
            width: read(row, width_col).as_int(),
            name: read(row, name_col).to_string_value(),
            access: read(row, access_col).to_string_value(),
            description: read(row, description_col).to_string_value(),
        })
        .collect()
}

/// The bit columns and data rows of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitGrid {
    /// First data row
    pub first_row: RowNum,
    /// Last data row
    pub last_row: RowNum,
    /// Column of bit 31
    pub first_col: ColNum,
}

impl BitGrid {
    /// Column of bit 0
    pub fn end_col(&self) -> ColNum {
        self.first_col + REGISTER_BITS - 1
    }

    /// Column holding a given bit
    pub fn column_of(&self, bit: u16) -> ColNum {
        self.end_col() - bit
    }

    /// Columns spanned by a field, leftmost first.
    ///
    /// The range runs from the field's highest bit to `offset`. Widths that
    /// reach past bit 31 are clamped to bit 31.
    pub fn field_columns(&self, offset: u16, width: Option<i64>) -> (ColNum, ColNum) {
        let right = self.column_of(offset);
        let extra = width.filter(|w| *w > 1).map(|w| w - 1).unwrap_or(0);
        let left = i64::from(right) - extra;
        let left = left.max(i64::from(self.first_col)) as ColNum;
        (left, right)
    }
}

/// What happened while painting a block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaintSummary {
    /// Fields written into the grid
    pub painted: usize,
    /// Fields skipped for a missing or out-of-range offset, or for lack of rows
    pub skipped: usize,
    /// Register rows used (1 + number of row advances)
    pub rows_used: u32,
}

/// Paint a module's fields into its bit grid, then fill the leftover bit cells
pub fn paint_fields(sheet: &mut OutputSheet, fields: &[BitField], grid: &BitGrid) -> PaintSummary {
    let mut summary = PaintSummary::default();
    if grid.last_row < grid.first_row {
        summary.skipped = fields.iter().filter(|f| f.offset.is_some()).count();
        return summary;
    }

    let mut row = grid.first_row;
    let mut seen_field = false;
    summary.rows_used = 1;

    for field in fields {
        let Some(offset) = field.offset else {
            continue;
        };
        let first = !seen_field;
        seen_field = true;

        if !(0..i64::from(REGISTER_BITS)).contains(&offset) {
            tracing::debug!(field = %field.name, offset, "offset outside register, skipping");
            summary.skipped += 1;
            continue;
        }
        let offset = offset as u16;

        if offset == 0 && !first {
            row += 1;
            summary.rows_used += 1;
        }
        if row > grid.last_row {
            tracing::warn!(
                field = %field.name,
                row,
                last_row = grid.last_row,
                "field starts a register past the block, skipping"
            );
            summary.skipped += 1;
            continue;
        }

        let (left, right) = grid.field_columns(offset, field.width);
        if let Some(width) = field.width {
            if i64::from(right - left) + 1 < width {
                tracing::warn!(field = %field.name, offset, width, "field wider than register, clamped to bit 31");
            }
        }

        sheet.merge(CellRange::row_span(row, left, right));
        sheet.set_value(row, left, CellValue::text(field.name.as_str()));
        sheet.style_mut(row, left).fill = Some(Fill::Defined);

        if let Some(text) = field.note_text() {
            sheet.add_note(CellNote {
                row,
                col: left,
                text,
                author: NOTE_AUTHOR.to_string(),
                width: NOTE_WIDTH,
                height: NOTE_HEIGHT,
            });
        }
        summary.painted += 1;
    }

    fill_bit_cells(sheet, grid);
    summary
}

/// Color every bit cell of the grid: defined if it holds a value, unused if
/// it holds nothing and has no fill yet
pub fn fill_bit_cells(sheet: &mut OutputSheet, grid: &BitGrid) {
    for row in grid.first_row..=grid.last_row {
        for col in grid.first_col..=grid.end_col() {
            if sheet.has_value(row, col) {
                sheet.style_mut(row, col).fill = Some(Fill::Defined);
            } else {
                let style = sheet.style_mut(row, col);
                if style.fill.is_none() {
                    style.fill = Some(Fill::Unused);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: u32) -> BitGrid {
        BitGrid {
            first_row: 4,
            last_row: 4 + rows - 1,
            first_col: 4,
        }
    }

    fn fill_at(sheet: &OutputSheet, row: RowNum, col: ColNum) -> Option<Fill> {
        sheet.cell(row, col).and_then(|c| c.style.fill)
    }

    #[test]
    fn test_bit_column_mapping() {
        let g = grid(1);
        assert_eq!(g.end_col(), 35);
        assert_eq!(g.column_of(0), 35);
        assert_eq!(g.column_of(31), 4);
    }

    #[test]
    fn test_field_offset_5_width_3_covers_bits_5_to_7() {
        let g = grid(1);
        assert_eq!(g.field_columns(5, Some(3)), (g.end_col() - 7, g.end_col() - 5));

        let mut sheet = OutputSheet::new("s");
        paint_fields(&mut sheet, &[BitField::new(5, 3, "MODE")], &g);

        assert_eq!(sheet.value(4, g.column_of(7)), &CellValue::text("MODE"));
        assert_eq!(sheet.merges, vec![CellRange::row_span(4, g.column_of(7), g.column_of(5))]);
    }

    #[test]
    fn test_missing_width_is_single_bit() {
        let g = grid(1);
        assert_eq!(g.field_columns(3, None), (g.column_of(3), g.column_of(3)));
        assert_eq!(g.field_columns(3, Some(0)), (g.column_of(3), g.column_of(3)));
    }

    #[test]
    fn test_width_clamped_to_bit_31() {
        let g = grid(1);
        assert_eq!(g.field_columns(30, Some(8)), (g.first_col, g.column_of(30)));
    }

    #[test]
    fn test_offset_zero_starts_new_register_row() {
        // Two full registers: 31..0 in 8-bit fields, twice
        let mut fields = Vec::new();
        for reg in 0..2 {
            for offset in [24, 16, 8, 0] {
                fields.push(BitField::new(offset, 8, format!("R{}_{}", reg, offset)));
            }
        }
        // Registers list their fields from bit 0 upwards in the source
        fields[0..4].reverse();
        fields[4..8].reverse();

        let g = grid(2);
        let mut sheet = OutputSheet::new("s");
        let summary = paint_fields(&mut sheet, &fields, &g);

        assert_eq!(summary.rows_used, 2);
        assert_eq!(summary.painted, 8);
        assert_eq!(sheet.value(4, g.column_of(31)), &CellValue::text("R0_24"));
        assert_eq!(sheet.value(5, g.column_of(7)), &CellValue::text("R1_0"));
        assert_eq!(sheet.merges.len(), 8);
    }

    #[test]
    fn test_first_field_at_offset_zero_stays_on_first_row() {
        let g = grid(1);
        let mut sheet = OutputSheet::new("s");
        let summary = paint_fields(&mut sheet, &[BitField::new(0, 32, "CTRL")], &g);

        assert_eq!(summary.rows_used, 1);
        assert_eq!(sheet.value(4, g.first_col), &CellValue::text("CTRL"));
        assert_eq!(sheet.merges, vec![CellRange::row_span(4, 4, 35)]);
    }

    #[test]
    fn test_absent_and_out_of_range_offsets() {
        let g = grid(1);
        let fields = vec![
            BitField { name: "NO_OFFSET".into(), ..Default::default() },
            BitField::new(40, 1, "TOO_HIGH"),
            BitField::new(0, 1, "LOW"),
        ];
        let mut sheet = OutputSheet::new("s");
        let summary = paint_fields(&mut sheet, &fields, &grid(2));

        // TOO_HIGH counts as the first field, so LOW starts the second row
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.rows_used, 2);
        assert_eq!(sheet.value(5, g.column_of(0)), &CellValue::text("LOW"));
    }

    #[test]
    fn test_fields_past_block_are_dropped() {
        let g = grid(1);
        let fields = vec![BitField::new(0, 1, "A"), BitField::new(0, 1, "B")];
        let mut sheet = OutputSheet::new("s");
        let summary = paint_fields(&mut sheet, &fields, &g);

        assert_eq!(summary.painted, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!sheet.has_value(5, g.column_of(0)));
    }

    #[test]
    fn test_unused_bits_get_unused_fill() {
        let g = grid(1);
        let mut sheet = OutputSheet::new("s");
        paint_fields(&mut sheet, &[BitField::new(4, 4, "NIBBLE")], &g);

        assert_eq!(fill_at(&sheet, 4, g.column_of(7)), Some(Fill::Defined));
        assert_eq!(fill_at(&sheet, 4, g.column_of(3)), Some(Fill::Unused));
        assert_eq!(fill_at(&sheet, 4, g.column_of(31)), Some(Fill::Unused));
        // Cells hidden under the field's merge keep the unused fill
        assert_eq!(fill_at(&sheet, 4, g.column_of(5)), Some(Fill::Unused));
    }

    #[test]
    fn test_note_text() {
        let mut field = BitField::new(0, 1, "EN");
        assert_eq!(field.note_text(), None);

        field.access = "RW".into();
        field.description = "Enable".into();
        assert_eq!(
            field.note_text().unwrap(),
            "Bit permission: RW\nBit Description:\nEnable"
        );

        let mut sheet = OutputSheet::new("s");
        paint_fields(&mut sheet, &[field], &grid(1));
        assert_eq!(sheet.notes.len(), 1);
        assert_eq!(sheet.notes[0].author, NOTE_AUTHOR);
        assert_eq!((sheet.notes[0].width, sheet.notes[0].height), (500, 100));
    }

    #[test]
    fn test_read_bit_fields_missing_columns() {
        let mut sheet = SourceSheet::new("Regs");
        sheet.rows = vec![
            vec![CellValue::text("Module Name"), CellValue::text("Bit Offset")],
            vec![CellValue::text("UART"), CellValue::Float(3.0)],
            vec![CellValue::text("UART"), CellValue::Empty],
        ];
        let span = ModuleSpan { name: "UART".into(), first: 1, last: 2 };

        let fields = read_bit_fields(&sheet, &span, &FieldColumns::default());
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].offset, Some(3));
        assert_eq!(fields[0].width, None);
        assert_eq!(fields[0].name, "");
        assert_eq!(fields[1].offset, None);
    }
}
