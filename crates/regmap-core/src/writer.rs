//! Renders an [`OutputSheet`] to an `.xlsx` workbook

use crate::error::Result;
use crate::layout::{Align, CellStyle, ColNum, OutputSheet, RowNum};
use crate::table::CellValue;
use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, FormatPattern, Note, Table, TableColumn, TableStyle,
    Workbook, Worksheet,
};
use std::collections::HashMap;
use std::path::Path;

/// Convert a cell style to a writer format
pub fn to_format(style: &CellStyle) -> Format {
    let mut format = Format::new();
    if style.bold {
        format = format.set_bold();
    }
    if let Some(size) = style.font_size {
        format = format.set_font_size(size);
    }
    if let Some(fill) = style.fill {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(fill.rgb()));
    }
    if style.border {
        format = format.set_border(FormatBorder::Thin);
    }
    match style.align {
        Some(Align::Center) => {
            format = format
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter);
        }
        Some(Align::TopLeft) => {
            format = format
                .set_align(FormatAlign::Left)
                .set_align(FormatAlign::Top);
        }
        None => {}
    }
    format
}

/// Build a workbook holding the sheet
pub fn build_workbook(sheet: &OutputSheet) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&sheet.name)?;
    render_sheet(worksheet, sheet)?;
    Ok(workbook)
}

/// Write the sheet to an `.xlsx` file
pub fn write_workbook<P: AsRef<Path>>(sheet: &OutputSheet, path: P) -> Result<()> {
    let mut workbook = build_workbook(sheet)?;
    workbook.save(path.as_ref())?;
    tracing::info!(path = %path.as_ref().display(), "saved workbook");
    Ok(())
}

/// Write the sheet to an in-memory `.xlsx` file
pub fn write_to_buffer(sheet: &OutputSheet) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(sheet)?;
    Ok(workbook.save_to_buffer()?)
}

fn render_sheet(worksheet: &mut Worksheet, sheet: &OutputSheet) -> Result<()> {
    // Table headers are written by the table itself and must match its column names
    let mut table_headers: HashMap<(RowNum, ColNum), &str> = HashMap::new();
    for table in &sheet.tables {
        let columns: Vec<TableColumn> = table
            .headers
            .iter()
            .map(|h| TableColumn::new().set_header(h))
            .collect();
        let xlsx_table = Table::new()
            .set_name(&table.name)
            .set_style(TableStyle::Medium9)
            .set_banded_rows(true)
            .set_banded_columns(true)
            .set_columns(&columns);
        let r = table.range;
        worksheet.add_table(r.first_row, r.first_col, r.last_row, r.last_col, &xlsx_table)?;

        for (i, header) in table.headers.iter().enumerate() {
            table_headers.insert((r.first_row, r.first_col + i as ColNum), header.as_str());
        }
    }

    for range in &sheet.merges {
        let style = sheet
            .cell(range.first_row, range.first_col)
            .map(|c| c.style.clone())
            .unwrap_or_default();
        worksheet.merge_range(
            range.first_row,
            range.first_col,
            range.last_row,
            range.last_col,
            "",
            &to_format(&style),
        )?;
    }

    for (&(row, col), cell) in &sheet.cells {
        if sheet.is_hidden(row, col) {
            continue;
        }
        let format = to_format(&cell.style);

        if let Some(header) = table_headers.get(&(row, col)) {
            worksheet.write_string_with_format(row, col, *header, &format)?;
            continue;
        }

        match &cell.value {
            CellValue::Integer(i) => {
                worksheet.write_number_with_format(row, col, *i as f64, &format)?;
            }
            CellValue::Float(f) => {
                worksheet.write_number_with_format(row, col, *f, &format)?;
            }
            CellValue::String(s) if !s.is_empty() => {
                worksheet.write_string_with_format(row, col, s, &format)?;
            }
            _ if !cell.style.is_default() => {
                worksheet.write_blank(row, col, &format)?;
            }
            _ => {}
        }
    }

    for note in &sheet.notes {
        let xlsx_note = Note::new(&note.text)
            .add_author_prefix(false)
            .set_author(&note.author)
            .set_width(note.width)
            .set_height(note.height);
        worksheet.insert_note(note.row, note.col, &xlsx_note)?;
    }

    for (&col, &width) in &sheet.column_widths {
        worksheet.set_column_width(col, width)?;
    }
    for (&row, &height) in &sheet.row_heights {
        worksheet.set_row_height(row, height)?;
    }

    Ok(())
}
