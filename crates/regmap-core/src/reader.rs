//! Workbook reader for register-map `.xlsx` files

use crate::error::{Error, Result};
use crate::table::{CellValue, MergeRegion, SourceSheet, SourceWorkbook};
use calamine::{Reader, Xlsx};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

/// Load every sheet of an `.xlsx` file into memory
pub fn load_workbook<P: AsRef<Path>>(path: P) -> Result<SourceWorkbook> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    read_workbook(BufReader::new(file), path)
}

/// Load a workbook from an in-memory buffer (useful for testing)
pub fn load_workbook_bytes(bytes: &[u8], source_name: &str) -> Result<SourceWorkbook> {
    read_workbook(Cursor::new(bytes), Path::new(source_name))
}

fn read_workbook<RS: Read + Seek>(reader: RS, path: &Path) -> Result<SourceWorkbook> {
    let workbook_error = |source| Error::Workbook {
        path: path.to_path_buf(),
        source,
    };

    let mut xlsx: Xlsx<RS> = Xlsx::new(reader).map_err(workbook_error)?;
    xlsx.load_merged_regions().map_err(workbook_error)?;

    let sheet_names = xlsx.sheet_names().to_owned();
    if sheet_names.is_empty() {
        return Err(Error::EmptyWorkbook(path.to_path_buf()));
    }

    let mut out = SourceWorkbook::new(path.to_path_buf());

    for sheet_name in sheet_names {
        let mut sheet = SourceSheet::new(sheet_name.clone());

        sheet.merges = xlsx
            .merged_regions_by_sheet(&sheet_name)
            .into_iter()
            .map(|(_, _, dim)| {
                MergeRegion::new(
                    dim.start.0 as usize,
                    dim.start.1 as usize,
                    dim.end.0 as usize,
                    dim.end.1 as usize,
                )
            })
            .collect();

        let range = xlsx.worksheet_range(&sheet_name).map_err(workbook_error)?;

        // Range positions are absolute; cells before `start()` read as empty.
        if let Some((last_row, last_col)) = range.end() {
            for row in 0..=last_row {
                let cells: Vec<CellValue> = (0..=last_col)
                    .map(|col| {
                        range
                            .get_value((row, col))
                            .map(CellValue::from)
                            .unwrap_or(CellValue::Empty)
                    })
                    .collect();
                sheet.rows.push(cells);
            }
        }

        tracing::debug!(
            sheet = %sheet.name,
            rows = sheet.row_count(),
            merges = sheet.merges.len(),
            "loaded sheet"
        );
        out.sheets.push(sheet);
    }

    Ok(out)
}
