//! Column reshaper: turns a module's source rows into a register block

use crate::address::ModuleAddress;
use crate::bitfield::{read_bit_fields, BitField, REGISTER_BITS};
use crate::config::ConvertConfig;
use crate::error::{Error, Result};
use crate::locator::ModuleSpan;
use crate::table::{CellValue, SourceSheet};
use serde::{Deserialize, Serialize};

pub const REGISTER_SIZE_HEADER: &str = "Register Size in bytes";
pub const BASE_ADDRESS_HEADER: &str = "Base Address";
pub const SUBSYSTEM_BRIDGE_HEADER: &str = "Subsystem Bridge";
pub const TOP_BRIDGE_HEADER: &str = "Top Qsys HPS Bridge";
pub const ACTUAL_BASE_HEADER: &str =
    "Actual Base Address = Top Qsys HPS Bridge Base Address + Subsystem Base Address";

/// Position of the register size column in the shaped block
const SIZE_COLUMN_POSITION: usize = 2;

/// A module's rows after column selection, relabeling and tagging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterBlock {
    /// Sheet the module came from
    pub sheet: String,
    /// Module name
    pub module: String,
    /// Column headers
    pub headers: Vec<String>,
    /// One row per register
    pub rows: Vec<Vec<CellValue>>,
    /// Field list of the whole module span
    pub fields: Vec<BitField>,
    /// Index of the `b31` column
    pub bit_column: usize,
}

impl RegisterBlock {
    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of register rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by header name
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Values of one column, top to bottom
    pub fn column_values(&self, index: usize) -> Vec<&CellValue> {
        self.rows.iter().filter_map(|r| r.get(index)).collect()
    }
}

/// Placeholder headers for the bit columns, `b31` down to `b0`
pub fn bit_headers() -> Vec<String> {
    (0..REGISTER_BITS).rev().map(|b| format!("b{}", b)).collect()
}

/// Resolve a signed column index; negative values count back from the last column
pub fn resolve_column(index: i32, width: usize) -> Option<usize> {
    let resolved = if index < 0 {
        width.checked_sub(index.unsigned_abs() as usize)?
    } else {
        index as usize
    };
    (resolved < width).then_some(resolved)
}

/// Shape one module's rows into a register block
pub fn shape_module(
    sheet: &SourceSheet,
    span: &ModuleSpan,
    address: &ModuleAddress,
    config: &ConvertConfig,
) -> Result<RegisterBlock> {
    let width = sheet.column_count();
    let selected: Vec<usize> = config
        .selected_columns
        .iter()
        .map(|&index| {
            resolve_column(index, width).ok_or_else(|| Error::ColumnOutOfRange {
                sheet: sheet.name.clone(),
                index,
                width,
            })
        })
        .collect::<Result<_>>()?;

    let source_headers = sheet.headers();
    let mut headers: Vec<String> = selected.iter().map(|&c| source_headers[c].clone()).collect();
    let key_column = selected.get(config.key_column).copied();

    let mut rows: Vec<Vec<CellValue>> = (span.first..=span.last)
        .filter(|&row| key_column.map_or(true, |key| !sheet.get(row, key).is_empty()))
        .map(|row| selected.iter().map(|&c| sheet.get(row, c).clone()).collect())
        .collect();

    if let Some(offset_col) = headers.iter().position(|h| *h == config.address_offset_column) {
        for row in &mut rows {
            if let CellValue::String(s) = &row[offset_col] {
                row[offset_col] = CellValue::String(s.replace("0x", ""));
            }
        }
        headers[offset_col] = config.address_offset_label.clone();
    }

    for rename in &config.renames {
        for header in headers.iter_mut().filter(|h| **h == rename.from) {
            *header = rename.to.clone();
        }
    }

    let bit_position = config.bit_insert_position.min(headers.len());
    headers.splice(bit_position..bit_position, bit_headers());
    for row in &mut rows {
        row.splice(
            bit_position..bit_position,
            std::iter::repeat(CellValue::Empty).take(REGISTER_BITS as usize),
        );
    }

    let size_position = SIZE_COLUMN_POSITION.min(headers.len());
    headers.insert(size_position, REGISTER_SIZE_HEADER.to_string());
    for row in &mut rows {
        row.insert(size_position, CellValue::Integer(config.register_size_bytes));
    }
    let bit_column = if size_position <= bit_position {
        bit_position + 1
    } else {
        bit_position
    };

    let optional = |value: &Option<String>| {
        value
            .as_deref()
            .map(CellValue::text)
            .unwrap_or(CellValue::Empty)
    };
    let tags = [
        (BASE_ADDRESS_HEADER, optional(&address.base_address)),
        (SUBSYSTEM_BRIDGE_HEADER, CellValue::text(config.subsystem_bridge.as_str())),
        (TOP_BRIDGE_HEADER, CellValue::text(address.top_bridge(&span.name))),
        (ACTUAL_BASE_HEADER, optional(&address.actual_base_address)),
    ];
    for (header, value) in tags {
        headers.push(header.to_string());
        for row in &mut rows {
            row.push(value.clone());
        }
    }

    let fields = read_bit_fields(sheet, span, &config.field_columns);

    tracing::debug!(
        sheet = %sheet.name,
        module = %span.name,
        registers = rows.len(),
        fields = fields.len(),
        "shaped module"
    );

    Ok(RegisterBlock {
        sheet: sheet.name.clone(),
        module: span.name.clone(),
        headers,
        rows,
        fields,
        bit_column,
    })
}
