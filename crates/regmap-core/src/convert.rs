//! End-to-end conversion: source workbook in, consolidated sheet out

use crate::address::AddressBook;
use crate::composer::{BlockPlacement, Composer};
use crate::config::ConvertConfig;
use crate::error::{Error, Result};
use crate::layout::OutputSheet;
use crate::locator::{locate_modules, processing_order};
use crate::patch::apply_overrides;
use crate::reader::load_workbook;
use crate::shaper::{shape_module, RegisterBlock};
use crate::table::SourceWorkbook;
use crate::writer::write_workbook;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Summary of a conversion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvertReport {
    /// Input file stem
    pub heading: String,
    /// Sheets in processing order
    pub sheets: Vec<String>,
    /// One entry per placed module block
    pub blocks: Vec<BlockPlacement>,
    /// Number of cell overrides written
    pub overrides_applied: usize,
    /// Where the workbook was saved, if it was
    pub output: Option<PathBuf>,
}

impl ConvertReport {
    /// Get the number of tables created
    pub fn table_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.table.is_some()).count()
    }

    /// Get the number of fields that could not be placed
    pub fn fields_skipped(&self) -> usize {
        self.blocks.iter().map(|b| b.fields_skipped).sum()
    }
}

/// The input file's stem, used as the run's heading
pub fn extract_heading(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<dir>/<stem>_combined.xlsx` next to the input
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_file_name(format!("{}_combined.xlsx", extract_heading(input)))
}

/// Shape every module of the workbook, in processing order.
///
/// A keyed address mapping is checked against all modules before any block
/// is shaped.
pub fn shape_workbook(workbook: &SourceWorkbook, config: &ConvertConfig) -> Result<Vec<RegisterBlock>> {
    let index = locate_modules(workbook, config.module_column);
    let ordered = index.ordered_sheets();

    let mut addresses = AddressBook::new(&config.addresses);
    addresses.validate(
        ordered
            .iter()
            .flat_map(|s| s.modules.iter().map(|m| m.name.as_str())),
    )?;

    let mut blocks = Vec::with_capacity(index.total_modules());
    for modules in ordered {
        let sheet = workbook
            .find_sheet(&modules.sheet)
            .ok_or_else(|| Error::SheetNotFound(modules.sheet.clone()))?;

        tracing::info!(sheet = %sheet.name, modules = modules.modules.len(), "processing sheet");

        for span in &modules.modules {
            let address = addresses.next_for(&span.name)?;
            blocks.push(shape_module(sheet, span, &address, config)?);
        }
    }

    Ok(blocks)
}

/// Build the consolidated sheet from a loaded workbook
pub fn compose_workbook(workbook: &SourceWorkbook, config: &ConvertConfig) -> Result<(OutputSheet, ConvertReport)> {
    let blocks = shape_workbook(workbook, config)?;

    let mut composer = Composer::new(config.sheet_name.as_str(), config.merge_column_indices()?);
    let placements: Vec<BlockPlacement> = blocks.iter().map(|b| composer.append_block(b)).collect();

    let mut sheet = composer.finish(config.row_height);
    let overrides_applied = apply_overrides(&mut sheet, &config.overrides)?;

    let report = ConvertReport {
        heading: extract_heading(&workbook.source_path),
        sheets: processing_order(&workbook.sheet_names())
            .into_iter()
            .map(|s| s.to_string())
            .collect(),
        blocks: placements,
        overrides_applied,
        output: None,
    };

    Ok((sheet, report))
}

/// Read `input`, consolidate it and save the result to `output`
pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    config: &ConvertConfig,
) -> Result<ConvertReport> {
    let workbook = load_workbook(input.as_ref())?;
    let (sheet, mut report) = compose_workbook(&workbook, config)?;

    write_workbook(&sheet, output.as_ref())?;
    report.output = Some(output.as_ref().to_path_buf());

    tracing::info!(
        input = %input.as_ref().display(),
        blocks = report.blocks.len(),
        tables = report.table_count(),
        "conversion finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::ModuleAddress;
    use crate::layout::{CellRange, Fill};
    use crate::patch::CellOverride;
    use crate::reader::load_workbook_bytes;
    use crate::table::{CellValue, SourceSheet};
    use crate::writer::write_to_buffer;

    const HEADERS: [&str; 11] = [
        "No",
        "Module Name",
        "Register Name",
        "Address Offset",
        "Reset Value",
        "Field Name",
        "Bit Offset",
        "Access",
        "Bit Width",
        "Field Description",
        "Register Description",
    ];

    fn cell(s: &str) -> CellValue {
        if s.is_empty() {
            CellValue::Empty
        } else if let Ok(i) = s.parse::<i64>() {
            CellValue::Integer(i)
        } else {
            CellValue::text(s)
        }
    }

    fn register(module: &str, name: &str, offset: &str, field: [&str; 5]) -> Vec<CellValue> {
        let [field_name, bit_offset, access, width, description] = field;
        vec![
            CellValue::Empty,
            cell(module),
            cell(name),
            cell(offset),
            cell("0"),
            cell(field_name),
            cell(bit_offset),
            cell(access),
            cell(width),
            cell(description),
            cell(name),
        ]
    }

    /// Module A on rows 3-5 with one full-width field, module B on rows 7-9 without fields
    fn two_module_sheet(name: &str) -> SourceSheet {
        let no_field = ["", "", "", "", ""];
        let mut sheet = SourceSheet::new(name);
        sheet.rows = vec![
            HEADERS.iter().map(|h| CellValue::text(*h)).collect(),
            vec![CellValue::Empty; 11],
            register("A", "CTRL", "0x0000", ["CTRL", "0", "RW", "32", "Control"]),
            register("A", "STATUS", "0x0004", no_field),
            register("A", "DATA", "0x0008", no_field),
            vec![CellValue::Empty; 11],
            register("B", "R0", "0x0000", no_field),
            register("B", "R1", "0x0004", no_field),
            register("B", "R2", "0x0008", no_field),
        ];
        sheet
    }

    fn workbook(sheets: Vec<SourceSheet>) -> SourceWorkbook {
        let mut workbook = SourceWorkbook::new(PathBuf::from("/data/registers.xlsx"));
        workbook.sheets = sheets;
        workbook
    }

    fn config() -> ConvertConfig {
        ConvertConfig {
            overrides: vec![],
            ..Default::default()
        }
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/registers.xlsx")),
            PathBuf::from("/data/registers_combined.xlsx")
        );
        assert_eq!(extract_heading(Path::new("regs.v2.xlsx")), "regs.v2");
    }

    #[test]
    fn test_two_modules_end_to_end() {
        let (sheet, report) = compose_workbook(&workbook(vec![two_module_sheet("Regs")]), &config()).unwrap();

        assert_eq!(report.heading, "registers");
        assert_eq!(report.blocks.len(), 2);
        assert_eq!(report.table_count(), 2);

        let a = &report.blocks[0];
        assert_eq!((a.module.as_str(), a.title_row, a.heading_row, a.last_row), ("A", 2, 3, 6));
        assert_eq!(a.table.as_deref(), Some("Table1"));
        assert_eq!(a.fields_painted, 1);

        let b = &report.blocks[1];
        assert_eq!((b.module.as_str(), b.title_row, b.heading_row, b.last_row), ("B", 9, 10, 13));
        assert_eq!(b.table.as_deref(), Some("Table2"));

        // Titles merged across all 42 columns
        assert!(sheet.merges.contains(&CellRange::row_span(2, 0, 41)));
        assert!(sheet.merges.contains(&CellRange::row_span(9, 0, 41)));
        assert_eq!(sheet.value(2, 0), &CellValue::text("A"));
        assert_eq!(sheet.value(9, 0), &CellValue::text("B"));

        // CTRL spans the whole first register row of A
        assert!(sheet.merges.contains(&CellRange::row_span(4, 4, 35)));
        assert_eq!(sheet.value(4, 4), &CellValue::text("CTRL"));
        assert_eq!(sheet.cell(4, 4).unwrap().style.fill, Some(Fill::Defined));
        assert_eq!(sheet.cell(5, 4).unwrap().style.fill, Some(Fill::Unused));

        // B has no fields, every bit cell is unused
        for row in 11..=13 {
            assert_eq!(sheet.cell(row, 20).unwrap().style.fill, Some(Fill::Unused));
        }

        // Positional addresses, one entry per module
        assert_eq!(sheet.value(4, 38), &CellValue::text("0x0000_3000"));
        assert_eq!(sheet.value(4, 41), &CellValue::text("0x0010_3000"));
        assert_eq!(sheet.value(11, 41), &CellValue::text("0x0010_2000"));

        // Bordered blocks, sized rows
        assert!(sheet.cell(13, 0).unwrap().style.border);
        assert_eq!(sheet.row_heights.get(&13), Some(&20.0));
    }

    #[test]
    fn test_sheets_processed_first_last_then_rest() {
        let mut first = two_module_sheet("First");
        let mut middle = two_module_sheet("Middle");
        let mut last = two_module_sheet("Last");
        for (sheet, prefix) in [(&mut first, "F"), (&mut middle, "M"), (&mut last, "L")] {
            for row in sheet.rows.iter_mut().skip(1) {
                if let CellValue::String(name) = &row[1] {
                    row[1] = CellValue::text(format!("{}{}", prefix, name));
                }
            }
        }

        let (_, report) = compose_workbook(&workbook(vec![first, middle, last]), &config()).unwrap();
        let modules: Vec<&str> = report.blocks.iter().map(|b| b.module.as_str()).collect();

        assert_eq!(report.sheets, vec!["First", "Last", "Middle"]);
        assert_eq!(modules, vec!["FA", "FB", "LA", "LB", "MA", "MB"]);
    }

    #[test]
    fn test_short_address_list_degrades() {
        let mut config = config();
        config.addresses.actual_base_sequence = vec!["0x0010_3000".into()];
        config.addresses.base_sequence = vec!["0x0000_3000".into()];

        let (sheet, report) = compose_workbook(&workbook(vec![two_module_sheet("Regs")]), &config).unwrap();

        assert_eq!(report.blocks.len(), 2);
        assert_eq!(sheet.value(11, 38), &CellValue::Empty);
        assert_eq!(sheet.value(11, 41), &CellValue::Empty);
    }

    #[test]
    fn test_keyed_addresses_fail_fast() {
        let mut config = config();
        config.addresses.modules.insert(
            "A".into(),
            ModuleAddress {
                base_address: Some("0x0000_3000".into()),
                actual_base_address: Some("0x0010_3000".into()),
                top_bridge: None,
            },
        );

        let err = compose_workbook(&workbook(vec![two_module_sheet("Regs")]), &config).unwrap_err();
        assert!(matches!(err, Error::MissingAddress(ref m) if m == "B"));
    }

    #[test]
    fn test_keyed_addresses_by_module() {
        let mut config = config();
        for (module, actual) in [("B", "0x0020_0000"), ("A", "0x0010_0000")] {
            config.addresses.modules.insert(
                module.into(),
                ModuleAddress {
                    base_address: None,
                    actual_base_address: Some(actual.into()),
                    top_bridge: Some("0x0001_0000".into()),
                },
            );
        }

        let (sheet, _) = compose_workbook(&workbook(vec![two_module_sheet("Regs")]), &config).unwrap();
        assert_eq!(sheet.value(4, 41), &CellValue::text("0x0010_0000"));
        assert_eq!(sheet.value(11, 41), &CellValue::text("0x0020_0000"));
        assert_eq!(sheet.value(11, 40), &CellValue::text("0x0001_0000"));
    }

    #[test]
    fn test_overrides_applied_last() {
        let mut config = config();
        config.overrides = vec![CellOverride::new("AO5", "0x0004_4000")];

        let (sheet, report) = compose_workbook(&workbook(vec![two_module_sheet("Regs")]), &config).unwrap();
        assert_eq!(report.overrides_applied, 1);
        assert_eq!(sheet.value(4, 40), &CellValue::text("0x0004_4000"));
    }

    #[test]
    fn test_report_json() {
        let (_, report) = compose_workbook(&workbook(vec![two_module_sheet("Regs")]), &config()).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["sheets"][0], "Regs");
        assert_eq!(json["blocks"][1]["module"], "B");
        assert_eq!(json["blocks"][1]["table"], "Table2");
        assert!(json["output"].is_null());

        let index = locate_modules(&workbook(vec![two_module_sheet("Regs")]), config().module_column);
        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["sheets"][0]["modules"][0]["name"], "A");
    }

    #[test]
    fn test_override_inside_address_merge_is_saved() {
        let mut config = config();
        config.overrides = vec![CellOverride::new("AO6", "0x0004_4000")];

        let (sheet, report) = compose_workbook(&workbook(vec![two_module_sheet("Regs")]), &config).unwrap();
        assert_eq!(report.overrides_applied, 1);
        assert!(sheet.merges.contains(&CellRange::new(4, 40, 6, 40)));

        let bytes = write_to_buffer(&sheet).unwrap();
        let combined = load_workbook_bytes(&bytes, "combined.xlsx").unwrap();
        let written = combined.find_sheet("Combined Sheet").unwrap();
        assert_eq!(written.get(4, 40), &CellValue::text("0x0004_4000"));
        assert_eq!(written.resolved(5, 40), &CellValue::text("0x0004_4000"));
    }

    #[test]
    fn test_convert_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("registers.xlsx");

        let mut source = rust_xlsxwriter::Workbook::new();
        let ws = source.add_worksheet();
        ws.set_name("Regs").unwrap();
        for (r, row) in two_module_sheet("Regs").rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                match value {
                    CellValue::Integer(i) => {
                        ws.write_number(r as u32, c as u16, *i as f64).unwrap();
                    }
                    CellValue::String(s) => {
                        ws.write_string(r as u32, c as u16, s).unwrap();
                    }
                    _ => {}
                }
            }
        }
        source.save(&input).unwrap();

        let mut config = config();
        config.overrides = vec![CellOverride::new("C5", "640")];
        let output = default_output_path(&input);
        let report = convert_file(&input, &output, &config).unwrap();
        assert_eq!(report.output.as_deref(), Some(output.as_path()));

        let bytes = std::fs::read(&output).unwrap();
        let combined = load_workbook_bytes(&bytes, "combined.xlsx").unwrap();
        let sheet = combined.find_sheet("Combined Sheet").unwrap();

        assert_eq!(sheet.get(2, 0), &CellValue::text("A"));
        assert_eq!(sheet.get(3, 1), &CellValue::text("FPGA Addr offset (in HEX)"));
        assert_eq!(sheet.get(4, 1), &CellValue::text("0000"));
        assert_eq!(sheet.get(4, 2), &CellValue::text("640"));
        assert_eq!(sheet.get(4, 4), &CellValue::text("CTRL"));
        assert!(sheet.merges.iter().any(|m| m.contains(2, 41) && m.first_col == 0));
    }
}
