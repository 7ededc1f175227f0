//! regmap-core: Core library for consolidating register-map workbooks
//!
//! This library provides functionality to:
//! - Read a multi-sheet register workbook and group rows into named modules
//! - Reshape each module into a register block with 32 bit columns
//! - Lay bit fields out over the bit columns, with fills and notes
//! - Stack the blocks onto one styled sheet and save it as `.xlsx`
//! - Export the shaped blocks without styling as CSV or JSON

pub mod address;
pub mod bitfield;
pub mod cellref;
pub mod composer;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod layout;
pub mod locator;
pub mod patch;
pub mod reader;
pub mod shaper;
pub mod table;
pub mod writer;

pub use address::{AddressBook, AddressConfig, ModuleAddress};
pub use bitfield::{paint_fields, read_bit_fields, BitField, BitGrid, PaintSummary};
pub use composer::{BlockPlacement, Composer};
pub use config::{ColumnRename, ConvertConfig, FieldColumns};
pub use convert::{compose_workbook, convert_file, default_output_path, shape_workbook, ConvertReport};
pub use error::{Error, Result};
pub use export::{export_blocks, ExportFormat};
pub use layout::{CellRange, OutputSheet};
pub use locator::{locate_modules, ModuleIndex, ModuleSpan, SheetModules};
pub use patch::{apply_overrides, CellOverride};
pub use reader::{load_workbook, load_workbook_bytes};
pub use shaper::{shape_module, RegisterBlock};
pub use table::{CellValue, MergeRegion, SourceSheet, SourceWorkbook};
pub use writer::{write_to_buffer, write_workbook};
