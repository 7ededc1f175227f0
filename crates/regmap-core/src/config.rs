//! Conversion settings
//!
//! Every setting defaults to the layout of the reference register workbook,
//! so running without a configuration file reproduces the stock layout.

use crate::address::AddressConfig;
use crate::cellref::column_index;
use crate::error::{Error, Result};
use crate::layout::ColNum;
use crate::patch::CellOverride;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Header names of the per-field columns in the source sheets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldColumns {
    pub offset: String,
    pub width: String,
    pub name: String,
    pub access: String,
    pub description: String,
}

impl Default for FieldColumns {
    fn default() -> Self {
        Self {
            offset: "Bit Offset".to_string(),
            width: "Bit Width".to_string(),
            name: "Field Name".to_string(),
            access: "Access".to_string(),
            description: "Field Description".to_string(),
        }
    }
}

/// A header rename applied to the shaped block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRename {
    pub from: String,
    pub to: String,
}

impl ColumnRename {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Settings for one conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Name of the consolidated output sheet
    pub sheet_name: String,
    /// 0-based column holding the module name
    pub module_column: usize,
    /// Source columns copied into each block; negative values count from the last column
    pub selected_columns: Vec<i32>,
    /// Number of selected columns placed before the 32 bit columns
    pub bit_insert_position: usize,
    /// Index into `selected_columns` of the column whose empty cells drop a row
    pub key_column: usize,
    /// Column whose `0x` prefixes are stripped
    pub address_offset_column: String,
    /// New header of the address offset column
    pub address_offset_label: String,
    /// Header renames applied after selection
    pub renames: Vec<ColumnRename>,
    /// Value of the "Register Size in bytes" column
    pub register_size_bytes: i64,
    /// Value of the "Subsystem Bridge" column
    pub subsystem_bridge: String,
    /// Per-field column headers
    pub field_columns: FieldColumns,
    /// Columns merged top-to-bottom across each block's data rows
    pub block_merge_columns: Vec<String>,
    /// Height applied to every used row
    pub row_height: f64,
    /// Module address source
    pub addresses: AddressConfig,
    /// Literal cell values applied after composition
    pub overrides: Vec<CellOverride>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        let mut overrides: Vec<CellOverride> = [168, 169, 181, 182, 230, 231, 243, 244]
            .iter()
            .map(|row| CellOverride::new(format!("C{}", row), "640"))
            .collect();
        overrides.push(CellOverride::new("AO256", "0x0004_4000"));
        overrides.push(CellOverride::new("AO266", "0X0005_0000"));

        Self {
            sheet_name: "Combined Sheet".to_string(),
            module_column: 1,
            selected_columns: vec![2, 3, 4, -1, -4],
            bit_insert_position: 3,
            key_column: 1,
            address_offset_column: "Address Offset".to_string(),
            address_offset_label: "FPGA Addr offset (in HEX)".to_string(),
            renames: vec![
                ColumnRename::new("Register Description", "Notes"),
                ColumnRename::new("Access", "Permission"),
            ],
            register_size_bytes: 4,
            subsystem_bridge: " ".to_string(),
            field_columns: FieldColumns::default(),
            block_merge_columns: ["AM", "AN", "AO", "AP", "AQ"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            row_height: 20.0,
            addresses: AddressConfig::default(),
            overrides,
        }
    }
}

impl ConvertConfig {
    /// Load a config file from JSON and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check every cell and column reference up front
    pub fn validate(&self) -> Result<()> {
        self.merge_column_indices()?;
        for over in &self.overrides {
            over.position()?;
        }
        Ok(())
    }

    /// Block merge columns as 0-based indices
    pub fn merge_column_indices(&self) -> Result<Vec<ColNum>> {
        self.block_merge_columns
            .iter()
            .map(|c| column_index(c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ConvertConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.merge_column_indices().unwrap(), vec![38, 39, 40, 41, 42]);
        assert_eq!(config.overrides.len(), 10);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "sheet_name": "Regs", "selected_columns": [2, 3] }"#;
        let config: ConvertConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.sheet_name, "Regs");
        assert_eq!(config.selected_columns, vec![2, 3]);
        assert_eq!(config.module_column, 1);
        assert_eq!(config.field_columns.offset, "Bit Offset");
        assert_eq!(config.addresses.actual_base_sequence.len(), 18);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regmap.json");

        let mut config = ConvertConfig::default();
        config.overrides = vec![CellOverride::new("B2", "x")];
        config.save(&path).unwrap();

        let loaded = ConvertConfig::load(&path).unwrap();
        assert_eq!(loaded.overrides, config.overrides);
        assert_eq!(loaded.block_merge_columns, config.block_merge_columns);
    }

    #[test]
    fn test_load_rejects_bad_cell_reference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "overrides": [{ "cell": "AO", "value": "1" }] }"#).unwrap();

        let err = ConvertConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidCellRef(_)));
    }
}
