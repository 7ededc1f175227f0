//! Unstyled export of shaped register blocks

use crate::error::Result;
use crate::shaper::RegisterBlock;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Leading column naming the module of each exported row
pub const MODULE_HEADER: &str = "Module";

/// Export file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

/// Write blocks as CSV: per block a header record, then one record per register
pub fn export_csv<W: Write>(blocks: &[RegisterBlock], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);

    for block in blocks {
        let header = std::iter::once(MODULE_HEADER).chain(block.headers.iter().map(String::as_str));
        csv_writer.write_record(header)?;

        for row in &block.rows {
            let values = std::iter::once(block.module.clone()).chain(row.iter().map(|v| v.to_string_value()));
            csv_writer.write_record(values)?;
        }
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write blocks as a pretty-printed JSON array
pub fn export_json<W: Write>(blocks: &[RegisterBlock], writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, blocks)?;
    Ok(())
}

/// Export blocks to a file, returning the number of register rows written
pub fn export_blocks<P: AsRef<Path>>(
    blocks: &[RegisterBlock],
    path: P,
    format: ExportFormat,
) -> Result<usize> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    match format {
        ExportFormat::Csv => export_csv(blocks, &mut writer)?,
        ExportFormat::Json => export_json(blocks, &mut writer)?,
    }
    writer.flush()?;

    let rows = blocks.iter().map(RegisterBlock::row_count).sum();
    tracing::info!(path = %path.as_ref().display(), ?format, blocks = blocks.len(), rows, "exported blocks");
    Ok(rows)
}
