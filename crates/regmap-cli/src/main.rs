//! Register map CLI
//!
//! Command-line tool for consolidating register-map workbooks into one
//! bit-field layout sheet.

mod logging;

use clap::{Parser, Subcommand, ValueEnum};
use logging::{setup_logging, LevelFilter};
use regmap_core::{
    convert_file, default_output_path, export_blocks, load_workbook, locate_modules,
    shape_workbook, ConvertConfig, ExportFormat,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "regmap")]
#[command(about = "Register map workbook consolidator", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level; overrides RUST_LOG
    #[arg(long, global = true, value_enum)]
    log_level: Option<LevelFilter>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consolidate a register workbook into one layout sheet
    Convert {
        /// Input workbook (.xlsx)
        #[arg(short, long)]
        input: PathBuf,

        /// Output workbook (defaults to <input>_combined.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// List every placed block
        #[arg(short, long)]
        verbose: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the module spans of every sheet
    Spans {
        /// Input workbook (.xlsx)
        #[arg(short, long)]
        input: PathBuf,

        /// Path to config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the spans as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the shaped register blocks without styling
    Export {
        /// Input workbook (.xlsx)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: FormatArg,

        /// Path to config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write the default config file
    InitConfig {
        /// Output path for the config file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> regmap_core::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level);

    match cli.command {
        Commands::Convert {
            input,
            output,
            config,
            verbose,
            json,
        } => cmd_convert(&input, output, config.as_deref(), verbose, json),
        Commands::Spans {
            input,
            config,
            json,
        } => cmd_spans(&input, config.as_deref(), json),
        Commands::Export {
            input,
            output,
            format,
            config,
        } => cmd_export(&input, &output, format.into(), config.as_deref()),
        Commands::InitConfig { output } => cmd_init_config(&output),
    }
}

fn load_config(path: Option<&Path>) -> regmap_core::Result<ConvertConfig> {
    match path {
        Some(path) => {
            let config = ConvertConfig::load(path)?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => Ok(ConvertConfig::default()),
    }
}

fn cmd_convert(
    input: &Path,
    output: Option<PathBuf>,
    config_path: Option<&Path>,
    verbose: bool,
    json: bool,
) -> regmap_core::Result<()> {
    let config = load_config(config_path)?;
    let output = output.unwrap_or_else(|| default_output_path(input));

    let report = convert_file(input, &output, &config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Processed {} sheet(s):", report.sheets.len());
    for sheet in &report.sheets {
        println!("  {}", sheet);
    }
    println!();
    println!(
        "Placed {} module block(s) with {} table(s), applied {} override(s)",
        report.blocks.len(),
        report.table_count(),
        report.overrides_applied
    );

    if verbose {
        println!();
        for block in &report.blocks {
            println!(
                "  {} [{}] rows {}-{} {}",
                block.module,
                block.sheet,
                block.title_row + 1,
                block.last_row + 1,
                block.table.as_deref().unwrap_or("(no table)")
            );
        }
    }

    if report.fields_skipped() > 0 {
        println!("\nWarning: {} bit field(s) could not be placed", report.fields_skipped());
    }

    println!("\nSaved to {}", output.display());
    Ok(())
}

fn cmd_spans(input: &Path, config_path: Option<&Path>, json: bool) -> regmap_core::Result<()> {
    let config = load_config(config_path)?;
    let workbook = load_workbook(input)?;
    let index = locate_modules(&workbook, config.module_column);

    if json {
        println!("{}", serde_json::to_string_pretty(&index)?);
        return Ok(());
    }

    println!("File: {}", input.display());
    println!("Modules: {}", index.total_modules());

    for sheet in &index.sheets {
        println!();
        println!("{} ({} modules)", sheet.sheet, sheet.modules.len());
        for span in &sheet.modules {
            // Spreadsheet rows are 1-based
            println!("  {}: rows {}-{}", span.name, span.first + 1, span.last + 1);
        }
    }

    Ok(())
}

fn cmd_export(
    input: &Path,
    output: &Path,
    format: ExportFormat,
    config_path: Option<&Path>,
) -> regmap_core::Result<()> {
    let config = load_config(config_path)?;
    let workbook = load_workbook(input)?;
    let blocks = shape_workbook(&workbook, &config)?;

    let rows = export_blocks(&blocks, output, format)?;

    println!(
        "Exported {} rows from {} module(s) to {}",
        rows,
        blocks.len(),
        output.display()
    );
    Ok(())
}

fn cmd_init_config(output: &Path) -> regmap_core::Result<()> {
    let config = ConvertConfig::default();
    config.save(output)?;

    println!("Created config file: {}", output.display());
    println!("  Sheet name: {}", config.sheet_name);
    println!("  Selected columns: {:?}", config.selected_columns);
    println!("  Overrides: {}", config.overrides.len());
    println!();
    println!("Edit the file, then run:");
    println!("  regmap convert --input <workbook.xlsx> --config {}", output.display());

    Ok(())
}
