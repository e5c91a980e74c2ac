use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::report::PageSize;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Summarize equipment sensor CSV uploads and keep a short history",
    long_about = None
)]
pub struct Cli {
    /// SQLite history database (`:memory:` for a throwaway store)
    #[arg(
        long,
        global = true,
        env = "EQUIPMENT_HISTORY_STORE",
        default_value = "equipment-history.db"
    )]
    pub store: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse a CSV upload, summarize it and add it to the history
    Ingest(IngestArgs),
    /// Show the most recent summary
    Summary(QueryArgs),
    /// List the retained summaries, most recent first
    History(QueryArgs),
    /// Render the retained summaries as a PDF report
    Report(ReportArgs),
    /// Delete every retained summary
    Clear,
    /// Show which columns of a CSV file map to flow, pressure, temperature and category
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Input CSV file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Source name recorded with the summary (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Number of preview rows to print in table mode
    #[arg(long = "preview-rows", default_value_t = 10)]
    pub preview_rows: usize,
    /// Emit the summary and preview rows as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Destination PDF file (`-` writes to stdout)
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Page size of the rendered document
    #[arg(long = "page-size", value_enum, default_value = "a4")]
    pub page_size: PageSize,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Input CSV file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
