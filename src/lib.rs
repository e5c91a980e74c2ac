pub mod aggregate;
pub mod cli;
pub mod columns;
pub mod dataset;
pub mod error;
pub mod fields;
pub mod history;
pub mod ingest;
pub mod io_utils;
pub mod pdf;
pub mod preview;
pub mod record;
pub mod report;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    history::{HistoryStore, RETENTION_LIMIT},
    record::AggregateRecord,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("equipment_history", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match &cli.command {
        Commands::Ingest(args) => handle_ingest(&cli, args),
        Commands::Summary(args) => handle_summary(&cli, args),
        Commands::History(args) => handle_history(&cli, args),
        Commands::Report(args) => handle_report(&cli, args),
        Commands::Clear => handle_clear(&cli),
        Commands::Inspect(args) => columns::execute(args),
    }
}

fn open_store(cli: &Cli) -> Result<HistoryStore> {
    debug!("Opening history store {:?}", cli.store);
    HistoryStore::open(&cli.store)
        .with_context(|| format!("Opening history store {:?}", cli.store))
}

fn handle_ingest(cli: &Cli, args: &cli::IngestArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Ingesting '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let bytes = io_utils::read_input(&args.input)?;
    let source_name = args
        .name
        .clone()
        .unwrap_or_else(|| io_utils::default_source_name(&args.input));

    let store = open_store(cli)?;
    let options = ingest::IngestOptions {
        delimiter,
        encoding,
    };
    let outcome = ingest::ingest(&store, &bytes, &source_name, &options)
        .with_context(|| format!("Ingesting {:?}", args.input))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Serializing ingestion result")?
        );
        return Ok(());
    }

    print_summary(&outcome.summary);
    let shown = outcome.data.iter().take(args.preview_rows).collect::<Vec<_>>();
    if let Some(first) = shown.first() {
        println!();
        let headers = first.columns().map(str::to_string).collect::<Vec<_>>();
        let rows = shown
            .iter()
            .map(|row| row.values().map(|value| value.as_display()).collect())
            .collect::<Vec<Vec<String>>>();
        table::print_table(&headers, &rows);
        debug!(
            "Displayed {} of {} preview row(s)",
            rows.len(),
            outcome.data.len()
        );
    }
    Ok(())
}

fn handle_summary(cli: &Cli, args: &cli::QueryArgs) -> Result<()> {
    let store = open_store(cli)?;
    let latest = store.latest().context("Reading latest summary")?;
    match (&latest, args.json) {
        (Some(record), true) => println!(
            "{}",
            serde_json::to_string_pretty(record).context("Serializing summary")?
        ),
        (None, true) => println!("{{}}"),
        (Some(record), false) => print_summary(record),
        (None, false) => println!("No summary available."),
    }
    info!(
        "Latest summary: {}",
        latest
            .as_ref()
            .map(|record| format!("record {}", record.id))
            .unwrap_or_else(|| "none".to_string())
    );
    Ok(())
}

fn handle_history(cli: &Cli, args: &cli::QueryArgs) -> Result<()> {
    let store = open_store(cli)?;
    let records = store
        .list_recent(RETENTION_LIMIT)
        .context("Reading history")?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&records).context("Serializing history")?
        );
    } else if records.is_empty() {
        println!("No history available.");
    } else {
        let headers = [
            "id",
            "uploaded_at",
            "source",
            "total",
            "avg_flow",
            "avg_pressure",
            "avg_temperature",
            "distribution",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
        let rows = records
            .iter()
            .map(|record| {
                vec![
                    record.id.to_string(),
                    local_timestamp(record),
                    record.summary.source_name.clone(),
                    record.summary.total_count.to_string(),
                    format!("{:.2}", record.summary.avg_flow),
                    format!("{:.2}", record.summary.avg_pressure),
                    format!("{:.2}", record.summary.avg_temperature),
                    record.summary.distribution.to_string(),
                ]
            })
            .collect::<Vec<_>>();
        table::print_table(&headers, &rows);
    }
    info!("Listed {} history record(s)", records.len());
    Ok(())
}

fn handle_report(cli: &Cli, args: &cli::ReportArgs) -> Result<()> {
    let store = open_store(cli)?;
    let records = store
        .list_recent(RETENTION_LIMIT)
        .context("Reading history for report")?;
    let geometry = report::ReportGeometry::for_page(args.page_size);
    let document = report::layout_report(&records, &Local::now(), &geometry);
    let bytes = pdf::render_pdf(&document);
    io_utils::write_output(&args.output, &bytes)?;
    info!(
        "Rendered {} record(s) on {} page(s) to {:?}",
        records.len(),
        document.page_count(),
        args.output
    );
    Ok(())
}

fn handle_clear(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let removed = store.clear_all().context("Clearing history")?;
    println!("History cleared");
    info!("Removed {removed} history record(s)");
    Ok(())
}

fn print_summary(record: &AggregateRecord) {
    let summary = &record.summary;
    let rows = vec![
        vec!["id".to_string(), record.id.to_string()],
        vec!["uploaded_at".to_string(), local_timestamp(record)],
        vec!["source".to_string(), summary.source_name.clone()],
        vec!["total_count".to_string(), summary.total_count.to_string()],
        vec!["avg_flow".to_string(), format!("{:.2}", summary.avg_flow)],
        vec!["avg_pressure".to_string(), format!("{:.2}", summary.avg_pressure)],
        vec![
            "avg_temperature".to_string(),
            format!("{:.2}", summary.avg_temperature),
        ],
        vec!["distribution".to_string(), summary.distribution.to_string()],
    ];
    table::print_table(&["field".to_string(), "value".to_string()], &rows);
}

fn local_timestamp(record: &AggregateRecord) -> String {
    record
        .uploaded_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
