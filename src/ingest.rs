//! Ingestion pipeline: parse, resolve, aggregate, persist, preview.

use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};
use serde::Serialize;

use crate::{
    aggregate::aggregate,
    dataset::RawTable,
    error::IngestError,
    fields::resolve_fields,
    history::HistoryStore,
    io_utils::DEFAULT_CSV_DELIMITER,
    preview::{PREVIEW_ROW_LIMIT, PreviewRow, build_preview},
    record::AggregateRecord,
};

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
        }
    }
}

/// Result of one successful ingestion, shaped as the transport payload.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub summary: AggregateRecord,
    pub data: Vec<PreviewRow>,
}

/// Ingests one uploaded table. A parse failure returns before the store is
/// touched; on success exactly one record is inserted (with its trim).
pub fn ingest(
    store: &HistoryStore,
    bytes: &[u8],
    source_name: &str,
    options: &IngestOptions,
) -> Result<IngestOutcome, IngestError> {
    let table = RawTable::parse(bytes, options.delimiter, options.encoding)?;
    debug!(
        "Parsed '{source_name}': {} column(s), {} row(s)",
        table.headers().len(),
        table.row_count()
    );

    let fields = resolve_fields(table.headers());
    let summary = aggregate(&table, &fields, source_name);
    let record = store.insert(summary)?;
    info!(
        "Ingested {} row(s) from '{}' as history record {}",
        record.summary.total_count, record.summary.source_name, record.id
    );

    let data = build_preview(&table, PREVIEW_ROW_LIMIT);
    Ok(IngestOutcome {
        summary: record,
        data,
    })
}
