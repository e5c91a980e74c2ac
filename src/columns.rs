//! Column resolution dry run.
//!
//! Parses a CSV file and renders which header each semantic field resolves
//! to, without aggregating or touching the history store.

use anyhow::{Context, Result};
use log::info;

use crate::{cli::InspectArgs, dataset::RawTable, fields, io_utils, table};

pub fn execute(args: &InspectArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let bytes = io_utils::read_input(&args.input)?;
    let raw = RawTable::parse(&bytes, delimiter, encoding)
        .with_context(|| format!("Parsing {:?}", args.input))?;

    let field_map = fields::resolve_fields(raw.headers());
    let rows = field_map
        .iter()
        .map(|(field, column)| match column {
            Some(column) => vec![
                field.to_string(),
                column.name.clone(),
                (column.index + 1).to_string(),
            ],
            None => vec![field.to_string(), "(unresolved)".to_string(), String::new()],
        })
        .collect::<Vec<_>>();

    let headers = vec![
        "field".to_string(),
        "column".to_string(),
        "position".to_string(),
    ];
    table::print_table(&headers, &rows);
    let resolved = field_map.iter().filter(|(_, c)| c.is_some()).count();
    info!(
        "Resolved {resolved} of {} field(s) across {} column(s) in {:?}",
        fields::SemanticField::ALL.len(),
        raw.headers().len(),
        args.input
    );
    Ok(())
}
