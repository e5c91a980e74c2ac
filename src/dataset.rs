//! In-memory table parsed from one uploaded file.
//!
//! [`RawTable::parse`] turns raw bytes into named columns of optional cells.
//! Missing cells (empty fields and the conventional NA tokens) are stored as
//! `None`; every other cell keeps its decoded text untouched.

use std::collections::HashSet;

use encoding_rs::Encoding;

use crate::{error::IngestError, io_utils};

/// Tokens read as missing values, in addition to the empty string.
const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Builds a table from already-split headers and rows. Short rows are
    /// padded with missing cells.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self {
            headers: dedupe_headers(headers),
            rows,
        }
    }

    pub fn parse(
        bytes: &[u8],
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self, IngestError> {
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            return Err(IngestError::Input(format!(
                "Failed to decode input with encoding {}",
                encoding.name()
            )));
        }
        if text.trim().is_empty() {
            return Err(IngestError::Input(
                "No columns to parse from input".to_string(),
            ));
        }

        // Split the decoded text: multi-byte encodings such as UTF-16 cannot
        // be split on single delimiter bytes.
        let mut reader = io_utils::open_csv_reader(text.as_bytes(), delimiter);
        let headers = reader
            .headers()
            .map_err(IngestError::input)?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let width = headers.len();

        let mut rows = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record
                .map_err(|err| IngestError::Input(format!("Reading row {}: {err}", row_idx + 2)))?;
            if record.len() > width {
                return Err(IngestError::Input(format!(
                    "Expected {width} fields in row {}, saw {}",
                    row_idx + 2,
                    record.len()
                )));
            }
            rows.push(
                record
                    .iter()
                    .map(|field| normalize_cell(field.to_string()))
                    .collect(),
            );
        }

        Ok(Self::new(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterates one column's cells, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).and_then(|cell| cell.as_deref()))
    }
}

fn normalize_cell(value: String) -> Option<String> {
    if value.is_empty() || NA_TOKENS.contains(&value.trim()) {
        None
    } else {
        Some(value)
    }
}

/// Later duplicates of a header get `.1`, `.2`, ... appended.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut result = Vec::with_capacity(headers.len());
    for header in headers {
        let mut candidate = header.clone();
        let mut suffix = 1usize;
        while seen.contains(&candidate) {
            candidate = format!("{header}.{suffix}");
            suffix += 1;
        }
        seen.insert(candidate.clone());
        result.push(candidate);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_8, WINDOWS_1252};

    fn parse(text: &str) -> Result<RawTable, IngestError> {
        RawTable::parse(text.as_bytes(), b',', UTF_8)
    }

    #[test]
    fn parses_headers_and_missing_cells() {
        let table = parse("Flowrate,Type\n1.5,Pump\n,NA\n3,Valve\n").expect("parse");
        assert_eq!(table.headers(), ["Flowrate", "Type"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(
            table.column(0).collect::<Vec<_>>(),
            vec![Some("1.5"), None, Some("3")]
        );
        assert_eq!(
            table.column(1).collect::<Vec<_>>(),
            vec![Some("Pump"), None, Some("Valve")]
        );
    }

    #[test]
    fn short_rows_are_padded() {
        let table = parse("a,b,c\n1\n").expect("parse");
        assert_eq!(table.rows()[0], vec![Some("1".to_string()), None, None]);
    }

    #[test]
    fn long_rows_are_rejected_with_row_number() {
        let err = parse("a,b\n1,2\n1,2,3\n").unwrap_err();
        assert!(err.to_string().contains("Expected 2 fields in row 3, saw 3"));
    }

    #[test]
    fn empty_input_is_an_input_error() {
        assert!(matches!(parse(""), Err(IngestError::Input(_))));
        assert!(matches!(parse("  \n\n"), Err(IngestError::Input(_))));
    }

    #[test]
    fn header_only_input_has_zero_rows() {
        let table = parse("Flowrate,Pressure\n").expect("parse");
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let table = parse("Type,Type,Type\nA,B,C\n").expect("parse");
        assert_eq!(table.headers(), ["Type", "Type.1", "Type.2"]);
    }

    #[test]
    fn invalid_utf8_is_an_input_error() {
        let bytes = b"Type\n\xff\xfe\n";
        assert!(matches!(
            RawTable::parse(bytes, b',', UTF_8),
            Err(IngestError::Input(_))
        ));
        let table = RawTable::parse(b"Type\nV\xe1lvula\n", b',', WINDOWS_1252).expect("latin1");
        assert_eq!(table.column(0).next(), Some(Some("Válvula")));
    }

    #[test]
    fn utf16_input_with_bom_is_parsed() {
        let mut bytes = vec![0xff, 0xfe];
        for unit in "Pressure,Type\n10,Pump\n30,Valve\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let encoding = Encoding::for_label(b"utf-16le").expect("label");
        let table = RawTable::parse(&bytes, b',', encoding).expect("utf-16 table");
        assert_eq!(table.headers(), ["Pressure", "Type"]);
        assert_eq!(
            table.column(1).collect::<Vec<_>>(),
            vec![Some("Pump"), Some("Valve")]
        );
    }
}
