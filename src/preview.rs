//! Preview rows returned alongside an ingestion summary.
//!
//! The preview is advisory transport data and is never persisted. Cells are
//! typed for JSON (integers, floats, strings) and missing cells become `0`.

use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{aggregate::parse_numeric, dataset::RawTable};

/// Maximum number of rows carried in an ingestion preview.
pub const PREVIEW_ROW_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PreviewValue {
    fn from_cell(cell: Option<&str>) -> Self {
        let Some(raw) = cell else {
            return PreviewValue::Integer(0);
        };
        if let Ok(value) = raw.trim().parse::<i64>() {
            return PreviewValue::Integer(value);
        }
        match parse_numeric(raw) {
            Some(value) => PreviewValue::Float(value),
            None => PreviewValue::Text(raw.to_string()),
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            PreviewValue::Integer(i) => i.to_string(),
            PreviewValue::Float(f) => f.to_string(),
            PreviewValue::Text(s) => s.clone(),
        }
    }
}

impl Serialize for PreviewValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PreviewValue::Integer(i) => serializer.serialize_i64(*i),
            PreviewValue::Float(f) => serializer.serialize_f64(*f),
            PreviewValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One preview row; serializes as a JSON object in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRow(Vec<(String, PreviewValue)>);

impl PreviewRow {
    #[cfg(test)]
    pub(crate) fn get(&self, column: &str) -> Option<&PreviewValue> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &PreviewValue> + '_ {
        self.0.iter().map(|(_, value)| value)
    }
}

impl Serialize for PreviewRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (column, value) in &self.0 {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

pub fn build_preview(table: &RawTable, limit: usize) -> Vec<PreviewRow> {
    table
        .rows()
        .iter()
        .take(limit)
        .map(|row| {
            PreviewRow(
                table
                    .headers()
                    .iter()
                    .zip(row)
                    .map(|(header, cell)| (header.clone(), PreviewValue::from_cell(cell.as_deref())))
                    .collect(),
            )
        })
        .collect()
}
