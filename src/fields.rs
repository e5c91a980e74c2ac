//! Column resolution: mapping inconsistently named input headers onto the
//! four semantic fields the pipeline aggregates.
//!
//! The alias table is plain data ([`FIELD_ALIASES`]) consumed by the pure
//! function [`resolve_fields`]. A header matches an alias when the two are
//! equal ignoring case; there is no trimming or partial matching. For each
//! alias group the first matching header in the table's own left-to-right
//! order wins.

use std::fmt;

use log::debug;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticField {
    Flow,
    Pressure,
    Temperature,
    Category,
}

impl SemanticField {
    pub const ALL: [SemanticField; 4] = [
        SemanticField::Flow,
        SemanticField::Pressure,
        SemanticField::Temperature,
        SemanticField::Category,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticField::Flow => "flow",
            SemanticField::Pressure => "pressure",
            SemanticField::Temperature => "temperature",
            SemanticField::Category => "category",
        }
    }
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alias configuration for one semantic field. `fallback` is only consulted
/// when no header matches any entry of `aliases`.
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub field: SemanticField,
    pub aliases: &'static [&'static str],
    pub fallback: Option<&'static [&'static str]>,
}

pub const FIELD_ALIASES: [FieldAliases; 4] = [
    FieldAliases {
        field: SemanticField::Flow,
        aliases: &["Flowrate", "Flow Rate", "Flow_Rate"],
        fallback: None,
    },
    FieldAliases {
        field: SemanticField::Pressure,
        aliases: &["Pressure"],
        fallback: None,
    },
    FieldAliases {
        field: SemanticField::Temperature,
        aliases: &["Temperature", "Temp"],
        fallback: None,
    },
    FieldAliases {
        field: SemanticField::Category,
        aliases: &["Type", "EquipmentType"],
        fallback: Some(&["Status"]),
    },
];

/// A header resolved to a semantic field: its position and literal name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    flow: Option<ResolvedColumn>,
    pressure: Option<ResolvedColumn>,
    temperature: Option<ResolvedColumn>,
    category: Option<ResolvedColumn>,
}

impl FieldMap {
    pub fn get(&self, field: SemanticField) -> Option<&ResolvedColumn> {
        match field {
            SemanticField::Flow => self.flow.as_ref(),
            SemanticField::Pressure => self.pressure.as_ref(),
            SemanticField::Temperature => self.temperature.as_ref(),
            SemanticField::Category => self.category.as_ref(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SemanticField, Option<&ResolvedColumn>)> + '_ {
        SemanticField::ALL
            .into_iter()
            .map(move |field| (field, self.get(field)))
    }

    fn slot(&mut self, field: SemanticField) -> &mut Option<ResolvedColumn> {
        match field {
            SemanticField::Flow => &mut self.flow,
            SemanticField::Pressure => &mut self.pressure,
            SemanticField::Temperature => &mut self.temperature,
            SemanticField::Category => &mut self.category,
        }
    }
}

pub fn resolve_fields(headers: &[String]) -> FieldMap {
    resolve_with(headers, &FIELD_ALIASES)
}

pub fn resolve_with(headers: &[String], config: &[FieldAliases]) -> FieldMap {
    let mut map = FieldMap::default();
    for entry in config {
        let resolved = find_column(headers, entry.aliases)
            .or_else(|| entry.fallback.and_then(|fallback| find_column(headers, fallback)));
        match &resolved {
            Some(column) => debug!(
                "Resolved field '{}' to column '{}' (position {})",
                entry.field,
                column.name,
                column.index + 1
            ),
            None => debug!("No column found for field '{}'", entry.field),
        }
        *map.slot(entry.field) = resolved;
    }
    map
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<ResolvedColumn> {
    headers
        .iter()
        .position(|header| {
            aliases
                .iter()
                .any(|alias| header.to_lowercase() == alias.to_lowercase())
        })
        .map(|index| ResolvedColumn {
            index,
            name: headers[index].clone(),
        })
}
