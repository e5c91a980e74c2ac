//! Mean statistics and category distribution over a resolved table.
//!
//! Aggregation never fails: unresolved fields produce `0.0` or an empty
//! distribution, and cells that do not parse as finite numbers are skipped.

use std::collections::HashMap;

use crate::{
    dataset::RawTable,
    fields::{FieldMap, SemanticField},
    record::{Distribution, Summary},
};

#[derive(Debug, Default, Clone, Copy)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    fn add(&mut self, raw: &str) {
        if let Some(value) = parse_numeric(raw) {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        }
    }
}

pub(crate) fn parse_numeric(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn column_mean(table: &RawTable, fields: &FieldMap, field: SemanticField) -> f64 {
    let Some(column) = fields.get(field) else {
        return 0.0;
    };
    let mut acc = MeanAccumulator::default();
    for raw in table.column(column.index).flatten() {
        acc.add(raw);
    }
    acc.mean()
}

fn category_distribution(table: &RawTable, fields: &FieldMap) -> Distribution {
    let Some(column) = fields.get(SemanticField::Category) else {
        return Distribution::default();
    };
    let mut counts: HashMap<String, u64> = HashMap::new();
    for raw in table.column(column.index).flatten() {
        *counts.entry(raw.to_string()).or_insert(0) += 1;
    }
    Distribution::from_counts(counts)
}

pub fn aggregate(table: &RawTable, fields: &FieldMap, source_name: &str) -> Summary {
    Summary {
        source_name: source_name.to_string(),
        total_count: table.row_count() as u64,
        avg_flow: column_mean(table, fields, SemanticField::Flow),
        avg_pressure: column_mean(table, fields, SemanticField::Pressure),
        avg_temperature: column_mean(table, fields, SemanticField::Temperature),
        distribution: category_distribution(table, fields),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::resolve_fields;

    fn table(headers: &[&str], rows: &[&[Option<&str>]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.map(str::to_string)).collect())
                .collect(),
        )
    }

    fn summarize(table: &RawTable) -> Summary {
        aggregate(table, &resolve_fields(table.headers()), "test.csv")
    }

    #[test]
    fn mean_of_resolved_column() {
        let t = table(
            &["Pressure"],
            &[&[Some("10")], &[Some("20")], &[Some("30")]],
        );
        let summary = summarize(&t);
        assert_eq!(summary.avg_pressure, 20.0);
        assert_eq!(summary.avg_flow, 0.0);
        assert_eq!(summary.avg_temperature, 0.0);
        assert_eq!(summary.total_count, 3);
    }

    #[test]
    fn unparseable_and_missing_cells_are_skipped() {
        let t = table(
            &["Temp"],
            &[&[Some("10")], &[Some("hot")], &[None], &[Some(" 30 ")], &[Some("inf")]],
        );
        let summary = summarize(&t);
        assert_eq!(summary.avg_temperature, 20.0);
        assert_eq!(summary.total_count, 5);
    }

    #[test]
    fn all_excluded_values_mean_zero() {
        let t = table(&["Flowrate"], &[&[Some("n/a-ish")], &[None]]);
        assert_eq!(summarize(&t).avg_flow, 0.0);
    }

    #[test]
    fn distribution_counts_categories() {
        let t = table(&["Type"], &[&[Some("A")], &[Some("A")], &[Some("B")]]);
        let summary = summarize(&t);
        assert_eq!(summary.distribution.get("A"), Some(2));
        assert_eq!(summary.distribution.get("B"), Some(1));
        assert_eq!(summary.distribution.total(), summary.total_count);
    }

    #[test]
    fn missing_categories_are_not_counted() {
        let t = table(&["Status"], &[&[Some("ok")], &[None], &[Some("ok")]]);
        let summary = summarize(&t);
        assert_eq!(summary.distribution.len(), 1);
        assert_eq!(summary.distribution.get("ok"), Some(2));
    }

    #[test]
    fn unresolved_category_yields_empty_distribution() {
        let t = table(&["Pressure"], &[&[Some("1")]]);
        assert!(summarize(&t).distribution.is_empty());
    }

    #[test]
    fn empty_table_counts_zero_rows() {
        let t = table(&["Flowrate", "Type"], &[]);
        let summary = summarize(&t);
        assert_eq!(summary.total_count, 0);
        assert_eq!(summary.avg_flow, 0.0);
        assert!(summary.distribution.is_empty());
    }
}
