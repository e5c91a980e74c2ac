//! Aggregate records: the persisted unit of the history.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

/// Occurrence count per category label, ordered by descending count and then
/// ascending label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Distribution(Vec<(String, u64)>);

impl Distribution {
    pub fn from_counts(counts: HashMap<String, u64>) -> Self {
        let mut items = counts.into_iter().collect::<Vec<_>>();
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Self(items)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, count)| count).sum()
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.0
            .iter()
            .find(|(candidate, _)| candidate == label)
            .map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.0.iter().map(|(label, count)| (label.as_str(), *count))
    }
}

impl fmt::Display for Distribution {
    /// `label: count` pairs joined by `, `; empty when there are no labels.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .iter()
            .map(|(label, count)| format!("{label}: {count}"))
            .join(", ");
        f.write_str(&joined)
    }
}

impl Serialize for Distribution {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, count) in &self.0 {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Distribution {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DistributionVisitor;

        impl<'de> Visitor<'de> for DistributionVisitor {
            type Value = Distribution;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of category labels to counts")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((label, count)) = access.next_entry::<String, u64>()? {
                    items.push((label, count));
                }
                Ok(Distribution(items))
            }
        }

        deserializer.deserialize_map(DistributionVisitor)
    }
}

/// Statistics computed from one table, before the store assigns identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub source_name: String,
    pub total_count: u64,
    pub avg_flow: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub distribution: Distribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRecord {
    #[serde(flatten)]
    pub summary: Summary,
    pub id: i64,
    pub uploaded_at: DateTime<Utc>,
}
