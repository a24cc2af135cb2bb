//! Windowed aggregation state of a filter

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::Record;

/// Aggregate a trigger reads from a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Count,
    Sum,
    Min,
    Max,
}

impl Aggregate {
    pub fn parse(name: &str) -> Option<Aggregate> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(Aggregate::Count),
            "sum" => Some(Aggregate::Sum),
            "min" => Some(Aggregate::Min),
            "max" => Some(Aggregate::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::Sum => "sum",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        }
    }

    /// Whether the aggregate reads a column rather than the match count
    pub fn needs_column(&self) -> bool {
        !matches!(self, Aggregate::Count)
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Running sum, min and max of one numeric column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericStats {
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl NumericStats {
    fn new(value: f64) -> Self {
        Self {
            sum: value,
            min: value,
            max: value,
        }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// Records matched by a filter within one window `[start_ms, end_ms)`
#[derive(Debug, Clone, PartialEq)]
pub struct WindowAggregate {
    start_ms: u64,
    end_ms: u64,
    count: u64,
    offsets: Vec<u64>,
    stats: BTreeMap<usize, NumericStats>,
}

impl WindowAggregate {
    pub(crate) fn new(start_ms: u64, window_ms: u64) -> Self {
        Self {
            start_ms,
            end_ms: start_ms.saturating_add(window_ms),
            count: 0,
            offsets: Vec::new(),
            stats: BTreeMap::new(),
        }
    }

    pub(crate) fn add(&mut self, record: &Record) {
        self.count += 1;
        self.offsets.push(record.offset());
        for field in record.fields() {
            if let Some(value) = field.value().as_f64() {
                self.stats
                    .entry(field.column())
                    .and_modify(|stats| stats.add(value))
                    .or_insert_with(|| NumericStats::new(value));
            }
        }
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> u64 {
        self.end_ms
    }

    /// Number of matched records
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Offsets of matched records, ascending
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Highest matched offset
    pub fn last_offset(&self) -> Option<u64> {
        self.offsets.last().copied()
    }

    /// Statistics of the numeric column at `position`
    pub fn stats(&self, position: usize) -> Option<&NumericStats> {
        self.stats.get(&position)
    }

    /// Value of `aggregate`. Column aggregates need a numeric column that
    /// saw at least one value.
    pub fn value(&self, aggregate: Aggregate, column: Option<usize>) -> Option<f64> {
        if aggregate == Aggregate::Count {
            return Some(self.count as f64);
        }
        let stats = self.stats.get(&column?)?;
        Some(match aggregate {
            Aggregate::Sum => stats.sum,
            Aggregate::Min => stats.min,
            Aggregate::Max => stats.max,
            Aggregate::Count => self.count as f64,
        })
    }

    /// Whether the window intersects `[from_ms, to_ms)`
    pub fn overlaps(&self, from_ms: u64, to_ms: u64) -> bool {
        self.start_ms < to_ms && from_ms < self.end_ms
    }
}
