//! Append-only series of sampled iteration metrics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::QualityMetrics;

/// Metrics captured at one sampled iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Zero-based iteration index the metrics were taken at.
    pub iteration: u64,
    /// Original-vs-current comparison at that iteration.
    pub metrics: QualityMetrics,
}

impl IterationRecord {
    /// Create a record.
    pub fn new(iteration: u64, metrics: QualityMetrics) -> Self {
        Self { iteration, metrics }
    }
}

/// A record was appended out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("iteration {attempted} appended after iteration {last}; series indices must strictly increase")]
pub struct SeriesOrderError {
    /// Last iteration already in the series.
    pub last: u64,
    /// Iteration that was rejected.
    pub attempted: u64,
}

/// Ordered, append-only sequence of [`IterationRecord`]s.
///
/// Insertion order always equals iteration order: [`MetricsSeries::push`]
/// rejects any record whose index does not exceed the last one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<IterationRecord>", into = "Vec<IterationRecord>")]
pub struct MetricsSeries {
    records: Vec<IterationRecord>,
}

impl MetricsSeries {
    /// Create an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from records that must already be strictly ordered.
    pub fn from_records(records: Vec<IterationRecord>) -> Result<Self, SeriesOrderError> {
        let mut series = Self {
            records: Vec::with_capacity(records.len()),
        };
        for record in records {
            series.push(record)?;
        }
        Ok(series)
    }

    /// Append a record.
    pub fn push(&mut self, record: IterationRecord) -> Result<(), SeriesOrderError> {
        if let Some(last) = self.last_iteration()
            && record.iteration <= last
        {
            return Err(SeriesOrderError {
                last,
                attempted: record.iteration,
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Index of the most recent record.
    pub fn last_iteration(&self) -> Option<u64> {
        self.records.last().map(|r| r.iteration)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no record has been appended.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in iteration order.
    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    /// Iterate records in iteration order.
    pub fn iter(&self) -> std::slice::Iter<'_, IterationRecord> {
        self.records.iter()
    }

    /// Record taken at exactly `iteration`, if it was sampled.
    pub fn get(&self, iteration: u64) -> Option<&IterationRecord> {
        self.records
            .binary_search_by_key(&iteration, |r| r.iteration)
            .ok()
            .map(|i| &self.records[i])
    }
}

impl TryFrom<Vec<IterationRecord>> for MetricsSeries {
    type Error = SeriesOrderError;

    fn try_from(records: Vec<IterationRecord>) -> Result<Self, Self::Error> {
        Self::from_records(records)
    }
}

impl From<MetricsSeries> for Vec<IterationRecord> {
    fn from(series: MetricsSeries) -> Self {
        series.records
    }
}

impl<'a> IntoIterator for &'a MetricsSeries {
    type Item = &'a IterationRecord;
    type IntoIter = std::slice::Iter<'a, IterationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
