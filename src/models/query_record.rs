use serde::{Deserialize, Serialize};

use crate::services::filter_policy::FilterPolicy;

/// One row as delivered by a statement source, before filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement {
    pub schema: String,
    pub count: u64,
    pub fingerprint: String,
    pub text: String,
}

impl RawStatement {
    pub fn new(
        schema: impl Into<String>,
        count: u64,
        fingerprint: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self { schema: schema.into(), count, fingerprint: fingerprint.into(), text: text.into() }
    }
}

/// One observed query class in a sampling window.
///
/// Field order is part of the report file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Executions observed during the window
    pub count: u64,
    /// Share of the post-filter total, fixed when the report is built
    pub fraction: f64,
    /// Digest of the normalized statement shape
    pub fingerprint: String,
    pub schema: String,
    /// Normalized statement text
    pub text: String,
}

/// Join key for temporal comparison of the same instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FingerprintKey<'a> {
    pub schema: &'a str,
    pub fingerprint: &'a str,
}

/// Join key for comparison across instances, where digests may differ
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub schema: String,
    pub text: String,
}

impl QueryRecord {
    pub fn fingerprint_key(&self) -> FingerprintKey<'_> {
        FingerprintKey { schema: &self.schema, fingerprint: &self.fingerprint }
    }

    pub fn query_key(&self) -> QueryKey {
        QueryKey { schema: self.schema.clone(), text: self.text.clone() }
    }
}

/// Snapshot of one source at one point in time.
///
/// Records keep the order they were captured in (descending count for
/// performance_schema samples). A report is never mutated once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    records: Vec<QueryRecord>,
}

impl Report {
    /// Build a report from a raw sample, dropping noise before the total is taken
    pub fn from_sample<I>(rows: I, policy: &FilterPolicy) -> Self
    where
        I: IntoIterator<Item = RawStatement>,
    {
        let kept: Vec<RawStatement> = rows.into_iter().filter(|row| policy.admits(row)).collect();
        let total = saturating_total(kept.iter().map(|row| row.count));

        let records = kept
            .into_iter()
            .map(|row| QueryRecord {
                count: row.count,
                fraction: share(row.count, total),
                fingerprint: row.fingerprint,
                schema: row.schema,
                text: row.text,
            })
            .collect();

        Self { records }
    }

    /// Wrap records that already carry their fractions, e.g. decoded from a file
    pub fn from_records(records: Vec<QueryRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[QueryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_count(&self) -> u64 {
        saturating_total(self.records.iter().map(|r| r.count))
    }

    /// Records whose share reaches `threshold`, in report order
    pub fn above(&self, threshold: f64) -> impl Iterator<Item = &QueryRecord> {
        self.records.iter().filter(move |r| r.fraction >= threshold)
    }
}

/// Counters near `u64::MAX` pin the total instead of wrapping
fn saturating_total(counts: impl Iterator<Item = u64>) -> u64 {
    counts.fold(0u64, |total, count| total.saturating_add(count))
}

fn share(count: u64, total: u64) -> f64 {
    if total == 0 { 0.0 } else { count as f64 / total as f64 }
}
