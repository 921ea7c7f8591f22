//! Pairwise report comparison
//!
//! Flags queries whose share of the total moved by at least the deviation
//! threshold between a baseline ("old") and a fresh ("new") report of the same
//! source. Records are joined on `(schema, fingerprint)`.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;

use crate::models::{DiffResult, FingerprintKey, QueryRecord, Report};
use crate::services::report_codec::read_report;
use crate::utils::error::{QrepError, QrepResult};
use crate::utils::table::TextTable;

#[derive(Debug, Clone, Copy)]
pub struct DiffEngine {
    deviation: f64,
}

impl DiffEngine {
    /// `deviation` must lie strictly between 0 and 1
    pub fn new(deviation: f64) -> QrepResult<Self> {
        if !(deviation > 0.0 && deviation < 1.0) {
            return Err(QrepError::config(format!(
                "dev should be in (0,1) range, got {}",
                deviation
            )));
        }
        Ok(Self { deviation })
    }

    pub fn deviation(&self) -> f64 {
        self.deviation
    }

    /// Rows of `new` that moved by at least the threshold, in `new`'s order.
    ///
    /// Queries missing from `new` are not reported.
    pub fn compare(&self, old: &Report, new: &Report) -> Vec<DiffResult> {
        let baseline: HashMap<FingerprintKey<'_>, &QueryRecord> =
            old.records().iter().map(|r| (r.fingerprint_key(), r)).collect();

        new.records()
            .iter()
            .filter_map(|current| match baseline.get(&current.fingerprint_key()) {
                None if current.fraction >= self.deviation => Some(DiffResult::appeared(current)),
                None => None,
                Some(previous) => {
                    let delta = current.fraction - previous.fraction;
                    (delta.abs() >= self.deviation).then(|| DiffResult::shifted(current, delta))
                },
            })
            .collect()
    }

    /// Read both report files and compare them; either file failing to decode
    /// aborts the comparison
    pub fn compare_files(
        &self,
        old_path: impl AsRef<Path>,
        new_path: impl AsRef<Path>,
    ) -> QrepResult<Vec<DiffResult>> {
        let old = read_report(old_path.as_ref())?;
        let new = read_report(new_path.as_ref())?;

        let results = self.compare(&old, &new);
        tracing::info!(
            old = %old_path.as_ref().display(),
            new = %new_path.as_ref().display(),
            old_records = old.len(),
            new_records = new.len(),
            deviations = results.len(),
            threshold = self.deviation,
            "Reports compared"
        );
        Ok(results)
    }
}

/// Write the deviation table; nothing at all when there are no rows
pub fn render_diff<W: Write>(results: &[DiffResult], out: &mut W) -> io::Result<()> {
    if results.is_empty() {
        return Ok(());
    }

    let mut table = TextTable::new(["Frac(±diff)", "Count", "Schema", "Query"]);
    for r in results {
        table.push_row([
            format!("{:.2}({:+.2})", r.fraction, r.delta),
            r.count.to_string(),
            r.schema.clone(),
            format!("{:?}", r.text),
        ]);
    }
    table.write_to(out)
}

/// Closing line of a standalone comparison, so an empty result is explicit
pub fn diff_summary(results: &[DiffResult], deviation: f64) -> String {
    match results.len() {
        1 => format!("1 deviation at threshold {}", deviation),
        n => format!("{} deviations at threshold {}", n, deviation),
    }
}
