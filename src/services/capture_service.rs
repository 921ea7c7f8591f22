//! Report capture
//!
//! Pulls per-digest counts from a statement source, turns them into a report,
//! prints the heaviest queries and persists the report for later comparison.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::models::{RawStatement, Report};
use crate::services::filter_policy::FilterPolicy;
use crate::services::report_codec::write_report;
use crate::utils::error::{QrepError, QrepResult};
use crate::utils::table::TextTable;

/// Anything that can hand out aggregated statement counts
#[async_trait]
pub trait StatementSource: Send + Sync {
    /// Counts since the last reset, busiest first
    async fn fetch_statements(&self) -> QrepResult<Vec<RawStatement>>;

    /// Start a new sampling window
    async fn reset_statistics(&self) -> QrepResult<()>;

    /// Release connections once the source is no longer needed
    async fn close(&self) -> QrepResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    /// Print queries whose share reaches this value; 0 prints nothing
    pub threshold: f64,
    /// Where to save the report, if anywhere
    pub file: Option<PathBuf>,
    /// Reset the source after the report was saved
    pub clear: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self { threshold: 0.1, file: None, clear: false }
    }
}

impl CaptureOptions {
    pub fn validate(&self) -> QrepResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(QrepError::config(format!(
                "invalid n value {}, should be in [0,1] range",
                self.threshold
            )));
        }
        Ok(())
    }
}

pub struct CaptureService {
    policy: FilterPolicy,
}

impl CaptureService {
    pub fn new(policy: FilterPolicy) -> Self {
        Self { policy }
    }

    /// Capture one report.
    ///
    /// The source is only reset when a report file was requested and written,
    /// so counts are never thrown away unsaved.
    pub async fn capture<S, W>(
        &self,
        source: &S,
        options: &CaptureOptions,
        out: &mut W,
    ) -> QrepResult<Report>
    where
        S: StatementSource + ?Sized,
        W: Write,
    {
        options.validate()?;

        let rows = source.fetch_statements().await?;
        let fetched = rows.len();
        let report = Report::from_sample(rows, &self.policy);
        tracing::info!(
            fetched,
            kept = report.len(),
            total = report.total_count(),
            "Statement sample captured"
        );

        render_capture(&report, options.threshold, out)
            .map_err(|e| QrepError::io("<output>", e))?;

        let Some(file) = &options.file else {
            if options.clear {
                tracing::warn!("Not clearing statistics: no report file requested");
            }
            return Ok(report);
        };

        write_report(file, &report)?;
        tracing::info!(path = %file.display(), records = report.len(), "Report saved");

        if options.clear {
            source.reset_statistics().await?;
        }
        Ok(report)
    }
}

/// Print records at or above `threshold`; a zero threshold disables output
pub fn render_capture<W: Write>(report: &Report, threshold: f64, out: &mut W) -> std::io::Result<()> {
    if threshold == 0.0 {
        return Ok(());
    }

    let mut table = TextTable::new(["Frac", "Count", "Schema", "Query"]);
    let mut rows = 0;
    for r in report.above(threshold) {
        table.push_row([
            format!("{:.2}", r.fraction),
            r.count.to_string(),
            r.schema.clone(),
            format!("{:?}", r.text),
        ]);
        rows += 1;
    }
    if rows == 0 {
        return Ok(());
    }
    table.write_to(out)
}
