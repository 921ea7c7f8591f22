//! Cross-source query intersection and ranking
//!
//! Given reports from many shards, finds the queries every shard runs (joined
//! on `(schema, text)`, since digests are not comparable across instances)
//! and ranks the shards by how often each one runs them.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::models::{IntersectionEntry, QueryKey, Report, SourceCount};
use crate::services::report_codec::read_report;
use crate::utils::collection_ext::{keys_in_all, sum_by_key, unique_ordered};
use crate::utils::error::{QrepError, QrepResult};
use crate::utils::string_ext::trim_common_suffix;

/// Queries whose busiest source ran them fewer times than this are dropped
pub const DEFAULT_MIN_COUNT: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectionConfig {
    pub min_count: u64,
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self { min_count: DEFAULT_MIN_COUNT }
    }
}

/// A decoded report and the name it is shown under
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledReport {
    pub label: String,
    pub report: Report,
}

impl LabeledReport {
    pub fn new(label: impl Into<String>, report: Report) -> Self {
        Self { label: label.into(), report }
    }

    /// Read a report file, labelled by its file name
    pub fn read(path: &Path) -> QrepResult<Self> {
        let report = read_report(path)?;
        Ok(Self::new(source_label(path), report))
    }
}

fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Result of one intersection run, ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionOutcome {
    /// Labels of every compared source, in input order
    pub labels: Vec<String>,
    pub entries: Vec<IntersectionEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct IntersectionEngine {
    config: IntersectionConfig,
}

impl IntersectionEngine {
    pub fn new(config: IntersectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IntersectionConfig {
        &self.config
    }

    /// Queries present in every source, ranked by their busiest source.
    ///
    /// Fails with [`QrepError::EmptyResult`] when the sources share no query
    /// at all. Entries below the count floor are dropped without error.
    pub fn intersect(&self, sources: &[LabeledReport]) -> QrepResult<Vec<IntersectionEntry>> {
        if sources.is_empty() {
            return Err(QrepError::config("no files to process"));
        }

        let counts: Vec<HashMap<QueryKey, u64>> = sources
            .iter()
            .map(|s| sum_by_key(s.report.records(), |r| r.query_key(), |r| r.count))
            .collect();

        let common = keys_in_all(&counts);
        if common.is_empty() {
            return Err(QrepError::EmptyResult);
        }
        let common_count = common.len();

        let mut entries: Vec<IntersectionEntry> = common
            .into_iter()
            .map(|key| {
                let mut ranked: Vec<SourceCount> = sources
                    .iter()
                    .zip(&counts)
                    .map(|(source, per_key)| SourceCount {
                        source: source.label.clone(),
                        count: per_key.get(key).copied().unwrap_or(0),
                    })
                    .collect();
                ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source.cmp(&b.source)));
                IntersectionEntry { key: key.clone(), sources: ranked }
            })
            .filter(|entry| entry.top_count() >= self.config.min_count)
            .collect();

        entries.sort_by(|a, b| {
            Reverse(a.top_count()).cmp(&Reverse(b.top_count())).then_with(|| a.key.cmp(&b.key))
        });

        tracing::info!(
            sources = sources.len(),
            common = common_count,
            reported = entries.len(),
            min_count = self.config.min_count,
            "Reports intersected"
        );
        Ok(entries)
    }

    /// Read every file, then intersect. Repeated paths are read once; any
    /// unreadable file aborts the run before the join starts.
    pub fn intersect_files<P: AsRef<Path>>(&self, paths: &[P]) -> QrepResult<IntersectionOutcome> {
        if paths.is_empty() {
            return Err(QrepError::config("no files to process"));
        }

        let unique: Vec<PathBuf> =
            unique_ordered(paths.iter().map(|p| p.as_ref().to_path_buf()).collect());
        if unique.len() < paths.len() {
            tracing::warn!(skipped = paths.len() - unique.len(), "Ignoring repeated report paths");
        }

        let sources = unique.iter().map(|p| LabeledReport::read(p)).collect::<QrepResult<Vec<_>>>()?;
        let entries = self.intersect(&sources)?;
        let labels = sources.into_iter().map(|s| s.label).collect();

        Ok(IntersectionOutcome { labels, entries })
    }
}

/// Write one block per common query: a `[schema] text` header followed by
/// the ranked sources, blocks separated by a blank line
pub fn render_intersection<W: Write>(
    outcome: &IntersectionOutcome,
    top_only: bool,
    out: &mut W,
) -> io::Result<()> {
    let display: HashMap<&str, String> = outcome
        .labels
        .iter()
        .map(String::as_str)
        .zip(trim_common_suffix(&outcome.labels))
        .collect();
    let name_of = |label: &str| display.get(label).cloned().unwrap_or_else(|| label.to_string());

    for (i, entry) in outcome.entries.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "[{}] {}", entry.key.schema, entry.key.text)?;

        if top_only {
            if let Some(top) = entry.top() {
                match entry.lead_percent() {
                    Some(lead) => {
                        writeln!(out, "\t{}\t{} ({:.2}% ahead)", top.count, name_of(&top.source), lead)?
                    },
                    None => writeln!(out, "\t{}\t{}", top.count, name_of(&top.source))?,
                }
            }
            continue;
        }

        for source in &entry.sources {
            writeln!(out, "\t{}\t{}", source.count, name_of(&source.source))?;
        }
    }
    Ok(())
}

/// Closing line of an intersection run
pub fn intersection_summary(outcome: &IntersectionOutcome, min_count: u64) -> String {
    let noun = if outcome.entries.len() == 1 { "query" } else { "queries" };
    format!(
        "{} common {} across {} reports (min count {})",
        outcome.entries.len(),
        noun,
        outcome.labels.len(),
        min_count
    )
}
