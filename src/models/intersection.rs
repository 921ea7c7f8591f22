use crate::models::QueryKey;

/// Load of one source for one common query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCount {
    pub source: String,
    pub count: u64,
}

/// A query present in every compared report, with its sources ranked by count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntersectionEntry {
    pub key: QueryKey,
    /// Sorted by count descending, then source label ascending
    pub sources: Vec<SourceCount>,
}

impl IntersectionEntry {
    pub fn top(&self) -> Option<&SourceCount> {
        self.sources.first()
    }

    pub fn top_count(&self) -> u64 {
        self.top().map(|s| s.count).unwrap_or(0)
    }

    /// Percentage by which the top source exceeds the runner-up.
    ///
    /// `None` with fewer than two sources or when the runner-up count is zero.
    pub fn lead_percent(&self) -> Option<f64> {
        match self.sources.as_slice() {
            [first, second, ..] if second.count > 0 => {
                Some((first.count as f64 / second.count as f64 - 1.0) * 100.0)
            },
            _ => None,
        }
    }
}
