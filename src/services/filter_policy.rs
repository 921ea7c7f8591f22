//! Noise filtering for captured statements
//!
//! Session housekeeping (transaction control, `SET`/`SHOW` chatter) dominates
//! raw digest counts on most servers and hides the workload mix, so it is
//! dropped before a report is built.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::models::RawStatement;
use crate::utils::error::{QrepError, QrepResult};

/// Statement prefixes that are always treated as noise
const NOISE_PREFIXES: [&str; 2] = ["SET ", "SHOW "];

/// Built-in denylist entries, in normalized digest text form
pub const BUILTIN_DENYLIST: &[&str] = &[
    "COMMIT",
    "START TRANSACTION",
    "ROLLBACK",
    "SET autocommit = ?",
    "SET `autocommit` = ?",
    "SET SESSION TRANSACTION ISOLATION LEVEL READ COMMITTED",
    "SET SESSION TRANSACTION ISOLATION LEVEL REPEATABLE READ",
    "SET SESSION TRANSACTION READ ONLY",
    "SET SESSION TRANSACTION READ WRITE",
    "SHOW WARNINGS",
];

/// Set of fingerprints or literal statement texts to exclude
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Denylist {
    entries: HashSet<String>,
}

impl Denylist {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in transaction and session entries
    pub fn builtin() -> Self {
        Self { entries: BUILTIN_DENYLIST.iter().map(|s| s.to_string()).collect() }
    }

    /// Built-ins plus the entries of an optional user file.
    ///
    /// A missing file is not an error; the built-ins are used alone.
    pub fn load(extension: Option<&Path>) -> QrepResult<Self> {
        let mut denylist = Self::builtin();
        let Some(path) = extension else {
            return Ok(denylist);
        };

        match fs::read_to_string(path) {
            Ok(content) => {
                let before = denylist.len();
                denylist.extend_from_lines(&content);
                tracing::debug!(
                    path = %path.display(),
                    added = denylist.len() - before,
                    "Loaded denylist extension"
                );
                Ok(denylist)
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Denylist extension not found, using built-ins");
                Ok(denylist)
            },
            Err(e) => Err(QrepError::io(path, e)),
        }
    }

    /// Add entries from denylist file content: one per line, `#` comments and
    /// blank lines skipped
    pub fn extend_from_lines(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            self.entries.insert(line.to_string());
        }
    }

    pub fn insert(&mut self, entry: impl Into<String>) {
        self.entries.insert(entry.into());
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decides which raw statements become report records
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    denylist: Denylist,
}

impl FilterPolicy {
    pub fn new(denylist: Denylist) -> Self {
        if denylist.is_empty() {
            tracing::debug!("Denylist is empty, only SET and SHOW statements are noise");
        }
        Self { denylist }
    }

    /// True when the statement carries workload signal
    pub fn admits(&self, row: &RawStatement) -> bool {
        !self.is_noise(row)
    }

    pub fn is_noise(&self, row: &RawStatement) -> bool {
        let text = row.text.trim();
        if NOISE_PREFIXES.iter().any(|p| text.starts_with(p)) {
            return true;
        }
        (!row.fingerprint.is_empty() && self.denylist.contains(&row.fingerprint))
            || self.denylist.contains(text)
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::new(Denylist::builtin())
    }
}
