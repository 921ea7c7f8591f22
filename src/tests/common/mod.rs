// Common test utilities and helpers

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::models::{QueryRecord, RawStatement, Report};
use crate::services::capture_service::StatementSource;
use crate::services::report_codec::write_report;
use crate::utils::error::{QrepError, QrepResult};

/// In-memory statement source. Resetting empties the sample, like truncating
/// the digest summary table does.
#[derive(Default)]
pub struct FakeSource {
    rows: Mutex<Vec<RawStatement>>,
    fetches: AtomicUsize,
    resets: AtomicUsize,
    closes: AtomicUsize,
    unavailable: bool,
}

impl FakeSource {
    pub fn new(rows: Vec<RawStatement>) -> Self {
        Self { rows: Mutex::new(rows), ..Default::default() }
    }

    /// A source whose every call fails
    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Default::default() }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatementSource for FakeSource {
    async fn fetch_statements(&self) -> QrepResult<Vec<RawStatement>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(QrepError::database("connection refused"));
        }
        Ok(self.rows.lock().expect("rows lock").clone())
    }

    async fn reset_statistics(&self) -> QrepResult<()> {
        if self.unavailable {
            return Err(QrepError::database("connection refused"));
        }
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().expect("rows lock").clear();
        Ok(())
    }

    async fn close(&self) -> QrepResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Lets a test keep a handle on a source it hands out as a boxed trait object
#[async_trait]
impl StatementSource for Arc<FakeSource> {
    async fn fetch_statements(&self) -> QrepResult<Vec<RawStatement>> {
        self.as_ref().fetch_statements().await
    }

    async fn reset_statistics(&self) -> QrepResult<()> {
        self.as_ref().reset_statistics().await
    }

    async fn close(&self) -> QrepResult<()> {
        self.as_ref().close().await
    }
}

pub fn statement(schema: &str, count: u64, fingerprint: &str, text: &str) -> RawStatement {
    RawStatement::new(schema, count, fingerprint, text)
}

/// A small day of traffic: two real queries plus transaction noise
pub fn shop_sample() -> Vec<RawStatement> {
    vec![
        statement("shop", 600, "d1", "SELECT * FROM `orders` WHERE `id` = ?"),
        statement("shop", 300, "d2", "UPDATE `carts` SET `qty` = ? WHERE `id` = ?"),
        statement("shop", 900, "d3", "COMMIT"),
        statement("shop", 500, "d4", "SHOW WARNINGS"),
        statement("shop", 100, "d5", "SELECT `name` FROM `users` WHERE `id` = ?"),
    ]
}

/// Records with fractions computed over their own total
pub fn records(rows: &[(&str, &str, u64)]) -> Vec<QueryRecord> {
    let total: u64 = rows.iter().map(|r| r.2).sum();
    rows.iter()
        .map(|&(schema, text, count)| QueryRecord {
            count,
            fraction: if total == 0 { 0.0 } else { count as f64 / total as f64 },
            fingerprint: format!("{}/{}", schema, text),
            schema: schema.to_string(),
            text: text.to_string(),
        })
        .collect()
}

/// Write a report fixture of `(schema, text, count)` rows and return its path
pub fn write_fixture(dir: &Path, name: &str, rows: &[(&str, &str, u64)]) -> PathBuf {
    let path = dir.join(name);
    write_report(&path, &Report::from_records(records(rows))).expect("write fixture");
    path
}

pub fn output_string(out: Vec<u8>) -> String {
    String::from_utf8(out).expect("utf-8 output")
}
