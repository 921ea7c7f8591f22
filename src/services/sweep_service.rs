//! Capture-then-compare over a fleet of database hosts
//!
//! Every host listed in the mapping file gets a fresh report under
//! `<dir>/<name>.<new>.qrep`, which is then compared against the report of
//! the previous run, `<dir>/<name>.<old>.qrep`. Hosts are processed one at a
//! time and the first failure stops the sweep.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::services::capture_service::{CaptureOptions, CaptureService, StatementSource};
use crate::services::diff_engine::{DiffEngine, render_diff};
use crate::services::report_codec::read_report;
use crate::utils::error::{QrepError, QrepResult};

/// `${NAME}` or `$NAME`
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("placeholder pattern is valid"));

/// Report file extension
pub const REPORT_EXTENSION: &str = "qrep";

#[derive(Debug, Clone, PartialEq)]
pub struct SweepOptions {
    pub dir: PathBuf,
    /// Date part of the baseline report names
    pub old: String,
    /// Date part of the reports captured by this sweep
    pub new: String,
    /// Connection URL with a `${HOST}` placeholder
    pub dsn_template: String,
    pub threshold: f64,
    pub deviation: f64,
    pub skip_compare: bool,
    pub clear: bool,
}

impl SweepOptions {
    pub fn validate(&self) -> QrepResult<()> {
        if self.old.is_empty() || self.new.is_empty() {
            return Err(QrepError::config("old and new report names must not be empty"));
        }
        if self.old == self.new {
            return Err(QrepError::config(format!(
                "old and new report names are both '{}'",
                self.new
            )));
        }
        if !self.skip_compare {
            DiffEngine::new(self.deviation)?;
        }
        CaptureOptions { threshold: self.threshold, file: None, clear: false }.validate()
    }

    pub fn report_paths(&self, name: &str) -> (PathBuf, PathBuf) {
        let name = base_name(name);
        let old = self.dir.join(format!("{}.{}.{}", name, base_name(&self.old), REPORT_EXTENSION));
        let new = self.dir.join(format!("{}.{}.{}", name, base_name(&self.new), REPORT_EXTENSION));
        (old, new)
    }
}

/// Today's and yesterday's UTC dates as `YYYYMMDD`, the default new/old names
pub fn default_report_dates() -> (String, String) {
    let now = Utc::now();
    let new = now.format("%Y%m%d").to_string();
    let old = (now - Duration::days(1)).format("%Y%m%d").to_string();
    (old, new)
}

fn base_name(s: &str) -> String {
    Path::new(s).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| s.to_string())
}

/// Substitute the host into a DSN template; unknown placeholders become empty
pub fn expand_dsn(template: &str, host: &str) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");
            if name == "HOST" { host.to_string() } else { String::new() }
        })
        .into_owned()
}

/// Parse a TOML mapping of report name to host, e.g. `shard1 = "db1.internal"`
pub fn parse_host_map(content: &str) -> QrepResult<BTreeMap<String, String>> {
    toml::from_str(content).map_err(|e| QrepError::config(format!("invalid host mapping: {}", e)))
}

pub fn read_host_map(path: impl AsRef<Path>) -> QrepResult<BTreeMap<String, String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| QrepError::io(path, e))?;
    parse_host_map(&content).map_err(|e| match e {
        QrepError::Config(msg) => QrepError::config(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Opens a statement source for a DSN
pub type Connector = dyn Fn(&str) -> QrepResult<Box<dyn StatementSource>> + Send + Sync;

pub struct SweepService {
    capture: CaptureService,
    connect: Box<Connector>,
}

impl SweepService {
    pub fn new(capture: CaptureService, connect: Box<Connector>) -> Self {
        Self { capture, connect }
    }

    /// Sweep every host in name order. Output of a host is written only when
    /// it is non-empty, preceded by a `Host:` line. The host that stops the
    /// sweep has its output written to `err` instead of `out`.
    pub async fn run<W: Write, E: Write>(
        &self,
        hosts: &BTreeMap<String, String>,
        options: &SweepOptions,
        out: &mut W,
        err: &mut E,
    ) -> QrepResult<()> {
        options.validate()?;

        for (name, host) in hosts {
            let mut buf = Vec::new();
            let result = self.process_host(name, host, options, &mut buf).await;

            match result {
                Ok(()) => write_host_output(out, host, &buf)?,
                Err(e) => {
                    write_host_output(err, host, &buf)?;
                    tracing::error!(name = %name, host = %host, error = %e, "Sweep stopped");
                    return Err(e.for_host(host.clone()));
                },
            }
        }

        tracing::info!(hosts = hosts.len(), "Sweep finished");
        Ok(())
    }

    async fn process_host(
        &self,
        name: &str,
        host: &str,
        options: &SweepOptions,
        out: &mut Vec<u8>,
    ) -> QrepResult<()> {
        let (old_path, new_path) = options.report_paths(name);
        let dsn = expand_dsn(&options.dsn_template, host);
        tracing::debug!(name, host, report = %new_path.display(), "Processing host");

        let source = (self.connect)(&dsn)?;
        let result = self.capture_and_compare(source.as_ref(), &old_path, new_path, options, out).await;
        let closed = source.close().await;
        result?;
        closed
    }

    async fn capture_and_compare(
        &self,
        source: &dyn StatementSource,
        old_path: &Path,
        new_path: PathBuf,
        options: &SweepOptions,
        out: &mut Vec<u8>,
    ) -> QrepResult<()> {
        let capture = CaptureOptions {
            threshold: options.threshold,
            file: Some(new_path),
            clear: options.clear,
        };
        let current = self.capture.capture(source, &capture, out).await?;

        if options.skip_compare {
            return Ok(());
        }

        let engine = DiffEngine::new(options.deviation)?;
        let baseline = read_report(old_path)?;
        let results = engine.compare(&baseline, &current);
        render_diff(&results, out).map_err(|e| QrepError::io("<output>", e))
    }
}

fn write_host_output<W: Write>(w: &mut W, host: &str, buf: &[u8]) -> QrepResult<()> {
    if buf.is_empty() {
        return Ok(());
    }
    writeln!(w, "\nHost: {}", host)
        .and_then(|_| w.write_all(buf))
        .map_err(|e| QrepError::io("<output>", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(dir: &Path) -> SweepOptions {
        SweepOptions {
            dir: dir.to_path_buf(),
            old: "20240101".to_string(),
            new: "20240102".to_string(),
            dsn_template: "mysql://u:p@${HOST}:3306/".to_string(),
            threshold: 0.2,
            deviation: 0.02,
            skip_compare: false,
            clear: false,
        }
    }

    #[test]
    fn test_expand_dsn() {
        assert_eq!(expand_dsn("mysql://u:p@${HOST}:3306/", "db1"), "mysql://u:p@db1:3306/");
        assert_eq!(expand_dsn("mysql://u:p@$HOST/", "db1"), "mysql://u:p@db1/");
        assert_eq!(expand_dsn("mysql://${USER}@${HOST}/", "db1"), "mysql://@db1/");
        assert_eq!(expand_dsn("mysql://plain/", "db1"), "mysql://plain/");
    }

    #[test]
    fn test_report_paths_use_base_names() {
        let opts = SweepOptions { old: "/x/20240101".to_string(), ..options(Path::new("/tmp")) };
        let (old, new) = opts.report_paths("../fleet/shard1");
        assert_eq!(old, PathBuf::from("/tmp/shard1.20240101.qrep"));
        assert_eq!(new, PathBuf::from("/tmp/shard1.20240102.qrep"));
    }

    #[test]
    fn test_validate() {
        let base = options(Path::new("/tmp"));
        assert!(base.validate().is_ok());
        assert!(SweepOptions { deviation: 1.0, ..base.clone() }.validate().is_err());
        assert!(SweepOptions { deviation: 1.0, skip_compare: true, ..base.clone() }.validate().is_ok());
        assert!(SweepOptions { threshold: 1.5, ..base.clone() }.validate().is_err());
        assert!(SweepOptions { old: base.new.clone(), ..base.clone() }.validate().is_err());
    }

    #[test]
    fn test_default_dates_are_consecutive() {
        let (old, new) = default_report_dates();
        assert_eq!(old.len(), 8);
        assert_eq!(new.len(), 8);
        assert!(old < new);
    }

    #[test]
    fn test_parse_host_map() {
        let hosts = parse_host_map("shard2 = \"db2.internal\"\nshard1 = \"db1.internal\"\n").unwrap();
        let names: Vec<&str> = hosts.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["shard1", "shard2"]);
        assert!(matches!(parse_host_map("shard1 = 5"), Err(QrepError::Config(_))));
    }
}
