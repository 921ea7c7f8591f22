use tempfile::tempdir;

use super::common::{FakeSource, output_string, shop_sample, statement};
use crate::services::capture_service::{CaptureOptions, CaptureService};
use crate::services::filter_policy::{Denylist, FilterPolicy};
use crate::services::report_codec::read_report;
use crate::utils::error::QrepError;

fn service() -> CaptureService {
    CaptureService::new(FilterPolicy::default())
}

#[tokio::test]
async fn test_capture_prints_heavy_queries_without_noise() {
    let source = FakeSource::new(shop_sample());
    let options = CaptureOptions { threshold: 0.25, ..Default::default() };
    let mut out = Vec::new();

    let report = service().capture(&source, &options, &mut out).await.unwrap();

    assert_eq!(report.len(), 3);
    assert_eq!(report.total_count(), 1000);
    assert_eq!(
        output_string(out),
        "Frac  Count  Schema  Query\n\
         0.60  600    shop    \"SELECT * FROM `orders` WHERE `id` = ?\"\n\
         0.30  300    shop    \"UPDATE `carts` SET `qty` = ? WHERE `id` = ?\"\n"
    );
}

#[tokio::test]
async fn test_zero_threshold_prints_nothing() {
    let source = FakeSource::new(shop_sample());
    let options = CaptureOptions { threshold: 0.0, ..Default::default() };
    let mut out = Vec::new();

    let report = service().capture(&source, &options, &mut out).await.unwrap();
    assert_eq!(report.len(), 3);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_no_header_when_nothing_reaches_threshold() {
    let source = FakeSource::new(shop_sample());
    let options = CaptureOptions { threshold: 0.9, ..Default::default() };
    let mut out = Vec::new();

    service().capture(&source, &options, &mut out).await.unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_invalid_threshold_is_rejected_before_fetching() {
    let source = FakeSource::new(shop_sample());
    let options = CaptureOptions { threshold: 1.5, ..Default::default() };

    let err = service().capture(&source, &options, &mut Vec::new()).await.unwrap_err();
    assert!(matches!(err, QrepError::Config(_)));
    assert_eq!(source.fetches(), 0);
}

#[tokio::test]
async fn test_saved_report_reads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shop.20240102.qrep");
    let source = FakeSource::new(shop_sample());
    let options = CaptureOptions { threshold: 0.0, file: Some(path.clone()), clear: false };

    let captured = service().capture(&source, &options, &mut Vec::new()).await.unwrap();

    assert_eq!(read_report(&path).unwrap(), captured);
    assert_eq!(source.resets(), 0);
}

#[tokio::test]
async fn test_clear_after_successful_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shop.qrep");
    let source = FakeSource::new(shop_sample());
    let options = CaptureOptions { threshold: 0.0, file: Some(path.clone()), clear: true };

    service().capture(&source, &options, &mut Vec::new()).await.unwrap();

    assert!(path.exists());
    assert_eq!(source.resets(), 1);
}

#[tokio::test]
async fn test_clear_without_file_keeps_statistics() {
    let source = FakeSource::new(shop_sample());
    let options = CaptureOptions { threshold: 0.0, file: None, clear: true };

    service().capture(&source, &options, &mut Vec::new()).await.unwrap();
    assert_eq!(source.resets(), 0);
}

#[tokio::test]
async fn test_failed_save_keeps_statistics() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("shop.qrep");
    let source = FakeSource::new(shop_sample());
    let options = CaptureOptions { threshold: 0.0, file: Some(path.clone()), clear: true };

    let err = service().capture(&source, &options, &mut Vec::new()).await.unwrap_err();

    assert!(matches!(err, QrepError::Io { .. }));
    assert!(!path.exists());
    assert_eq!(source.resets(), 0);
}

#[tokio::test]
async fn test_source_failure_writes_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shop.qrep");
    let source = FakeSource::unavailable();
    let options = CaptureOptions { threshold: 0.1, file: Some(path.clone()), clear: true };
    let mut out = Vec::new();

    let err = service().capture(&source, &options, &mut out).await.unwrap_err();

    assert!(matches!(err, QrepError::Database(_)));
    assert!(out.is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_user_denylist_entries_are_not_counted() {
    let mut denylist = Denylist::builtin();
    denylist.insert("d2");
    let service = CaptureService::new(FilterPolicy::new(denylist));
    let source = FakeSource::new(vec![
        statement("shop", 75, "d1", "SELECT ?"),
        statement("shop", 100, "d2", "SELECT `heartbeat`"),
        statement("shop", 25, "d3", "SELECT ? FROM DUAL"),
    ]);

    let report = service
        .capture(&source, &CaptureOptions { threshold: 0.0, ..Default::default() }, &mut Vec::new())
        .await
        .unwrap();

    assert_eq!(report.total_count(), 100);
    let fractions: Vec<f64> = report.records().iter().map(|r| r.fraction).collect();
    assert_eq!(fractions, vec![0.75, 0.25]);
}

#[tokio::test]
async fn test_empty_sample_saves_empty_report() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("idle.qrep");
    let source = FakeSource::new(Vec::new());
    let options = CaptureOptions { threshold: 0.1, file: Some(path.clone()), clear: false };
    let mut out = Vec::new();

    let report = service().capture(&source, &options, &mut out).await.unwrap();

    assert!(report.is_empty());
    assert!(out.is_empty());
    assert!(read_report(&path).unwrap().is_empty());
}
