use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use rating_trends::AnalysisError;
use rating_trends::analyzers::analyzer::{analyze_files, analyze_relation};
use rating_trends::calendar::parse_reference_date;
use rating_trends::cleaner::RecordCleaner;
use rating_trends::config::AnalysisConfig;
use rating_trends::parser::load_raw;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn march() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 3, 14).unwrap()
}

#[test]
fn test_full_pipeline() {
    let config = AnalysisConfig::default();
    let report = analyze_files(
        &config,
        &fixture("ratings.csv"),
        &fixture("metadata.json"),
        march(),
    )
    .expect("Failed to analyze fixtures");

    let top: Vec<_> = report.top.iter().map(|r| r.item_id.as_str()).collect();
    let bottom: Vec<_> = report.bottom.iter().map(|r| r.item_id.as_str()).collect();
    let improved: Vec<_> = report.improved.iter().map(|d| d.item_id.as_str()).collect();

    assert_eq!(top, vec!["A1", "A5", "A6", "A2"]);
    assert_eq!(bottom, vec!["A2", "A6", "A5", "A1"]);
    assert_eq!(improved, vec!["A1", "A5"]);

    let heat = &report.top[0];
    assert_eq!(heat.title, "Heat");
    assert_eq!(heat.review_count, 3);
    assert!((heat.avg_rating - 14.0 / 3.0).abs() < 1e-9);

    // The April 1st review of A2 sits on the window end and is excluded.
    let ran = &report.bottom[0];
    assert_eq!(ran.review_count, 1);
    assert_eq!(ran.avg_rating, 1.0);

    assert!((report.improved[0].delta - 5.0 / 3.0).abs() < 1e-9);
    assert_eq!(report.improved[1].delta, 1.0);
}

#[test]
fn test_cleaning_fixture() {
    let raw = load_raw(&fixture("ratings.csv"), &fixture("metadata.json")).unwrap();
    // A7 has no metadata and A8 has no ratings.
    assert_eq!(raw.len(), 15);

    let config = AnalysisConfig::default();
    let cleaner = RecordCleaner::new(&config);
    let canonical = cleaner.clean(&raw);
    assert_eq!(canonical.len(), 11);
    assert!(canonical.rows().iter().all(|r| r.item_id != "A3" && r.item_id != "A4"));
}

#[test]
fn test_gzip_metadata_matches_plain() {
    let gz_path = env::temp_dir().join("rating_trends_test_metadata.json.gz");
    let plain = fs::read(fixture("metadata.json")).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&plain).unwrap();
    fs::write(&gz_path, encoder.finish().unwrap()).unwrap();

    let config = AnalysisConfig::default();
    let from_gz = analyze_files(&config, &fixture("ratings.csv"), &gz_path, march()).unwrap();
    let from_plain = analyze_files(
        &config,
        &fixture("ratings.csv"),
        &fixture("metadata.json"),
        march(),
    )
    .unwrap();

    assert_eq!(from_gz.top, from_plain.top);
    assert_eq!(from_gz.bottom, from_plain.bottom);
    assert_eq!(from_gz.improved, from_plain.improved);

    fs::remove_file(&gz_path).unwrap();
}

#[test]
fn test_canonical_relation_reused_for_other_months() {
    let raw = load_raw(&fixture("ratings.csv"), &fixture("metadata.json")).unwrap();
    let config = AnalysisConfig::default();

    let february = analyze_relation(&config, &raw, NaiveDate::from_ymd_opt(2015, 2, 1).unwrap())
        .unwrap();
    let top: Vec<_> = february.top.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(top, vec!["A6", "A1", "A5"]);
    assert!(february.improved.is_empty());

    let empty = analyze_relation(&config, &raw, NaiveDate::from_ymd_opt(2016, 6, 1).unwrap())
        .unwrap();
    assert!(empty.top.is_empty());
    assert!(empty.bottom.is_empty());
    assert!(empty.improved.is_empty());
}

#[test]
fn test_invalid_reference_date() {
    assert!(matches!(
        parse_reference_date("2015/03/14"),
        Err(AnalysisError::InvalidDateFormat { .. })
    ));
}

#[test]
fn test_schema_mismatch_aborts() {
    let path = env::temp_dir().join("rating_trends_test_bad_ratings.csv");
    fs::write(&path, "R1,A1,5.0\n").unwrap();

    let config = AnalysisConfig::default();
    let err = analyze_files(&config, &path, &fixture("metadata.json"), march()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::SchemaMismatch { .. })
    ));

    fs::remove_file(&path).unwrap();
}
