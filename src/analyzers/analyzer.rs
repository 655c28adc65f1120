use anyhow::Result;
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

use crate::analyzers::delta::DeltaAnalyzer;
use crate::analyzers::ranking::RankingAnalyzer;
use crate::cleaner::RecordCleaner;
use crate::config::AnalysisConfig;
use crate::output::AnalysisReport;
use crate::parser::load_raw;
use crate::records::{CanonicalRecord, RawRecord};
use crate::relation::Relation;

/// Cleans `raw` once and runs both analyses over the shared canonical relation.
pub fn analyze_relation(
    config: &AnalysisConfig,
    raw: &Relation<RawRecord>,
    date: NaiveDate,
) -> Result<AnalysisReport> {
    let canonical: Relation<CanonicalRecord> = RecordCleaner::new(config).clean(raw);

    let ranking = RankingAnalyzer::new(config).analyze(&canonical, date)?;
    let improvement = DeltaAnalyzer::new(config).analyze(&canonical, date)?;

    info!(
        top = ranking.top.len(),
        bottom = ranking.bottom.len(),
        improved = improvement.improved.len(),
        "Analysis complete"
    );

    Ok(AnalysisReport {
        reference_date: date,
        generated_at: chrono::Utc::now(),
        current_window: ranking.window,
        previous_window: improvement.previous_window,
        top: ranking.top,
        bottom: ranking.bottom,
        improved: improvement.improved,
    })
}

/// Loads the ratings and metadata files and analyzes the month of `date`.
pub fn analyze_files(
    config: &AnalysisConfig,
    ratings_path: &Path,
    metadata_path: &Path,
    date: NaiveDate,
) -> Result<AnalysisReport> {
    let date_str = date.format("%Y-%m-%d").to_string();
    info!("Starting analysis for date {}", date_str);

    let raw = load_raw(ratings_path, metadata_path)?;
    analyze_relation(config, &raw, date)
}
