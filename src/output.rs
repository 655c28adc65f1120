//! Result reporting: structured log events and a JSON report file.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use crate::analyzers::types::{DeltaItem, RankedItem};
use crate::calendar::MonthWindow;

/// The three result sets for one reference month.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub reference_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub current_window: MonthWindow,
    pub previous_window: MonthWindow,
    pub top: Vec<RankedItem>,
    pub bottom: Vec<RankedItem>,
    pub improved: Vec<DeltaItem>,
}

/// Logs every result row as its own event.
pub fn log_report(report: &AnalysisReport) {
    log_ranked("top", &report.top);
    log_ranked("bottom", &report.bottom);

    if report.improved.is_empty() {
        info!(list = "improved", "No qualifying items");
    }
    for (rank, item) in report.improved.iter().enumerate() {
        info!(
            list = "improved",
            rank = rank + 1,
            item_id = %item.item_id,
            title = %item.title,
            avg_previous = item.avg_previous,
            avg_current = item.avg_current,
            delta = item.delta,
            "Improved item"
        );
    }
}

fn log_ranked(list: &str, items: &[RankedItem]) {
    if items.is_empty() {
        info!(list, "No qualifying items");
    }
    for (rank, item) in items.iter().enumerate() {
        info!(
            list,
            rank = rank + 1,
            item_id = %item.item_id,
            title = %item.title,
            avg_rating = item.avg_rating,
            review_count = item.review_count,
            "Ranked item"
        );
    }
}

/// Logs the report as pretty-printed JSON.
pub fn print_json(report: &AnalysisReport) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Writes the report as pretty JSON, creating parent directories as needed.
pub fn write_json(path: &Path, report: &AnalysisReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    info!(path = %path.display(), "Report written");

    Ok(())
}
