use chrono::NaiveDate;
use std::cmp::Ordering;
use tracing::{debug, info};

use crate::analyzers::aggregate::average_by_item;
use crate::analyzers::types::{ItemAverage, RankedItem, Ranking};
use crate::calendar::month_window;
use crate::config::AnalysisConfig;
use crate::errors::Result;
use crate::records::CanonicalRecord;
use crate::relation::Relation;
use crate::selector::select_window;

/// Ranks items by average rating within the reference date's month.
///
/// Top and bottom lists are computed independently from the same grouped
/// relation, so with fewer than `2 * top_n` items an item can appear in both.
pub struct RankingAnalyzer<'c> {
    config: &'c AnalysisConfig,
}

impl<'c> RankingAnalyzer<'c> {
    pub fn new(config: &'c AnalysisConfig) -> Self {
        Self { config }
    }

    #[tracing::instrument(skip_all, fields(date = %date))]
    pub fn analyze(
        &self,
        canonical: &Relation<CanonicalRecord>,
        date: NaiveDate,
    ) -> Result<Ranking> {
        let window = month_window(date, 1)?;
        let grouped = average_by_item(select_window(canonical, window)).collect();
        debug!(items = grouped.len(), start = %window.start, end = %window.end, "Grouped month");

        let top = grouped
            .query()
            .sort_by(highest_first)
            .limit(self.config.top_n)
            .map(RankedItem::from)
            .to_vec();
        let bottom = grouped
            .query()
            .sort_by(lowest_first)
            .limit(self.config.top_n)
            .map(RankedItem::from)
            .to_vec();

        if grouped.is_empty() {
            info!("No rated items in month");
        }

        Ok(Ranking {
            window,
            top,
            bottom,
        })
    }
}

/// Average descending, then review count descending, then item id.
fn highest_first(a: &ItemAverage, b: &ItemAverage) -> Ordering {
    b.avg_rating
        .total_cmp(&a.avg_rating)
        .then_with(|| b.count.cmp(&a.count))
        .then_with(|| a.key.cmp(&b.key))
}

/// Average ascending, then review count descending, then item id.
fn lowest_first(a: &ItemAverage, b: &ItemAverage) -> Ordering {
    a.avg_rating
        .total_cmp(&b.avg_rating)
        .then_with(|| b.count.cmp(&a.count))
        .then_with(|| a.key.cmp(&b.key))
}
