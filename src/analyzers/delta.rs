use chrono::NaiveDate;
use tracing::{debug, info};

use crate::analyzers::aggregate::average_by_item;
use crate::analyzers::types::{DeltaItem, Improvement};
use crate::calendar::month_window;
use crate::config::AnalysisConfig;
use crate::errors::Result;
use crate::records::CanonicalRecord;
use crate::relation::Relation;
use crate::selector::select_window;

/// Finds the items whose average rating rose most versus the previous month.
///
/// Only items rated in both months are compared, and only strict increases
/// qualify. Fewer than `top_n` qualifying items yields a shorter list.
pub struct DeltaAnalyzer<'c> {
    config: &'c AnalysisConfig,
}

impl<'c> DeltaAnalyzer<'c> {
    pub fn new(config: &'c AnalysisConfig) -> Self {
        Self { config }
    }

    #[tracing::instrument(skip_all, fields(date = %date))]
    pub fn analyze(
        &self,
        canonical: &Relation<CanonicalRecord>,
        date: NaiveDate,
    ) -> Result<Improvement> {
        let current_window = month_window(date, 1)?;
        let previous_window = current_window.previous_month()?;
        debug!(
            previous_start = %previous_window.start,
            current_start = %current_window.start,
            current_end = %current_window.end,
            "Comparing months"
        );

        let previous = average_by_item(select_window(canonical, previous_window));
        let current = average_by_item(select_window(canonical, current_window));

        let improved = previous
            .join(current, |p| p.key.clone(), |c| c.key.clone())
            .filter(|(p, c)| c.avg_rating > p.avg_rating)
            .map(|(p, c)| DeltaItem {
                item_id: c.key.item_id,
                title: c.key.title,
                avg_previous: p.avg_rating,
                avg_current: c.avg_rating,
                delta: (c.avg_rating - p.avg_rating).abs(),
            })
            .sort_by(|a, b| {
                b.delta
                    .total_cmp(&a.delta)
                    .then_with(|| a.item_id.cmp(&b.item_id))
                    .then_with(|| a.title.cmp(&b.title))
            })
            .limit(self.config.top_n)
            .to_vec();

        if improved.is_empty() {
            info!("No items improved over the previous month");
        }

        Ok(Improvement {
            previous_window,
            current_window,
            improved,
        })
    }
}
