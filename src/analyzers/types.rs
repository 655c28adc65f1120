//! Result types produced by the analyzers.

use serde::Serialize;

use crate::calendar::MonthWindow;
use crate::records::ItemKey;

/// Average rating and review count of one item inside one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemAverage {
    pub(crate) key: ItemKey,
    pub(crate) avg_rating: f64,
    pub(crate) count: usize,
}

/// A ranked item for a single month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub item_id: String,
    pub title: String,
    pub avg_rating: f64,
    pub review_count: usize,
}

/// An item whose monthly average rose versus the previous month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaItem {
    pub item_id: String,
    pub title: String,
    pub avg_previous: f64,
    pub avg_current: f64,
    pub delta: f64,
}

/// Top and bottom lists for one month.
#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    pub window: MonthWindow,
    pub top: Vec<RankedItem>,
    pub bottom: Vec<RankedItem>,
}

/// Most improved items, current month versus the previous one.
#[derive(Debug, Clone, Serialize)]
pub struct Improvement {
    pub previous_window: MonthWindow,
    pub current_window: MonthWindow,
    pub improved: Vec<DeltaItem>,
}

impl From<ItemAverage> for RankedItem {
    fn from(average: ItemAverage) -> Self {
        RankedItem {
            item_id: average.key.item_id,
            title: average.key.title,
            avg_rating: average.avg_rating,
            review_count: average.count,
        }
    }
}
