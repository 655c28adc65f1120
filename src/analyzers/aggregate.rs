use crate::analyzers::types::ItemAverage;
use crate::analyzers::utility::mean;
use crate::records::{CanonicalRecord, ItemKey};
use crate::relation::Query;

/// Groups rows by (item, title) into average rating and review count.
///
/// Only items with at least one row appear, so `count >= 1` always holds.
pub fn average_by_item<'a>(rows: Query<'a, CanonicalRecord>) -> Query<'a, ItemAverage> {
    rows.group_by(
        |row: &CanonicalRecord| row.item_key(),
        |key: ItemKey, members: Vec<CanonicalRecord>| {
            let ratings: Vec<f64> = members.iter().map(|m| m.rating.value()).collect();
            ItemAverage {
                key,
                avg_rating: mean(&ratings),
                count: ratings.len(),
            }
        },
    )
}
