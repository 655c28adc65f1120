use crate::calendar::MonthWindow;
use crate::records::CanonicalRecord;
use crate::relation::{Query, Relation};

/// Lazily selects rows whose review date falls in `[window.start, window.end)`.
pub fn select_window(
    canonical: &Relation<CanonicalRecord>,
    window: MonthWindow,
) -> Query<'_, CanonicalRecord> {
    canonical
        .query()
        .filter(move |row| window.contains(row.review_date))
}
