//! Turns the raw joined relation into canonical rows.

use chrono::{DateTime, NaiveDate};
use std::cmp::Ordering;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::records::{CanonicalRecord, Rating, RawRecord, flatten_categories};
use crate::relation::{Query, Relation};

/// A raw row with its review date derived.
struct Dated {
    record: RawRecord,
    review_date: NaiveDate,
}

/// One category leaf of a dated row. `categories` has already been taken out.
struct Exploded {
    record: RawRecord,
    review_date: NaiveDate,
    category: String,
}

/// A canonical row still carrying the raw timestamp used to pick a survivor
/// among duplicates.
struct Candidate {
    canonical: CanonicalRecord,
    review_time: i64,
}

#[derive(PartialEq, Eq, Hash)]
struct DedupKey {
    item_id: String,
    title: String,
    reviewer_id: String,
    review_date: NaiveDate,
}

/// Filters and normalizes raw ratings. Anomalies are dropped, never raised.
pub struct RecordCleaner<'c> {
    config: &'c AnalysisConfig,
}

impl<'c> RecordCleaner<'c> {
    pub fn new(config: &'c AnalysisConfig) -> Self {
        Self { config }
    }

    /// Builds the lazy cleaning plan over `raw`.
    pub fn plan<'a>(&self, raw: &'a Relation<RawRecord>) -> Query<'a, CanonicalRecord>
    where
        'c: 'a,
    {
        let config = self.config;

        raw.query()
            .filter_map(with_review_date)
            .filter(|row| row.record.corrupt_record.is_none())
            .filter(|row| row.record.title.is_some())
            .unnest(explode_categories)
            .filter(move |row| config.is_allowed(&row.category))
            .filter_map(move |row| to_candidate(row, config))
            .reduce_by_key(dedup_key, prefer)
            .map(|candidate| candidate.canonical)
    }

    /// Runs the plan and materializes the canonical relation.
    #[tracing::instrument(skip_all, fields(raw_rows = raw.len()))]
    pub fn clean(&self, raw: &Relation<RawRecord>) -> Relation<CanonicalRecord> {
        let canonical = self.plan(raw).collect();

        let dropped = raw.len().saturating_sub(canonical.len());
        debug!(dropped, "Rows filtered or merged during cleaning");
        info!(canonical_rows = canonical.len(), "Cleaned ratings");

        canonical
    }
}

fn with_review_date(record: RawRecord) -> Option<Dated> {
    let review_date = DateTime::from_timestamp(record.review_time?, 0)?.date_naive();
    Some(Dated {
        record,
        review_date,
    })
}

fn explode_categories(row: Dated) -> Vec<Exploded> {
    let Dated {
        mut record,
        review_date,
    } = row;
    let leaves = record
        .categories
        .take()
        .map(|nodes| flatten_categories(&nodes))
        .unwrap_or_default();

    leaves
        .into_iter()
        .map(|category| Exploded {
            record: record.clone(),
            review_date,
            category,
        })
        .collect()
}

fn to_candidate(row: Exploded, config: &AnalysisConfig) -> Option<Candidate> {
    let Exploded {
        record,
        review_date,
        category,
    } = row;
    let rating = Rating::parse(&record.rating, config.min_rating, config.max_rating)?;

    Some(Candidate {
        canonical: CanonicalRecord {
            item_id: record.item_id,
            title: record.title?,
            reviewer_id: record.reviewer_id,
            rating,
            review_date,
            category,
        },
        review_time: record.review_time?,
    })
}

fn dedup_key(candidate: &Candidate) -> DedupKey {
    let c = &candidate.canonical;
    DedupKey {
        item_id: c.item_id.clone(),
        title: c.title.clone(),
        reviewer_id: c.reviewer_id.clone(),
        review_date: c.review_date,
    }
}

/// Latest review wins, then the higher rating, then the smaller category.
fn prefer(current: Candidate, incoming: Candidate) -> Candidate {
    let ordering = incoming
        .review_time
        .cmp(&current.review_time)
        .then_with(|| incoming.canonical.rating.cmp(&current.canonical.rating))
        .then_with(|| current.canonical.category.cmp(&incoming.canonical.category));

    if ordering == Ordering::Greater {
        incoming
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CategoryNode;
    use std::collections::HashSet;

    #[test]
    fn test_drops_corrupt_untitled_and_foreign_rows() {
        let mut corrupt = raw("R1", "A1", "5", 1_420_070_400);
        corrupt.corrupt_record = Some("A1,R1,,x".to_string());

        let mut untitled = raw("R2", "A1", "5", 1_420_070_400);
        untitled.title = None;

        let mut books = raw("R3", "A1", "5", 1_420_070_400);
        books.categories = Some(vec![nested(&["Books"])]);

        let mut no_time = raw("R4", "A1", "5", 0);
        no_time.review_time = None;

        let bad_rating = raw("R5", "A1", "excellent", 1_420_070_400);
        let out_of_range = raw("R6", "A1", "9", 1_420_070_400);
        let keep = raw("R7", "A1", "4", 1_420_070_400);

        let canonical = clean(vec![
            corrupt,
            untitled,
            books,
            no_time,
            bad_rating,
            out_of_range,
            keep,
        ]);

        assert_eq!(canonical.len(), 1);
        let row = &canonical.rows()[0];
        assert_eq!(row.reviewer_id, "R7");
        assert_eq!(row.rating.value(), 4.0);
        assert_eq!(row.review_date, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
    }

    #[test]
    fn test_review_date_is_utc() {
        // 2015-01-31T23:30:00Z
        let canonical = clean(vec![raw("R1", "A1", "3", 1_422_747_000)]);
        assert_eq!(
            canonical.rows()[0].review_date,
            NaiveDate::from_ymd_opt(2015, 1, 31).unwrap()
        );
    }

    #[test]
    fn test_both_allowed_categories_count_once() {
        let mut record = raw("R1", "A1", "4", 1_420_070_400);
        record.categories = Some(vec![nested(&["Movies & TV", "Movies"]), nested(&["Drama"])]);

        let canonical = clean(vec![record]);
        assert_eq!(canonical.len(), 1);
        assert_eq!(canonical.rows()[0].category, "Movies");
    }

    #[test]
    fn test_deeply_nested_categories_are_flattened() {
        let mut record = raw("R1", "A1", "4", 1_420_070_400);
        record.categories = Some(vec![CategoryNode::Nested(vec![CategoryNode::Nested(vec![
            CategoryNode::Nested(vec![CategoryNode::Scalar("Movies & TV".to_string())]),
        ])])]);

        let canonical = clean(vec![record]);
        assert_eq!(canonical.len(), 1);
        assert_eq!(canonical.rows()[0].category, "Movies & TV");
    }

    #[test]
    fn test_same_review_day_keeps_latest() {
        let early = raw("R1", "A1", "2", 1_420_070_400);
        let late = raw("R1", "A1", "5", 1_420_070_400 + 3_600);
        let other_reviewer = raw("R2", "A1", "1", 1_420_070_400);

        let canonical = clean(vec![late.clone(), early.clone(), other_reviewer.clone()]);
        let again = clean(vec![early, other_reviewer, late]);

        assert_eq!(canonical.len(), 2);
        assert_eq!(as_set(&canonical), as_set(&again));
        let r1 = canonical
            .rows()
            .iter()
            .find(|r| r.reviewer_id == "R1")
            .unwrap();
        assert_eq!(r1.rating.value(), 5.0);
    }

    #[test]
    fn test_invariants_hold_after_cleaning() {
        let config = AnalysisConfig::default();
        let canonical = clean(sample_rows());

        let unique: HashSet<_> = canonical.rows().iter().collect();
        assert_eq!(unique.len(), canonical.len());
        for row in canonical.rows() {
            assert!(config.is_allowed(&row.category));
            assert!(!row.title.is_empty());
        }
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let once = clean(sample_rows());
        let round_trip: Vec<RawRecord> = once.rows().iter().cloned().map(RawRecord::from).collect();
        let twice = clean(round_trip);

        assert_eq!(as_set(&once), as_set(&twice));
    }

    #[test]
    fn test_plan_count_matches_clean() {
        let config = AnalysisConfig::default();
        let raw = Relation::from_rows(sample_rows());
        let plan = RecordCleaner::new(&config).plan(&raw);
        assert_eq!(plan.count(), clean(sample_rows()).len());
    }

    // Helper functions for tests
    fn clean(rows: Vec<RawRecord>) -> Relation<CanonicalRecord> {
        let config = AnalysisConfig::default();
        RecordCleaner::new(&config).clean(&Relation::from_rows(rows))
    }

    fn as_set(relation: &Relation<CanonicalRecord>) -> HashSet<CanonicalRecord> {
        relation.rows().iter().cloned().collect()
    }

    fn nested(values: &[&str]) -> CategoryNode {
        CategoryNode::Nested(
            values
                .iter()
                .map(|v| CategoryNode::Scalar(v.to_string()))
                .collect(),
        )
    }

    fn raw(reviewer: &str, item: &str, rating: &str, time: i64) -> RawRecord {
        RawRecord {
            reviewer_id: reviewer.to_string(),
            item_id: item.to_string(),
            rating: rating.to_string(),
            review_time: Some(time),
            title: Some(format!("Title of {item}")),
            categories: Some(vec![nested(&["Movies & TV", "Movies"])]),
            corrupt_record: None,
        }
    }

    fn sample_rows() -> Vec<RawRecord> {
        let mut rows = vec![
            raw("R1", "A1", "5", 1_425_168_000),
            raw("R1", "A1", "5", 1_425_168_000),
            raw("R2", "A1", "4.0", 1_425_254_400),
            raw("R3", "A2", "1", 1_422_748_800),
            raw("R3", "A3", "2", 1_422_748_800),
        ];
        let mut tv_only = raw("R4", "A4", "3", 1_425_168_000);
        tv_only.categories = Some(vec![CategoryNode::Scalar("TV".to_string())]);
        rows.push(tv_only);
        rows
    }
}
