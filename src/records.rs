//! Row types flowing through the pipeline: raw joined ratings, the nested
//! category tree, and cleaned canonical rows.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A category list entry; metadata nests category paths as lists of lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryNode {
    Scalar(String),
    Nested(Vec<CategoryNode>),
}

/// Flattens a category tree of any depth into its scalar leaves, in order.
pub fn flatten_categories(nodes: &[CategoryNode]) -> Vec<String> {
    let mut leaves = Vec::new();
    let mut stack: Vec<&CategoryNode> = nodes.iter().rev().collect();

    while let Some(node) = stack.pop() {
        match node {
            CategoryNode::Scalar(value) => leaves.push(value.clone()),
            CategoryNode::Nested(children) => stack.extend(children.iter().rev()),
        }
    }

    leaves
}

/// One rating joined with its item metadata, as ingested. Nothing here is
/// trusted; the cleaner decides what survives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RawRecord {
    pub reviewer_id: String,
    pub item_id: String,
    /// Rating as read from the source, not yet parsed.
    pub rating: String,
    /// Unix epoch seconds.
    pub review_time: Option<i64>,
    pub title: Option<String>,
    pub categories: Option<Vec<CategoryNode>>,
    /// Set by ingestion when the source row failed to parse.
    pub corrupt_record: Option<String>,
}

/// A numeric rating. Finite by construction, so it is totally ordered and
/// hashable.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct Rating(f64);

impl Rating {
    /// Parses `text` and accepts it only inside `[min, max]`.
    pub fn parse(text: &str, min: f64, max: f64) -> Option<Self> {
        let value: f64 = text.trim().parse().ok()?;
        (value.is_finite() && value >= min && value <= max).then_some(Rating(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Rating {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Rating {}

impl Hash for Rating {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for Rating {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rating {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// A cleaned rating row: valid, single category, one per
/// (item, title, reviewer, review date).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CanonicalRecord {
    pub item_id: String,
    pub title: String,
    pub reviewer_id: String,
    pub rating: Rating,
    pub review_date: NaiveDate,
    pub category: String,
}

impl CanonicalRecord {
    pub fn item_key(&self) -> ItemKey {
        ItemKey {
            item_id: self.item_id.clone(),
            title: self.title.clone(),
        }
    }
}

/// Lets a cleaned relation be fed back through the cleaner.
impl From<CanonicalRecord> for RawRecord {
    fn from(record: CanonicalRecord) -> Self {
        RawRecord {
            reviewer_id: record.reviewer_id,
            item_id: record.item_id,
            rating: record.rating.value().to_string(),
            review_time: Some(
                record
                    .review_date
                    .and_time(NaiveTime::MIN)
                    .and_utc()
                    .timestamp(),
            ),
            title: Some(record.title),
            categories: Some(vec![CategoryNode::Scalar(record.category)]),
            corrupt_record: None,
        }
    }
}

/// Grouping key for per-item aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemKey {
    pub item_id: String,
    pub title: String,
}
