//! Ingestion of the ratings CSV and the item metadata JSON lines, joined into
//! the raw relation.

use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::errors::{AnalysisError, Result};
use crate::records::{CategoryNode, RawRecord};
use crate::relation::Relation;

/// Column order of the ratings file.
pub const RATING_COLUMNS: [&str; 4] = ["reviewerID", "asin", "overall", "unixReviewTime"];

/// One line of the ratings file.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRow {
    pub reviewer_id: String,
    pub item_id: String,
    pub rating: String,
    pub review_time: Option<i64>,
    pub corrupt_record: Option<String>,
}

/// One line of the metadata file, reduced to the columns the pipeline reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemMetadata {
    pub item_id: String,
    pub title: Option<String>,
    pub categories: Option<Vec<CategoryNode>>,
}

/// Reads headerless ratings CSV. A leading header row naming the expected
/// columns is skipped.
///
/// # Errors
///
/// Returns [`AnalysisError::SchemaMismatch`] when a record does not have
/// exactly four columns.
pub fn read_ratings<R: Read>(reader: R) -> Result<Vec<RatingRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        let line = record.position().map_or(index as u64 + 1, |p| p.line());

        if record.len() != RATING_COLUMNS.len() {
            let column = RATING_COLUMNS.get(record.len()).copied().unwrap_or("<extra>");
            return Err(AnalysisError::schema(
                column,
                format!(
                    "expected {} columns, found {} on line {line}",
                    RATING_COLUMNS.len(),
                    record.len()
                ),
            ));
        }

        if index == 0 && record.iter().eq(RATING_COLUMNS.iter().copied()) {
            continue;
        }

        let field = |i: usize| record.get(i).unwrap_or_default().trim().to_string();
        let item_id = field(1);
        let review_time = field(3).parse::<i64>().ok();

        let corrupt_record = if review_time.is_none() || item_id.is_empty() {
            Some(record.iter().collect::<Vec<_>>().join(","))
        } else {
            None
        };
        if corrupt_record.is_some() {
            debug!(line, "Marking ratings record corrupt");
        }

        rows.push(RatingRow {
            reviewer_id: field(0),
            item_id,
            rating: field(2),
            review_time,
            corrupt_record,
        });
    }

    Ok(rows)
}

/// Reads JSON-lines item metadata.
///
/// Lines may use single-quoted strings, as the published dumps do. Lines that
/// are not objects with an `asin` are skipped: without a key they can never
/// join a rating.
///
/// # Errors
///
/// Returns [`AnalysisError::SchemaMismatch`] when `title` is not a string or
/// `categories` is not a (nested) list of strings.
pub fn read_metadata<R: BufRead>(reader: R) -> Result<Vec<ItemMetadata>> {
    let mut items = Vec::new();
    let mut skipped = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let object = match parse_line(trimmed) {
            Some(Value::Object(object)) => object,
            _ => {
                skipped += 1;
                debug!(line = index + 1, "Skipping unparsable metadata line");
                continue;
            }
        };

        match parse_item(object)? {
            Some(item) => items.push(item),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "Skipped metadata lines without a usable asin");
    }

    Ok(items)
}

/// Strict JSON first, then JSON5 for single-quoted lines.
fn parse_line(line: &str) -> Option<Value> {
    serde_json::from_str::<Value>(line)
        .ok()
        .or_else(|| json5::from_str::<Value>(line).ok())
}

fn parse_item(mut object: Map<String, Value>) -> Result<Option<ItemMetadata>> {
    let item_id = match object.remove("asin") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Ok(None),
    };

    let title = match object.remove("title") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            return Err(AnalysisError::schema(
                "title",
                format!("expected string for asin {item_id}, found {}", type_name(&other)),
            ));
        }
    };

    let categories = match object.remove("categories") {
        None | Some(Value::Null) => None,
        Some(value @ Value::Array(_)) => {
            Some(serde_json::from_value::<Vec<CategoryNode>>(value).map_err(|e| {
                AnalysisError::schema(
                    "categories",
                    format!("expected nested lists of strings for asin {item_id}: {e}"),
                )
            })?)
        }
        Some(other) => {
            return Err(AnalysisError::schema(
                "categories",
                format!("expected array for asin {item_id}, found {}", type_name(&other)),
            ));
        }
    };

    Ok(Some(ItemMetadata {
        item_id,
        title,
        categories,
    }))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Opens the ratings file at `path`.
pub fn load_ratings(path: &Path) -> Result<Vec<RatingRow>> {
    read_ratings(File::open(path)?)
}

/// Opens the metadata file at `path`, decompressing it when it ends in `.gz`.
pub fn load_metadata(path: &Path) -> Result<Vec<ItemMetadata>> {
    let file = File::open(path)?;
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        read_metadata(BufReader::new(GzDecoder::new(file)))
    } else {
        read_metadata(BufReader::new(file))
    }
}

/// Inner-joins ratings with metadata on the item identifier.
pub fn join_records(ratings: Vec<RatingRow>, metadata: Vec<ItemMetadata>) -> Relation<RawRecord> {
    let ratings = Relation::from_rows(ratings);
    let metadata = Relation::from_rows(metadata);

    let raw = ratings
        .query()
        .join(
            metadata.query(),
            |r| r.item_id.clone(),
            |m| m.item_id.clone(),
        )
        .map(|(rating, item)| RawRecord {
            reviewer_id: rating.reviewer_id,
            item_id: rating.item_id,
            rating: rating.rating,
            review_time: rating.review_time,
            title: item.title,
            categories: item.categories,
            corrupt_record: rating.corrupt_record,
        })
        .collect();
    raw
}

/// Loads both files and returns the joined raw relation.
#[tracing::instrument(
    skip_all,
    fields(ratings = %ratings_path.display(), metadata = %metadata_path.display())
)]
pub fn load_raw(ratings_path: &Path, metadata_path: &Path) -> Result<Relation<RawRecord>> {
    let ratings = load_ratings(ratings_path)?;
    let metadata = load_metadata(metadata_path)?;
    let (rating_rows, items) = (ratings.len(), metadata.len());

    let raw = join_records(ratings, metadata);
    info!(rating_rows, items, joined = raw.len(), "Loaded raw relation");

    Ok(raw)
}
