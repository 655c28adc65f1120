//! A minimal in-process relation engine.
//!
//! [`Relation`] is an immutable, cheaply clonable set of rows. [`Query`] is a
//! lazy plan built from it: filters, unnests and maps are fused into a single
//! pull-based pipeline, and breakers (group-by, join, sort) run only when the
//! first row is pulled. Nothing executes until [`Query::collect`] or
//! [`Query::to_vec`] is called.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Immutable rows shared by reference count.
pub struct Relation<R> {
    rows: Arc<[R]>,
}

impl<R> Relation<R> {
    pub fn from_rows(rows: Vec<R>) -> Self {
        Self { rows: rows.into() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }
}

impl<R: Clone> Relation<R> {
    /// Starts a lazy plan scanning this relation.
    pub fn query(&self) -> Query<'_, R> {
        Query::new(self.rows.iter().cloned())
    }
}

impl<R> Clone for Relation<R> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for Relation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("len", &self.rows.len())
            .finish()
    }
}

impl<R> FromIterator<R> for Relation<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self::from_rows(iter.into_iter().collect())
    }
}

/// A lazy query plan producing rows of type `R`.
pub struct Query<'a, R> {
    plan: Box<dyn Iterator<Item = R> + 'a>,
}

impl<'a, R: 'a> Query<'a, R> {
    pub fn new(rows: impl Iterator<Item = R> + 'a) -> Self {
        Self {
            plan: Box::new(rows),
        }
    }

    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: FnMut(&R) -> bool + 'a,
    {
        Query::new(self.plan.filter(predicate))
    }

    pub fn map<S: 'a, F>(self, f: F) -> Query<'a, S>
    where
        F: FnMut(R) -> S + 'a,
    {
        Query::new(self.plan.map(f))
    }

    pub fn filter_map<S: 'a, F>(self, f: F) -> Query<'a, S>
    where
        F: FnMut(R) -> Option<S> + 'a,
    {
        Query::new(self.plan.filter_map(f))
    }

    /// Expands each row into zero or more output rows.
    pub fn unnest<S: 'a, I, F>(self, f: F) -> Query<'a, S>
    where
        I: IntoIterator<Item = S> + 'a,
        I::IntoIter: 'a,
        F: FnMut(R) -> I + 'a,
    {
        Query::new(self.plan.flat_map(f))
    }

    /// Drops rows identical to one already emitted.
    pub fn distinct(self) -> Self
    where
        R: Eq + Hash + Clone,
    {
        let mut seen = HashSet::new();
        Query::new(self.plan.filter(move |row| seen.insert(row.clone())))
    }

    /// Collapses rows sharing a key into one, folding them with `reduce`.
    pub fn reduce_by_key<K, KF, RF>(self, mut key: KF, mut reduce: RF) -> Self
    where
        K: Eq + Hash + 'a,
        KF: FnMut(&R) -> K + 'a,
        RF: FnMut(R, R) -> R + 'a,
    {
        self.deferred(move |rows| {
            let mut kept: HashMap<K, R> = HashMap::new();
            for row in rows {
                let k = key(&row);
                let merged = match kept.remove(&k) {
                    Some(existing) => reduce(existing, row),
                    None => row,
                };
                kept.insert(k, merged);
            }
            kept.into_values().collect()
        })
    }

    /// Groups rows by key and turns each group into one output row.
    pub fn group_by<K, S, KF, AF>(self, mut key: KF, mut aggregate: AF) -> Query<'a, S>
    where
        K: Eq + Hash + 'a,
        S: 'a,
        KF: FnMut(&R) -> K + 'a,
        AF: FnMut(K, Vec<R>) -> S + 'a,
    {
        self.deferred(move |rows| {
            let mut groups: HashMap<K, Vec<R>> = HashMap::new();
            for row in rows {
                groups.entry(key(&row)).or_default().push(row);
            }
            groups
                .into_iter()
                .map(|(k, members)| aggregate(k, members))
                .collect()
        })
    }

    /// Inner hash join; the right side is the build side.
    pub fn join<S, K, KL, KR>(
        self,
        right: Query<'a, S>,
        mut left_key: KL,
        mut right_key: KR,
    ) -> Query<'a, (R, S)>
    where
        R: Clone,
        S: Clone + 'a,
        K: Eq + Hash + 'a,
        KL: FnMut(&R) -> K + 'a,
        KR: FnMut(&S) -> K + 'a,
    {
        self.deferred(move |left| {
            let mut build: HashMap<K, Vec<S>> = HashMap::new();
            for row in right.plan {
                build.entry(right_key(&row)).or_default().push(row);
            }

            let mut joined = Vec::new();
            for row in left {
                if let Some(matches) = build.get(&left_key(&row)) {
                    for other in matches {
                        joined.push((row.clone(), other.clone()));
                    }
                }
            }
            joined
        })
    }

    pub fn sort_by<F>(self, compare: F) -> Self
    where
        F: FnMut(&R, &R) -> Ordering + 'a,
    {
        self.deferred(move |rows| {
            let mut sorted: Vec<R> = rows.collect();
            sorted.sort_by(compare);
            sorted
        })
    }

    pub fn limit(self, n: usize) -> Self {
        Query::new(self.plan.take(n))
    }

    /// Executes the plan into a new relation.
    pub fn collect(self) -> Relation<R> {
        Relation::from_rows(self.to_vec())
    }

    /// Executes the plan, keeping row order.
    pub fn to_vec(self) -> Vec<R> {
        self.plan.collect()
    }

    pub fn count(self) -> usize {
        self.plan.count()
    }

    /// Wraps a pipeline breaker so that it runs on the first pull, not at
    /// plan construction.
    fn deferred<S: 'a, F>(self, run: F) -> Query<'a, S>
    where
        F: FnOnce(Box<dyn Iterator<Item = R> + 'a>) -> Vec<S> + 'a,
    {
        let mut pending = Some((self.plan, run));
        let mut output = Vec::new().into_iter();
        Query::new(std::iter::from_fn(move || {
            if let Some((plan, run)) = pending.take() {
                output = run(plan).into_iter();
            }
            output.next()
        }))
    }
}
