//! Monthly rating analyses.
//!
//! Both analyzers read the same cleaned relation: [`ranking`] lists the best
//! and worst rated items of a month, [`delta`] the items whose average rose
//! most versus the previous month. [`analyzer`] wires ingestion, cleaning and
//! both analyses into one report.

pub mod aggregate;
pub mod analyzer;
pub mod delta;
pub mod ranking;
pub mod types;
pub mod utility;
