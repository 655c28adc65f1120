pub mod analyzers;
pub mod calendar;
pub mod cleaner;
pub mod config;
pub mod errors;
pub mod output;
pub mod parser;
pub mod records;
pub mod relation;
pub mod selector;

pub use errors::{AnalysisError, Result};
