//! Movie dataset ingestion.
//!
//! Reads raw movie rows (CSV export or JSON Lines), normalizes them into [`MovieRecord`]s
//! and turns those into index [`Document`](crate::types::Document)s.

pub mod literal;
pub mod loader;
pub mod record;

pub use loader::{load_movies, parse_movies, parse_movies_csv, Dataset, SkippedRow};
pub use record::MovieRecord;
