//! # Metric Sheet
//!
//! Reads the metrics exported by a supply-chain business simulation from Excel and OpenDocument
//! workbooks. The exports are loosely formatted: sheet and column names drift between versions,
//! numbers come as display strings (`"€ 1,234"`, `"(1,234)"`, `"-2.8%"`) and rounds are tagged in
//! several ways. This crate tolerates all of it and returns plain numbers per round.
//!
//! ## Features
//!
//! - **Workbook loading**: `.xlsx`, `.xlsm`, `.xlam` and `.ods`, from a path or uploaded bytes
//! - **Cell normalization**: currency symbols, thousands separators, accounting negatives, percents
//! - **Round tokens**: `1`, `1.0`, `"R1"`, `"Round 1"` and sheet names such as `KPI_R1`
//! - **Fuzzy lookup**: sheets and columns by case- and whitespace-insensitive keywords
//! - **Metric extraction**: long, wide and round-column tables, with sum, mean and weighted mean
//! - **Explicit absence**: a metric is present, unavailable or not found, never a silent default
//! - **Caching**: loaded workbooks memoized by file identity or content hash
//!
//! ## Example
//!
//! ```no_run
//! use metric_sheet::{Catalog, Criteria, MetricsExtractor, Round, WorkbookCache};
//!
//! let mut cache = WorkbookCache::new(Criteria::default());
//! let workbook = cache.get_or_open("rounds.xlsx")?;
//! let extractor = MetricsExtractor::new(workbook);
//! for metric in extractor.metrics(&Catalog::default(), Round::new(2)) {
//!     println!("{}: {}", metric.name, metric.display_value());
//! }
//! # Ok::<(), metric_sheet::MetricSheetError>(())
//! ```
mod error;
mod helpers;

pub mod cache;
pub mod export;
pub mod metrics;
pub mod spreadsheet;
pub mod workbook;

pub use cache::CacheKey;
pub use cache::WorkbookCache;
pub use error::MetricSheetError;
pub use metrics::Aggregation;
pub use metrics::Catalog;
pub use metrics::LabeledRow;
pub use metrics::MatchPolicy;
pub use metrics::Metric;
pub use metrics::MetricCard;
pub use metrics::MetricDefinition;
pub use metrics::MetricValue;
pub use metrics::MetricsExtractor;
pub use metrics::Round;
pub use metrics::Unit;
pub use spreadsheet::Criteria;
pub use spreadsheet::SpreadsheetError;
pub use workbook::CellValue;
pub use workbook::Table;
pub use workbook::Workbook;
