//! # Metric Extraction
//!
//! Turns the loosely formatted sheets of a simulation export into numbers:
//!
//! - [`normalize`]: display-formatted cells (`"€ 1,234"`, `"(12)"`, `"-2.8%"`) to numbers
//! - [`round`]: round labels (`1`, `"R1"`, `"Round 1"`) to [`Round`]
//! - [`locate`]: keyword lookup of sheets and columns
//! - [`aggregate`]: reading one metric out of a located table
//! - [`extractor`]: the [`MetricsExtractor`] tying the pieces together
pub mod aggregate;
pub mod catalog;
pub mod display;
pub mod extractor;
pub mod locate;
pub mod normalize;
pub mod round;

pub use aggregate::Aggregation;
pub use aggregate::MetricQuery;
pub use aggregate::MetricValue;
pub use catalog::Catalog;
pub use catalog::MetricDefinition;
pub use display::Unit;
pub use extractor::LabeledRow;
pub use extractor::Metric;
pub use extractor::MetricCard;
pub use extractor::MetricsExtractor;
pub use locate::MatchPolicy;
pub use round::Round;
