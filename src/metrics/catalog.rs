use crate::error::MetricSheetError;
use crate::metrics::aggregate::Aggregation;
use crate::metrics::aggregate::MetricQuery;
use crate::metrics::display::Unit;
use serde::Deserialize;

/// Where a metric lives and how it is read.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MetricDefinition {
    pub name: String,
    /// Keywords the sheet name must contain; empty searches every sheet.
    #[serde(default)]
    pub sheet_keywords: Vec<String>,
    /// Other names of the metric, besides `name`.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Display unit; inferred from the name when absent.
    #[serde(default)]
    pub unit: Option<Unit>,
    #[serde(default)]
    pub aggregation: Aggregation,
}

impl MetricDefinition {
    pub fn new(name: &str, sheet_keywords: &[&str], aliases: &[&str]) -> Self {
        MetricDefinition {
            name: name.to_owned(),
            sheet_keywords: sheet_keywords.iter().map(|keyword| keyword.to_string()).collect(),
            aliases: aliases.iter().map(|alias| alias.to_string()).collect(),
            unit: None,
            aggregation: Aggregation::First,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn unit(&self) -> Unit {
        self.unit.unwrap_or_else(|| Unit::infer(&self.name))
    }

    pub fn query(&self) -> MetricQuery {
        MetricQuery::new(&self.name).with_aliases(&self.aliases)
    }
}

/// An ordered set of metric definitions.
///
/// The default catalog covers the headline metrics of the simulation exports. Custom catalogs
/// are read from TOML:
///
/// ```toml
/// [[metric]]
/// name = "Service level"
/// sheet_keywords = ["sales"]
/// aliases = ["Service level (order lines, %)"]
/// unit = "percent"
/// aggregation = { weighted_mean = { weight_column = "Volume" } }
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Catalog {
    #[serde(rename = "metric", default)]
    metrics: Vec<MetricDefinition>,
}

impl Catalog {
    pub fn new(metrics: Vec<MetricDefinition>) -> Self {
        Catalog { metrics }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, MetricSheetError> {
        Ok(toml::from_str(text)?)
    }

    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.metrics.iter().find(|metric| metric.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDefinition> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new(vec![
            MetricDefinition::new("ROI", &[], &["ROI (%)", "Return on investment"]).with_unit(Unit::Percent),
            MetricDefinition::new("Realized revenue", &[], &["Realized revenue (€)", "Revenue"]),
            MetricDefinition::new("Gross margin", &[], &["Gross margin (€)"]),
            MetricDefinition::new("Bonus or penalties", &[], &["Total bonus or penalties"]),
            MetricDefinition::new(
                "Service level",
                &["sales"],
                &["Service level (order lines, %)", "Service level outbound order lines", "Service level (%)"],
            ),
            MetricDefinition::new("Shelf life", &["sales"], &["Shelf life (%)", "Attained shelf life"]),
            MetricDefinition::new(
                "Availability components",
                &["supply"],
                &["Availability components (%)", "Component availability"],
            ),
            MetricDefinition::new("Obsolescence", &["supply"], &["Obsolescence (%)", "Obsoletes (%)"]).with_unit(Unit::Percent),
            MetricDefinition::new(
                "Delivery reliability suppliers",
                &["purchasing"],
                &["Delivery reliability suppliers (%)", "Delivery reliability"],
            ),
            MetricDefinition::new("Rejection", &["purchasing"], &["Rejection (%)", "Component rejection"]),
            MetricDefinition::new(
                "Production plan adherence",
                &["operations"],
                &["Production plan adherence (%)", "Plan adherence"],
            ),
            MetricDefinition::new(
                "Capacity utilization",
                &["operations"],
                &["Capacity utilization (%)", "Bottling capacity utilization"],
            ),
        ])
    }
}
