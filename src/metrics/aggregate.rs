use crate::metrics::locate::find_column;
use crate::metrics::locate::normalize_name;
use crate::metrics::normalize::to_number;
use crate::metrics::round::Round;
use crate::workbook::CellValue;
use crate::workbook::Table;
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Headers naming the column that holds metric names in long tables
const NAME_COLUMNS: [&str; 3] = ["metric", "kpi", "name"];
/// Headers naming the column that holds metric values in long tables
const VALUE_COLUMNS: [&str; 3] = ["value", "amount", "score"];

/// `1`, `R1`, `Round 1`, `round_1` as a whole column header
static ROUND_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:round|r)?[\s_-]*(\d+)$").expect("Hardcode regex pattern"));

/// Outcome of looking a metric up.
///
/// `Unavailable` means the metric was located but holds nothing numeric (blank, `n/a`, text);
/// `NotFound` means there was nothing to read at all.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MetricValue {
    Present(f64),
    Unavailable,
    NotFound,
}

impl MetricValue {
    pub fn value(self) -> Option<f64> {
        match self {
            MetricValue::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_present(self) -> bool {
        matches!(self, MetricValue::Present(_))
    }

    pub fn is_not_found(self) -> bool {
        self == MetricValue::NotFound
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(MetricValue::Unavailable, MetricValue::Present)
    }
}

/// How the cells selected for a metric are reduced to one value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// First row holding a number
    #[default]
    First,
    Sum,
    Mean,
    /// Mean weighted by the numbers of another column in the same rows
    WeightedMean { weight_column: String },
}

/// The names a metric may appear under.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricQuery {
    names: Vec<String>,
}

impl MetricQuery {
    pub fn new(name: &str) -> Self {
        MetricQuery {
            names: vec![name.to_owned()],
        }
    }

    pub fn with_aliases<S: AsRef<str>>(mut self, aliases: &[S]) -> Self {
        for alias in aliases {
            if !self.names.iter().any(|name| name == alias.as_ref()) {
                self.names.push(alias.as_ref().to_owned());
            }
        }
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Exact comparison after case and whitespace normalization.
    fn is_named(&self, label: &CellValue) -> bool {
        let label = normalize_name(&label.to_string());
        !label.is_empty() && self.names.iter().any(|name| normalize_name(name) == label)
    }

    /// A column equal to one of the names, else the first column containing one.
    fn column(&self, table: &Table) -> Option<usize> {
        self.names
            .iter()
            .find_map(|name| table.column_index(name))
            .or_else(|| self.names.iter().find_map(|name| find_column(table, &[name])))
    }
}

/// Layout of a metric table.
#[derive(Clone, Debug, PartialEq)]
pub enum TableShape {
    /// One row per metric: a name column and a value column
    Long { name_column: usize, value_column: usize },
    /// One row per metric, one column per round (`Metric | Round 1 | Round 2`)
    RoundColumns { name_column: usize, round_columns: Vec<(Round, usize)> },
    /// One column per metric, rows optionally tagged by a `Round` column
    Wide,
}

impl TableShape {
    pub fn detect(table: &Table) -> TableShape {
        let name_column = NAME_COLUMNS.iter().find_map(|name| table.column_index(name));
        let value_column = VALUE_COLUMNS.iter().find_map(|name| table.column_index(name));
        if let (Some(name_column), Some(value_column)) = (name_column, value_column) {
            return TableShape::Long { name_column, value_column };
        }

        let round_columns: Vec<(Round, usize)> = table
            .columns()
            .iter()
            .enumerate()
            .filter_map(|(index, column)| round_header(column).map(|round| (round, index)))
            .collect();
        if round_columns.is_empty() {
            return TableShape::Wide;
        }
        let name_column = name_column
            .or_else(|| (0..table.columns().len()).find(|index| round_columns.iter().all(|(_, column)| column != index)));
        match name_column {
            Some(name_column) => TableShape::RoundColumns { name_column, round_columns },
            None => TableShape::Wide,
        }
    }
}

fn round_header(column: &str) -> Option<Round> {
    let column = normalize_name(column);
    let captures = ROUND_HEADER.captures(&column)?;
    captures.get(1)?.as_str().parse().ok().map(Round::new)
}

/// Keeps the rows of `round` when the table has a round column.
fn restrict(table: &Table, round: Option<Round>) -> Cow<'_, Table> {
    match round.and_then(|round| table.for_round(round)) {
        Some(filtered) => Cow::Owned(filtered),
        None => Cow::Borrowed(table),
    }
}

/// Reads one metric from a table of any supported shape.
///
/// With a round, long and wide tables carrying a `Round` column only consider that round's rows,
/// and round-column tables read that round's column; without one, round-column tables read the
/// latest round. Returns `NotFound` when the metric, the round or a weight column is absent.
pub fn extract(table: &Table, query: &MetricQuery, round: Option<Round>, aggregation: &Aggregation) -> MetricValue {
    match TableShape::detect(table) {
        TableShape::Long { name_column, value_column } => {
            let table = restrict(table, round);
            let rows: Vec<&Vec<CellValue>> = table
                .rows()
                .iter()
                .filter(|row| query.is_named(&row[name_column]))
                .collect();
            aggregate(&table, &rows, value_column, aggregation)
        }
        TableShape::RoundColumns { name_column, round_columns } => {
            let column = match round {
                Some(round) => round_columns.iter().find(|(column_round, _)| *column_round == round),
                None => round_columns.iter().max_by_key(|(column_round, _)| *column_round),
            };
            let Some((_, column)) = column else {
                return MetricValue::NotFound;
            };
            let rows: Vec<&Vec<CellValue>> = table
                .rows()
                .iter()
                .filter(|row| query.is_named(&row[name_column]))
                .collect();
            aggregate(table, &rows, *column, aggregation)
        }
        TableShape::Wide => {
            let Some(column) = query.column(table) else {
                return MetricValue::NotFound;
            };
            let table = restrict(table, round);
            let rows: Vec<&Vec<CellValue>> = table.rows().iter().collect();
            aggregate(&table, &rows, column, aggregation)
        }
    }
}

fn aggregate(table: &Table, rows: &[&Vec<CellValue>], column: usize, aggregation: &Aggregation) -> MetricValue {
    if rows.is_empty() {
        return MetricValue::NotFound;
    }
    let numbers = |column: usize| rows.iter().map(move |row| row.get(column).and_then(to_number));
    match aggregation {
        Aggregation::First => numbers(column).flatten().next().into(),
        Aggregation::Sum => sum(&numbers(column).flatten().collect::<Vec<_>>()).into(),
        Aggregation::Mean => mean(&numbers(column).flatten().collect::<Vec<_>>()).into(),
        Aggregation::WeightedMean { weight_column } => {
            let Some(weight_column) = table
                .column_index(weight_column)
                .or_else(|| find_column(table, &[weight_column]))
            else {
                return MetricValue::NotFound;
            };
            let (values, weights): (Vec<f64>, Vec<f64>) = numbers(column)
                .zip(numbers(weight_column))
                .filter_map(|(value, weight)| Some((value?, weight?)))
                .unzip();
            weighted_mean(&values, &weights).into()
        }
    }
}

/// Sum of the values, `None` when there are none.
pub fn sum(values: &[f64]) -> Option<f64> {
    match values.is_empty() {
        true => None,
        false => Some(values.iter().sum()),
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    sum(values).map(|total| total / values.len() as f64)
}

/// Weighted mean over the pairs of `values` and `weights`.
/// `None` when there are no pairs or the weights sum to zero.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Option<f64> {
    let total: f64 = weights.iter().take(values.len()).sum();
    if values.is_empty() || weights.is_empty() || total == 0.0 {
        return None;
    }
    let weighted: f64 = values.iter().zip(weights).map(|(value, weight)| value * weight).sum();
    Some(weighted / total).filter(|mean| mean.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roi() -> MetricQuery {
        MetricQuery::new("ROI").with_aliases(&["ROI (%)", "Return on investment"])
    }

    #[test]
    fn detects_shapes() {
        let long = Table::from_rows::<&str, _>(&["KPI", "Score"], vec![]);
        assert_eq!(TableShape::detect(&long), TableShape::Long { name_column: 0, value_column: 1 });

        let by_round = Table::from_rows::<&str, _>(&["", "Round 1", "R2", "3"], vec![]);
        assert_eq!(
            TableShape::detect(&by_round),
            TableShape::RoundColumns {
                name_column: 0,
                round_columns: vec![(Round::new(1), 1), (Round::new(2), 2), (Round::new(3), 3)],
            }
        );

        let wide = Table::from_rows::<&str, _>(&["Round", "ROI (%)", "Gross margin"], vec![]);
        assert_eq!(TableShape::detect(&wide), TableShape::Wide);
    }

    #[test]
    fn reads_long_table() {
        let table = Table::from_rows(&["Metric", "Value"], vec![vec!["ROI", "12.5%"], vec!["Revenue", "€ 1,000"]]);
        assert_eq!(extract(&table, &roi(), None, &Aggregation::First), MetricValue::Present(12.5));
        assert_eq!(
            extract(&table, &MetricQuery::new(" revenue "), None, &Aggregation::First),
            MetricValue::Present(1000.0)
        );
        assert_eq!(extract(&table, &MetricQuery::new("Margin"), None, &Aggregation::First), MetricValue::NotFound);
    }

    #[test]
    fn located_but_unparseable_is_unavailable() {
        let table = Table::from_rows(&["Metric", "Value"], vec![vec!["ROI", "n/a"], vec!["Revenue", "   "]]);
        assert_eq!(extract(&table, &roi(), None, &Aggregation::First), MetricValue::Unavailable);
        assert_eq!(extract(&table, &MetricQuery::new("Revenue"), None, &Aggregation::Sum), MetricValue::Unavailable);
    }

    #[test]
    fn reads_wide_table_by_round() {
        let table = Table::from_rows(
            &["Round", "ROI (%)", "Gross margin"],
            vec![
                vec![CellValue::Number(1.0), "-2.8%".into(), "€ 1,000".into()],
                vec![CellValue::from("Round 2"), "3.1%".into(), "€ 2,500".into()],
            ],
        );
        assert_eq!(extract(&table, &roi(), Some(Round::new(2)), &Aggregation::First), MetricValue::Present(3.1));
        assert_eq!(extract(&table, &roi(), Some(Round::new(3)), &Aggregation::First), MetricValue::NotFound);
        assert_eq!(extract(&table, &roi(), None, &Aggregation::First), MetricValue::Present(-2.8));
        // Containment fallback on the column header
        assert_eq!(
            extract(&table, &MetricQuery::new("margin"), None, &Aggregation::Sum),
            MetricValue::Present(3500.0)
        );
        assert_eq!(extract(&table, &MetricQuery::new("Revenue"), None, &Aggregation::First), MetricValue::NotFound);
    }

    #[test]
    fn reads_round_columns() {
        let table = Table::from_rows(
            &["", "Round 1", "Round 2"],
            vec![
                vec!["Gross margin", "€ 1,000", "€ 1,500"],
                vec!["ROI", "(2.5)", "4%"],
            ],
        );
        let margin = MetricQuery::new("Gross margin");
        assert_eq!(extract(&table, &margin, Some(Round::new(1)), &Aggregation::First), MetricValue::Present(1000.0));
        assert_eq!(extract(&table, &roi(), Some(Round::new(1)), &Aggregation::First), MetricValue::Present(-2.5));
        assert_eq!(extract(&table, &roi(), None, &Aggregation::First), MetricValue::Present(4.0));
        assert_eq!(extract(&table, &roi(), Some(Round::new(3)), &Aggregation::First), MetricValue::NotFound);
    }

    #[test]
    fn aggregates_rows() {
        let table = Table::from_rows(
            &["Round", "Service level", "Volume"],
            vec![
                vec!["1", "90%", "100"],
                vec!["1", "80%", "300"],
                vec!["1", "n/a", "50"],
                vec!["2", "70%", "0"],
            ],
        );
        let query = MetricQuery::new("Service level");
        let round = Some(Round::new(1));
        assert_eq!(extract(&table, &query, round, &Aggregation::Sum), MetricValue::Present(170.0));
        assert_eq!(extract(&table, &query, round, &Aggregation::Mean), MetricValue::Present(85.0));
        let weighted = Aggregation::WeightedMean { weight_column: "volume".to_owned() };
        assert_eq!(extract(&table, &query, round, &weighted), MetricValue::Present(82.5));
        assert_eq!(extract(&table, &query, Some(Round::new(2)), &weighted), MetricValue::Unavailable);
        let missing = Aggregation::WeightedMean { weight_column: "Pallets".to_owned() };
        assert_eq!(extract(&table, &query, round, &missing), MetricValue::NotFound);
    }

    #[test]
    fn pure_aggregations() {
        assert_eq!(sum(&[]), None);
        assert_eq!(sum(&[1.0, 2.5]), Some(3.5));
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(mean(&[]), None);
        assert_eq!(weighted_mean(&[10.0, 20.0], &[0.0, 0.0]), None);
        assert_eq!(weighted_mean(&[10.0, 20.0], &[1.0, 3.0]), Some(17.5));
        assert_eq!(weighted_mean(&[], &[]), None);
    }

    #[test]
    fn aggregation_from_config() {
        #[derive(Deserialize)]
        struct Holder {
            aggregation: Aggregation,
        }
        let sum: Holder = toml::from_str(r#"aggregation = "sum""#).unwrap();
        assert_eq!(sum.aggregation, Aggregation::Sum);
        let weighted: Holder = toml::from_str(r#"aggregation = { weighted_mean = { weight_column = "Volume" } }"#).unwrap();
        assert_eq!(weighted.aggregation, Aggregation::WeightedMean { weight_column: "Volume".to_owned() });
    }
}
