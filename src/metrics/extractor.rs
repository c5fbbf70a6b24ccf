use crate::metrics::aggregate::extract;
use crate::metrics::aggregate::MetricValue;
use crate::metrics::aggregate::TableShape;
use crate::metrics::catalog::Catalog;
use crate::metrics::catalog::MetricDefinition;
use crate::metrics::display::format_delta;
use crate::metrics::display::format_value;
use crate::metrics::display::Unit;
use crate::metrics::locate::find_column_with;
use crate::metrics::locate::find_sheets;
use crate::metrics::locate::normalize_name;
use crate::metrics::locate::MatchPolicy;
use crate::metrics::normalize::to_number;
use crate::metrics::round::Round;
use crate::workbook::CellValue;
use crate::workbook::Table;
use crate::workbook::Workbook;
use std::sync::Arc;
use tracing::debug;
use tracing::warn;

/// One metric value for one round.
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: MetricValue,
    pub round: Round,
    pub unit: Unit,
    /// Sheet the value was read from
    pub sheet: Option<String>,
}

impl Metric {
    pub fn display_value(&self) -> String {
        format_value(self.unit, self.value)
    }
}

/// A column of a per-round sheet with its change since the previous round.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricCard {
    pub name: String,
    pub unit: Unit,
    pub value: MetricValue,
    /// `None` when this or the previous round has no number
    pub delta: Option<f64>,
}

impl MetricCard {
    pub fn display_value(&self) -> String {
        format_value(self.unit, self.value)
    }

    pub fn display_delta(&self) -> Option<String> {
        self.delta.map(|delta| format_delta(self.unit, delta))
    }
}

/// A row of a round-column table, labelled by the segment after its last `-`.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledRow {
    pub label: String,
    pub name: String,
    pub values: Vec<(Round, MetricValue)>,
}

/// Reads metrics out of one workbook.
///
/// Sheets are located by keywords; per-round sheets (`KPI_R2`) are preferred for their round
/// and skipped for others, while round-less sheets are used when they carry round information
/// of their own (a `Round` column or round columns).
#[derive(Clone, Debug)]
pub struct MetricsExtractor {
    workbook: Arc<Workbook>,
    policy: MatchPolicy,
}

impl MetricsExtractor {
    pub fn new(workbook: Arc<Workbook>) -> Self {
        MetricsExtractor {
            workbook,
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    fn candidates<K: AsRef<str>>(&self, keywords: &[K]) -> Vec<(&str, &Table)> {
        match keywords.is_empty() {
            true => self.workbook.iter().collect(),
            false => find_sheets(&self.workbook, keywords, self.policy),
        }
    }

    /// Candidate sheets for `round`: sheets dedicated to it first, then round-less sheets
    /// holding round information.
    fn sheets_for<K: AsRef<str>>(&self, keywords: &[K], round: Round) -> Vec<(&str, &Table)> {
        let (dedicated, shared): (Vec<_>, Vec<_>) = self
            .candidates(keywords)
            .into_iter()
            .filter(|(name, table)| match Round::from_sheet_name(name) {
                Some(sheet_round) => sheet_round == round,
                None => carries_rounds(table),
            })
            .partition(|(name, _)| Round::from_sheet_name(name).is_some());
        dedicated.into_iter().chain(shared).collect()
    }

    /// Reads one metric for one round. Candidate sheets are tried in order until one of them
    /// locates the metric.
    pub fn metric(&self, definition: &MetricDefinition, round: Round) -> Metric {
        let query = definition.query();
        let mut metric = Metric {
            name: definition.name.clone(),
            value: MetricValue::NotFound,
            round,
            unit: definition.unit(),
            sheet: None,
        };
        for (sheet, table) in self.sheets_for(&definition.sheet_keywords, round) {
            let value = extract(table, &query, Some(round), &definition.aggregation);
            if !value.is_not_found() {
                debug!(metric = %definition.name, round = round.number(), sheet, ?value, "metric located");
                metric.value = value;
                metric.sheet = Some(sheet.to_owned());
                return metric;
            }
        }
        debug!(metric = %definition.name, round = round.number(), "metric not found");
        metric
    }

    /// Reads every metric of the catalog for one round, in catalog order.
    pub fn metrics(&self, catalog: &Catalog, round: Round) -> Vec<Metric> {
        catalog.iter().map(|definition| self.metric(definition, round)).collect()
    }

    /// The first located sheet restricted to one round.
    ///
    /// A dedicated sheet is returned whole, a sheet with a `Round` column keeps that round's
    /// rows, and a round-column sheet keeps its name column and that round's column.
    pub fn round_table<K: AsRef<str>>(&self, keywords: &[K], round: Round) -> Option<Table> {
        self.sheets_for(keywords, round)
            .into_iter()
            .find_map(|(name, table)| match Round::from_sheet_name(name) {
                Some(_) => Some(table.clone()),
                None => restrict_to_round(table, round),
            })
    }

    /// One card per column of a per-round sheet, with the change since the previous round.
    /// Empty when the sheet has no rows for `round`.
    pub fn cards<K: AsRef<str>>(&self, keywords: &[K], round: Round) -> Vec<MetricCard> {
        let Some(table) = self.round_sheet(keywords) else {
            return Vec::new();
        };
        let Some(round_column) = table.round_column() else {
            return Vec::new();
        };
        let current = first_row_of(table, round);
        if current.is_none() {
            debug!(round = round.number(), "no data for round");
            return Vec::new();
        }
        let previous = round.previous().and_then(|previous| first_row_of(table, previous));

        table
            .columns()
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != round_column)
            .map(|(index, name)| {
                let number = |row: Option<&Vec<CellValue>>| row.and_then(|row| row.get(index)).and_then(to_number);
                let value = number(current);
                let delta = match (value, number(previous)) {
                    (Some(value), Some(previous)) => Some(value - previous),
                    _ => None,
                };
                MetricCard {
                    name: name.clone(),
                    unit: Unit::infer(name),
                    value: value.into(),
                    delta,
                }
            })
            .collect()
    }

    /// Values of one column of a per-round sheet, one per round in ascending order.
    pub fn series<K: AsRef<str>, C: AsRef<str>>(&self, keywords: &[K], column_keywords: &[C]) -> Vec<(Round, MetricValue)> {
        let Some(table) = self.round_sheet(keywords) else {
            return Vec::new();
        };
        let Some(column) = find_column_with(table, column_keywords, self.policy) else {
            return Vec::new();
        };
        table
            .rounds()
            .into_iter()
            .map(|round| {
                let value = first_row_of(table, round).and_then(|row| row.get(column)).and_then(to_number);
                (round, value.into())
            })
            .collect()
    }

    /// Rows of a round-column sheet whose name contains `fragment`, such as the per-customer
    /// lines `Bonus or penalties - Retailer A`.
    pub fn rows_matching<K: AsRef<str>>(&self, keywords: &[K], fragment: &str) -> Vec<LabeledRow> {
        let fragment = normalize_name(fragment);
        let layout = self.candidates(keywords).into_iter().find_map(|(_, table)| match TableShape::detect(table) {
            TableShape::RoundColumns { name_column, round_columns } => Some((table, name_column, round_columns)),
            _ => None,
        });
        let Some((table, name_column, round_columns)) = layout else {
            return Vec::new();
        };

        table
            .rows()
            .iter()
            .filter_map(|row| {
                let name = row[name_column].to_string();
                if fragment.is_empty() || !normalize_name(&name).contains(&fragment) {
                    return None;
                }
                let label = name.rsplit('-').next().unwrap_or_default().trim().to_owned();
                let values = round_columns
                    .iter()
                    .map(|(round, column)| (*round, to_number(&row[*column]).into()))
                    .collect();
                Some(LabeledRow { label, name: name.trim().to_owned(), values })
            })
            .collect()
    }

    /// Names from `expected` without a sheet of that exact name. Each one is logged as a warning.
    pub fn missing_sheets(&self, expected: &[&str]) -> Vec<String> {
        let missing = self.workbook.missing_sheets(expected);
        for sheet in &missing {
            warn!(workbook = %self.workbook.name(), sheet = %sheet, "expected sheet is missing");
        }
        missing
    }

    /// First matching sheet with a `Round` column.
    fn round_sheet<K: AsRef<str>>(&self, keywords: &[K]) -> Option<&Table> {
        self.candidates(keywords)
            .into_iter()
            .map(|(_, table)| table)
            .find(|table| table.round_column().is_some())
    }
}

fn carries_rounds(table: &Table) -> bool {
    table.round_column().is_some() || matches!(TableShape::detect(table), TableShape::RoundColumns { .. })
}

fn first_row_of(table: &Table, round: Round) -> Option<&Vec<CellValue>> {
    let index = table.round_column()?;
    table
        .rows()
        .iter()
        .find(|row| row.get(index).and_then(Round::parse) == Some(round))
}

fn restrict_to_round(table: &Table, round: Round) -> Option<Table> {
    if let Some(filtered) = table.for_round(round) {
        return Some(filtered).filter(|filtered| !filtered.is_empty());
    }
    match TableShape::detect(table) {
        TableShape::RoundColumns { name_column, round_columns } => {
            let (_, column) = round_columns.into_iter().find(|(column_round, _)| *column_round == round)?;
            let columns = vec![table.columns()[name_column].clone(), table.columns()[column].clone()];
            let rows = table
                .rows()
                .iter()
                .map(|row| vec![row[name_column].clone(), row[column].clone()])
                .collect();
            Some(Table::new(columns, rows))
        }
        _ => None,
    }
}
