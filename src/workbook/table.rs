use crate::metrics::locate::normalize_name;
use crate::metrics::normalize::to_number;
use crate::metrics::round::Round;
use std::fmt::Display;

/// A loosely typed spreadsheet value.
///
/// Cells arrive from the file as numbers, text or nothing. Everything downstream converts them
/// through the normalizer, so this is the only place where the file's cell type survives.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    /// Returns true for `Empty` and for whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Display for CellValue {
    /// Integral numbers print without a fractional part (`1`, not `1.0`), matching how
    /// spreadsheet applications show them.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                write!(f, "{}", *number as i64)
            }
            CellValue::Number(number) => write!(f, "{}", number),
            CellValue::Text(text) => write!(f, "{}", text),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

/// One sheet as rows of cells under named columns.
///
/// Column names are kept verbatim for display; lookups compare them case- and
/// whitespace-insensitively.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Creates a table, padding or truncating every row to the number of columns.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Table { columns, rows }
    }

    /// Convenience constructor for literal tables.
    pub fn from_rows<C, R>(columns: &[&str], rows: R) -> Self
    where
        C: Into<CellValue>,
        R: IntoIterator<Item = Vec<C>>,
    {
        Table::new(
            columns.iter().map(|column| column.to_string()).collect(),
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finds a column whose normalized name equals the normalized `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = normalize_name(name);
        self.columns.iter().position(|column| normalize_name(column) == name)
    }

    /// Iterates over the cells of one column.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row)?.get(col)
    }

    /// The column holding round identifiers, if any.
    pub fn round_column(&self) -> Option<usize> {
        self.column_index("Round")
    }

    /// Distinct rounds present in the round column, ascending.
    pub fn rounds(&self) -> Vec<Round> {
        let mut rounds: Vec<Round> = match self.round_column() {
            Some(index) => self.column(index).filter_map(Round::parse).collect(),
            None => Vec::new(),
        };
        rounds.sort();
        rounds.dedup();
        rounds
    }

    /// Returns a table with the same columns and only the rows accepted by `predicate`.
    pub fn filter_rows<F>(&self, predicate: F) -> Table
    where
        F: Fn(&[CellValue]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|row| predicate(row)).cloned().collect(),
        }
    }

    /// Restricts the table to the rows of one round.
    /// Returns `None` when the table has no round column to filter on.
    pub fn for_round(&self, round: Round) -> Option<Table> {
        let index = self.round_column()?;
        Some(self.filter_rows(|row| row.get(index).and_then(Round::parse) == Some(round)))
    }

    /// Converts every numeric column into numbers.
    ///
    /// A column counts as numeric when at least one of its cells normalizes to a number; its
    /// unparseable cells become `Empty`. Text columns (metric names, labels) and the round column
    /// are kept verbatim.
    pub fn normalized(&self) -> Table {
        let round_column = self.round_column();
        let numeric: Vec<bool> = (0..self.columns.len())
            .map(|index| Some(index) != round_column && self.column(index).any(|cell| to_number(cell).is_some()))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&numeric)
                    .map(|(cell, numeric)| match numeric {
                        true => to_number(cell).map_or(CellValue::Empty, CellValue::Number),
                        false => cell.clone(),
                    })
                    .collect()
            })
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }
}
