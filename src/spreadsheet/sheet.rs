use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::criteria::Criteria;
use crate::workbook::CellValue;
use crate::workbook::Table;
use std::collections::BTreeMap;

/// Raw cells of one worksheet as read from the file, before header detection.
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// All non-empty cells in the sheet
    pub(crate) cells: Vec<Cell>,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(crate) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    /// Returns true if the sheet contains no cells.
    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell to the sheet, updating the data range.
    pub(crate) fn push(&mut self, cell: Cell) {
        self.update_bound(cell.row, cell.col);
        self.cells.push(cell);
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        fn widen(lower: &mut Option<usize>, upper: &mut Option<usize>, index: usize) {
            *lower = Some(lower.map_or(index, |lower| lower.min(index)));
            *upper = Some(upper.map_or(index, |upper| upper.max(index)));
        }
        widen(&mut self.row_lower_bound, &mut self.row_upper_bound, row);
        widen(&mut self.col_lower_bound, &mut self.col_upper_bound, col);
    }

    /// Groups the cells by row, ordered by row index. Each row starts at the first data column
    /// and ends at its own last cell; positions without a stored cell are `None`. Rows holding
    /// no cell are left out, so a stray cell far from the data costs one short row.
    pub(crate) fn rows(&self) -> Vec<(usize, Vec<Option<&Cell>>)> {
        let Some(col_lower) = self.col_lower_bound else {
            return Vec::new();
        };
        let mut rows: BTreeMap<usize, Vec<Option<&Cell>>> = BTreeMap::new();
        for cell in &self.cells {
            let record = rows.entry(cell.row).or_default();
            let offset = cell.col - col_lower;
            if record.len() <= offset {
                record.resize(offset + 1, None);
            }
            // Later duplicates (repeated ODS cells, malformed references) overwrite earlier ones
            record[offset] = Some(cell);
        }
        rows.into_iter().collect()
    }

    /// Converts the raw cells into a table, resolving shared strings and taking the first row as
    /// the header when `criteria.header` is set.
    pub(crate) fn into_table(self, shared_strings: &[String], criteria: &Criteria) -> Table {
        let mut rows: Vec<Vec<CellValue>> = Vec::new();
        let mut next_row = self.row_lower_bound.unwrap_or(0);
        for (index, record) in self.rows() {
            if !criteria.skip_empty_rows {
                rows.extend((next_row..index).map(|_| Vec::new()));
            }
            next_row = index + 1;
            rows.push(
                record
                    .into_iter()
                    .map(|cell| cell.map_or(CellValue::Empty, |cell| cell.to_value(shared_strings, &criteria.nulls)))
                    .collect(),
            );
        }
        if criteria.skip_empty_rows {
            rows.retain(|row| !row.iter().all(CellValue::is_empty));
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let columns = if criteria.header && !rows.is_empty() {
            let mut titles = rows.remove(0);
            titles.resize(width, CellValue::Empty);
            titles
                .into_iter()
                .enumerate()
                .map(|(index, title)| match title {
                    CellValue::Empty => format!("column{}", index + 1),
                    title => title.to_string().trim().to_owned(),
                })
                .collect()
        } else {
            (0..width).map(|index| format!("column{}", index + 1)).collect()
        };
        Table::new(columns, rows)
    }
}
