//! # Workbook Model
//!
//! A loaded spreadsheet: named sheets in file order, each a [`Table`] of [`CellValue`]s.
mod table;

pub use table::CellValue;
pub use table::Table;

use crate::error::MetricSheetError;
use crate::error::ResultMessage;
use crate::spreadsheet;
use crate::spreadsheet::Criteria;
use crate::spreadsheet::Spreadsheet;
use std::path::Path;
use tracing::debug;

/// Sheets of one file keyed by name, in the order the file declares them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workbook {
    name: String,
    sheets: Vec<(String, Table)>,
}

impl Workbook {
    pub fn new(name: &str, sheets: Vec<(String, Table)>) -> Self {
        Workbook {
            name: name.to_owned(),
            sheets,
        }
    }

    /// Loads a workbook from a local `.xlsx` or `.ods` file.
    pub fn open<P: AsRef<Path>>(path: P, criteria: &Criteria) -> Result<Self, MetricSheetError> {
        let file_name = path.as_ref().to_string_lossy().into_owned();
        let spreadsheet = spreadsheet::open(&file_name).with_prefix(&format!("Failed to open '{}'", file_name))?;
        Self::load(spreadsheet, criteria)
    }

    /// Loads a workbook from uploaded bytes. The format is taken from the extension of `name`,
    /// or sniffed from the archive content when `name` has none.
    pub fn from_bytes(name: &str, bytes: Vec<u8>, criteria: &Criteria) -> Result<Self, MetricSheetError> {
        let spreadsheet = spreadsheet::open_bytes(name, bytes).with_prefix(&format!("Failed to open '{}'", name))?;
        Self::load(spreadsheet, criteria)
    }

    fn load(mut spreadsheet: Box<dyn Spreadsheet>, criteria: &Criteria) -> Result<Self, MetricSheetError> {
        let name = spreadsheet.name();
        let shared_strings = spreadsheet
            .load_shared_strings()
            .with_prefix(&format!("Failed to load shared strings of '{}'", name))?;
        let sheets: Vec<(String, Table)> = spreadsheet
            .read_sheets(criteria)?
            .into_iter()
            .map(|sheet| (sheet.name.clone(), sheet.into_table(&shared_strings, criteria)))
            .collect();
        debug!(workbook = %name, sheets = sheets.len(), "loaded workbook");
        Ok(Workbook { name, sheets })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Looks a sheet up by its exact name.
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.sheets.iter().find(|(sheet, _)| sheet == name).map(|(_, table)| table)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> + '_ {
        self.sheets.iter().map(|(name, table)| (name.as_str(), table))
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Names from `expected` with no sheet of exactly that name.
    pub fn missing_sheets(&self, expected: &[&str]) -> Vec<String> {
        expected
            .iter()
            .filter(|name| self.get(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::ods::tests::build_ods;
    use crate::spreadsheet::xlsx::tests::build_xlsx;

    fn kpi_workbook() -> Vec<u8> {
        build_xlsx(
            &["Metric", "Value", "ROI"],
            &[
                ("KPI_R1", vec![
                    vec![("A1", "s", "<v>0</v>"), ("B1", "s", "<v>1</v>")],
                    vec![("A2", "s", "<v>2</v>"), ("B2", "str", "<v>-2.8%</v>")],
                ]),
                ("KPI_R2", vec![
                    vec![("A1", "s", "<v>0</v>"), ("B1", "s", "<v>1</v>")],
                    vec![("A2", "s", "<v>2</v>"), ("B2", "", "<v>3.1</v>")],
                ]),
            ],
        )
    }

    #[test]
    fn loads_xlsx_bytes() {
        let workbook = Workbook::from_bytes("metrics.xlsx", kpi_workbook(), &Criteria::default()).unwrap();
        assert_eq!(workbook.name(), "metrics.xlsx");
        assert_eq!(workbook.sheet_names(), vec!["KPI_R1", "KPI_R2"]);

        let first = workbook.get("KPI_R1").unwrap();
        assert_eq!(first.columns(), &["Metric".to_owned(), "Value".to_owned()]);
        assert_eq!(first.rows()[0], vec![CellValue::from("ROI"), CellValue::from("-2.8%")]);
        assert_eq!(workbook.get("KPI_R2").unwrap().cell(0, 1), Some(&CellValue::Number(3.1)));
        assert!(workbook.get("kpi_r1").is_none());
    }

    #[test]
    fn loads_selected_sheets_only() {
        let criteria = Criteria::default().with_sheet_patterns(&["*R2"]).unwrap();
        let workbook = Workbook::from_bytes("metrics.xlsx", kpi_workbook(), &criteria).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["KPI_R2"]);
    }

    #[test]
    fn loads_ods_without_extension() {
        let content = r#"<table:table table:name="Sales">
            <table:table-row>
              <table:table-cell office:value-type="string"><text:p>Round</text:p></table:table-cell>
              <table:table-cell office:value-type="string"><text:p>ROI (%)</text:p></table:table-cell>
            </table:table-row>
            <table:table-row>
              <table:table-cell office:value-type="float" office:value="1"><text:p>1</text:p></table:table-cell>
              <table:table-cell office:value-type="string"><text:p>-2.8%</text:p></table:table-cell>
            </table:table-row>
        </table:table>"#;
        let workbook = Workbook::from_bytes("upload", build_ods(content, None), &Criteria::default()).unwrap();
        let sales = workbook.get("Sales").unwrap();
        assert_eq!(sales.round_column(), Some(0));
        assert_eq!(sales.cell(0, 1), Some(&CellValue::from("-2.8%")));
    }

    #[test]
    fn open_reports_missing_file() {
        let error = Workbook::open("/nonexistent/metrics.xlsx", &Criteria::default()).unwrap_err();
        assert!(error.to_string().starts_with("Failed to open '/nonexistent/metrics.xlsx'"));
    }

    #[test]
    fn missing_sheets_uses_exact_names() {
        let workbook = Workbook::new("book", vec![("Sales".to_owned(), Table::default())]);
        assert_eq!(workbook.missing_sheets(&["Sales", "Operations"]), vec!["Operations".to_owned()]);
        assert_eq!(workbook.len(), 1);
    }
}
