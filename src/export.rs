//! CSV export of tables.
use crate::error::MetricSheetError;
use crate::workbook::Table;
use std::io::Write;

impl Table {
    /// Writes the header and every row as CSV. Cells are written in their display form.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), MetricSheetError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.columns())?;
        for row in self.rows() {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// File name offered for downloading a table: `"Supply Chain"` becomes `supply_chain.csv`.
pub fn csv_file_name(label: &str) -> String {
    let stem = label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    match stem.is_empty() {
        true => "table.csv".to_owned(),
        false => format!("{}.csv", stem),
    }
}
