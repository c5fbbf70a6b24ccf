use crate::workbook::CellValue;
use std::collections::HashSet;

/// Types of raw cell data as stored in the spreadsheet file.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as "1"/"0"
    Boolean,
    /// Numeric values (including dates stored as serial numbers)
    Number,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// ISO 8601 duration strings
    IsoDuration,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values such as `#DIV/0!`
    Error,
}

/// A single raw cell read from a worksheet.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    /// Cell value as stored in the file
    pub(crate) value: String,
}

impl Cell {
    /// Converts the raw cell into the loosely typed value exposed to callers.
    ///
    /// Numbers stay numbers, booleans become 1/0, strings are resolved through the shared string
    /// table. Text equal to one of the `nulls` literals, unresolvable shared strings and error
    /// cells become `Empty`.
    pub(crate) fn to_value(&self, shared_strings: &[String], nulls: &HashSet<String>) -> CellValue {
        match self.kind {
            CellType::Empty | CellType::Error => CellValue::Empty,
            CellType::Boolean => CellValue::Number(if self.value == "1" { 1.0 } else { 0.0 }),
            CellType::Number => match self.value.trim().parse::<f64>() {
                Ok(number) => CellValue::Number(number),
                Err(_) => text_value(&self.value, nulls),
            },
            CellType::SharedString => self.value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| shared_strings.get(index))
                .map(|text| text_value(text, nulls))
                .unwrap_or(CellValue::Empty),
            CellType::IsoDateTime | CellType::IsoDuration | CellType::InlineString => text_value(&self.value, nulls),
        }
    }
}

fn text_value(text: &str, nulls: &HashSet<String>) -> CellValue {
    if nulls.contains(text.trim()) {
        CellValue::Empty
    } else {
        CellValue::Text(text.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 1,
            col: 2,
            kind,
            value: value.to_owned(),
        }
    }

    fn nulls() -> HashSet<String> {
        ["", "#N/A"].iter().map(|null| null.to_string()).collect()
    }

    #[test]
    fn number_and_boolean_values() {
        let shared = Vec::new();
        assert_eq!(cell(CellType::Number, "12.5").to_value(&shared, &nulls()), CellValue::Number(12.5));
        assert_eq!(cell(CellType::Boolean, "1").to_value(&shared, &nulls()), CellValue::Number(1.0));
        assert_eq!(cell(CellType::Boolean, "0").to_value(&shared, &nulls()), CellValue::Number(0.0));
        assert_eq!(cell(CellType::Error, "#DIV/0!").to_value(&shared, &nulls()), CellValue::Empty);
    }

    #[test]
    fn shared_and_inline_strings() {
        let shared = vec!["ROI".to_owned(), "#N/A".to_owned()];
        assert_eq!(cell(CellType::SharedString, "0").to_value(&shared, &nulls()), CellValue::Text("ROI".to_owned()));
        assert_eq!(cell(CellType::SharedString, "1").to_value(&shared, &nulls()), CellValue::Empty);
        assert_eq!(cell(CellType::SharedString, "7").to_value(&shared, &nulls()), CellValue::Empty);
        assert_eq!(cell(CellType::InlineString, "€ 1,000").to_value(&shared, &nulls()), CellValue::Text("€ 1,000".to_owned()));
        assert_eq!(cell(CellType::IsoDateTime, "2024-01-02").to_value(&shared, &nulls()), CellValue::Text("2024-01-02".to_owned()));
    }
}
