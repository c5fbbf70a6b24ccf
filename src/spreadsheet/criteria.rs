use crate::error::MetricSheetError;
use glob::Pattern;
use std::collections::HashSet;

/// Literals treated as missing values, after trimming.
const DEFAULT_NULLS: [&str; 8] = ["", "-", "–", "#N/A", "N/A", "n/a", "NA", "nan"];

/// Options controlling which sheets are loaded and how raw cells become table values.
#[derive(Clone, Debug)]
pub struct Criteria {
    /// Sheet name patterns for filtering which sheets to load, `None` loads every sheet.
    pub sheet_name_patterns: Option<Vec<Pattern>>,

    /// Text literals loaded as empty cells.
    pub nulls: HashSet<String>,

    /// Load spreadsheet error cells (`#DIV/0!`, ...) as empty instead of failing.
    pub error_as_null: bool,

    /// Drop rows where all columns are empty.
    pub skip_empty_rows: bool,

    /// Treat the first row of each sheet as column names.
    pub header: bool,
}

impl Default for Criteria {
    fn default() -> Self {
        Criteria {
            sheet_name_patterns: None,
            nulls: DEFAULT_NULLS.iter().map(|null| null.to_string()).collect(),
            error_as_null: true,
            skip_empty_rows: true,
            header: true,
        }
    }
}

impl Criteria {
    /// Restricts loading to sheets matching any of the glob patterns (e.g. `"KPI*"`).
    pub fn with_sheet_patterns(mut self, patterns: &[&str]) -> Result<Self, MetricSheetError> {
        let patterns = patterns
            .iter()
            .map(|pattern| Pattern::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        self.sheet_name_patterns = Some(patterns);
        Ok(self)
    }

    /// Checks if a sheet name matches the criteria patterns.
    /// Returns true if no patterns are specified or if name matches any pattern.
    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }
}
