use thiserror::Error;

/// Main error type for the metric_sheet crate.
/// Aggregates errors from loading, parsing and configuration. Metric extraction itself never
/// fails: it reports missing or unparseable values through `MetricValue`.
#[derive(Error, Debug)]
pub enum MetricSheetError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    CatalogError(#[from] toml::de::Error),

    #[error("{0}")]
    CsvError(#[from] csv::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    OdsError(#[from] crate::spreadsheet::ods::OdsError),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, MetricSheetError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| MetricSheetError::WithContextError(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_prefix_wraps_message() {
        let result: Result<(), MetricSheetError> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "metrics.xlsx",
        )
        .into());
        let error = result.with_prefix("Open workbook").unwrap_err();
        assert_eq!(error.to_string(), "Open workbook: metrics.xlsx");
    }

    #[test]
    fn with_prefix_keeps_ok() {
        let result: Result<u8, MetricSheetError> = Ok(3);
        assert_eq!(result.with_prefix("unused").unwrap(), 3);
    }
}
