use crate::error::MetricSheetError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::BufRead;
use std::io::Read;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
/// XML element name for table (sheet)
const TABLE: QName = QName(b"table:table");
/// XML element name for table row
const TABLE_ROW: QName = QName(b"table:table-row");
/// XML element name for table cell
const TABLE_CELL: QName = QName(b"table:table-cell");
/// XML element name for covered table cell (merged cells)
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
/// XML element name for annotations (comments)
const ANNOTATION: QName = QName(b"office:annotation");
/// XML element name for paragraph text
const PARAGRAPH: QName = QName(b"text:p");
/// XML element name for string (space) text
const STRING: QName = QName(b"text:s");

/// Error types specific to ODS spreadsheet processing
#[derive(Error, Debug)]
pub enum OdsError {
    /// Invalid ODS MIME type detected in file
    #[error("Invalid ODS MIME type")]
    MimeTypeError,
}

/// An OpenDocument spreadsheet
pub(crate) struct OdsSpreadsheet {
    /// Name of the ODS file
    pub(crate) name: String,
    /// ZIP archive containing the ODS file contents
    zip: ZipArchive<UnifiedReader>,
}

impl OdsSpreadsheet {
    /// Validates the archive as an unencrypted ODS document
    pub(crate) fn new(file_name: &str, mut zip: ZipArchive<UnifiedReader>) -> Result<Self, MetricSheetError> {
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
        }
        Ok(OdsSpreadsheet {
            name: file_name.to_owned(),
            zip,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    /// ODS stores strings inline, there is no shared string table
    fn load_shared_strings(&mut self) -> Result<Vec<String>, MetricSheetError> {
        Ok(Vec::new())
    }

    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, MetricSheetError> {
        let mut sheets = Vec::<Sheet>::new();
        let file_name = self.name.to_owned();
        let mut reader = self.zip
            .xml_reader("content.xml")?
            .ok_or_else(|| SpreadsheetError::FileError("content.xml".to_string()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TABLE => {
                let sheet_name = event
                    .get_attribute_value("table:name")?
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| format!("Sheet{}", sheets.len() + 1));
                if criteria.accept(&sheet_name) {
                    let mut sheet = Sheet::new(&file_name, &sheet_name);
                    read_table(&mut reader, &mut sheet, criteria)?;
                    debug!(file = %file_name, sheet = %sheet.name, cells = sheet.cells.len(), "sheet read");
                    sheets.push(sheet);
                } else {
                    debug!(file = %file_name, sheet = %sheet_name, "sheet skipped by criteria");
                }
            }
        });
        if sheets.is_empty() && criteria.sheet_name_patterns.is_none() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name))?
        }
        Ok(sheets)
    }
}

/// Reads the rows of one `table:table` element into `sheet`, consuming its end tag.
/// Skipped tables are left to the caller's event loop, which ignores their rows.
fn read_table<R: BufRead>(reader: &mut XmlReader<R>, sheet: &mut Sheet, criteria: &Criteria) -> Result<(), MetricSheetError> {
    let mut row = 0usize;
    let mut col = 0usize;
    let mut row_count = 1usize;
    let mut col_count = 1usize;
    let mut kind = CellType::default();
    let mut value = String::new();
    // Whether text paragraphs of the current cell form its value
    let mut element_context = false;
    let mut comment_context = false;
    match_xml_events!(reader => {
        Event::End(event) if event.name() == TABLE => break,
        Event::Start(event) if event.name() == TABLE_ROW => {
            row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
            col = 0;
        }
        Event::End(event) if event.name() == TABLE_ROW => {
            row += row_count;
        }
        Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
            value.clear();
            col_count = event.parse_attribute_value("table:number-columns-repeated")?.unwrap_or(1);
            let value_type = event.get_attribute_value("office:value-type")?.map(|value_type| value_type.to_string());
            kind = match value_type.as_deref() {
                None => CellType::Empty,
                Some("boolean") => CellType::Boolean,
                Some("date") => CellType::IsoDateTime,
                Some("time") => CellType::IsoDuration,
                Some("string") => {
                    let is_error = event
                        .get_attribute_value("calcext:value-type")?
                        .map(|calc_type| calc_type == "error")
                        .unwrap_or(false);
                    match is_error {
                        true if criteria.error_as_null => CellType::Empty,
                        true => CellType::Error,
                        false => CellType::InlineString,
                    }
                }
                Some(_) => CellType::Number,
            };
            match value_type.as_deref() {
                Some("string") => element_context = kind != CellType::Empty,
                Some("boolean") => {
                    let truthy = event
                        .get_attribute_value("office:boolean-value")?
                        .map(|flag| flag != "false" && flag != "0")
                        .unwrap_or(false);
                    value.push(if truthy { '1' } else { '0' });
                }
                Some("date") => value.push_str(&event.get_attribute_value("office:date-value")?.unwrap_or_default()),
                Some("time") => value.push_str(&event.get_attribute_value("office:time-value")?.unwrap_or_default()),
                Some(_) => value.push_str(&event.get_attribute_value("office:value")?.unwrap_or_default()),
                None => (),
            }
        }
        Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
            if kind != CellType::Empty && !value.is_empty() {
                if kind == CellType::Error {
                    Err(SpreadsheetError::CellValueError(
                        sheet.file_name.to_owned(),
                        sheet.name.to_owned(),
                        index_to_reference(row, col),
                        value.to_owned(),
                    ))?
                }
                for row_offset in 0..row_count {
                    for col_offset in 0..col_count {
                        sheet.push(Cell {
                            row: row + row_offset,
                            col: col + col_offset,
                            kind,
                            value: value.to_owned(),
                        });
                    }
                }
            }
            col += col_count;
            kind = CellType::Empty;
            element_context = false;
            comment_context = false;
        }
        Event::Start(event) if element_context && event.name() == ANNOTATION => comment_context = true,
        Event::End(event) if element_context && comment_context && event.name() == ANNOTATION => comment_context = false,
        Event::Start(event) if element_context && !comment_context && event.name() == PARAGRAPH => {
            if !value.is_empty() {
                value.push('\n');
            }
        }
        Event::Start(event) if element_context && !comment_context && event.name() == STRING => {
            let count = event.parse_attribute_value("text:c")?.unwrap_or(1usize);
            value.extend(std::iter::repeat(' ').take(count));
        }
        Event::Text(event) if element_context && !comment_context => value.push_bytes_text(&event)?,
        Event::GeneralRef(event) if element_context && !comment_context => value.push_bytes_ref(&event)?,
    });
    Ok(())
}

/// Validates that the archive declares the ODS spreadsheet MIME type
fn check_mime(zip: &mut ZipArchive<UnifiedReader>) -> Result<(), MetricSheetError> {
    if let Some(file) = &mut zip.file("mimetype")? {
        let mut buffer = Vec::with_capacity(MIME_TYPE.len());
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// Checks the manifest for encryption data on any file entry
fn is_password_protected(zip: &mut ZipArchive<UnifiedReader>) -> Result<bool, MetricSheetError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = true,
        Event::End(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == QName(b"manifest:encryption-data") => {
            return Ok(true);
        }
    });
    Ok(false)
}
