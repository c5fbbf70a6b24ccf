//! # Spreadsheet Reading Module
//!
//! Reads Excel (`.xlsx`, `.xlsm`, `.xlam`) and OpenDocument (`.ods`) workbooks into raw sheets.
//! Each format implements [`Spreadsheet`]; [`open`] picks the implementation from the file
//! extension, or by sniffing the archive when the name carries none (uploaded bytes).
pub(crate) mod cell;
pub(crate) mod criteria;
pub(crate) mod ods;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

pub use criteria::Criteria;

use crate::error::MetricSheetError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;

/// Signature of OLE compound files; Office wraps password-protected workbooks in one
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Cannot detect file format for '{0}'")]
    InvalidFileFormat(String),

    #[error("Missing '{0}' in spreadsheet archive")]
    FileError(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Spreadsheet '{0}' contains no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Error value in '{0}' sheet '{1}' cell {2}: {3}")]
    CellValueError(String, String, String, String),
}

/// A spreadsheet format able to produce raw sheets.
pub(crate) trait Spreadsheet {
    /// Returns the file name of this spreadsheet
    fn name(&self) -> String;

    /// Loads the shared string table referenced by `CellType::SharedString` cells
    fn load_shared_strings(&mut self) -> Result<Vec<String>, MetricSheetError>;

    /// Reads every sheet accepted by the criteria, in workbook order
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, MetricSheetError>;
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Format {
    Xlsx,
    Ods,
}

impl Format {
    fn from_extension(file_name: &str) -> Option<Format> {
        let extension = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "xlsx" | "xlsm" | "xlam" => Some(Format::Xlsx),
            "ods" => Some(Format::Ods),
            _ => None,
        }
    }
}

/// Opens a spreadsheet from a local path.
pub(crate) fn open(file_name: &str) -> Result<Box<dyn Spreadsheet>, MetricSheetError> {
    let format = Format::from_extension(file_name)
        .ok_or_else(|| SpreadsheetError::InvalidFileFormat(file_name.to_owned()))?;
    open_reader(file_name, UnifiedReader::open(file_name)?, Some(format))
}

/// Opens a spreadsheet held in memory. `file_name` is used for format detection and messages.
pub(crate) fn open_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Box<dyn Spreadsheet>, MetricSheetError> {
    open_reader(file_name, UnifiedReader::from_bytes(bytes), Format::from_extension(file_name))
}

fn open_reader(file_name: &str, mut reader: UnifiedReader, format: Option<Format>) -> Result<Box<dyn Spreadsheet>, MetricSheetError> {
    if is_password_protected(&mut reader)? {
        Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
    }
    let zip = ZipArchive::new(reader)
        .map_err(|_| SpreadsheetError::InvalidFileFormat(file_name.to_owned()))?;
    let format = match format {
        Some(format) => format,
        None if zip.contains("xl/workbook.xml") => Format::Xlsx,
        None if zip.contains("content.xml") => Format::Ods,
        None => Err(SpreadsheetError::InvalidFileFormat(file_name.to_owned()))?,
    };
    let spreadsheet: Box<dyn Spreadsheet> = match format {
        Format::Xlsx => Box::new(XlsxSpreadsheet::new(file_name, zip)?),
        Format::Ods => Box::new(OdsSpreadsheet::new(file_name, zip)?),
    };
    Ok(spreadsheet)
}

/// Checks whether the content is an OLE container rather than a zip archive.
/// Encrypted OOXML packages are stored this way.
fn is_password_protected<RS: Read + Seek>(reader: &mut RS) -> Result<bool, MetricSheetError> {
    let mut signature = [0u8; 8];
    let protected = match reader.read_exact(&mut signature) {
        Ok(()) => signature == CFB_SIGNATURE,
        Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(error) => Err(error)?,
    };
    reader.seek(SeekFrom::Start(0))?;
    Ok(protected)
}
