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
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::io::BufRead;
use tracing::debug;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_RELATIONSHIP: &[u8] = b"Relationship";       // Package relationship
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content

/// An Excel XLSX workbook
pub(crate) struct XlsxSpreadsheet {
    /// File name of the spreadsheet
    pub(crate) name: String,
    /// ZIP archive containing the XLSX file contents
    zip: ZipArchive<UnifiedReader>,
    /// Worksheets in workbook order as (name, zip_path) pairs
    sheets: Vec<(String, String)>,
}

impl XlsxSpreadsheet {
    /// Reads the workbook structure from an opened archive
    pub(crate) fn new(file_name: &str, mut zip: ZipArchive<UnifiedReader>) -> Result<XlsxSpreadsheet, MetricSheetError> {
        let sheets = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
        }
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            sheets,
        })
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    /// Loads the shared string table.
    ///
    /// Strings are stored once in `xl/sharedStrings.xml` and referenced from cells by index.
    /// Workbooks without any text have no such part.
    fn load_shared_strings(&mut self) -> Result<Vec<String>, MetricSheetError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
            }
        });
        Ok(shared_strings)
    }

    /// Reads the worksheets accepted by the criteria.
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, MetricSheetError> {
        let mut sheets = Vec::<Sheet>::new();
        for (sheet_name, zip_path) in &self.sheets {
            if !criteria.accept(sheet_name) {
                debug!(file = %self.name, sheet = %sheet_name, "sheet skipped by criteria");
                continue;
            }

            let mut sheet = Sheet::new(&self.name, sheet_name);
            let mut row_count = 0usize;
            let mut col_count = 0usize;
            let mut row = 0usize;
            let mut col = 0usize;
            let mut kind = CellType::default();
            let mut value = String::new();
            let mut reader = self.zip
                .xml_reader(zip_path)?
                .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
            match_xml_events!(reader => {
                Event::Start(event) if event.name() == TAG_ROW => {
                    // Rows without data are omitted from the file, so prefer the explicit number
                    if let Some(number) = event.parse_attribute_value::<usize>("r")? {
                        row_count = number.saturating_sub(1);
                    }
                    col_count = 0;
                }
                Event::End(event) if event.name() == TAG_ROW => {
                    row_count += 1;
                }
                Event::Start(event) if event.name() == TAG_CELL => {
                    (row, col) = event.get_attribute_value("r")?
                        .and_then(|reference| reference_to_index(&reference))
                        .unwrap_or((row_count, col_count));
                    col_count = col + 1;
                    value.clear();
                    kind = match event.get_attribute_value("t")?.as_deref() {
                        Some("inlineStr") | Some("str") => CellType::InlineString,
                        Some("s") => CellType::SharedString,
                        Some("d") => CellType::IsoDateTime,
                        Some("b") => CellType::Boolean,
                        Some("e") if criteria.error_as_null => CellType::Empty,
                        Some("e") => CellType::Error,
                        _ => CellType::Number,
                    };
                }
                Event::Start(event) if kind != CellType::Empty && event.name() == TAG_INLINE_STRING => {
                    value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
                }
                Event::Start(event) if kind != CellType::Empty && event.name() == TAG_VALUE => {
                    value = read_string_value(&mut reader, TAG_VALUE, true)?;
                }
                Event::End(event) if kind != CellType::Empty && !value.is_empty() && event.name() == TAG_CELL => {
                    if kind == CellType::Error {
                        Err(SpreadsheetError::CellValueError(
                            sheet.file_name.to_owned(),
                            sheet.name.to_owned(),
                            index_to_reference(row, col),
                            value.to_owned(),
                        ))?
                    }
                    sheet.push(Cell {
                        row,
                        col,
                        kind,
                        value: value.to_owned(),
                    });
                    value.clear();
                },
            });
            debug!(file = %self.name, sheet = %sheet.name, cells = sheet.cells.len(), "sheet read");
            sheets.push(sheet);
        }

        Ok(sheets)
    }
}

/// Loads the worksheet names and their archive paths, in workbook order.
///
/// Sheet order comes from `xl/workbook.xml`; the paths are resolved through
/// `xl/_rels/workbook.xml.rels`. Chart sheets and other non-worksheet parts are dropped.
fn load_workbook(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<(String, String)>, MetricSheetError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let name = event.get_attribute_value("name")?;
            let id = event.get_attribute_value("r:id")?;
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&*id) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
    });
    Ok(sheets)
}

/// Loads worksheet relationships as a mapping of relationship id to archive path
fn load_relationships(zip: &mut ZipArchive<UnifiedReader>, path: &str) -> Result<HashMap<String, String>, MetricSheetError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to a path inside the archive
fn to_zip_path(path: &str) -> String {
    if let Some(path) = path.strip_prefix('/') {
        path.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Reads string content up to `end_tag`, skipping phonetic annotations.
/// `is_text_content` is set for `<v>`, whose text is the value itself rather than nested `<t>` runs.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, MetricSheetError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::spreadsheet;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Builds a minimal xlsx archive. Each sheet is `(name, rows)` where a row is a list of
    /// `(reference, type attribute, inner xml)`.
    pub(crate) fn build_xlsx(shared_strings: &[&str], sheets: &[(&str, Vec<Vec<(&str, &str, &str)>>)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        let mut workbook = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#);
        let mut rels = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
        for (index, (name, rows)) in sheets.iter().enumerate() {
            let id = index + 1;
            workbook.push_str(&format!(r#"<sheet name="{name}" sheetId="{id}" r:id="rId{id}"/>"#));
            rels.push_str(&format!(r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#));

            let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#);
            for row in rows {
                xml.push_str("<row>");
                for (reference, kind, inner) in row {
                    if kind.is_empty() {
                        xml.push_str(&format!(r#"<c r="{reference}">{inner}</c>"#));
                    } else {
                        xml.push_str(&format!(r#"<c r="{reference}" t="{kind}">{inner}</c>"#));
                    }
                }
                xml.push_str("</row>");
            }
            xml.push_str("</sheetData></worksheet>");
            writer.start_file(format!("xl/worksheets/sheet{id}.xml"), SimpleFileOptions::default()).unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
        }
        rels.push_str(r#"<Relationship Id="rIdS" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#);
        workbook.push_str("</sheets></workbook>");

        writer.start_file("xl/workbook.xml", SimpleFileOptions::default()).unwrap();
        writer.write_all(workbook.as_bytes()).unwrap();
        writer.start_file("xl/_rels/workbook.xml.rels", SimpleFileOptions::default()).unwrap();
        writer.write_all(rels.as_bytes()).unwrap();

        if !shared_strings.is_empty() {
            let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#);
            for string in shared_strings {
                xml.push_str(&format!("<si><t>{string}</t></si>"));
            }
            xml.push_str("</sst>");
            writer.start_file("xl/sharedStrings.xml", SimpleFileOptions::default()).unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn sample() -> Vec<u8> {
        build_xlsx(
            &["Metric", "Value", "ROI", "Revenue"],
            &[
                ("KPI_R1", vec![
                    vec![("A1", "s", "<v>0</v>"), ("B1", "s", "<v>1</v>")],
                    vec![("A2", "s", "<v>2</v>"), ("B2", "inlineStr", "<is><t>-2.8%</t></is>")],
                    vec![("A4", "s", "<v>3</v>"), ("B4", "", "<v>1000</v>")],
                ]),
                ("Errors", vec![
                    vec![("A1", "str", "<v>Round</v>"), ("B1", "str", "<v>Flag</v>")],
                    vec![("A2", "", "<v>1</v>"), ("B2", "e", "<v>#DIV/0!</v>")],
                    vec![("A3", "", "<v>2</v>"), ("B3", "b", "<v>1</v>")],
                ]),
            ],
        )
    }

    #[test]
    fn reads_sheet_names_in_order() {
        let zip = ZipArchive::new(UnifiedReader::from_bytes(sample())).unwrap();
        let xlsx = XlsxSpreadsheet::new("metrics.xlsx", zip).unwrap();
        let names: Vec<&str> = xlsx.sheets.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["KPI_R1", "Errors"]);
        assert_eq!(xlsx.sheets[0].1, "xl/worksheets/sheet1.xml");
    }

    #[test]
    fn reads_shared_strings_and_cells() {
        let mut xlsx = spreadsheet::open_bytes("metrics.xlsx", sample()).unwrap();
        assert_eq!(xlsx.name(), "metrics.xlsx");
        assert_eq!(xlsx.load_shared_strings().unwrap(), vec!["Metric", "Value", "ROI", "Revenue"]);

        let sheets = xlsx.read_sheets(&Criteria::default()).unwrap();
        assert_eq!(sheets.len(), 2);
        let kpi = &sheets[0];
        assert_eq!(kpi.cells.len(), 6);
        assert_eq!(kpi.row_upper_bound, Some(3));
        let inline = &kpi.cells[3];
        assert_eq!((inline.row, inline.col), (1, 1));
        assert_eq!(inline.kind, CellType::InlineString);
        assert_eq!(inline.value, "-2.8%");

        // The error cell is dropped, the boolean kept
        let errors = &sheets[1];
        assert_eq!(errors.cells.len(), 5);
        assert_eq!(errors.cells[4].kind, CellType::Boolean);
    }

    #[test]
    fn error_cells_fail_without_error_as_null() {
        let mut xlsx = spreadsheet::open_bytes("metrics.xlsx", sample()).unwrap();
        let criteria = Criteria {
            error_as_null: false,
            ..Criteria::default()
        };
        let error = xlsx.read_sheets(&criteria).err().unwrap();
        assert_eq!(error.to_string(), "Error value in 'metrics.xlsx' sheet 'Errors' cell B2: #DIV/0!");
    }

    #[test]
    fn sheet_patterns_filter_sheets() {
        let mut xlsx = spreadsheet::open_bytes("upload", sample()).unwrap();
        let criteria = Criteria::default().with_sheet_patterns(&["KPI*"]).unwrap();
        let sheets = xlsx.read_sheets(&criteria).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "KPI_R1");
    }

    #[test]
    fn zip_path_normalization() {
        assert_eq!(to_zip_path("/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
    }
}
