//! ZIP archive helpers for the XLSX and ODS containers

use crate::error::MetricSheetError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// Lookup of archive members by name
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets an archive member (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, MetricSheetError>;

    /// Creates an XML reader over an archive member
    fn xml_reader(&'_ mut self, name: &str) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, MetricSheetError>;

    /// Checks whether an archive member exists
    fn contains(&self, name: &str) -> bool;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, MetricSheetError> {
        let path = match member_name(self, name) {
            Some(path) => path,
            None => return Ok(None),
        };
        match self.by_name(&path) {
            Ok(file) => Ok(Some(file)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(&'_ mut self, name: &str) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, MetricSheetError> {
        Ok(self.file(name)?.map(|file| XmlReader::new(BufReader::new(file))))
    }

    fn contains(&self, name: &str) -> bool {
        member_name(self, name).is_some()
    }
}

/// Resolves the stored member name for a requested path.
/// Some producers write backslashes or differ in case from the relationship targets.
fn member_name<RS: Read + Seek>(zip: &ZipArchive<RS>, name: &str) -> Option<String> {
    let pattern = name.replace('\\', "/");
    zip.file_names()
        .find(|file_name| pattern.eq_ignore_ascii_case(&file_name.replace('\\', "/")))
        .map(|file_name| file_name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn archive() -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("xl/Workbook.xml", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"<workbook/>").unwrap();
        let cursor = writer.finish().unwrap();
        ZipArchive::new(cursor).unwrap()
    }

    #[test]
    fn file_lookup_ignores_case_and_separator() {
        let mut zip = archive();
        assert!(zip.contains("xl/workbook.xml"));
        assert!(zip.contains("xl\\WORKBOOK.xml"));
        let mut content = String::new();
        zip.file("XL/workbook.xml").unwrap().unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "<workbook/>");
    }

    #[test]
    fn missing_member_is_none() {
        let mut zip = archive();
        assert!(!zip.contains("xl/sharedStrings.xml"));
        assert!(zip.file("xl/sharedStrings.xml").unwrap().is_none());
        assert!(zip.xml_reader("xl/sharedStrings.xml").unwrap().is_none());
    }
}
