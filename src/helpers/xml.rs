//! XML reading utilities shared by the XLSX and ODS readers.
//! Wraps quick-xml with the configuration both formats need and adds attribute/text helpers.

use crate::error::MetricSheetError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute '{0}' value '{1}' failed")]
    ParseAttributeValueError(String, String),
}

/// Event-at-a-time XML reader owning its scratch buffer
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        // `<c r="A1"/>` must produce both Start and End so cell bookkeeping stays uniform
        config.expand_empty_elements = true;
        config.trim_text(false);

        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Reads the next event, `None` at end of document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, MetricSheetError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

/// Attribute lookup on start tags
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets the unescaped value of an attribute by its qualified name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, MetricSheetError>;

    /// Parses an attribute value, failing when it is present but malformed
    fn parse_attribute_value<T: FromStr>(&'a self, name: &str) -> Result<Option<T>, MetricSheetError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, MetricSheetError> {
        match self.try_get_attribute(name)? {
            Some(attribute) => Ok(Some(attribute.unescape_value()?)),
            None => Ok(None),
        }
    }

    fn parse_attribute_value<T: FromStr>(&'a self, name: &str) -> Result<Option<T>, MetricSheetError> {
        match self.get_attribute_value(name)? {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| XmlError::ParseAttributeValueError(name.to_owned(), value.to_string()).into()),
            None => Ok(None),
        }
    }
}

/// Accumulates cell text from text and entity-reference events
pub(crate) trait XmlTextContextHelper {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), MetricSheetError>;

    /// Appends a general reference such as `&amp;` or `&#8364;`
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), MetricSheetError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), MetricSheetError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), MetricSheetError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = match number.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16)?,
                None => number.parse::<u32>()?,
            };
            if let Some(character) = char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }
        Ok(())
    }
}

/// Loops over the events of an `XmlReader`, dispatching to the given match arms.
/// Unlisted events are ignored; `break` and `continue` apply to the event loop.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::name::QName;

    #[test]
    fn reads_attributes_and_text() {
        let xml = r#"<row r="3"><c r="B3" s="x"><v>1 &amp; 2 &#8364;</v></c></row>"#;
        let mut reader = XmlReader::new(xml.as_bytes());
        let mut row = None::<usize>;
        let mut style = None::<String>;
        let mut text = String::new();
        let mut in_value = false;
        let result: Result<(), MetricSheetError> = (|| {
            match_xml_events!(reader => {
                Event::Start(event) if event.name() == QName(b"row") => {
                    row = event.parse_attribute_value("r")?;
                }
                Event::Start(event) if event.name() == QName(b"c") => {
                    style = event.get_attribute_value("s")?.map(|value| value.to_string());
                }
                Event::Start(event) if event.name() == QName(b"v") => in_value = true,
                Event::End(event) if event.name() == QName(b"v") => in_value = false,
                Event::Text(event) if in_value => text.push_bytes_text(&event)?,
                Event::GeneralRef(event) if in_value => text.push_bytes_ref(&event)?,
            });
            Ok(())
        })();
        assert!(result.is_ok());
        assert_eq!(row, Some(3));
        assert_eq!(style.as_deref(), Some("x"));
        assert_eq!(text, "1 & 2 €");
    }

    #[test]
    fn malformed_attribute_is_an_error() {
        let xml = r#"<row r="three"/>"#;
        let mut reader = XmlReader::new(xml.as_bytes());
        let result: Result<Option<usize>, MetricSheetError> = (|| {
            let mut row = None;
            match_xml_events!(reader => {
                Event::Start(event) if event.name() == QName(b"row") => {
                    row = event.parse_attribute_value("r")?;
                }
            });
            Ok(row)
        })();
        assert!(result.is_err());
    }
}
