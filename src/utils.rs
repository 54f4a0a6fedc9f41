//! Small XML helpers shared by the connector transformers.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

/// Deserializes a struct from an XML string.
pub(crate) trait XmlExt {
    fn parse_xml<T: DeserializeOwned>(&self) -> Result<T, quick_xml::DeError>;
}

impl XmlExt for str {
    fn parse_xml<T: DeserializeOwned>(&self) -> Result<T, quick_xml::DeError> {
        quick_xml::de::from_str(self)
    }
}

/// Removes namespace prefixes from element tags so SOAP replies deserialize
/// against prefix-free response structs regardless of the prefix the server
/// picked (`<soap:Body>`, `<s:Body>`, ...). Attributes and text content are
/// left alone.
pub(crate) fn strip_soap_prefixes(xml: &str) -> String {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    let prefix = PREFIX.get_or_init(|| {
        Regex::new(r"<(/?)[A-Za-z0-9_]+:").expect("static pattern")
    });
    prefix.replace_all(xml, "<$1").into_owned()
}

/// Escapes a string for use as XML text content.
pub(crate) fn escape_xml_text(value: &str) -> String {
    quick_xml::escape::escape(value).into_owned()
}
