//! Minimal namespace-aware XML element tree.
//!
//! Uses quick-xml's `NsReader`, which never expands entities. Documents with
//! a DOCTYPE (where entities would be declared) are refused.

use crate::error::{Result, SoapClientError};
use crate::policy::QName;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

/// An element with resolved namespace, attributes, children and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: QName,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlElement>,
    /// Concatenated text content (trimmed), if any
    pub text: Option<String>,
}

/// A namespace-resolved attribute. Namespace declarations are not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: QName,
    pub value: String,
}

impl XmlElement {
    /// Attribute value by local name, ignoring its namespace.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Attribute value by fully qualified name.
    pub fn attribute_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace == namespace && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Depth-first search for the first element matching `pred`, including self.
    pub fn find<P>(&self, pred: &P) -> Option<&XmlElement>
    where
        P: Fn(&XmlElement) -> bool,
    {
        if pred(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(pred))
    }
}

/// Parse a complete document and return its root element.
pub fn parse_document(xml: &str) -> Result<XmlElement> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        let namespace = namespace_of(resolved);

        match event {
            Event::Start(ref e) => {
                let element = element_from(&reader, namespace, e)?;
                stack.push(element);
            }
            Event::Empty(ref e) => {
                let element = element_from(&reader, namespace, e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    SoapClientError::XmlParse("Unbalanced end tag".to_string())
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref t) => {
                if let Some(current) = stack.last_mut() {
                    let text = t.unescape()?;
                    push_text(current, &text);
                }
            }
            Event::CData(t) => {
                if let Some(current) = stack.last_mut() {
                    let bytes = t.into_inner();
                    push_text(current, &String::from_utf8_lossy(&bytes));
                }
            }
            Event::DocType(_) => {
                return Err(SoapClientError::XmlParse(
                    "DOCTYPE declarations are not allowed".to_string(),
                ));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(SoapClientError::XmlParse(
            "Unexpected end of document".to_string(),
        ));
    }

    root.ok_or_else(|| SoapClientError::XmlParse("Document has no root element".to_string()))
}

fn namespace_of(resolved: ResolveResult) -> String {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => String::from_utf8_lossy(ns).into_owned(),
        _ => String::new(),
    }
}

fn element_from(
    reader: &NsReader<&[u8]>,
    namespace: String,
    e: &BytesStart,
) -> Result<XmlElement> {
    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| SoapClientError::XmlParse(e.to_string()))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local_name) = reader.resolve_attribute(attr.key);
        let value = attr.unescape_value()?.into_owned();
        attributes.push(XmlAttribute {
            name: QName::new(
                namespace_of(resolved),
                String::from_utf8_lossy(local_name.as_ref()).into_owned(),
            ),
            value,
        });
    }

    Ok(XmlElement {
        name: QName::new(namespace, local),
        attributes,
        children: Vec::new(),
        text: None,
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                return Err(SoapClientError::XmlParse(
                    "Document has more than one root element".to_string(),
                ));
            }
            *root = Some(element);
        }
    }
    Ok(())
}

fn push_text(element: &mut XmlElement, text: &str) {
    if text.is_empty() {
        return;
    }
    match element.text {
        Some(ref mut existing) => existing.push_str(text),
        None => element.text = Some(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolves_namespaces() {
        let xml = r#"<?xml version="1.0"?>
<a:Root xmlns:a="urn:a" xmlns:b="urn:b" b:flag="1" plain="x">
  <b:Child>hello</b:Child>
  <Empty/>
</a:Root>"#;
        let root = parse_document(xml).unwrap();
        assert_eq!(root.name, QName::new("urn:a", "Root"));
        assert_eq!(root.attribute_ns("urn:b", "flag"), Some("1"));
        assert_eq!(root.attribute("plain"), Some("x"));
        assert_eq!(root.attributes.len(), 2);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].name, QName::new("urn:b", "Child"));
        assert_eq!(root.children[0].text.as_deref(), Some("hello"));
        assert_eq!(root.children[1].name, QName::new("", "Empty"));
    }

    #[test]
    fn test_default_namespace() {
        let root = parse_document(r#"<Root xmlns="urn:d"><Inner/></Root>"#).unwrap();
        assert_eq!(root.name.namespace, "urn:d");
        assert_eq!(root.children[0].name.namespace, "urn:d");
    }

    #[test]
    fn test_unescapes_text() {
        let root = parse_document("<Root>a &amp; b</Root>").unwrap();
        assert_eq!(root.text.as_deref(), Some("a & b"));
    }

    #[test]
    fn test_rejects_doctype() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<Root>&xxe;</Root>"#;
        let err = parse_document(xml).unwrap_err();
        assert!(matches!(err, SoapClientError::XmlParse(_)));
    }

    #[test]
    fn test_rejects_lowercase_doctype() {
        let err = parse_document("<!doctype Root><Root/>").unwrap_err();
        assert!(matches!(err, SoapClientError::XmlParse(_)));
    }

    #[test]
    fn test_entity_text_in_comment_and_cdata_is_allowed() {
        let xml = r#"<Root><!-- <!ENTITY e "x"> --><A><![CDATA[a < b <!ENTITY e "x">]]></A></Root>"#;
        let root = parse_document(xml).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].text.as_deref(), Some(r#"a < b <!ENTITY e "x">"#));
    }

    #[test]
    fn test_cdata_joins_surrounding_text() {
        let root = parse_document("<Root>a&amp;<![CDATA[<b>]]></Root>").unwrap();
        assert_eq!(root.text.as_deref(), Some("a&<b>"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_document("<Root><Open></Root>").is_err());
        assert!(parse_document("").is_err());
    }

    #[test]
    fn test_find() {
        let root = parse_document(r#"<R><A id="1"/><B><A id="2"/></B></R>"#).unwrap();
        let found = root.find(&|e: &XmlElement| e.attribute("id") == Some("2"));
        assert!(found.is_some());
    }
}
