//! Namespace-aware XML tree.
//!
//! SOS responses are small enough to hold in memory, and the extraction code
//! is far easier to read against a navigable tree than against a pull parser.
//! This module turns the `quick-xml` event stream into owned `XmlElement`s with
//! resolved namespace URIs and offers `prefix:local` lookups through a fixed
//! prefix table.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use thiserror::Error;

/// Fixed prefix table used by every lookup in the crate.
///
/// Several prefixes accept more than one namespace URI because services in the
/// wild mix schema revisions (e.g. GML 3.1 vs 3.2).
pub const NAMESPACES: &[(&str, &[&str])] = &[
    (
        "sml",
        &[
            "http://www.opengis.net/sensorML/1.0.1",
            "http://www.opengis.net/sensorML/1.0",
        ],
    ),
    (
        "gml",
        &["http://www.opengis.net/gml", "http://www.opengis.net/gml/3.2"],
    ),
    ("xlink", &["http://www.w3.org/1999/xlink"]),
    (
        "swe",
        &[
            "http://www.opengis.net/swe/1.0.1",
            "http://www.opengis.net/swe/1.0",
            "http://www.opengis.net/swe/2.0",
        ],
    ),
    ("ism", &["urn:us:gov:ic:ism:v2"]),
    ("sos", &["http://www.opengis.net/sos/1.0"]),
    (
        "ows",
        &["http://www.opengis.net/ows/1.1", "http://www.opengis.net/ows"],
    ),
    ("om", &["http://www.opengis.net/om/1.0"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Syntax(String),
    #[error("document has no root element")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// One element of a parsed document.
///
/// `text` holds the concatenated, trimmed character data directly inside the
/// element (not its descendants).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

/// Parse a complete document into its root element.
pub fn parse(bytes: &[u8]) -> Result<XmlElement, XmlError> {
    let mut reader = NsReader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (ns, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| XmlError::Syntax(e.to_string()))?;
        let namespace = namespace_uri(&ns);

        match event {
            Event::Start(start) => {
                let element = open_element(&reader, namespace, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&reader, namespace, &start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::Syntax("unbalanced closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let value = text
                        .unescape()
                        .unwrap_or_else(|_| Cow::Owned(String::from_utf8_lossy(&text).into_owned()));
                    push_text(current, &value);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    push_text(current, &String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(XmlError::Syntax("unexpected end of document".to_string()));
    }
    root.ok_or(XmlError::Empty)
}

fn namespace_uri(ns: &ResolveResult) -> Option<String> {
    match ns {
        ResolveResult::Bound(namespace) => {
            Some(String::from_utf8_lossy(namespace.as_ref()).into_owned())
        }
        _ => None,
    }
}

fn open_element<R>(
    reader: &NsReader<R>,
    namespace: Option<String>,
    start: &BytesStart<'_>,
) -> Result<XmlElement, XmlError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Syntax(e.to_string()))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (ns, local) = reader.resolve_attribute(attr.key);
        let value = attr
            .unescape_value()
            .map(Cow::into_owned)
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        attributes.push(XmlAttribute {
            namespace: namespace_uri(&ns),
            name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            value,
        });
    }

    Ok(XmlElement {
        namespace,
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlError::Syntax("multiple root elements".to_string())),
    }
}

fn push_text(element: &mut XmlElement, value: &str) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return;
    }
    if !element.text.is_empty() {
        element.text.push(' ');
    }
    element.text.push_str(trimmed);
}

/// Split `prefix:local` into the accepted namespace URIs and the local name.
///
/// An unprefixed name matches any namespace. An unknown prefix matches nothing.
fn resolve_qname(qname: &str) -> (Option<&'static [&'static str]>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => {
            let uris = NAMESPACES
                .iter()
                .find(|(p, _)| *p == prefix)
                .map(|(_, uris)| *uris)
                .unwrap_or(&[]);
            (Some(uris), local)
        }
        None => (None, qname),
    }
}

fn namespace_matches(actual: Option<&str>, accepted: Option<&[&str]>) -> bool {
    match accepted {
        None => true,
        Some(uris) => actual.is_some_and(|ns| uris.contains(&ns)),
    }
}

impl XmlElement {
    /// Whether this element is `prefix:local`.
    pub fn is(&self, qname: &str) -> bool {
        let (uris, local) = resolve_qname(qname);
        self.name == local && namespace_matches(self.namespace.as_deref(), uris)
    }

    /// Trimmed text content, `None` when empty.
    pub fn text(&self) -> Option<&str> {
        let text = self.text.trim();
        if text.is_empty() { None } else { Some(text) }
    }

    /// Attribute value by `prefix:local` (unprefixed means "no namespace").
    pub fn attr(&self, qname: &str) -> Option<&str> {
        let (uris, local) = resolve_qname(qname);
        self.attributes
            .iter()
            .find(|a| {
                a.name == local
                    && match uris {
                        None => a.namespace.is_none(),
                        Some(_) => namespace_matches(a.namespace.as_deref(), uris),
                    }
            })
            .map(|a| a.value.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn child(&self, qname: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.is(qname))
    }

    pub fn children_named<'a>(&'a self, qname: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.is(qname))
    }

    /// Follow a `/`-separated path of child steps, taking the first match at
    /// each step.
    pub fn find(&self, path: &str) -> Option<&XmlElement> {
        path.split('/')
            .filter(|step| !step.is_empty())
            .try_fold(self, |el, step| el.child(step))
    }

    /// Every element reachable by the path (all matches at each step).
    pub fn find_all(&self, path: &str) -> Vec<&XmlElement> {
        let mut current = vec![self];
        for step in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|el| el.children.iter().filter(move |c| c.is(step)))
                .collect();
        }
        current
    }

    /// Text of the element at `path`, if any.
    pub fn find_text(&self, path: &str) -> Option<&str> {
        self.find(path).and_then(XmlElement::text)
    }

    /// Depth-first search for the first descendant (or self) named `qname`.
    pub fn first_descendant(&self, qname: &str) -> Option<&XmlElement> {
        if self.is(qname) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.first_descendant(qname))
    }

    /// All descendants named `qname` in document order (excluding self).
    pub fn descendants_named(&self, qname: &str) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        collect_descendants(self, qname, &mut out);
        out
    }
}

fn collect_descendants<'a>(el: &'a XmlElement, qname: &str, out: &mut Vec<&'a XmlElement>) {
    for child in &el.children {
        if child.is(qname) {
            out.push(child);
        }
        collect_descendants(child, qname, out);
    }
}
