use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::encoding::{normalize, sniff_declared_charset};
use crate::feed::FeedError;
use crate::fetch::DEFAULT_CHARSET;

/// Namespace the `xml:` prefix is permanently bound to.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

// ============================================================================
// Tree
// ============================================================================

/// An attribute with its namespace resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Name as written, including any prefix (`rdf:about`).
    pub name: String,
    pub local_name: String,
    pub namespace: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
}

/// An element with its namespace resolved from the `xmlns` declarations in
/// scope where it appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    prefix: Option<String>,
    namespace: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    /// Local name, without prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Namespace URI, `None` when the element is in no namespace.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// True when the element has local name `name` in namespace `ns`.
    pub fn is(&self, ns: Option<&str>, name: &str) -> bool {
        self.name == name && self.namespace() == ns
    }

    /// Attribute value by name as written (`version`, `rdf:about`).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Attribute value by namespace and local name.
    pub fn attr_ns(&self, ns: &str, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.local_name == local_name && a.namespace.as_deref() == Some(ns))
            .map(|a| a.value.as_str())
    }

    /// Child elements in document order.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child with local name `name`, in any namespace.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children().find(|e| e.name == name)
    }

    /// First child with local name `name` in namespace `ns`.
    pub fn child_ns(&self, ns: &str, name: &str) -> Option<&Element> {
        self.children().find(|e| e.is(Some(ns), name))
    }

    /// Concatenated text of this element and all its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }
}

/// A parsed document: at most one root element plus what the document
/// declared about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    source: String,
    encoding: Option<String>,
    root: Option<Element>,
}

impl Document {
    /// URL or path the document came from; base for relative links.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Encoding named in the XML declaration, if any.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }
}

// ============================================================================
// Recovering tree builder
// ============================================================================

/// Element still waiting for its end tag.
struct OpenElement {
    qname: String,
    element: Element,
    declared_namespaces: usize,
}

#[derive(Default)]
struct TreeBuilder {
    open: Vec<OpenElement>,
    // (prefix, uri); `None` prefix is the default namespace
    namespaces: Vec<(Option<String>, String)>,
    root: Option<Element>,
    encoding: Option<String>,
}

impl TreeBuilder {
    fn lookup(&self, prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE.to_string());
        }
        self.namespaces
            .iter()
            .rev()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.clone())
            .filter(|uri| !uri.is_empty())
    }

    fn open(&mut self, start: &BytesStart<'_>, reader: &Reader<&[u8]>) -> OpenElement {
        let qname = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let decoder = reader.decoder();

        let mut raw_attributes = Vec::new();
        let mut declared = 0;
        for attr in start.attributes().with_checks(false) {
            let attr = match attr {
                Ok(attr) => attr,
                Err(e) => {
                    tracing::debug!(element = %qname, error = %e, "Skipping malformed attribute");
                    continue;
                }
            };
            let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.decode_and_unescape_value(decoder) {
                Ok(v) => v.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };

            if name == "xmlns" {
                self.namespaces.push((None, value));
                declared += 1;
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                self.namespaces.push((Some(prefix.to_string()), value));
                declared += 1;
            } else {
                raw_attributes.push((name, value));
            }
        }

        let (prefix, local) = split_qname(&qname);
        let namespace = self.lookup(prefix);
        let attributes = raw_attributes
            .into_iter()
            .map(|(name, value)| {
                let (attr_prefix, attr_local) = split_qname(&name);
                // Unprefixed attributes are in no namespace
                let namespace = attr_prefix.and_then(|p| self.lookup(Some(p)));
                Attribute {
                    local_name: attr_local.to_string(),
                    name,
                    namespace,
                    value,
                }
            })
            .collect();

        OpenElement {
            element: Element {
                name: local.to_string(),
                prefix: prefix.map(str::to_string),
                namespace,
                attributes,
                children: Vec::new(),
            },
            qname,
            declared_namespaces: declared,
        }
    }

    fn close(&mut self, open: OpenElement) {
        let keep = self.namespaces.len().saturating_sub(open.declared_namespaces);
        self.namespaces.truncate(keep);

        match self.open.last_mut() {
            Some(parent) => parent.element.children.push(Node::Element(open.element)),
            None if self.root.is_none() => self.root = Some(open.element),
            None => {
                tracing::debug!(element = %open.qname, "Ignoring element after the root element");
            }
        }
    }

    /// Closes `qname` and anything left open inside it. An end tag that
    /// matches nothing open is dropped.
    fn end(&mut self, qname: &str) {
        let Some(pos) = self.open.iter().rposition(|o| o.qname == qname) else {
            tracing::debug!(element = %qname, "Ignoring unmatched end tag");
            return;
        };
        while self.open.len() > pos {
            if let Some(open) = self.open.pop() {
                self.close(open);
            }
        }
    }

    fn text(&mut self, text: &str) {
        match self.open.last_mut() {
            Some(parent) => parent.element.push_text(text),
            None if text.trim().is_empty() => {}
            None => tracing::debug!("Ignoring text outside the root element"),
        }
    }

    fn finish(mut self, source: &str) -> Document {
        while let Some(open) = self.open.pop() {
            tracing::debug!(element = %open.qname, "Closing element left open at end of input");
            self.close(open);
        }
        Document {
            source: source.to_string(),
            encoding: self.encoding,
            root: self.root,
        }
    }
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (Some(prefix), local),
        _ => (None, qname),
    }
}

/// Builds a tree from `text`, recovering from malformed markup.
///
/// Mismatched end tags close back to the nearest matching open element,
/// elements still open at the end are closed, unknown entities keep their
/// raw text, and a hard syntax error ends the parse keeping everything read
/// so far. The result may have no root element.
pub fn parse_document(text: &str, source: &str) -> Document {
    let mut reader = Reader::from_str(text);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut builder = TreeBuilder::default();

    loop {
        match reader.read_event() {
            Ok(Event::Decl(decl)) => {
                if let Some(Ok(label)) = decl.encoding() {
                    builder.encoding = Some(String::from_utf8_lossy(&label).into_owned());
                }
            }
            Ok(Event::Start(start)) => {
                let open = builder.open(&start, &reader);
                builder.open.push(open);
            }
            Ok(Event::Empty(start)) => {
                let open = builder.open(&start, &reader);
                builder.close(open);
            }
            Ok(Event::End(end)) => {
                let qname = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                builder.end(&qname);
            }
            Ok(Event::Text(t)) => match t.unescape() {
                Ok(text) => builder.text(&text),
                Err(e) => {
                    tracing::debug!(error = %e, "Keeping undecodable text as-is");
                    builder.text(&String::from_utf8_lossy(&t));
                }
            },
            Ok(Event::CData(cdata)) => {
                builder.text(&String::from_utf8_lossy(&cdata.into_inner()));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!(
                    position = reader.buffer_position(),
                    error = %e,
                    "Unrecoverable markup error, keeping partial tree"
                );
                break;
            }
            // Comments, processing instructions, DOCTYPE
            Ok(_) => {}
        }
    }

    builder.finish(source)
}

// ============================================================================
// DocumentParser
// ============================================================================

/// Owns the most recently parsed document.
///
/// Each parse replaces (and drops) the previous document, so at most one tree
/// is alive per parser. Borrowed views never outlive the parser.
#[derive(Debug, Default)]
pub struct DocumentParser {
    current: Option<Document>,
}

impl DocumentParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses already-normalized `text`, labelling the document with `source`.
    ///
    /// # Errors
    ///
    /// [`FeedError::Parse`] when the buffer holds no markup at all.
    pub fn parse_buffer(&mut self, text: &str, source: &str) -> Result<&Document, FeedError> {
        self.current = None;
        if text.trim().is_empty() {
            return Err(FeedError::Parse("buffer".to_string()));
        }
        Ok(&*self.current.insert(parse_document(text, source)))
    }

    /// Reads and parses the file at `path`, honouring its declared encoding.
    ///
    /// # Errors
    ///
    /// [`FeedError::Io`] when the file cannot be read, [`FeedError::RootMissing`]
    /// when no root element could be recovered.
    pub fn parse_file(&mut self, path: &Path) -> Result<&Document, FeedError> {
        self.current = None;
        let bytes = std::fs::read(path)?;
        let charset = sniff_declared_charset(&bytes).unwrap_or_else(|| DEFAULT_CHARSET.to_string());
        let text = normalize(&bytes, &charset);

        let document = parse_document(&text, &path.to_string_lossy());
        if document.root().is_none() {
            return Err(FeedError::RootMissing);
        }
        Ok(&*self.current.insert(document))
    }

    /// The document from the last successful parse.
    pub fn document(&self) -> Option<&Document> {
        self.current.as_ref()
    }

    /// Drops the current document.
    pub fn release(&mut self) {
        self.current = None;
    }
}
