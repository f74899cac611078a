//! Markup layer: charset normalization and the recovering document tree.

mod document;
mod encoding;

pub use document::{
    parse_document, Attribute, Document, DocumentParser, Element, XML_NAMESPACE,
};
pub use encoding::{normalize, sniff_declared_charset};
