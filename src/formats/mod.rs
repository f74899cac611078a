//! Dialect detection and the per-dialect feed parsers.
//!
//! [`detect_and_parse`] looks at the root element of a parsed document,
//! resolves a [`Dialect`] with [`detect_dialect`], then hands the tree to the
//! [`FormatParser`] for that dialect.

mod atom;
mod common;
mod detect;
pub mod namespaces;
mod rdf;
mod rss;

pub use detect::detect_dialect;

use crate::feed::{Dialect, Feed, FeedError};
use crate::xml::{Document, Element};

/// Populates a [`Feed`] from the root element of a document in one dialect.
///
/// Implementations fill metadata and items but never change the feed's
/// dialect. Their errors reach the caller unchanged.
pub trait FormatParser {
    fn parse_feed(&self, feed: &mut Feed, root: &Element, doc: &Document) -> Result<(), FeedError>;
}

/// Root element no parser understands.
struct UnknownParser;

impl FormatParser for UnknownParser {
    fn parse_feed(&self, _feed: &mut Feed, root: &Element, _doc: &Document) -> Result<(), FeedError> {
        Err(FeedError::Format(format!(
            "unsupported feed format: root element <{}>",
            root.name()
        )))
    }
}

/// The parser responsible for `dialect`.
pub fn parser_for(dialect: Dialect) -> Box<dyn FormatParser> {
    match dialect {
        Dialect::Rss091 | Dialect::Rss092 | Dialect::Rss094 | Dialect::Rss20 => Box::new(rss::RssParser),
        Dialect::Rss10 => Box::new(rdf::RdfParser),
        Dialect::Atom03 => Box::new(atom::AtomParser {
            namespace: Some(namespaces::ATOM_0_3_URI),
        }),
        Dialect::Atom10 => Box::new(atom::AtomParser {
            namespace: Some(namespaces::ATOM_1_0_URI),
        }),
        Dialect::Atom03NoNamespace => Box::new(atom::AtomParser { namespace: None }),
        Dialect::Unknown => Box::new(UnknownParser),
    }
}

/// Detects the dialect of `doc` and parses it into a new [`Feed`].
///
/// The feed's `encoding` is the encoding the document declared, if any.
///
/// # Errors
///
/// - [`FeedError::RootMissing`] if the document has no root element
/// - [`FeedError::NoVersion`] / [`FeedError::InvalidVersion`] from detection
/// - whatever the selected parser fails with
pub fn detect_and_parse(doc: &Document) -> Result<Feed, FeedError> {
    let root = doc.root().ok_or(FeedError::RootMissing)?;

    let dialect = detect_dialect(root.name(), root.namespace(), root.attr("version"))?;
    tracing::debug!(%dialect, root = root.name(), "Detected feed dialect");

    let mut feed = Feed::new(dialect);
    feed.encoding = doc.encoding().unwrap_or_default().to_string();
    parser_for(dialect).parse_feed(&mut feed, root, doc)?;

    Ok(feed)
}
