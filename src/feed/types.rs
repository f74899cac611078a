use serde::Serialize;
use std::fmt;

// ============================================================================
// Dialect
// ============================================================================

/// The syndication format/version a document was recognized as.
///
/// Chosen by [`detect_dialect`](crate::formats::detect_dialect) before any
/// format parser runs; format parsers read it but never change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Dialect {
    #[serde(rename = "RSS_0_91")]
    Rss091,
    #[serde(rename = "RSS_0_92")]
    Rss092,
    #[serde(rename = "RSS_0_94")]
    Rss094,
    #[serde(rename = "RSS_1_0")]
    Rss10,
    #[serde(rename = "RSS_2_0")]
    Rss20,
    #[serde(rename = "ATOM_0_3")]
    Atom03,
    #[serde(rename = "ATOM_0_3_NONS")]
    Atom03NoNamespace,
    #[serde(rename = "ATOM_1_0")]
    Atom10,
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Rss091 => "RSS 0.91",
            Dialect::Rss092 => "RSS 0.92",
            Dialect::Rss094 => "RSS 0.94",
            Dialect::Rss10 => "RSS 1.0",
            Dialect::Rss20 => "RSS 2.0",
            Dialect::Atom03 => "Atom 0.3",
            Dialect::Atom03NoNamespace => "Atom 0.3 (no namespace)",
            Dialect::Atom10 => "Atom 1.0",
            Dialect::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Feed
// ============================================================================

/// A parsed syndication feed.
///
/// Owned by the caller once returned. An empty `Feed` (no items, unknown
/// dialect) is what a "not modified" fetch produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Feed {
    dialect: Dialect,
    /// Encoding label declared by the parsed document, empty if none.
    pub encoding: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub language: String,
    pub managing_editor: String,
    /// Raw publication date as written in the document.
    pub pub_date: String,
    /// Entries in document order.
    pub items: Vec<Item>,
}

impl Feed {
    /// Creates an empty feed already bound to `dialect`.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// Item
// ============================================================================

/// A single feed entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub description: String,
    /// MIME type of `description` when the format says so (Atom `type`).
    pub description_mime_type: String,
    pub author: String,
    pub author_email: String,
    pub guid: String,
    pub guid_is_permalink: bool,
    /// Raw publication date as written in the document.
    pub pub_date: String,
    /// Publication time as a Unix timestamp, when `pub_date` could be parsed.
    pub pub_date_ts: Option<i64>,
    pub enclosure_url: String,
    pub enclosure_type: String,
    pub content_encoded: String,
    pub categories: Vec<String>,
}
