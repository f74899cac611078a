use super::common::{generate_guid, or_else, parse_timestamp, resolve_url};
use super::namespaces::DC_URI;
use super::FormatParser;
use crate::feed::{Feed, FeedError, Item};
use crate::xml::{Document, Element, XML_NAMESPACE};

/// Atom 0.3 and 1.0.
///
/// `namespace` is the Atom namespace elements must be in; `None` for the
/// namespace-less 0.3 variant, where elements are unqualified.
pub(crate) struct AtomParser {
    pub(crate) namespace: Option<&'static str>,
}

impl AtomParser {
    fn child<'a>(&self, parent: &'a Element, name: &str) -> Option<&'a Element> {
        parent.children().find(|e| e.is(self.namespace, name))
    }

    fn text(&self, parent: &Element, name: &str) -> String {
        self.child(parent, name)
            .map(|e| e.text().trim().to_string())
            .unwrap_or_default()
    }

    /// Name and email of the first `author` child.
    fn author(&self, parent: &Element) -> Option<(String, String)> {
        let author = self.child(parent, "author")?;
        Some((self.text(author, "name"), self.text(author, "email")))
    }

    /// First link with relation `rel`. A link without `rel` counts as
    /// `alternate`.
    fn link<'a>(&self, parent: &'a Element, rel: &str) -> Option<&'a Element> {
        parent
            .children()
            .filter(|e| e.is(self.namespace, "link"))
            .find(|e| e.attr("rel").unwrap_or("alternate") == rel)
    }

    fn parse_entry(&self, entry: &Element, parent_base: &str, feed_author: &(String, String)) -> Item {
        let base = base_for(entry, parent_base);
        let mut item = Item {
            title: self.text(entry, "title"),
            ..Item::default()
        };

        if let Some(link) = self.link(entry, "alternate") {
            item.link = resolve_url(&base, link.attr("href").unwrap_or_default());
        }
        if let Some(enclosure) = self.link(entry, "enclosure") {
            item.enclosure_url = resolve_url(&base, enclosure.attr("href").unwrap_or_default());
            item.enclosure_type = enclosure.attr("type").unwrap_or_default().to_string();
        }

        (item.author, item.author_email) = self
            .author(entry)
            .unwrap_or_else(|| feed_author.clone());

        let body = self
            .child(entry, "content")
            .or_else(|| self.child(entry, "summary"));
        if let Some(body) = body {
            item.description = body.text().trim().to_string();
            item.description_mime_type = mime_type(body.attr("type"));
        }
        if let Some(content) = self.child(entry, "content") {
            item.content_encoded = content.text().trim().to_string();
        }

        // 1.0 uses published/updated, 0.3 issued/modified
        item.pub_date = ["published", "issued", "updated", "modified"]
            .iter()
            .map(|name| self.text(entry, name))
            .find(|date| !date.is_empty())
            .unwrap_or_default();
        item.pub_date_ts = parse_timestamp(&item.pub_date);

        item.categories = entry
            .children()
            .filter_map(|e| {
                if e.is(self.namespace, "category") {
                    e.attr("label").or(e.attr("term")).map(str::to_string)
                } else if e.is(Some(DC_URI), "subject") {
                    Some(e.text().trim().to_string())
                } else {
                    None
                }
            })
            .filter(|c| !c.is_empty())
            .collect();

        let id = self.text(entry, "id");
        item.guid = generate_guid(Some(id.as_str()), &item.link, &item.title, item.pub_date_ts);

        item
    }
}

impl FormatParser for AtomParser {
    fn parse_feed(&self, feed: &mut Feed, root: &Element, doc: &Document) -> Result<(), FeedError> {
        let base = base_for(root, doc.source());

        feed.title = self.text(root, "title");
        if let Some(link) = self.link(root, "alternate") {
            feed.link = resolve_url(&base, link.attr("href").unwrap_or_default());
        }
        feed.description = or_else(self.text(root, "subtitle"), || self.text(root, "tagline"));
        feed.language = root
            .attr_ns(XML_NAMESPACE, "lang")
            .unwrap_or_default()
            .to_string();
        feed.pub_date = or_else(self.text(root, "updated"), || self.text(root, "modified"));

        let feed_author = self.author(root).unwrap_or_default();
        feed.managing_editor = feed_author.0.clone();

        feed.items = root
            .children()
            .filter(|e| e.is(self.namespace, "entry"))
            .map(|entry| self.parse_entry(entry, &base, &feed_author))
            .collect();

        Ok(())
    }
}

/// Base URL in effect inside `element`: its `xml:base` resolved against the
/// parent's base.
fn base_for(element: &Element, parent_base: &str) -> String {
    match element.attr_ns(XML_NAMESPACE, "base") {
        Some(base) => resolve_url(parent_base, base),
        None => parent_base.to_string(),
    }
}

/// Maps an Atom content `type` to a MIME type. Atom 0.3 already uses MIME
/// types, which pass through.
fn mime_type(kind: Option<&str>) -> String {
    match kind {
        None | Some("text") => "text/plain",
        Some("html") => "text/html",
        Some("xhtml") => "application/xhtml+xml",
        Some(other) => other,
    }
    .to_string()
}
