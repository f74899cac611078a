use super::common::{generate_guid, or_else, parse_timestamp, resolve_url, text_of};
use super::namespaces::{CONTENT_URI, DC_URI, RDF_URI, RSS_1_0_URI};
use super::FormatParser;
use crate::feed::{Feed, FeedError, Item};
use crate::xml::{Document, Element};

/// RSS 1.0 (RDF Site Summary).
pub(crate) struct RdfParser;

/// RSS 1.0 elements are normally in the RSS 1.0 namespace; some producers
/// leave them unqualified.
fn rss_child<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent
        .children()
        .find(|e| e.name() == name && matches!(e.namespace(), None | Some(RSS_1_0_URI)))
}

fn rss_text(parent: &Element, name: &str) -> String {
    rss_child(parent, name)
        .map(|e| e.text().trim().to_string())
        .unwrap_or_default()
}

impl FormatParser for RdfParser {
    fn parse_feed(&self, feed: &mut Feed, root: &Element, doc: &Document) -> Result<(), FeedError> {
        let base = doc.source();

        if let Some(channel) = rss_child(root, "channel") {
            feed.title = rss_text(channel, "title");
            feed.link = resolve_url(base, &rss_text(channel, "link"));
            feed.description = rss_text(channel, "description");
            feed.language = text_of(channel, Some(DC_URI), "language");
            feed.managing_editor = text_of(channel, Some(DC_URI), "creator");
            feed.pub_date = text_of(channel, Some(DC_URI), "date");
        }

        feed.items = root
            .children()
            .filter(|e| e.name() == "item" && matches!(e.namespace(), None | Some(RSS_1_0_URI)))
            .map(|e| parse_item(e, base))
            .collect();

        Ok(())
    }
}

fn parse_item(element: &Element, base: &str) -> Item {
    let mut item = Item {
        title: rss_text(element, "title"),
        link: resolve_url(base, &rss_text(element, "link")),
        description: rss_text(element, "description"),
        author: text_of(element, Some(DC_URI), "creator"),
        content_encoded: text_of(element, Some(CONTENT_URI), "encoded"),
        ..Item::default()
    };
    item.description = or_else(item.description, || {
        text_of(element, Some(DC_URI), "description")
    });
    item.pub_date = text_of(element, Some(DC_URI), "date");
    item.pub_date_ts = parse_timestamp(&item.pub_date);
    item.categories = element
        .children()
        .filter(|e| e.is(Some(DC_URI), "subject"))
        .map(|e| e.text().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let about = element.attr_ns(RDF_URI, "about");
    item.guid = generate_guid(about, &item.link, &item.title, item.pub_date_ts);

    item
}
