use super::common::{find, generate_guid, or_else, parse_timestamp, resolve_url, split_author, text_of};
use super::namespaces::{CONTENT_URI, DC_URI};
use super::FormatParser;
use crate::feed::{Feed, FeedError, Item};
use crate::xml::{Document, Element};

/// RSS 0.91, 0.92, 0.94 and 2.0. All of them share the `rss/channel/item`
/// layout with unqualified element names.
pub(crate) struct RssParser;

impl FormatParser for RssParser {
    fn parse_feed(&self, feed: &mut Feed, root: &Element, doc: &Document) -> Result<(), FeedError> {
        let channel = find(root, None, "channel")
            .ok_or_else(|| FeedError::Format("no RSS channel found".to_string()))?;

        feed.title = text_of(channel, None, "title");
        feed.link = resolve_url(doc.source(), &text_of(channel, None, "link"));
        feed.description = text_of(channel, None, "description");
        feed.language = or_else(text_of(channel, None, "language"), || {
            text_of(channel, Some(DC_URI), "language")
        });
        feed.managing_editor = text_of(channel, None, "managingEditor");
        feed.pub_date = or_else(text_of(channel, None, "pubDate"), || {
            text_of(channel, Some(DC_URI), "date")
        });

        // Some 0.9x feeds put items next to the channel instead of inside it
        let items = channel
            .children()
            .chain(root.children())
            .filter(|e| e.is(None, "item"));
        feed.items = items.map(|e| parse_item(e, doc.source())).collect();

        Ok(())
    }
}

fn parse_item(element: &Element, base: &str) -> Item {
    let mut item = Item {
        title: text_of(element, None, "title"),
        link: resolve_url(base, &text_of(element, None, "link")),
        description: text_of(element, None, "description"),
        content_encoded: text_of(element, Some(CONTENT_URI), "encoded"),
        ..Item::default()
    };

    let author = or_else(text_of(element, None, "author"), || {
        text_of(element, Some(DC_URI), "creator")
    });
    (item.author, item.author_email) = split_author(&author);

    item.pub_date = or_else(text_of(element, None, "pubDate"), || {
        text_of(element, Some(DC_URI), "date")
    });
    item.pub_date_ts = parse_timestamp(&item.pub_date);

    if let Some(enclosure) = find(element, None, "enclosure") {
        item.enclosure_url = resolve_url(base, enclosure.attr("url").unwrap_or_default());
        item.enclosure_type = enclosure.attr("type").unwrap_or_default().to_string();
    }

    item.categories = element
        .children()
        .filter(|e| e.is(None, "category") || e.is(Some(DC_URI), "subject"))
        .map(|e| e.text().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    match find(element, None, "guid") {
        Some(guid) if !guid.text().trim().is_empty() => {
            item.guid = guid.text().trim().to_string();
            item.guid_is_permalink = guid.attr("isPermaLink") != Some("false");
        }
        _ => {
            item.guid = generate_guid(None, &item.link, &item.title, item.pub_date_ts);
        }
    }

    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Result<Feed, FeedError> {
        let doc = parse_document(text, "http://example.com/blog/feed.xml");
        let mut feed = Feed::default();
        RssParser.parse_feed(&mut feed, doc.root().unwrap(), &doc)?;
        Ok(feed)
    }

    #[test]
    fn test_rss20_channel_and_items() {
        let feed = parse(
            r#"<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
  <title>Example</title>
  <link>http://example.com/</link>
  <description>An example feed</description>
  <language>en-us</language>
  <managingEditor>editor@example.com (Ed)</managingEditor>
  <pubDate>Sun, 06 Nov 1994 08:49:37 GMT</pubDate>
  <item>
    <title>First</title>
    <link>posts/1</link>
    <description>Short</description>
    <content:encoded><![CDATA[<p>Long</p>]]></content:encoded>
    <author>jane@example.com (Jane)</author>
    <guid isPermaLink="false">tag:example.com,1994:1</guid>
    <pubDate>Sun, 06 Nov 1994 08:49:37 GMT</pubDate>
    <enclosure url="http://example.com/ep1.mp3" type="audio/mpeg" length="1"/>
    <category>news</category>
    <category>tech</category>
  </item>
  <item><title>Second</title></item>
</channel>
</rss>"#,
        )
        .unwrap();

        assert_eq!(feed.title, "Example");
        assert_eq!(feed.link, "http://example.com/");
        assert_eq!(feed.description, "An example feed");
        assert_eq!(feed.language, "en-us");
        assert_eq!(feed.managing_editor, "editor@example.com (Ed)");
        assert_eq!(feed.items.len(), 2);

        let first = &feed.items[0];
        assert_eq!(first.title, "First");
        assert_eq!(first.link, "http://example.com/blog/posts/1");
        assert_eq!(first.content_encoded, "<p>Long</p>");
        assert_eq!(first.author, "Jane");
        assert_eq!(first.author_email, "jane@example.com");
        assert_eq!(first.guid, "tag:example.com,1994:1");
        assert!(!first.guid_is_permalink);
        assert_eq!(first.pub_date_ts, Some(784111777));
        assert_eq!(first.enclosure_url, "http://example.com/ep1.mp3");
        assert_eq!(first.enclosure_type, "audio/mpeg");
        assert_eq!(first.categories, vec!["news", "tech"]);

        let second = &feed.items[1];
        assert_eq!(second.title, "Second");
        assert_eq!(second.guid.len(), 64);
        assert!(!second.guid_is_permalink);
    }

    #[test]
    fn test_guid_is_permalink_by_default() {
        let feed = parse(
            r#"<rss version="2.0"><channel><item><guid>http://example.com/1</guid></item></channel></rss>"#,
        )
        .unwrap();
        assert!(feed.items[0].guid_is_permalink);
    }

    #[test]
    fn test_dublin_core_fallbacks() {
        let feed = parse(
            r#"<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/"><channel>
<item><title>t</title><dc:creator>Jane Doe</dc:creator><dc:date>1994-11-06T08:49:37Z</dc:date><dc:subject>misc</dc:subject></item>
</channel></rss>"#,
        )
        .unwrap();
        let item = &feed.items[0];
        assert_eq!(item.author, "Jane Doe");
        assert_eq!(item.pub_date, "1994-11-06T08:49:37Z");
        assert_eq!(item.pub_date_ts, Some(784111777));
        assert_eq!(item.categories, vec!["misc"]);
    }

    #[test]
    fn test_items_beside_channel() {
        let feed = parse(
            r#"<rss version="0.91"><channel><title>Old</title></channel><item><title>Loose</title></item></rss>"#,
        )
        .unwrap();
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].title, "Loose");
    }

    #[test]
    fn test_missing_channel() {
        let err = parse(r#"<rss version="2.0"><item/></rss>"#).unwrap_err();
        assert!(matches!(err, FeedError::Format(_)));
    }
}
