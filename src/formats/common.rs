use chrono::{DateTime, NaiveDate};
use sha2::{Digest, Sha256};

use crate::xml::Element;

/// First child named `name` in namespace `ns` (`None` = unqualified).
pub(crate) fn find<'a>(parent: &'a Element, ns: Option<&str>, name: &str) -> Option<&'a Element> {
    parent.children().find(|e| e.is(ns, name))
}

/// Trimmed text of the first matching child, empty when absent.
pub(crate) fn text_of(parent: &Element, ns: Option<&str>, name: &str) -> String {
    find(parent, ns, name)
        .map(|e| e.text().trim().to_string())
        .unwrap_or_default()
}

/// Returns `value`, or `fallback()` when `value` is empty.
pub(crate) fn or_else(value: String, fallback: impl FnOnce() -> String) -> String {
    if value.is_empty() {
        fallback()
    } else {
        value
    }
}

/// Unix timestamp for a feed date.
///
/// Accepts RFC 2822 (RSS), RFC 3339 (Atom, Dublin Core) and bare
/// `YYYY-MM-DD` dates. Anything else yields `None`.
pub(crate) fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
    }
    tracing::debug!(date = %raw, "Unrecognized date format");
    None
}

/// Resolves `href` against `base`. Returns `href` unchanged when either is
/// not usable as a URL.
pub(crate) fn resolve_url(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() || base.is_empty() {
        return href.to_string();
    }
    url::Url::parse(base)
        .and_then(|base| base.join(href))
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

/// Stable identifier for an entry.
///
/// Uses the feed's own id when it has one, otherwise hashes link, title and
/// publication time so the same entry gets the same guid on every fetch.
pub(crate) fn generate_guid(
    existing: Option<&str>,
    link: &str,
    title: &str,
    published: Option<i64>,
) -> String {
    if let Some(guid) = existing {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}|{}",
        link,
        title,
        published.map(|p| p.to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}

/// Splits an RSS author of the form `jane@example.com (Jane Doe)` into name
/// and email. Plain names come back with an empty email.
pub(crate) fn split_author(raw: &str) -> (String, String) {
    let raw = raw.trim();
    if let Some((email, rest)) = raw.split_once(" (") {
        if email.contains('@') {
            if let Some(name) = rest.strip_suffix(')') {
                return (name.trim().to_string(), email.trim().to_string());
            }
        }
    }
    if raw.contains('@') && !raw.contains(' ') {
        return (String::new(), raw.to_string());
    }
    (raw.to_string(), String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_guid_prefers_existing() {
        assert_eq!(generate_guid(Some("  id-1 "), "l", "t", None), "id-1");
    }

    #[test]
    fn test_generate_guid_is_deterministic() {
        let a = generate_guid(None, "http://x/1", "Title", Some(100));
        let b = generate_guid(Some("   "), "http://x/1", "Title", Some(100));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, generate_guid(None, "http://x/1", "Title", Some(101)));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("Sun, 06 Nov 1994 08:49:37 GMT"),
            Some(784111777)
        );
        assert_eq!(parse_timestamp("1994-11-06T08:49:37Z"), Some(784111777));
        assert_eq!(
            parse_timestamp("1994-11-06T09:49:37+01:00"),
            Some(784111777)
        );
        assert_eq!(parse_timestamp("1994-11-06"), Some(784080000));
        assert_eq!(parse_timestamp("last tuesday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("http://example.com/blog/feed.xml", "post/1"),
            "http://example.com/blog/post/1"
        );
        assert_eq!(
            resolve_url("http://example.com/feed", "https://other.org/a"),
            "https://other.org/a"
        );
        assert_eq!(resolve_url("", "post/1"), "post/1");
        assert_eq!(resolve_url("/tmp/feed.xml", "post/1"), "post/1");
    }

    #[test]
    fn test_split_author() {
        assert_eq!(
            split_author("jane@example.com (Jane Doe)"),
            ("Jane Doe".to_string(), "jane@example.com".to_string())
        );
        assert_eq!(
            split_author("jane@example.com"),
            (String::new(), "jane@example.com".to_string())
        );
        assert_eq!(
            split_author("Jane Doe"),
            ("Jane Doe".to_string(), String::new())
        );
    }
}
