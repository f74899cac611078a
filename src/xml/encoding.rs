//! Charset normalization.
//!
//! Feed bodies arrive in whatever charset the server declared. Everything
//! past this point works on UTF-8 `str`, so bytes are decoded here once.

use encoding_rs::{Encoding, UTF_8};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::fetch::DEFAULT_CHARSET;

/// Decodes `bytes` declared to be in `charset` into a UTF-8 string.
///
/// Never fails: an unknown label falls back to UTF-8, and byte sequences that
/// are invalid in the source charset become U+FFFD. Both cases are logged.
/// A byte-order mark, when present, overrides the label.
pub fn normalize(bytes: &[u8], charset: &str) -> String {
    let label = match charset.trim() {
        "" => DEFAULT_CHARSET,
        label => label,
    };

    let encoding = Encoding::for_label(label.as_bytes()).unwrap_or_else(|| {
        tracing::warn!(charset = %label, "Unknown charset, decoding as UTF-8");
        UTF_8
    });

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::warn!(
            charset = %used.name(),
            bytes = bytes.len(),
            "Invalid byte sequences replaced during charset conversion"
        );
    }
    tracing::debug!(from = %used.name(), "Converted feed data to UTF-8");

    text.into_owned()
}

/// Charset a raw XML document announces for itself, from its byte-order mark
/// or the `encoding` pseudo-attribute of its XML declaration.
pub fn sniff_declared_charset(bytes: &[u8]) -> Option<String> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return Some(encoding.name().to_string());
    }

    let mut reader = Reader::from_reader(bytes);
    match reader.read_event() {
        Ok(Event::Decl(decl)) => match decl.encoding() {
            Some(Ok(label)) => Some(String::from_utf8_lossy(&label).into_owned()),
            _ => None,
        },
        _ => None,
    }
}
