use super::namespaces::{ATOM_0_3_URI, ATOM_1_0_URI};
use crate::feed::{Dialect, FeedError};

/// Picks the dialect for a document from its root element.
///
/// `root_name` is the local name, `namespace` the resolved namespace URI of
/// the root element and `version` its `version` attribute. For `feed` the
/// namespace wins over the version attribute; an unrecognized namespace is an
/// invalid version unless `version="0.3"`. Roots that are none of `rss`,
/// `RDF` or `feed` resolve to [`Dialect::Unknown`].
///
/// `rss version="1.0"` maps to RSS 0.91 and `RDF` maps to RSS 1.0 whatever
/// its namespace; real feeds are still served in both shapes.
pub fn detect_dialect(
    root_name: &str,
    namespace: Option<&str>,
    version: Option<&str>,
) -> Result<Dialect, FeedError> {
    match root_name {
        "rss" => match version {
            None => Err(FeedError::NoVersion { format: "RSS" }),
            Some("0.91") => Ok(Dialect::Rss091),
            Some("0.92") => Ok(Dialect::Rss092),
            Some("0.94") => Ok(Dialect::Rss094),
            Some("2.0" | "2") => Ok(Dialect::Rss20),
            Some("1.0") => Ok(Dialect::Rss091),
            Some(other) => Err(FeedError::InvalidVersion {
                format: "RSS",
                version: other.to_string(),
            }),
        },
        "RDF" => Ok(Dialect::Rss10),
        "feed" => match (namespace, version) {
            (Some(ATOM_0_3_URI), _) => Ok(Dialect::Atom03),
            (Some(ATOM_1_0_URI), _) => Ok(Dialect::Atom10),
            (_, Some("0.3")) => Ok(Dialect::Atom03NoNamespace),
            (None, _) => Err(FeedError::NoVersion { format: "Atom" }),
            (Some(_), other) => Err(FeedError::InvalidVersion {
                format: "Atom",
                version: other.unwrap_or_default().to_string(),
            }),
        },
        _ => Ok(Dialect::Unknown),
    }
}
