//! Namespace URIs the format parsers look for.

pub const ATOM_0_3_URI: &str = "http://purl.org/atom/ns#";
pub const ATOM_1_0_URI: &str = "http://www.w3.org/2005/Atom";
pub const RDF_URI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RSS_1_0_URI: &str = "http://purl.org/rss/1.0/";
pub const DC_URI: &str = "http://purl.org/dc/elements/1.1/";
pub const CONTENT_URI: &str = "http://purl.org/rss/1.0/modules/content/";
