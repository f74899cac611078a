//! Conditional feed fetching and multi-dialect RSS/Atom parsing.
//!
//! The pipeline runs URL → conditional GET → charset conversion → recovering
//! XML tree → dialect detection → format parser → [`Feed`].

pub mod config;
pub mod feed;
pub mod fetch;
pub mod formats;
pub mod lifecycle;
pub mod xml;

pub use config::{ConfigError, FetchConfig, ProxyType};
pub use feed::{Dialect, Feed, FeedError, FeedParser, Item};
pub use fetch::{CacheValidators, HttpHandle, RequestAuthenticator, TransportError};
