//! The feed model and the fetch-and-parse pipeline.
//!
//! - `types` defines [`Feed`], [`Item`] and [`Dialect`]
//! - `parser` holds [`FeedParser`], which chains fetching, charset
//!   conversion, document parsing and dialect dispatch
//! - `error` defines [`FeedError`]
//!
//! # Example
//!
//! ```ignore
//! use feedpipe::{CacheValidators, FeedParser, FetchConfig};
//!
//! feedpipe::lifecycle::ensure_initialized();
//! let mut parser = FeedParser::new(FetchConfig::default());
//! let feed = parser
//!     .parse_url("https://example.com/feed.xml", &CacheValidators::default(), None, None, None)
//!     .await?;
//! let next = parser.validators();
//! ```

mod error;
mod parser;
mod types;

pub use error::FeedError;
pub use parser::FeedParser;
pub use types::{Dialect, Feed, Item};
