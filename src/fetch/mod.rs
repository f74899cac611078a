//! Conditional feed retrieval.
//!
//! - `headers` folds raw response header lines into validators and charset
//! - `fetcher` issues the conditional GET and follows redirects
//! - `handle` is the reusable network handle (client + cookie jar)
//! - `cookies` persists cookies in Netscape cookie-file format

mod cookies;
mod error;
mod fetcher;
mod handle;
mod headers;

pub use cookies::{Cookie, CookieError, CookieJar};
pub use error::TransportError;
pub use fetcher::{
    FetchOutcome, FetchRequest, Fetcher, RequestAuthenticator, A_IM_FEED, A_IM_HEADER,
    MAX_REDIRECTS,
};
pub use handle::{HttpHandle, CA_BUNDLE_ENV};
pub use headers::{CacheValidators, HeaderState, DEFAULT_CHARSET};
