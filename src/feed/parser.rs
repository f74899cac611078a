use std::path::Path;

use super::{Feed, FeedError};
use crate::config::FetchConfig;
use crate::fetch::{
    CacheValidators, FetchOutcome, FetchRequest, Fetcher, HttpHandle, RequestAuthenticator,
    DEFAULT_CHARSET,
};
use crate::formats::detect_and_parse;
use crate::lifecycle;
use crate::xml::{normalize, sniff_declared_charset, DocumentParser};

/// Fetches, decodes and parses feeds.
///
/// Owns at most one parsed document at a time; each parse releases the
/// previous one. Not meant to be shared between concurrent calls.
#[derive(Debug, Default)]
pub struct FeedParser {
    fetcher: Fetcher,
    documents: DocumentParser,
    last_modified: i64,
    etag: String,
}

impl FeedParser {
    pub fn new(config: FetchConfig) -> Self {
        Self {
            fetcher: Fetcher::new(config),
            ..Self::default()
        }
    }

    /// `Last-Modified` of the last successful fetch, 0 if unknown.
    pub fn last_modified(&self) -> i64 {
        self.last_modified
    }

    /// `ETag` of the last successful fetch, empty if unknown.
    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Validators to send with the next fetch of the same URL.
    pub fn validators(&self) -> CacheValidators {
        CacheValidators::new(self.last_modified, self.etag.clone())
    }

    /// Fetches `url` with conditional-GET `validators` and parses the result.
    ///
    /// Without a `handle` a fresh one is used for this call only. Without a
    /// `cookie_jar` the configured `cookie_cache`, if any, is used. An empty
    /// response (e.g. 304 Not Modified) gives an empty [`Feed`] and nothing
    /// is parsed.
    ///
    /// The body is decoded with the `Content-Type` charset. When the response
    /// names none, the document's own BOM or `encoding=` declaration is used,
    /// then UTF-8.
    ///
    /// # Errors
    ///
    /// [`FeedError::Transport`] when the request fails; otherwise the errors
    /// of [`FeedParser::parse_buffer`]. On transport failure
    /// [`FeedParser::last_modified`] and [`FeedParser::etag`] keep the values
    /// of the previous successful fetch, even when the failing response sent
    /// new validators.
    pub async fn parse_url(
        &mut self,
        url: &str,
        validators: &CacheValidators,
        handle: Option<&mut HttpHandle>,
        auth: Option<&dyn RequestAuthenticator>,
        cookie_jar: Option<&Path>,
    ) -> Result<Feed, FeedError> {
        if !lifecycle::is_initialized() {
            tracing::warn!("Feed parser used before feedpipe::lifecycle::ensure_initialized()");
        }

        let config_jar = self.fetcher.config().cookie_cache.clone();
        let mut request = FetchRequest::new(url, validators);
        if let Some(auth) = auth {
            request = request.with_auth(auth);
        }
        if let Some(path) = cookie_jar.or(config_jar.as_deref()) {
            request = request.with_cookie_jar(path);
        }

        let outcome = match handle {
            Some(handle) => self.fetcher.fetch(request, handle).await?,
            None => self.fetcher.fetch(request, &mut HttpHandle::new()).await?,
        };

        let headers = outcome.headers();
        self.last_modified = headers.last_modified;
        self.etag = headers.etag.clone();

        match outcome {
            FetchOutcome::Empty { .. } => {
                // A 304 need not repeat the validators
                if self.last_modified == 0 {
                    self.last_modified = validators.last_modified;
                }
                if self.etag.is_empty() {
                    self.etag = validators.etag.clone();
                }
                Ok(Feed::default())
            }
            FetchOutcome::Body { bytes, headers } => {
                let charset = headers
                    .charset
                    .or_else(|| sniff_declared_charset(&bytes))
                    .unwrap_or_else(|| DEFAULT_CHARSET.to_string());
                let text = normalize(&bytes, &charset);
                tracing::info!(
                    url,
                    charset = %charset,
                    chars = text.len(),
                    "Converted feed data"
                );
                self.parse_buffer(&text, url)
            }
        }
    }

    /// Parses already-decoded feed text. `url` is the base for relative
    /// links.
    ///
    /// # Errors
    ///
    /// [`FeedError::Parse`] for an empty buffer, [`FeedError::RootMissing`]
    /// when no root element could be recovered, and any detection or
    /// format-parser error.
    pub fn parse_buffer(&mut self, text: &str, url: &str) -> Result<Feed, FeedError> {
        let document = self.documents.parse_buffer(text, url)?;
        let feed = detect_and_parse(document)?;
        tracing::info!(
            url,
            dialect = %feed.dialect(),
            encoding = %feed.encoding,
            items = feed.items.len(),
            "Parsed feed"
        );
        Ok(feed)
    }

    /// Reads and parses a feed file.
    ///
    /// # Errors
    ///
    /// [`FeedError::Io`] if the file cannot be read, [`FeedError::RootMissing`]
    /// if it holds no root element, and any detection or format-parser error.
    pub fn parse_file(&mut self, path: &Path) -> Result<Feed, FeedError> {
        let document = self.documents.parse_file(path)?;
        let feed = detect_and_parse(document)?;
        tracing::info!(
            path = %path.display(),
            dialect = %feed.dialect(),
            items = feed.items.len(),
            "Parsed feed file"
        );
        Ok(feed)
    }
}
