use std::path::Path;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use super::error::{TransportError, TOO_MANY_REDIRECTS, URL_MALFORMAT};
use super::handle::{ClientSettings, HttpHandle};
use super::headers::{CacheValidators, HeaderState};
use crate::config::FetchConfig;

/// Maximum number of redirects followed within one fetch.
pub const MAX_REDIRECTS: usize = 10;

/// Incremental-update extension (RFC 3229 + feed): the server may answer
/// with only the entries that changed since the validators.
pub const A_IM_HEADER: &str = "a-im";
pub const A_IM_FEED: &str = "feed";

/// Hook that may add headers (usually credentials) to every feed request.
pub trait RequestAuthenticator: Send + Sync {
    fn add_custom_headers(&self, headers: &mut HeaderMap);
}

/// Everything one fetch needs to know besides the configuration.
#[derive(Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub validators: &'a CacheValidators,
    pub auth: Option<&'a dyn RequestAuthenticator>,
    pub cookie_jar: Option<&'a Path>,
}

impl<'a> FetchRequest<'a> {
    pub fn new(url: &'a str, validators: &'a CacheValidators) -> Self {
        Self {
            url,
            validators,
            auth: None,
            cookie_jar: None,
        }
    }

    pub fn with_auth(mut self, auth: &'a dyn RequestAuthenticator) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_cookie_jar(mut self, path: &'a Path) -> Self {
        self.cookie_jar = Some(path);
        self
    }
}

/// Successful result of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server sent a document.
    Body { bytes: Vec<u8>, headers: HeaderState },
    /// Nothing to parse: not modified, or a genuinely empty resource.
    Empty { headers: HeaderState },
}

impl FetchOutcome {
    /// Header state of the final response in the redirect chain.
    pub fn headers(&self) -> &HeaderState {
        match self {
            FetchOutcome::Body { headers, .. } | FetchOutcome::Empty { headers } => headers,
        }
    }
}

/// Issues conditional GET requests for feeds.
///
/// One call sends the request, follows redirects, and buffers the whole body
/// before returning. There is no internal retry: a failed attempt surfaces
/// immediately.
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches `request.url` through `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the URL is malformed, the connection
    /// fails, the total timeout elapses, more than [`MAX_REDIRECTS`] redirects
    /// are chained, or the final status is 400 or above.
    pub async fn fetch(
        &self,
        request: FetchRequest<'_>,
        handle: &mut HttpHandle,
    ) -> Result<FetchOutcome, TransportError> {
        let settings = ClientSettings::from_config(&self.config);
        let client = handle.client_for(&settings)?;

        if let Some(path) = request.cookie_jar {
            handle.attach_cookie_jar(path);
        }

        let exchange = self.exchange(&client, request, handle);
        let result = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .unwrap_or_else(|_| Err(TransportError::timeout())),
            None => exchange.await,
        };

        // Cookies collected so far are persisted whatever the outcome
        handle.flush_cookies();

        match &result {
            Ok(FetchOutcome::Body { bytes, .. }) => {
                tracing::info!(url = %request.url, bytes = bytes.len(), "Retrieved feed data");
            }
            Ok(FetchOutcome::Empty { .. }) => {
                tracing::info!(url = %request.url, "Empty response, nothing to update");
            }
            Err(e) => {
                tracing::error!(url = %request.url, error = %e, "Feed request failed");
            }
        }
        result
    }

    async fn exchange(
        &self,
        client: &reqwest::Client,
        request: FetchRequest<'_>,
        handle: &mut HttpHandle,
    ) -> Result<FetchOutcome, TransportError> {
        let mut url = Url::parse(request.url).map_err(|e| {
            tracing::debug!(url = %request.url, error = %e, "Unparseable feed URL");
            TransportError::new(URL_MALFORMAT)
        })?;
        let base_headers = request_headers(&request);
        let mut state = HeaderState::default();

        for hop in 0..=MAX_REDIRECTS {
            let mut headers = base_headers.clone();
            if let Some(cookies) = handle.cookie_jar().and_then(|jar| jar.header_for(&url)) {
                merge_cookie_header(&mut headers, &cookies);
            }

            let response = client
                .get(url.clone())
                .headers(headers)
                .send()
                .await
                .map_err(|e| TransportError::from_reqwest(&e))?;

            state = raw_header_lines(&response)
                .iter()
                .map(String::as_str)
                .fold(state, HeaderState::apply_line);

            if let Some(jar) = handle.cookie_jar_mut() {
                for value in response.headers().get_all(reqwest::header::SET_COOKIE) {
                    if let Ok(value) = value.to_str() {
                        jar.store_set_cookie(&url, value);
                    }
                }
            }

            let status = response.status();
            tracing::debug!(url = %url, status = %status, hop, "Received response");

            if let Some(next) = redirect_target(&response, &url)? {
                tracing::debug!(from = %url, to = %next, hop, "Following redirect");
                url = next;
                continue;
            }

            if status.is_client_error() || status.is_server_error() {
                return Err(TransportError::http_status(status.as_u16()));
            }

            let bytes = read_body(response).await?;
            return Ok(if bytes.is_empty() {
                FetchOutcome::Empty { headers: state }
            } else {
                FetchOutcome::Body {
                    bytes,
                    headers: state,
                }
            });
        }

        Err(TransportError::new(TOO_MANY_REDIRECTS))
    }
}

/// Buffers the whole response body in memory.
async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, TransportError> {
    let mut bytes = Vec::with_capacity(response.content_length().unwrap_or(0).min(1 << 20) as usize);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| TransportError::from_reqwest(&e))?;
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// Conditional, extension and collaborator headers shared by every hop.
fn request_headers(request: &FetchRequest<'_>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Some(auth) = request.auth {
        auth.add_custom_headers(&mut headers);
    }

    let validators = request.validators;
    if let Some(since) = validators.modified_since() {
        if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(since)) {
            headers.insert(reqwest::header::IF_MODIFIED_SINCE, value);
        }
    }

    if !validators.etag.is_empty() {
        match HeaderValue::from_str(&validators.etag) {
            Ok(value) => {
                headers.insert(reqwest::header::IF_NONE_MATCH, value);
            }
            Err(_) => {
                tracing::warn!(etag = %validators.etag, "ETag is not a valid header value, skipping");
            }
        }
    }

    if !validators.is_empty() {
        headers.insert(
            HeaderName::from_static(A_IM_HEADER),
            HeaderValue::from_static(A_IM_FEED),
        );
    }

    headers
}

/// Appends jar cookies to any `Cookie` header the auth collaborator set.
fn merge_cookie_header(headers: &mut HeaderMap, jar_cookies: &str) {
    let merged = match headers
        .get(reqwest::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
    {
        Some(existing) => format!("{existing}; {jar_cookies}"),
        None => jar_cookies.to_string(),
    };

    match HeaderValue::from_str(&merged) {
        Ok(value) => {
            headers.insert(reqwest::header::COOKIE, value);
        }
        Err(_) => tracing::warn!("Cookie header is not a valid header value, skipping jar cookies"),
    }
}

/// Raw header block of a response: status line followed by `Name: value` lines.
fn raw_header_lines(response: &reqwest::Response) -> Vec<String> {
    let mut lines = Vec::with_capacity(response.headers().len() + 1);
    lines.push(format!("{:?} {}", response.version(), response.status()));
    for (name, value) in response.headers() {
        lines.push(format!(
            "{}: {}",
            name,
            String::from_utf8_lossy(value.as_bytes())
        ));
    }
    lines
}

/// Next URL when `response` is a followable redirect.
fn redirect_target(
    response: &reqwest::Response,
    current: &Url,
) -> Result<Option<Url>, TransportError> {
    use reqwest::StatusCode;

    let followable = matches!(
        response.status(),
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    );
    if !followable {
        return Ok(None);
    }

    let Some(location) = response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(None);
    };

    current.join(location).map(Some).map_err(|e| {
        tracing::debug!(location = %location, error = %e, "Unusable redirect location");
        TransportError::new(URL_MALFORMAT)
    })
}
