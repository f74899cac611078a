//! Response header tracking.
//!
//! Raw header lines are folded into a [`HeaderState`]. A status line
//! (`HTTP/...`) resets the fold, so after a redirect chain only the final
//! response's validators and charset survive.

use std::time::{SystemTime, UNIX_EPOCH};

/// Charset assumed when neither the response nor the document declares one.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Validators and charset collected from one response header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderState {
    /// Unix timestamp from `Last-Modified`, 0 when absent or unparseable.
    pub last_modified: i64,
    /// Entity tag from `ETag`, empty when absent.
    pub etag: String,
    /// Charset from `Content-Type`, `None` when the response names none.
    pub charset: Option<String>,
}

impl HeaderState {
    /// Folds a sequence of raw header lines, starting from the defaults.
    pub fn fold<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines.into_iter().fold(Self::default(), Self::apply_line)
    }

    /// Applies one raw header line.
    ///
    /// Unrecognized or malformed lines leave the state untouched.
    pub fn apply_line(self, line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);

        if line.starts_with("HTTP/") {
            tracing::debug!(status_line = %line, "New response, resetting header state");
            return Self::default();
        }

        let Some((name, value)) = line.split_once(':') else {
            if !line.is_empty() {
                tracing::debug!(line = %line, "Ignoring malformed header line");
            }
            return self;
        };
        let value = value.trim();

        if name.eq_ignore_ascii_case("last-modified") {
            self.with_last_modified(value)
        } else if name.eq_ignore_ascii_case("etag") {
            tracing::debug!(etag = %value, "Got etag");
            Self {
                etag: value.to_string(),
                ..self
            }
        } else if name.eq_ignore_ascii_case("content-type") {
            match charset_from_content_type(value) {
                Some(charset) => Self {
                    charset: Some(charset),
                    ..self
                },
                None => self,
            }
        } else {
            self
        }
    }

    fn with_last_modified(self, value: &str) -> Self {
        let parsed = httpdate::parse_http_date(value)
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .and_then(|since| i64::try_from(since.as_secs()).ok());

        match parsed {
            Some(last_modified) => {
                tracing::debug!(value = %value, last_modified, "Got last-modified");
                Self {
                    last_modified,
                    ..self
                }
            }
            None => {
                tracing::debug!(value = %value, "Unparseable last-modified, ignoring");
                self
            }
        }
    }
}

/// Extracts the `charset=` parameter from a Content-Type value.
///
/// Surrounding double quotes are stripped; an empty charset counts as absent.
fn charset_from_content_type(value: &str) -> Option<String> {
    const KEY: &str = "charset=";

    let start = value.to_ascii_lowercase().find(KEY)? + KEY.len();
    let rest = &value[start..];
    let charset = rest.split(';').next().unwrap_or(rest).trim();
    let charset = charset
        .strip_prefix('"')
        .and_then(|c| c.strip_suffix('"'))
        .unwrap_or(charset);

    if charset.is_empty() {
        None
    } else {
        Some(charset.to_string())
    }
}

// ============================================================================
// Cache validators
// ============================================================================

/// Conditional-GET validators the caller keeps between fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheValidators {
    /// Unix timestamp of the last known modification, 0 = unknown.
    pub last_modified: i64,
    /// Last known entity tag, empty = unknown.
    pub etag: String,
}

impl CacheValidators {
    pub fn new(last_modified: i64, etag: impl Into<String>) -> Self {
        Self {
            last_modified,
            etag: etag.into(),
        }
    }

    /// True when neither validator is set.
    pub fn is_empty(&self) -> bool {
        self.last_modified == 0 && self.etag.is_empty()
    }

    /// `Last-Modified` as a `SystemTime`, if set.
    pub(crate) fn modified_since(&self) -> Option<SystemTime> {
        let secs = u64::try_from(self.last_modified).ok().filter(|s| *s > 0)?;
        UNIX_EPOCH.checked_add(std::time::Duration::from_secs(secs))
    }
}

impl From<&HeaderState> for CacheValidators {
    fn from(headers: &HeaderState) -> Self {
        Self {
            last_modified: headers.last_modified,
            etag: headers.etag.clone(),
        }
    }
}
