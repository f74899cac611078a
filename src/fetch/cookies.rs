//! Netscape cookie file persistence.
//!
//! The same file supplies outgoing cookies and receives the cookies servers
//! set, so sessions survive across fetches and process restarts. Format: one
//! cookie per line, 7 TAB-separated fields (`domain`, `tailmatch`, `path`,
//! `secure`, `expires`, `name`, `value`), `#` comments, and curl's
//! `#HttpOnly_` domain prefix.
//!
//! Matching, expiry and `Set-Cookie` parsing are done by `cookie_store`, the
//! store behind reqwest's `cookies` feature. File lines are turned into
//! `Set-Cookie` strings against a synthetic origin on load.

use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use cookie_store::{CookieDomain, CookieExpiration, CookieStore};
use thiserror::Error;
use url::Url;

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Errors that can occur while loading or saving a cookie file.
#[derive(Debug, Error)]
pub enum CookieError {
    /// A line in the cookie file has an invalid format.
    #[error("line {line_number}: {reason}")]
    InvalidLine { line_number: usize, reason: String },

    /// I/O error reading or writing the cookie file.
    #[error("cookie file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One stored cookie.
///
/// The value is redacted in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Host the cookie belongs to, lowercase, without a leading dot.
    pub domain: String,
    /// Whether subdomains of `domain` also receive the cookie.
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// Unix timestamp for expiry (0 = session cookie).
    pub expires: i64,
    pub name: String,
    value: String,
}

impl Cookie {
    pub fn value(&self) -> &str {
        &self.value
    }

    /// URL a server would have set this cookie from.
    fn origin(&self) -> Option<Url> {
        let scheme = if self.secure { "https" } else { "http" };
        Url::parse(&format!("{scheme}://{}{}", self.domain, self.path)).ok()
    }

    fn to_set_cookie(&self) -> String {
        let mut header = format!("{}={}; Path={}", self.name, self.value, self.path);
        if self.include_subdomains {
            header.push_str(&format!("; Domain={}", self.domain));
        }
        if self.secure {
            header.push_str("; Secure");
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        if self.expires != 0 {
            let when = UNIX_EPOCH + Duration::from_secs(self.expires.max(1).unsigned_abs());
            header.push_str(&format!("; Expires={}", httpdate::fmt_http_date(when)));
        }
        header
    }

    fn from_stored(cookie: &cookie_store::Cookie<'_>) -> Option<Self> {
        let (domain, include_subdomains) = match &cookie.domain {
            CookieDomain::HostOnly(domain) => (domain.clone(), false),
            CookieDomain::Suffix(domain) => (domain.clone(), true),
            _ => return None,
        };
        let expires = match &cookie.expires {
            CookieExpiration::AtUtc(at) => at.unix_timestamp().max(1),
            CookieExpiration::SessionEnd => 0,
        };

        Some(Self {
            domain,
            include_subdomains,
            path: String::from(&cookie.path),
            secure: cookie.secure().unwrap_or(false),
            http_only: cookie.http_only().unwrap_or(false),
            expires,
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
        })
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("domain", &self.domain)
            .field("include_subdomains", &self.include_subdomains)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// In-memory cookie store backed by a Netscape cookie file.
#[derive(Default)]
pub struct CookieJar {
    store: CookieStore,
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("cookies", &self.cookies())
            .finish()
    }
}

impl CookieJar {
    /// Loads a cookie file. A missing file yields an empty jar.
    pub fn load(path: &Path) -> Result<Self, CookieError> {
        match std::fs::File::open(path) {
            Ok(file) => Self::parse(std::io::BufReader::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No cookie file yet, starting empty");
                Ok(Self::default())
            }
            Err(e) => Err(CookieError::Io(e)),
        }
    }

    /// Parses Netscape cookie lines. Malformed lines are skipped with a warning.
    pub fn parse(reader: impl BufRead) -> Result<Self, CookieError> {
        let mut jar = Self::default();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() || (line.starts_with('#') && !line.starts_with(HTTP_ONLY_PREFIX)) {
                continue;
            }

            match parse_cookie_line(line, idx + 1) {
                Ok(cookie) => jar.insert(&cookie),
                Err(e) => tracing::warn!(reason = %e, "Skipping malformed cookie line"),
            }
        }

        Ok(jar)
    }

    fn insert(&mut self, cookie: &Cookie) {
        let Some(origin) = cookie.origin() else {
            tracing::warn!(domain = %cookie.domain, "Skipping cookie with unusable domain");
            return;
        };
        if let Err(e) = self.store.parse(&cookie.to_set_cookie(), &origin) {
            tracing::debug!(domain = %cookie.domain, name = %cookie.name, error = %e, "Cookie not loaded");
        }
    }

    /// Writes the jar back in Netscape format, dropping expired cookies.
    pub fn save(&self, path: &Path) -> Result<(), CookieError> {
        let mut out = String::from("# Netscape HTTP Cookie File\n");
        for cookie in self.cookies() {
            let prefix = if cookie.http_only { HTTP_ONLY_PREFIX } else { "" };
            let dot = if cookie.include_subdomains { "." } else { "" };
            out.push_str(&format!(
                "{prefix}{dot}{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                cookie.domain,
                bool_field(cookie.include_subdomains),
                cookie.path,
                bool_field(cookie.secure),
                cookie.expires,
                cookie.name,
                cookie.value
            ));
        }

        let mut file = std::fs::File::create(path)?;
        file.write_all(out.as_bytes())?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.store.iter_unexpired().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the unexpired cookies.
    pub fn cookies(&self) -> Vec<Cookie> {
        self.store
            .iter_unexpired()
            .filter_map(Cookie::from_stored)
            .collect()
    }

    /// `Cookie` header value for a request to `url`, if any cookie applies.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let pairs: Vec<String> = self
            .store
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect();

        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    /// Folds one `Set-Cookie` header received from `url` into the jar.
    ///
    /// Cookies for a foreign domain are rejected; an already-expired cookie
    /// deletes the stored one with the same domain, path and name.
    pub fn store_set_cookie(&mut self, url: &Url, header: &str) {
        match self.store.parse(header, url) {
            Ok(_) => tracing::debug!(url = %url, "Set-Cookie applied"),
            Err(e) => tracing::debug!(url = %url, error = %e, "Ignoring unusable Set-Cookie header"),
        }
    }
}

fn bool_field(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn parse_cookie_line(line: &str, line_number: usize) -> Result<Cookie, CookieError> {
    let invalid = |reason: String| CookieError::InvalidLine {
        line_number,
        reason,
    };

    let (http_only, line) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 7 {
        return Err(invalid(format!(
            "expected 7 TAB-separated fields, found {}",
            fields.len()
        )));
    }

    let parse_bool = |value: &str, field: &str| match value {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(invalid(format!("{field} must be TRUE or FALSE, got '{value}'"))),
    };

    let domain = fields[0].trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return Err(invalid("domain field is empty".to_string()));
    }
    let include_subdomains = parse_bool(fields[1], "tailmatch")?;
    let secure = parse_bool(fields[3], "secure")?;
    let expires = fields[4]
        .parse::<i64>()
        .map_err(|_| invalid(format!("expires must be an integer, got '{}'", fields[4])))?;
    if fields[5].is_empty() {
        return Err(invalid("cookie name field is empty".to_string()));
    }

    Ok(Cookie {
        domain,
        include_subdomains,
        path: fields[2].to_string(),
        secure,
        http_only,
        expires,
        name: fields[5].to_string(),
        value: fields[6].to_string(),
    })
}
