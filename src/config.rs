//! Fetch configuration parser for `config.toml`.
//!
//! The config file is optional: a missing file yields `FetchConfig::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Protocol spoken to the configured proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    Http,
    Https,
    Socks4,
    Socks4a,
    Socks5,
    Socks5h,
}

impl ProxyType {
    /// URL scheme reqwest expects for this proxy protocol.
    pub fn scheme(self) -> &'static str {
        match self {
            ProxyType::Http => "http",
            ProxyType::Https => "https",
            ProxyType::Socks4 => "socks4",
            ProxyType::Socks4a => "socks4a",
            ProxyType::Socks5 => "socks5",
            ProxyType::Socks5h => "socks5h",
        }
    }
}

/// Settings applied to every feed request.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
///
/// Custom Debug impl masks `proxy_auth` to prevent credential leakage
/// in logs, error messages, and debug output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User-Agent header value. Empty = let the HTTP client choose.
    pub user_agent: String,

    /// Total time allowed for one fetch, redirects included. 0 = no limit.
    pub timeout_secs: u64,

    /// Whether TLS peer certificates are verified.
    pub verify_ssl: bool,

    /// Proxy address (`host:port` or a full URL). Empty = no explicit proxy.
    pub proxy: String,

    /// Proxy credentials as `user:password`. Empty = none.
    pub proxy_auth: String,

    /// Proxy protocol, used when `proxy` carries no scheme.
    pub proxy_type: ProxyType,

    /// Netscape-format cookie file shared between fetches.
    pub cookie_cache: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("feedpipe/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            verify_ssl: true,
            proxy: String::new(),
            proxy_auth: String::new(),
            proxy_type: ProxyType::Http,
            cookie_cache: None,
        }
    }
}

/// Mask proxy_auth in Debug output to prevent secret leakage.
impl std::fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchConfig")
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .field("verify_ssl", &self.verify_ssl)
            .field("proxy", &self.proxy)
            .field(
                "proxy_auth",
                &(!self.proxy_auth.is_empty()).then_some("[REDACTED]"),
            )
            .field("proxy_type", &self.proxy_type)
            .field("cookie_cache", &self.cookie_cache)
            .finish()
    }
}

impl FetchConfig {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Total timeout for one fetch, `None` when unbounded.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Proxy URL with the configured scheme applied, `None` when no proxy is set.
    pub fn proxy_url(&self) -> Option<String> {
        let proxy = self.proxy.trim();
        if proxy.is_empty() {
            return None;
        }
        if proxy.contains("://") {
            return Some(proxy.to_string());
        }
        Some(format!("{}://{}", self.proxy_type.scheme(), proxy))
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(FetchConfig::default())`
    /// - Empty file → `Ok(FetchConfig::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "user_agent",
                "timeout_secs",
                "verify_ssl",
                "proxy",
                "proxy_auth",
                "proxy_type",
                "cookie_cache",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: FetchConfig = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            timeout_secs = config.timeout_secs,
            verify_ssl = config.verify_ssl,
            "Loaded configuration"
        );
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedpipe.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert!(config.user_agent.starts_with("feedpipe/"));
        assert_eq!(config.timeout_secs, 30);
        assert!(config.verify_ssl);
        assert!(config.proxy.is_empty());
        assert!(config.proxy_auth.is_empty());
        assert_eq!(config.proxy_type, ProxyType::Http);
        assert!(config.cookie_cache.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = FetchConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (_dir, path) = write_config("   \n  \n  ");
        let config = FetchConfig::load(&path).unwrap();
        assert!(config.verify_ssl);
    }

    #[test]
    fn test_full_config() {
        let (_dir, path) = write_config(
            r#"
user_agent = "podboat/2.0"
timeout_secs = 0
verify_ssl = false
proxy = "proxy.local:1080"
proxy_auth = "alice:hunter2"
proxy_type = "socks5h"
cookie_cache = "/tmp/cookies.txt"
"#,
        );

        let config = FetchConfig::load(&path).unwrap();
        assert_eq!(config.user_agent, "podboat/2.0");
        assert_eq!(config.timeout(), None);
        assert!(!config.verify_ssl);
        assert_eq!(
            config.proxy_url().as_deref(),
            Some("socks5h://proxy.local:1080")
        );
        assert_eq!(config.proxy_auth, "alice:hunter2");
        assert_eq!(
            config.cookie_cache.as_deref(),
            Some(Path::new("/tmp/cookies.txt"))
        );
    }

    #[test]
    fn test_proxy_url_keeps_explicit_scheme() {
        let config = FetchConfig {
            proxy: "https://proxy.example:8443".to_string(),
            proxy_type: ProxyType::Socks4,
            ..FetchConfig::default()
        };
        assert_eq!(
            config.proxy_url().as_deref(),
            Some("https://proxy.example:8443")
        );
    }

    #[test]
    fn test_timeout_nonzero() {
        let config = FetchConfig {
            timeout_secs: 5,
            ..FetchConfig::default()
        };
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (_dir, path) = write_config("this is not [valid toml");
        let err = FetchConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_proxy_type_returns_error() {
        let (_dir, path) = write_config("proxy_type = \"carrier-pigeon\"\n");
        assert!(FetchConfig::load(&path).is_err());
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (_dir, path) = write_config("timeout_secs = 10\ntotally_fake_key = 1\n");
        let config = FetchConfig::load(&path).unwrap();
        assert_eq!(config.timeout_secs, 10);
    }

    // File size limit
    #[test]
    fn test_too_large_file_rejected() {
        let (_dir, path) = write_config(&"a".repeat(1_048_577));
        let err = FetchConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
    }

    // Debug output masks proxy credentials
    #[test]
    fn test_debug_masks_proxy_auth() {
        let config = FetchConfig {
            proxy_auth: "bob:super-secret".to_string(),
            ..FetchConfig::default()
        };

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_debug_shows_none_when_no_proxy_auth() {
        let debug_output = format!("{:?}", FetchConfig::default());
        assert!(debug_output.contains("None"));
        assert!(!debug_output.contains("[REDACTED]"));
    }
}
