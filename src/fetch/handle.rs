use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use super::cookies::CookieJar;
use super::error::{TransportError, CA_CERT_ERROR, FAILED_INIT};
use crate::config::FetchConfig;

/// Environment variable naming a PEM bundle of extra trusted CA certificates.
/// Read at request time so it can change between fetches.
pub const CA_BUNDLE_ENV: &str = "CURL_CA_BUNDLE";

/// Client-level options. Changing any of them forces a new `reqwest::Client`.
#[derive(Clone)]
pub(crate) struct ClientSettings {
    user_agent: String,
    verify_ssl: bool,
    proxy: Option<String>,
    proxy_auth: Option<SecretString>,
    ca_bundle: Option<PathBuf>,
}

impl ClientSettings {
    pub(crate) fn from_config(config: &FetchConfig) -> Self {
        let ca_bundle = ca_bundle_from_env(CA_BUNDLE_ENV);

        Self {
            user_agent: config.user_agent.clone(),
            verify_ssl: config.verify_ssl,
            proxy: config.proxy_url(),
            proxy_auth: (!config.proxy_auth.is_empty())
                .then(|| SecretString::from(config.proxy_auth.clone())),
            ca_bundle,
        }
    }

    fn same_as(&self, other: &ClientSettings) -> bool {
        let auth = |s: &ClientSettings| s.proxy_auth.as_ref().map(|a| a.expose_secret().to_string());
        self.user_agent == other.user_agent
            && self.verify_ssl == other.verify_ssl
            && self.proxy == other.proxy
            && self.ca_bundle == other.ca_bundle
            && auth(self) == auth(other)
    }

    fn build(&self) -> Result<reqwest::Client, TransportError> {
        // Redirects are followed by the fetcher so every header block is seen
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(!self.verify_ssl);

        if !self.user_agent.is_empty() {
            builder = builder.user_agent(self.user_agent.as_str());
        }

        if let Some(proxy_url) = &self.proxy {
            let mut proxy = reqwest::Proxy::all(proxy_url.as_str()).map_err(|e| {
                tracing::error!(proxy = %proxy_url, error = %e, "Invalid proxy address");
                TransportError::new(FAILED_INIT)
            })?;
            if let Some(auth) = &self.proxy_auth {
                let auth = auth.expose_secret();
                let (user, password) = auth.split_once(':').unwrap_or((auth, ""));
                proxy = proxy.basic_auth(user, password);
            }
            builder = builder.proxy(proxy);
        }

        if let Some(path) = &self.ca_bundle {
            let pem = std::fs::read(path).map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "Cannot read CA bundle");
                TransportError::new(CA_CERT_ERROR)
            })?;
            let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "Invalid CA bundle");
                TransportError::new(CA_CERT_ERROR)
            })?;
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        builder.build().map_err(|e| {
            tracing::error!(error = %e, "Failed to build HTTP client");
            TransportError::new(FAILED_INIT)
        })
    }
}

/// CA bundle path named by the environment variable `var`, if set and non-empty.
fn ca_bundle_from_env(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

struct AttachedJar {
    path: PathBuf,
    jar: CookieJar,
}

/// A reusable network handle.
///
/// Keeps one HTTP client (and its connection pool) alive across fetches.
/// Per-request options never touch the handle, so nothing leaks from one
/// call into the next; the client itself is rebuilt whenever the
/// client-level settings change. The cookie-jar path, once attached, is
/// retained: cookies are flushed to it after every call and on drop.
///
/// Not safe for concurrent use; one request is in flight per handle.
#[derive(Default)]
pub struct HttpHandle {
    client: Option<(ClientSettings, reqwest::Client)>,
    cookies: Option<AttachedJar>,
}

impl HttpHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the attached cookie file, if any.
    pub fn cookie_jar_path(&self) -> Option<&Path> {
        self.cookies.as_ref().map(|c| c.path.as_path())
    }

    /// In-memory cookies of the attached jar.
    pub fn cookie_jar(&self) -> Option<&CookieJar> {
        self.cookies.as_ref().map(|c| &c.jar)
    }

    pub(crate) fn cookie_jar_mut(&mut self) -> Option<&mut CookieJar> {
        self.cookies.as_mut().map(|c| &mut c.jar)
    }

    /// Returns a client configured for `settings`, reusing the cached one when
    /// nothing changed.
    pub(crate) fn client_for(
        &mut self,
        settings: &ClientSettings,
    ) -> Result<reqwest::Client, TransportError> {
        if let Some((cached, client)) = &self.client {
            if cached.same_as(settings) {
                return Ok(client.clone());
            }
            tracing::debug!("Client settings changed, rebuilding HTTP client");
        }

        let client = settings.build()?;
        self.client = Some((settings.clone(), client.clone()));
        Ok(client)
    }

    /// Attaches the cookie file at `path`, loading it unless it is already
    /// the attached one.
    pub(crate) fn attach_cookie_jar(&mut self, path: &Path) {
        if self.cookie_jar_path() == Some(path) {
            return;
        }
        self.flush_cookies();

        let jar = CookieJar::load(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Cannot load cookie file, starting empty");
            CookieJar::default()
        });
        tracing::debug!(path = %path.display(), cookies = jar.len(), "Attached cookie jar");
        self.cookies = Some(AttachedJar {
            path: path.to_path_buf(),
            jar,
        });
    }

    /// Writes accumulated cookies to the attached file.
    pub(crate) fn flush_cookies(&self) {
        if let Some(store) = &self.cookies {
            if let Err(e) = store.jar.save(&store.path) {
                tracing::warn!(path = %store.path.display(), error = %e, "Failed to save cookies");
            }
        }
    }
}

impl Drop for HttpHandle {
    fn drop(&mut self) {
        self.flush_cookies();
    }
}

impl std::fmt::Debug for HttpHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpHandle")
            .field("has_client", &self.client.is_some())
            .field("cookie_jar", &self.cookie_jar_path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyType;

    #[tokio::test]
    async fn test_client_reused_when_settings_unchanged() {
        let mut handle = HttpHandle::new();
        let settings = ClientSettings::from_config(&FetchConfig::default());
        handle.client_for(&settings).unwrap();
        assert!(handle.client.is_some());
        handle.client_for(&settings).unwrap();
        assert!(handle.client.as_ref().unwrap().0.same_as(&settings));
    }

    #[test]
    fn test_settings_compare_proxy_auth() {
        let a = ClientSettings::from_config(&FetchConfig {
            proxy: "proxy.local:3128".to_string(),
            proxy_auth: "u:one".to_string(),
            ..FetchConfig::default()
        });
        let b = ClientSettings::from_config(&FetchConfig {
            proxy: "proxy.local:3128".to_string(),
            proxy_auth: "u:two".to_string(),
            ..FetchConfig::default()
        });
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }

    #[tokio::test]
    async fn test_proxy_settings_from_config() {
        let settings = ClientSettings::from_config(&FetchConfig {
            proxy: "proxy.local:1080".to_string(),
            proxy_type: ProxyType::Socks5,
            proxy_auth: "user:pa:ss".to_string(),
            ..FetchConfig::default()
        });
        assert_eq!(settings.proxy.as_deref(), Some("socks5://proxy.local:1080"));
        assert_eq!(
            settings.proxy_auth.as_ref().map(|a| a.expose_secret().to_string()),
            Some("user:pa:ss".to_string())
        );
        assert!(settings.build().is_ok());

        let explicit = ClientSettings::from_config(&FetchConfig {
            proxy: "http://gateway:3128".to_string(),
            proxy_type: ProxyType::Socks4a,
            ..FetchConfig::default()
        });
        assert_eq!(explicit.proxy.as_deref(), Some("http://gateway:3128"));
        assert!(explicit.proxy_auth.is_none());

        let direct = ClientSettings::from_config(&FetchConfig::default());
        assert_eq!(direct.proxy.as_deref(), None);
    }

    #[tokio::test]
    async fn test_invalid_proxy_is_init_failure() {
        let settings = ClientSettings::from_config(&FetchConfig {
            proxy: "http://[not a host".to_string(),
            ..FetchConfig::default()
        });
        let err = settings.build().unwrap_err();
        assert_eq!(err.to_string(), "Failed initialization");
    }

    #[test]
    fn test_ca_bundle_read_from_environment_at_call_time() {
        // Only this test touches the variable
        const VAR: &str = "FEEDPIPE_TEST_CA_BUNDLE";
        std::env::remove_var(VAR);
        assert_eq!(ca_bundle_from_env(VAR), None);

        std::env::set_var(VAR, "");
        assert_eq!(ca_bundle_from_env(VAR), None);

        std::env::set_var(VAR, "/etc/feedpipe/ca.pem");
        assert_eq!(ca_bundle_from_env(VAR), Some(PathBuf::from("/etc/feedpipe/ca.pem")));
        std::env::remove_var(VAR);
    }

    #[tokio::test]
    async fn test_missing_ca_bundle_is_ca_cert_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ClientSettings {
            ca_bundle: Some(dir.path().join("missing.pem")),
            ..ClientSettings::from_config(&FetchConfig::default())
        };

        let mut handle = HttpHandle::new();
        let err = handle.client_for(&settings).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Problem with the SSL CA cert (path? access rights?)"
        );
        assert!(handle.client.is_none());
    }

    #[test]
    fn test_cookie_path_retained_and_flushed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jar.txt");

        {
            let mut handle = HttpHandle::new();
            handle.attach_cookie_jar(&path);
            assert_eq!(handle.cookie_jar_path(), Some(path.as_path()));
            let origin = url::Url::parse("http://example.com/").unwrap();
            handle
                .cookie_jar_mut()
                .unwrap()
                .store_set_cookie(&origin, "sid=abc; Path=/");
        }

        let reloaded = CookieJar::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
    }
}
