//! Proxy descriptor for tunneled dispatch.

use base64::{engine::general_purpose, Engine as _};
use url::Url;
use zeroize::Zeroizing;

/// Proxy protocol family, derived from the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Http,
    Https,
    Socks,
}

/// Proxy configuration for one request.
///
/// Only HTTP proxies (CONNECT tunneling) are dialed; other kinds are
/// rejected at connect time. The password is zeroized on drop.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub url: Url,
    username: Option<String>,
    password: Option<Zeroizing<String>>,
}

impl ProxySettings {
    /// Create proxy settings from a URL string such as
    /// `http://proxy.example.test:8080`.
    pub fn new(url_str: &str) -> Option<Self> {
        let url = Url::parse(url_str).ok()?;
        url.host_str()?;
        Some(Self {
            url,
            username: None,
            password: None,
        })
    }

    /// Attach Basic authentication credentials.
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(Zeroizing::new(password.to_string()));
        self
    }

    pub fn kind(&self) -> ProxyKind {
        match self.url.scheme() {
            "https" => ProxyKind::Https,
            "socks4" | "socks4a" | "socks5" | "socks5h" => ProxyKind::Socks,
            _ => ProxyKind::Http,
        }
    }

    /// Proxy host and port, with the scheme's conventional default port.
    pub fn host_port(&self) -> Option<(&str, u16)> {
        let host = self.url.host_str()?;
        let port = self.url.port().unwrap_or(match self.kind() {
            ProxyKind::Http => 80,
            ProxyKind::Https => 443,
            ProxyKind::Socks => 1080,
        });
        Some((host, port))
    }

    pub fn requires_auth(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// The `Proxy-Authorization` header value, when credentials are set.
    pub fn auth_header(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                let credentials = format!("{username}:{}", password.as_str());
                Some(format!(
                    "Basic {}",
                    general_purpose::STANDARD.encode(credentials)
                ))
            }
            _ => None,
        }
    }
}
