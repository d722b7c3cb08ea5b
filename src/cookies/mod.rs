//! Cookie jar shared between requests and responses.
//!
//! A domain-keyed store with shared-handle semantics: cloning a
//! [`CookieJar`] hands out another reference to the same store, so one jar
//! can carry a session across requests. `Set-Cookie` attribute parsing is
//! delegated to the `cookie` crate; the jar only keeps what it matches on.

use cookie::{Cookie, Expiration};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

#[derive(Debug, Clone)]
struct StoredCookie {
    name: String,
    value: String,
    path: String,
    secure: bool,
    host_only: bool,
    expires: Option<OffsetDateTime>,
}

impl StoredCookie {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires.is_some_and(|expiry| expiry <= now)
    }
}

/// Domain-keyed cookie store.
#[derive(Clone, Default)]
pub struct CookieJar {
    store: Arc<DashMap<String, Vec<StoredCookie>>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session cookie for a host directly.
    pub fn insert(&self, host: &str, name: &str, value: &str) {
        self.store_cookie(
            host.to_ascii_lowercase(),
            StoredCookie {
                name: name.to_string(),
                value: value.to_string(),
                path: "/".to_string(),
                secure: false,
                host_only: true,
                expires: None,
            },
        );
    }

    /// Parse one response `Set-Cookie` line against the request URL.
    ///
    /// Unparsable lines are dropped.
    pub fn store_set_cookie(&self, url: &Url, line: &str) {
        let Ok(parsed) = Cookie::parse(line.trim().to_owned()) else {
            return;
        };
        let Some(request_host) = url.host_str() else {
            return;
        };

        let host_only = parsed.domain().is_none();
        let domain = parsed
            .domain()
            .map(|d| d.trim_start_matches('.').to_ascii_lowercase())
            .unwrap_or_else(|| request_host.to_ascii_lowercase());

        // Max-Age beats Expires when both are present.
        let now = OffsetDateTime::now_utc();
        let expires = if let Some(max_age) = parsed.max_age() {
            Some(now + max_age)
        } else {
            match parsed.expires() {
                Some(Expiration::DateTime(at)) => Some(at),
                _ => None,
            }
        };

        self.store_cookie(
            domain,
            StoredCookie {
                name: parsed.name().to_string(),
                value: parsed.value().to_string(),
                path: parsed.path().unwrap_or("/").to_string(),
                secure: parsed.secure().unwrap_or(false),
                host_only,
                expires,
            },
        );
    }

    /// Assemble the `Cookie` request-header value for a URL.
    ///
    /// Applies domain, path, secure and expiry matching; returns `None`
    /// when nothing matches.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?.to_ascii_lowercase();
        let https = url.scheme() == "https";
        let now = OffsetDateTime::now_utc();

        let mut pairs = Vec::new();
        for entry in self.store.iter() {
            for cookie in entry.value() {
                if !domain_matches(entry.key(), cookie.host_only, &host) {
                    continue;
                }
                if !path_matches(&cookie.path, url.path()) {
                    continue;
                }
                if cookie.secure && !https {
                    continue;
                }
                if cookie.is_expired(now) {
                    continue;
                }
                pairs.push(format!("{}={}", cookie.name, cookie.value));
            }
        }

        if pairs.is_empty() {
            None
        } else {
            pairs.sort();
            Some(pairs.join("; "))
        }
    }

    /// Look up a cookie value by name, regardless of domain.
    pub fn get(&self, name: &str) -> Option<String> {
        self.store.iter().find_map(|entry| {
            entry
                .value()
                .iter()
                .find(|cookie| cookie.name == name)
                .map(|cookie| cookie.value.clone())
        })
    }

    pub fn cookie_count(&self) -> usize {
        self.store.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cookie_count() == 0
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    fn store_cookie(&self, domain: String, cookie: StoredCookie) {
        let mut entry = self.store.entry(domain).or_default();
        entry.retain(|existing| existing.name != cookie.name || existing.path != cookie.path);
        entry.push(cookie);
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("cookies", &self.cookie_count())
            .finish()
    }
}

fn domain_matches(stored_domain: &str, host_only: bool, host: &str) -> bool {
    if host_only {
        return host == stored_domain;
    }
    host == stored_domain
        || host
            .strip_suffix(stored_domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path == request_path {
        return true;
    }
    request_path
        .strip_prefix(cookie_path)
        .is_some_and(|rest| cookie_path.ends_with('/') || rest.starts_with('/'))
}
