//! The recognized request-header vocabulary.
//!
//! A closed enumeration of well-known HTTP request headers. Names parse
//! case-insensitively with hyphens ignored, so a captured transcript line
//! like `user-agent:` or a caller string `USERAGENT` both resolve to
//! [`StandardHeader::UserAgent`]. Anything outside this set travels as a
//! custom header.

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// A well-known HTTP request header.
///
/// `Display` renders the canonical wire name (`User-Agent`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum StandardHeader {
    #[strum(serialize = "Cache-Control")]
    CacheControl,
    #[strum(serialize = "Connection")]
    Connection,
    #[strum(serialize = "Date")]
    Date,
    #[strum(serialize = "Keep-Alive")]
    KeepAlive,
    #[strum(serialize = "Pragma")]
    Pragma,
    #[strum(serialize = "Trailer")]
    Trailer,
    #[strum(serialize = "Transfer-Encoding")]
    TransferEncoding,
    #[strum(serialize = "Upgrade")]
    Upgrade,
    #[strum(serialize = "Via")]
    Via,
    #[strum(serialize = "Warning")]
    Warning,
    #[strum(serialize = "Allow")]
    Allow,
    #[strum(serialize = "Content-Length")]
    ContentLength,
    #[strum(serialize = "Content-Type")]
    ContentType,
    #[strum(serialize = "Content-Encoding")]
    ContentEncoding,
    #[strum(serialize = "Content-Language")]
    ContentLanguage,
    #[strum(serialize = "Content-Location")]
    ContentLocation,
    #[strum(serialize = "Content-MD5")]
    ContentMd5,
    #[strum(serialize = "Content-Range")]
    ContentRange,
    #[strum(serialize = "Expires")]
    Expires,
    #[strum(serialize = "Last-Modified")]
    LastModified,
    #[strum(serialize = "Accept")]
    Accept,
    #[strum(serialize = "Accept-Charset")]
    AcceptCharset,
    #[strum(serialize = "Accept-Encoding")]
    AcceptEncoding,
    #[strum(serialize = "Accept-Language")]
    AcceptLanguage,
    #[strum(serialize = "Authorization")]
    Authorization,
    #[strum(serialize = "Cookie")]
    Cookie,
    #[strum(serialize = "Expect")]
    Expect,
    #[strum(serialize = "From")]
    From,
    #[strum(serialize = "Host")]
    Host,
    #[strum(serialize = "If-Match")]
    IfMatch,
    #[strum(serialize = "If-Modified-Since")]
    IfModifiedSince,
    #[strum(serialize = "If-None-Match")]
    IfNoneMatch,
    #[strum(serialize = "If-Range")]
    IfRange,
    #[strum(serialize = "If-Unmodified-Since")]
    IfUnmodifiedSince,
    #[strum(serialize = "Max-Forwards")]
    MaxForwards,
    #[strum(serialize = "Proxy-Authorization")]
    ProxyAuthorization,
    #[strum(serialize = "Referer")]
    Referer,
    #[strum(serialize = "Range")]
    Range,
    #[strum(serialize = "TE")]
    Te,
    #[strum(serialize = "Translate")]
    Translate,
    #[strum(serialize = "User-Agent")]
    UserAgent,
}

impl StandardHeader {
    /// Resolve a header name, ignoring case and hyphens.
    ///
    /// Returns `None` for names outside the recognized set.
    pub fn from_name(name: &str) -> Option<Self> {
        let folded = fold(name);
        Self::iter().find(|header| fold(&header.to_string()) == folded)
    }
}

fn fold(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
