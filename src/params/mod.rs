//! Per-request configuration.
//!
//! [`ReqParams`] describes one request: headers, cookies, proxy, body,
//! encoding, timeout and behavior flags. It is built by the caller (or by
//! the transcript parser), consumed read-only by one dispatch, then
//! discarded. Sharing one instance across concurrent dispatches is the
//! caller's responsibility.

pub mod headers;

pub use headers::StandardHeader;

use crate::base::error::ReqError;
use crate::cookies::CookieJar;
use crate::http::multipart::Form;
use crate::socket::proxy::ProxySettings;
use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// The outgoing body, tagged by serialization strategy.
///
/// Exactly one payload slot per variant: a request cannot carry two body
/// sources at once, by construction.
#[derive(Debug, Clone, Default)]
pub enum Body {
    /// No body. POST/PUT-class methods fall back to [`ReqParams::query`]
    /// as form data, or send nothing.
    #[default]
    None,
    /// `application/x-www-form-urlencoded` key/value pairs.
    Form(Vec<(String, String)>),
    /// A JSON document. `Value::String` is sent verbatim, other values are
    /// serialized first.
    Json(serde_json::Value),
    /// Raw bytes, sent unmodified with no content-type imposed.
    Raw(Bytes),
    /// A `multipart/form-data` payload; framing, content-type and length
    /// come from the form itself.
    Multipart(Form),
}

impl Body {
    /// Build a JSON body from any serializable value.
    pub fn json_of<T: Serialize>(value: &T) -> Result<Self, ReqError> {
        serde_json::to_value(value)
            .map(Body::Json)
            .map_err(|e| ReqError::Other(format!("failed to serialize JSON body: {e}")))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Body::None)
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Body::Json(value)
    }
}

impl From<Bytes> for Body {
    fn from(data: Bytes) -> Self {
        Body::Raw(data)
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        Body::Raw(Bytes::from(data))
    }
}

impl From<Form> for Body {
    fn from(form: Form) -> Self {
        Body::Multipart(form)
    }
}

/// Configuration for one request.
#[derive(Debug, Clone)]
pub struct ReqParams {
    /// Recognized headers; keys unique, any caller value beats the
    /// dispatcher defaults.
    pub headers: HashMap<StandardHeader, String>,
    /// Headers outside the recognized set; key and value are
    /// percent-encoded before hitting the wire.
    pub custom_headers: HashMap<String, String>,
    /// Cookie jar consulted for the `Cookie` header and fed from
    /// `Set-Cookie` responses. Clones share one store.
    pub cookies: CookieJar,
    pub proxy: Option<ProxySettings>,
    pub body: Body,
    /// Charset used to serialize text bodies. UTF-8 without BOM by default.
    pub body_encoding: &'static Encoding,
    /// Appended to the URL query on GET; doubles as the urlencoded form
    /// source for body-bearing methods when `body` is `None`.
    pub query: Vec<(String, String)>,
    /// Route errors to the client's [`ErrorHub`](crate::ErrorHub) instead
    /// of returning them. Requires a subscriber.
    pub use_error_channel: bool,
    /// Let an HTML `<meta charset>` declaration override the
    /// transport-declared response encoding.
    pub sniff_html_charset: bool,
    /// Escalate non-2xx/3xx statuses. The response data is kept either way.
    pub error_on_status: bool,
    /// Escalate timeouts instead of quietly returning the empty response.
    pub error_on_timeout: bool,
    pub timeout: Duration,
    /// Response accumulation buffer seed; must be non-zero.
    pub read_buffer_size: usize,
}

impl Default for ReqParams {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            custom_headers: HashMap::new(),
            cookies: CookieJar::new(),
            proxy: None,
            body: Body::None,
            body_encoding: UTF_8,
            query: Vec::new(),
            use_error_channel: false,
            sniff_html_charset: true,
            error_on_status: true,
            error_on_timeout: true,
            timeout: Duration::from_millis(500),
            read_buffer_size: 1024,
        }
    }
}

impl ReqParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, header: StandardHeader, value: impl Into<String>) -> Self {
        self.headers.insert(header, value.into());
        self
    }

    pub fn custom_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(name.into(), value.into());
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn body_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.body_encoding = encoding;
        self
    }

    pub fn proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn cookies(mut self, jar: CookieJar) -> Self {
        self.cookies = jar;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn use_error_channel(mut self, enabled: bool) -> Self {
        self.use_error_channel = enabled;
        self
    }

    pub fn sniff_html_charset(mut self, enabled: bool) -> Self {
        self.sniff_html_charset = enabled;
        self
    }

    pub fn error_on_status(mut self, enabled: bool) -> Self {
        self.error_on_status = enabled;
        self
    }

    pub fn error_on_timeout(mut self, enabled: bool) -> Self {
        self.error_on_timeout = enabled;
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }
}
