//! Normalized response value.
//!
//! [`normalize`] drains the transport body into one buffer, resolves the
//! text encoding (transport headers, then HTML meta-sniffing), collects
//! response cookies and packages everything into an immutable
//! [`ReqResponse`].

use crate::base::error::ReqError;
use crate::cookies::CookieJar;
use crate::http::charset;
use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use tracing::debug;
use url::Url;

/// The outcome of one dispatch.
///
/// Status 0 is the sentinel for "no response obtained": cancellation,
/// timeout or a suppressed transport fault.
pub struct ReqResponse {
    raw: Bytes,
    status: u16,
    content_type: String,
    encoding: &'static Encoding,
    cookies: CookieJar,
}

impl ReqResponse {
    pub(crate) fn new(
        raw: Bytes,
        status: u16,
        content_type: String,
        encoding: &'static Encoding,
        cookies: CookieJar,
    ) -> Self {
        Self {
            raw,
            status,
            content_type,
            encoding,
            cookies,
        }
    }

    /// The status-0 sentinel carrying the request's jar and no body.
    pub(crate) fn empty(cookies: CookieJar) -> Self {
        Self::new(Bytes::new(), 0, String::new(), UTF_8, cookies)
    }

    /// HTTP status code; 0 when no response was obtained.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw `Content-Type` header value, possibly empty.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The encoding the body decodes with.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// The undecoded body bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.raw
    }

    /// Cookies set by this response.
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// The body decoded with the resolved encoding. Malformed sequences
    /// become replacement characters.
    pub fn text(&self) -> String {
        let (decoded, _, _) = self.encoding.decode(&self.raw);
        decoded.into_owned()
    }

    /// Parse the decoded body as JSON.
    pub fn json(&self) -> Result<Value, ReqError> {
        serde_json::from_str(&self.text()).map_err(ReqError::ResponseParse)
    }

    /// Deserialize the decoded body into a caller type.
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T, ReqError> {
        serde_json::from_str(&self.text()).map_err(ReqError::ResponseParse)
    }
}

impl fmt::Display for ReqResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl fmt::Debug for ReqResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("encoding", &self.encoding.name())
            .field("bytes", &self.raw.len())
            .finish()
    }
}

/// Buffer the body and resolve the response encoding.
pub(crate) async fn normalize(
    response: http::Response<Incoming>,
    url: &Url,
    sniff_html_charset: bool,
    read_buffer_size: usize,
    shared_jar: &CookieJar,
) -> Result<ReqResponse, ReqError> {
    let (parts, mut body) = response.into_parts();

    // Response cookies land in a fresh jar and in the request's shared jar.
    let response_jar = CookieJar::new();
    for value in parts.headers.get_all(http::header::SET_COOKIE) {
        if let Ok(line) = value.to_str() {
            response_jar.store_set_cookie(url, line);
            shared_jar.store_set_cookie(url, line);
        }
    }

    let content_type = parts
        .headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let content_encoding = parts
        .headers
        .get(http::header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let mut buffer: Vec<u8> = Vec::with_capacity(read_buffer_size);
    while let Some(frame) = body.frame().await {
        let frame =
            frame.map_err(|e| ReqError::Other(format!("failed to read response body: {e}")))?;
        if let Some(chunk) = frame.data_ref() {
            buffer.extend_from_slice(chunk);
        }
    }

    let mut encoding = charset::resolve_response_encoding(
        content_encoding.as_deref(),
        if content_type.is_empty() {
            None
        } else {
            Some(content_type.as_str())
        },
    );

    if sniff_html_charset && charset::is_html(&content_type) {
        if let Some(declared) = charset::sniff_html_meta(&buffer, encoding) {
            encoding = declared;
        }
    }

    debug!(
        status = parts.status.as_u16(),
        encoding = encoding.name(),
        bytes = buffer.len(),
        "response normalized"
    );

    Ok(ReqResponse::new(
        Bytes::from(buffer),
        parts.status.as_u16(),
        content_type,
        encoding,
        response_jar,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(body: &str, status: u16, content_type: &str) -> ReqResponse {
        ReqResponse::new(
            Bytes::copy_from_slice(body.as_bytes()),
            status,
            content_type.to_string(),
            UTF_8,
            CookieJar::new(),
        )
    }

    #[test]
    fn empty_response_is_the_status_zero_sentinel() {
        let jar = CookieJar::new();
        jar.insert("example.test", "kept", "1");
        let response = ReqResponse::empty(jar);

        assert_eq!(response.status(), 0);
        assert!(response.bytes().is_empty());
        assert_eq!(response.content_type(), "");
        assert_eq!(response.encoding(), UTF_8);
        assert_eq!(response.cookies().cookie_count(), 1);
    }

    #[test]
    fn text_decodes_with_the_resolved_encoding() {
        let (gbk_bytes, _, _) = encoding_rs::GBK.encode("早上好");
        let response = ReqResponse::new(
            Bytes::from(gbk_bytes.into_owned()),
            200,
            "text/html; charset=gbk".to_string(),
            encoding_rs::GBK,
            CookieJar::new(),
        );
        assert_eq!(response.text(), "早上好");
    }

    #[test]
    fn json_accessor_parses_valid_documents() {
        let response = sample(r#"{"ok": true}"#, 200, "application/json");
        assert_eq!(response.json().unwrap()["ok"], true);
    }

    #[test]
    fn json_accessor_tags_parse_failures() {
        let response = sample("<html>not json</html>", 200, "text/html");
        let err = response.json().unwrap_err();
        assert_eq!(err.kind(), crate::base::error::ErrorKind::ResponseParse);
    }

    #[test]
    fn typed_json_deserialization() {
        #[derive(serde::Deserialize)]
        struct Payload {
            id: u32,
        }
        let response = sample(r#"{"id": 42}"#, 200, "application/json");
        assert_eq!(response.json_as::<Payload>().unwrap().id, 42);
    }

    #[test]
    fn display_renders_the_decoded_text() {
        let response = sample("hello", 200, "text/plain");
        assert_eq!(response.to_string(), "hello");
    }
}
