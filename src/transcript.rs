//! Raw HTTP transcript parsing.
//!
//! A captured request block — request line, header lines, a blank line and
//! an optional body — is an alternate way to specify a request. Parsing
//! yields the method, the rebuilt URL and a fully populated
//! [`ReqParams`]; [`Client::replay`](crate::client::Client::replay)
//! dispatches the result in one call.

use crate::base::error::ReqError;
use crate::http::charset;
use crate::params::{Body, ReqParams, StandardHeader};
use bytes::Bytes;
use http::Method;
use serde_json::Value;

/// A parsed request block, ready to dispatch.
#[derive(Debug, Clone)]
pub struct ParsedTranscript {
    pub method: Method,
    pub url: String,
    pub params: ReqParams,
}

/// Parse a captured request block into dispatch inputs.
///
/// Header classification: `Host` becomes the URL authority,
/// `Content-Length` and `Accept-Encoding` are dropped (the transport
/// recomputes/negotiates them), recognized names land in
/// [`ReqParams::headers`], everything else in
/// [`ReqParams::custom_headers`]. Missing `Host`, an empty block or a
/// short request line fail with a `UrlParse` error.
pub fn parse(block: &str, mut params: ReqParams) -> Result<ParsedTranscript, ReqError> {
    let (head, body_section) = split_head_and_body(block);

    let mut lines = head
        .split('\n')
        .map(|line| line.trim_end_matches('\r').trim())
        .filter(|line| !line.is_empty());

    let request_line = lines
        .next()
        .ok_or_else(|| ReqError::UrlParse("transcript must contain at least one line".into()))?;

    let mut tokens = request_line.split_whitespace();
    let (method_token, path_token) = match (tokens.next(), tokens.next()) {
        (Some(method), Some(path)) => (method, path),
        _ => {
            return Err(ReqError::UrlParse(
                "request line must contain a method and a URL".into(),
            ))
        }
    };
    // A trailing protocol token (HTTP/1.1) is ignored.
    let method = Method::from_bytes(method_token.to_ascii_uppercase().as_bytes())
        .map_err(|_| ReqError::UrlParse(format!("`{method_token}` is not an HTTP method")))?;

    let mut host = String::new();
    for line in lines {
        let (key, value) = match line.split_once(':') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (line, ""),
        };

        match key.to_ascii_lowercase().as_str() {
            "host" => host = value.to_string(),
            // Recomputed by the transport / not honored by this client.
            "content-length" | "accept-encoding" => {}
            _ => match StandardHeader::from_name(key) {
                Some(header) => {
                    params.headers.insert(header, value.to_string());
                }
                None => {
                    params.custom_headers.insert(key.to_string(), value.to_string());
                }
            },
        }
    }

    if host.is_empty() {
        return Err(ReqError::UrlParse(
            "transcript does not name a target Host".into(),
        ));
    }

    let url = format!("http://{host}{path_token}");

    if method != Method::GET {
        if let Some(body_text) = body_section {
            apply_body_section(&mut params, body_text);
        }
    }

    Ok(ParsedTranscript {
        method,
        url,
        params,
    })
}

/// Split on the first blank line. CRLF transcripts take priority; LF-only
/// input falls back to `\n\n`.
fn split_head_and_body(block: &str) -> (&str, Option<&str>) {
    for separator in ["\r\n\r\n", "\n\n"] {
        if let Some((head, body)) = block.split_once(separator) {
            return (head, if body.is_empty() { None } else { Some(body) });
        }
    }
    (block, None)
}

/// Turn the captured body text into concrete body fields.
///
/// The captured content-type picks the variant (an explicit caller-set
/// body is never overridden) and may carry a `charset=` that becomes the
/// body encoding. urlencoded and json rewrite the content-type with the
/// resolved charset; everything else travels as re-encoded raw bytes.
fn apply_body_section(params: &mut ReqParams, body_text: &str) {
    #[derive(PartialEq)]
    enum Variant {
        Unset,
        Urlencoded,
        Multipart,
        Json,
        Raw,
    }

    let mut variant = match &params.body {
        Body::None => Variant::Unset,
        Body::Form(_) => Variant::Urlencoded,
        Body::Multipart(_) => Variant::Multipart,
        Body::Json(_) => Variant::Json,
        Body::Raw(_) => Variant::Raw,
    };

    if let Some(content_type) = params.headers.get(&StandardHeader::ContentType).cloned() {
        if let Some(token) = charset::charset_token(&content_type) {
            if let Some(encoding) = charset::encoding_from_label(token) {
                params.body_encoding = encoding;
            }
        }

        if variant == Variant::Unset {
            let lowered = content_type.to_ascii_lowercase();
            if lowered.contains("application/x-www-form-urlencoded") {
                variant = Variant::Urlencoded;
            }
            if lowered.contains("multipart/form-data") {
                variant = Variant::Multipart;
            }
            if lowered.contains("application/json") {
                variant = Variant::Json;
            }
        }
    }

    let charset_name = params.body_encoding.name().to_ascii_lowercase();
    let (encoded, _, _) = params.body_encoding.encode(body_text);
    let raw = Bytes::from(encoded.into_owned());

    match variant {
        Variant::Urlencoded => {
            params.headers.insert(
                StandardHeader::ContentType,
                format!("application/x-www-form-urlencoded;charset={charset_name}"),
            );
            params.body = Body::Raw(raw);
        }
        Variant::Json => {
            params.headers.insert(
                StandardHeader::ContentType,
                format!("application/json;charset={charset_name}"),
            );
            params.body = Body::Json(Value::String(body_text.to_string()));
        }
        Variant::Multipart | Variant::Raw | Variant::Unset => {
            params.body = Body::Raw(raw);
        }
    }
}
