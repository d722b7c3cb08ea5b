//! Outgoing body resolution.
//!
//! Determines the effective body variant for a request and serializes it
//! into transport bytes plus the content-type it mandates. Runs only for
//! body-bearing (POST/PUT-class) methods.

use crate::base::error::ReqError;
use crate::params::{Body, ReqParams};
use bytes::Bytes;
use encoding_rs::Encoding;
use url::form_urlencoded;

/// A body ready for the transport.
#[derive(Debug, Clone)]
pub struct ResolvedBody {
    pub bytes: Bytes,
    /// Content-type mandated by the variant; `None` for raw bodies.
    pub content_type: Option<String>,
    pub content_length: u64,
}

impl ResolvedBody {
    fn from_text(text: &str, content_type: Option<String>, encoding: &'static Encoding) -> Self {
        let (encoded, _, _) = encoding.encode(text);
        let bytes = Bytes::from(encoded.into_owned());
        Self {
            content_length: bytes.len() as u64,
            bytes,
            content_type,
        }
    }
}

/// Resolve and serialize the body for one request.
///
/// Returns `Ok(None)` when the request carries no body: a `Body::None`
/// with no query pairs keeps GET-like semantics even for POST. A resolved
/// variant whose source is empty fails with an `ArgumentNull` naming the
/// missing field.
pub fn resolve(params: &ReqParams) -> Result<Option<ResolvedBody>, ReqError> {
    let charset = params.body_encoding.name().to_ascii_lowercase();

    match &params.body {
        Body::None => {
            if params.query.is_empty() {
                return Ok(None);
            }
            // Query pairs double as urlencoded form data.
            let serialized = encode_pairs(&params.query, params.body_encoding);
            Ok(Some(ResolvedBody::from_text(
                &serialized,
                Some(format!(
                    "application/x-www-form-urlencoded;charset={charset}"
                )),
                params.body_encoding,
            )))
        }
        Body::Form(pairs) => {
            if pairs.is_empty() {
                return Err(ReqError::ArgumentNull("form parameters"));
            }
            let serialized = encode_pairs(pairs, params.body_encoding);
            Ok(Some(ResolvedBody::from_text(
                &serialized,
                Some(format!(
                    "application/x-www-form-urlencoded;charset={charset}"
                )),
                params.body_encoding,
            )))
        }
        Body::Json(value) => {
            if value.is_null() {
                return Err(ReqError::ArgumentNull("JSON body"));
            }
            // A string body is sent byte-for-byte; anything else is
            // serialized through serde_json first.
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => serde_json::to_string(other)
                    .map_err(|e| ReqError::Other(format!("failed to serialize JSON body: {e}")))?,
            };
            Ok(Some(ResolvedBody::from_text(
                &text,
                Some(format!("application/json;charset={charset}")),
                params.body_encoding,
            )))
        }
        Body::Raw(data) => {
            if data.is_empty() {
                return Err(ReqError::ArgumentNull("raw body"));
            }
            Ok(Some(ResolvedBody {
                bytes: data.clone(),
                content_type: None,
                content_length: data.len() as u64,
            }))
        }
        Body::Multipart(form) => {
            if form.is_empty() {
                return Err(ReqError::ArgumentNull("multipart form"));
            }
            Ok(Some(ResolvedBody {
                content_type: Some(form.content_type()),
                content_length: form.content_length(),
                bytes: form.to_bytes(),
            }))
        }
    }
}

/// Percent-encode key/value pairs, `&`-joined, with each key and value
/// first serialized through the configured body charset.
pub(crate) fn encode_pairs(pairs: &[(String, String)], encoding: &'static Encoding) -> String {
    let mut serialized = String::new();
    for (key, value) in pairs {
        if !serialized.is_empty() {
            serialized.push('&');
        }
        let (key_bytes, _, _) = encoding.encode(key);
        serialized.extend(form_urlencoded::byte_serialize(&key_bytes));
        serialized.push('=');
        let (value_bytes, _, _) = encoding.encode(value);
        serialized.extend(form_urlencoded::byte_serialize(&value_bytes));
    }
    serialized
}
