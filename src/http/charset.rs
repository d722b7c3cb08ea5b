//! Response character-set resolution.
//!
//! The decode encoding for a response body is picked in order:
//! a transport-declared `Content-Encoding` label, then the `charset`
//! parameter of `Content-Type`, then UTF-8. For HTML bodies an embedded
//! `<meta charset>` declaration can override all of it (meta-sniffing).

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::sync::OnceLock;

/// Look up an encoding by its WHATWG label (`utf-8`, `gbk`, `shift_jis`, ...).
pub fn encoding_from_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Resolve the transport-declared encoding for a response.
pub fn resolve_response_encoding(
    content_encoding: Option<&str>,
    content_type: Option<&str>,
) -> &'static Encoding {
    if let Some(label) = content_encoding {
        if let Some(encoding) = encoding_from_label(label) {
            return encoding;
        }
    }

    if let Some(raw) = content_type {
        // Only consult the mime parse when a charset is actually declared.
        if raw.to_ascii_lowercase().contains("charset") {
            if let Ok(parsed) = raw.parse::<mime::Mime>() {
                if let Some(charset) = parsed.get_param(mime::CHARSET) {
                    if let Some(encoding) = encoding_from_label(charset.as_str()) {
                        return encoding;
                    }
                }
            }
        }
    }

    UTF_8
}

/// Whether a content-type names an HTML document.
pub fn is_html(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

/// Sniff a `<meta charset>` declaration out of an already-downloaded body.
///
/// The body is decoded with the encoding resolved so far; a recognized
/// declared label takes precedence over it.
pub fn sniff_html_meta(body: &[u8], assumed: &'static Encoding) -> Option<&'static Encoding> {
    let (text, _, _) = assumed.decode(body);
    let declared = meta_charset_pattern().captures(&text)?.get(1)?.as_str();
    encoding_from_label(declared)
}

/// Extract the `charset=` token from a content-type value, if any.
pub fn charset_token(content_type: &str) -> Option<&str> {
    let at = content_type.to_ascii_lowercase().find("charset=")?;
    let rest = &content_type[at + "charset=".len()..];
    let token = rest
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn meta_charset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]*?charset=["']?([a-zA-Z0-9_-]+)"#)
            .expect("meta charset pattern is valid")
    })
}
