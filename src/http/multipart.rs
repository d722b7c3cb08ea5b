//! multipart/form-data payloads.
//!
//! Frames parts per RFC 2046 and owns the derived `Content-Type` (with
//! boundary) and exact `Content-Length`, so the dispatcher never has to
//! look inside.

use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A multipart/form-data payload.
#[derive(Debug, Clone)]
pub struct Form {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    pub fn new() -> Self {
        Self {
            boundary: next_boundary(),
            parts: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a plain text field.
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// Add a prepared part.
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// The `Content-Type` value for this payload.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Exact serialized length in bytes.
    pub fn content_length(&self) -> u64 {
        if self.parts.is_empty() {
            return 0;
        }

        let mut total = 0u64;
        for part in &self.parts {
            // --boundary\r\n<headers>\r\n\r\n<data>\r\n
            total += 2 + self.boundary.len() as u64 + 2;
            total += part.header_block().len() as u64;
            total += 4;
            total += part.data.len() as u64;
            total += 2;
        }
        // --boundary--\r\n
        total + 2 + self.boundary.len() as u64 + 4
    }

    /// Serialize the framed payload.
    pub fn to_bytes(&self) -> Bytes {
        if self.parts.is_empty() {
            return Bytes::new();
        }

        let mut wire = Vec::with_capacity(self.content_length() as usize);
        for part in &self.parts {
            wire.extend_from_slice(b"--");
            wire.extend_from_slice(self.boundary.as_bytes());
            wire.extend_from_slice(b"\r\n");
            wire.extend_from_slice(part.header_block().as_bytes());
            wire.extend_from_slice(b"\r\n\r\n");
            wire.extend_from_slice(&part.data);
            wire.extend_from_slice(b"\r\n");
        }
        wire.extend_from_slice(b"--");
        wire.extend_from_slice(self.boundary.as_bytes());
        wire.extend_from_slice(b"--\r\n");

        Bytes::from(wire)
    }
}

/// One field of a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    data: Bytes,
    content_type: Option<String>,
    file_name: Option<String>,
}

impl Part {
    /// A text field, tagged `text/plain; charset=utf-8`.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Bytes::from(value.into()),
            content_type: Some("text/plain; charset=utf-8".to_string()),
            file_name: None,
        }
    }

    /// A binary field with no content-type until one is set.
    pub fn bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            content_type: None,
            file_name: None,
        }
    }

    pub fn content_type(mut self, mime_type: impl Into<String>) -> Self {
        self.content_type = Some(mime_type.into());
        self
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    fn header_block(&self) -> String {
        let mut block = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_token(&self.name)
        );
        if let Some(file_name) = &self.file_name {
            block.push_str("; filename=\"");
            block.push_str(&escape_token(file_name));
            block.push('"');
        }
        if let Some(content_type) = &self.content_type {
            block.push_str("\r\nContent-Type: ");
            block.push_str(content_type);
        }
        block
    }
}

/// Escape quotes, backslashes and line breaks in a disposition token.
fn escape_token(token: &str) -> String {
    token
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

fn next_boundary() -> String {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("----replaynet-{nanos:016x}-{sequence:04x}")
}
