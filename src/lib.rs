//! # replaynet
//!
//! An HTTP/HTTPS client library built around three ideas:
//!
//! - **Flexible dispatch**: one [`ReqParams`] value describes a request —
//!   recognized and custom headers, cookies, proxy, a tagged body variant
//!   (form / JSON / raw / multipart), body charset, timeout and behavior
//!   flags.
//! - **Transcript replay**: a raw captured HTTP request block (request
//!   line, headers, optional body) parses directly into dispatchable
//!   parameters — paste a capture, get a request.
//! - **Charset-aware responses**: response bodies resolve their text
//!   encoding from transport headers and, for HTML, from embedded
//!   `<meta charset>` declarations, before decoding.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use replaynet::{Client, ReqParams};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::new();
//!     let response = client
//!         .get_with("http://example.test/", ReqParams::new().query_param("page", "1"))
//!         .await
//!         .unwrap();
//!     println!("{}: {}", response.status(), response.text());
//! }
//! ```
//!
//! Replaying a capture:
//!
//! ```rust,ignore
//! let response = client
//!     .replay("GET /status HTTP/1.1\r\nHost: example.test\r\n\r\n")
//!     .await
//!     .unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`base`] - error taxonomy and the error notification channel
//! - [`client`] - the client front door and dispatch pipeline
//! - [`cookies`] - the shared cookie jar
//! - [`http`] - body resolution, multipart framing, charset handling,
//!   response normalization and the wire exchange
//! - [`params`] - per-request configuration
//! - [`socket`] - TCP/TLS connection setup and proxy tunneling
//! - [`transcript`] - raw transcript parsing
//!
//! ## Error handling
//!
//! Every failure carries an [`ErrorKind`] tag. By default errors come back
//! as `Err(ReqError)`; attach a subscriber with
//! [`Client::builder()`](client::ClientBuilder) to route them to a
//! notification channel instead, in which case the caller receives an
//! empty status-0 response as the "no response obtained" sentinel.

pub mod base;
pub mod client;
pub mod cookies;
pub mod http;
pub mod params;
pub mod socket;
pub mod transcript;

pub use base::error::{ErrorKind, ReqError};
pub use base::events::ErrorHub;
pub use client::{Client, ClientBuilder};
pub use cookies::CookieJar;
pub use http::multipart::{Form, Part};
pub use http::response::ReqResponse;
pub use params::{Body, ReqParams, StandardHeader};
pub use socket::proxy::ProxySettings;
pub use transcript::{parse as parse_transcript, ParsedTranscript};
