//! Client front door and the dispatch pipeline.
//!
//! One [`Client`] serves any number of requests. Each dispatch builds the
//! target URL, applies headers, writes the resolved body, then races the
//! wire exchange against the configured timeout and an optional
//! cancellation token. Failures either come back as tagged errors or, in
//! channel mode, are delivered to the client's [`ErrorHub`] while the
//! caller receives the empty status-0 response.
//!
//! # Example
//!
//! ```rust,ignore
//! use replaynet::{Client, ReqParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), replaynet::ReqError> {
//!     let client = Client::new();
//!     let response = client
//!         .get_with("http://example.test/", ReqParams::new().query_param("q", "rust"))
//!         .await?;
//!     println!("{} {}", response.status(), response.text());
//!     Ok(())
//! }
//! ```

use crate::base::error::ReqError;
use crate::base::events::ErrorHub;
use crate::cookies::CookieJar;
use crate::http::body::{self, ResolvedBody};
use crate::http::response::{normalize, ReqResponse};
use crate::http::stream::HttpStream;
use crate::params::{ReqParams, StandardHeader};
use crate::transcript::{self, ParsedTranscript};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Request};
use http_body_util::Full;
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::{form_urlencoded, Url};

// Browser-like defaults, applied only when the caller set nothing. They
// exist to avoid generic rejections from servers that block headerless
// clients; any caller value wins.
const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8,en-GB;q=0.7,en-US;q=0.6";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/85.0.4183.83 Safari/537.36 Edg/85.0.564.41";
const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,\
                              image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9";

/// HTTP client.
///
/// Cheap to clone; clones share the error hub.
#[derive(Debug, Clone, Default)]
pub struct Client {
    errors: ErrorHub,
}

impl Client {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// The error notification channel for this client.
    pub fn errors(&self) -> &ErrorHub {
        &self.errors
    }

    pub async fn get(&self, url: &str) -> Result<ReqResponse, ReqError> {
        self.request(Method::GET, url, ReqParams::new()).await
    }

    pub async fn get_with(&self, url: &str, params: ReqParams) -> Result<ReqResponse, ReqError> {
        self.request(Method::GET, url, params).await
    }

    pub async fn post(&self, url: &str) -> Result<ReqResponse, ReqError> {
        self.request(Method::POST, url, ReqParams::new()).await
    }

    pub async fn post_with(&self, url: &str, params: ReqParams) -> Result<ReqResponse, ReqError> {
        self.request(Method::POST, url, params).await
    }

    pub async fn put_with(&self, url: &str, params: ReqParams) -> Result<ReqResponse, ReqError> {
        self.request(Method::PUT, url, params).await
    }

    pub async fn patch_with(&self, url: &str, params: ReqParams) -> Result<ReqResponse, ReqError> {
        self.request(Method::PATCH, url, params).await
    }

    pub async fn delete_with(&self, url: &str, params: ReqParams) -> Result<ReqResponse, ReqError> {
        self.request(Method::DELETE, url, params).await
    }

    pub async fn head_with(&self, url: &str, params: ReqParams) -> Result<ReqResponse, ReqError> {
        self.request(Method::HEAD, url, params).await
    }

    /// Dispatch with a fresh (never-fired) cancellation token.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        params: ReqParams,
    ) -> Result<ReqResponse, ReqError> {
        self.request_cancelable(method, url, params, CancellationToken::new())
            .await
    }

    /// Parse a captured request transcript and dispatch it.
    pub async fn replay(&self, block: &str) -> Result<ReqResponse, ReqError> {
        self.replay_with(block, ReqParams::new()).await
    }

    /// Parse a captured request transcript and dispatch it with explicit
    /// parameters. Parse failures follow the same propagation mode as
    /// dispatch failures.
    pub async fn replay_with(&self, block: &str, params: ReqParams) -> Result<ReqResponse, ReqError> {
        let channel = self.channel_mode(&params)?;
        let jar = params.cookies.clone();

        let ParsedTranscript {
            method,
            url,
            params,
        } = match transcript::parse(block, params) {
            Ok(parsed) => parsed,
            Err(e) => return self.fail(channel, e, &jar),
        };

        self.dispatch(method, &url, params, CancellationToken::new(), channel)
            .await
    }

    /// Dispatch with an external cancellation signal.
    ///
    /// Cancellation wins the race with an empty status-0 response; it is
    /// notified on the channel when one is attached, never returned as an
    /// error.
    pub async fn request_cancelable(
        &self,
        method: Method,
        url: &str,
        params: ReqParams,
        cancel: CancellationToken,
    ) -> Result<ReqResponse, ReqError> {
        let channel = self.channel_mode(&params)?;
        self.dispatch(method, url, params, cancel, channel).await
    }

    /// Determine the propagation mode for this dispatch.
    ///
    /// Asking for the channel with no subscriber attached is rejected
    /// outright; a subscribed hub enables channel mode even when the flag
    /// is unset.
    fn channel_mode(&self, params: &ReqParams) -> Result<bool, ReqError> {
        if params.use_error_channel && !self.errors.has_subscribers() {
            return Err(ReqError::ArgumentNull("error channel subscriber"));
        }
        Ok(params.use_error_channel || self.errors.has_subscribers())
    }

    /// Route or return an error per the active mode. Routed errors yield
    /// the empty response carrying the request's jar.
    fn fail(
        &self,
        channel: bool,
        error: ReqError,
        jar: &CookieJar,
    ) -> Result<ReqResponse, ReqError> {
        if channel {
            self.errors.notify(&error);
            Ok(ReqResponse::empty(jar.clone()))
        } else {
            Err(error)
        }
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        params: ReqParams,
        cancel: CancellationToken,
        channel: bool,
    ) -> Result<ReqResponse, ReqError> {
        if url.is_empty() {
            return Err(ReqError::ArgumentNull("url"));
        }
        if params.read_buffer_size == 0 {
            return Err(ReqError::ArgumentNull("read_buffer_size"));
        }

        let target = match build_target_url(&method, url, &params) {
            Ok(target) => target,
            Err(e) => return self.fail(channel, e, &params.cookies),
        };

        let resolved_body = if body_bearing(&method) {
            match body::resolve(&params) {
                Ok(resolved) => resolved,
                Err(e) => return self.fail(channel, e, &params.cookies),
            }
        } else {
            None
        };

        let request = match build_request(&method, &target, &params, resolved_body) {
            Ok(request) => request,
            Err(e) => return self.fail(channel, e, &params.cookies),
        };

        debug!(%method, url = %target, timeout_ms = params.timeout.as_millis() as u64, "dispatching");

        let exchange = async {
            let mut stream = HttpStream::open(&target, params.proxy.as_ref()).await?;
            stream.send(request).await
        };

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(url = %target, "dispatch cancelled by caller");
                if channel {
                    self.errors.notify(&ReqError::UserCancelled);
                }
                return Ok(ReqResponse::empty(params.cookies.clone()));
            }
            outcome = tokio::time::timeout(params.timeout, exchange) => match outcome {
                Err(_) => {
                    debug!(url = %target, "dispatch timed out");
                    if params.error_on_timeout {
                        let error = ReqError::RequestTimeout;
                        if channel {
                            self.errors.notify(&error);
                        } else {
                            return Err(error);
                        }
                    }
                    return Ok(ReqResponse::empty(params.cookies.clone()));
                }
                Ok(Err(e)) => return self.fail(channel, e, &params.cookies),
                Ok(Ok(response)) => response,
            }
        };

        // Non-2xx/3xx statuses escalate only when asked to; the response
        // data is captured either way.
        let status = response.status();
        if !(status.is_success() || status.is_redirection()) && params.error_on_status {
            let error = ReqError::HttpStatusCode(status.as_u16());
            if channel {
                self.errors.notify(&error);
            } else {
                return Err(error);
            }
        }

        match normalize(
            response,
            &target,
            params.sniff_html_charset,
            params.read_buffer_size,
            &params.cookies,
        )
        .await
        {
            Ok(normalized) => Ok(normalized),
            Err(e) => self.fail(channel, e, &params.cookies),
        }
    }
}

/// Builder for a [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    errors: ErrorHub,
}

impl ClientBuilder {
    /// Attach an error subscriber. With at least one attached, every
    /// dispatch through the built client runs in channel mode.
    pub fn on_error<F>(self, subscriber: F) -> Self
    where
        F: Fn(&ReqError) + Send + Sync + 'static,
    {
        self.errors.subscribe(subscriber);
        self
    }

    pub fn build(self) -> Client {
        Client {
            errors: self.errors,
        }
    }
}

fn body_bearing(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Parse the URL and, for GET, merge the query pairs into the existing
/// query string (original query preserved, new pairs appended).
fn build_target_url(method: &Method, url: &str, params: &ReqParams) -> Result<Url, ReqError> {
    let mut target =
        Url::parse(url).map_err(|e| ReqError::UrlParse(format!("`{url}` is not a valid URL: {e}")))?;

    match target.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ReqError::UrlParse(format!(
                "unsupported URL scheme `{other}`"
            )))
        }
    }

    if *method == Method::GET && !params.query.is_empty() {
        let mut pairs = target.query_pairs_mut();
        for (key, value) in &params.query {
            pairs.append_pair(key, value);
        }
        drop(pairs);
    }

    Ok(target)
}

/// Assemble the transport request: defaults, recognized headers with
/// validation, percent-encoded custom headers, cookie and host lines, and
/// the resolved body.
fn build_request(
    method: &Method,
    url: &Url,
    params: &ReqParams,
    resolved_body: Option<ResolvedBody>,
) -> Result<Request<Full<Bytes>>, ReqError> {
    let mut headers = HeaderMap::new();

    let mut recognized = params.headers.clone();
    recognized
        .entry(StandardHeader::AcceptLanguage)
        .or_insert_with(|| DEFAULT_ACCEPT_LANGUAGE.to_string());
    recognized
        .entry(StandardHeader::UserAgent)
        .or_insert_with(|| DEFAULT_USER_AGENT.to_string());
    recognized
        .entry(StandardHeader::Accept)
        .or_insert_with(|| DEFAULT_ACCEPT.to_string());

    for (header, value) in &recognized {
        match header {
            // The transport computes the real length from the body; the
            // caller's value only has to be well-formed.
            StandardHeader::ContentLength => {
                value.trim().parse::<u64>().map_err(|_| {
                    header_error(&header.to_string(), "not a valid content length")
                })?;
            }
            StandardHeader::Date => {
                OffsetDateTime::parse(value.trim(), &Rfc2822)
                    .map_err(|_| header_error(&header.to_string(), "not a valid RFC 2822 date"))?;
                insert_header(&mut headers, &header.to_string(), value)?;
            }
            _ => insert_header(&mut headers, &header.to_string(), value)?,
        }
    }

    // Custom headers go out percent-encoded so arbitrary octets cannot be
    // rejected by the transport.
    for (name, value) in &params.custom_headers {
        let encoded_name: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
        let encoded_value: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
        insert_header(&mut headers, &encoded_name, &encoded_value)?;
    }

    if !headers.contains_key(http::header::HOST) {
        let host = url
            .host_str()
            .ok_or_else(|| ReqError::UrlParse(format!("`{url}` has no host")))?;
        let host_value = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        insert_header(&mut headers, "Host", &host_value)?;
    }

    if !headers.contains_key(http::header::COOKIE) {
        if let Some(cookie_line) = params.cookies.header_for(url) {
            insert_header(&mut headers, "Cookie", &cookie_line)?;
        }
    }

    // The body resolver's content-type wins over any header-supplied one.
    let body_bytes = match resolved_body {
        Some(resolved) => {
            if let Some(content_type) = &resolved.content_type {
                insert_header(&mut headers, "Content-Type", content_type)?;
            }
            resolved.bytes
        }
        None => Bytes::new(),
    };

    let path_and_query = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };

    let mut request = Request::builder()
        .method(method.clone())
        .uri(path_and_query)
        .body(Full::new(body_bytes))
        .map_err(|e| ReqError::RequestError(format!("failed to build request: {e}")))?;
    *request.headers_mut() = headers;

    Ok(request)
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), ReqError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| header_error(name, "invalid header name"))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|_| header_error(name, "invalid header value"))?;
    headers.insert(header_name, header_value);
    Ok(())
}

fn header_error(name: &str, reason: &str) -> ReqError {
    ReqError::HeaderConstruction {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
