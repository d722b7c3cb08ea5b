//! One-shot HTTP/1.1 exchange over an established socket.

use crate::base::error::ReqError;
use crate::socket::{ConnectJob, ProxySettings};
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tracing::debug;
use url::Url;

/// A ready HTTP/1.1 request sender for one origin.
pub struct HttpStream {
    sender: http1::SendRequest<Full<Bytes>>,
}

impl HttpStream {
    /// Connect (direct or tunneled) and complete the HTTP/1.1 handshake.
    pub async fn open(url: &Url, proxy: Option<&ProxySettings>) -> Result<Self, ReqError> {
        let socket = ConnectJob::connect(url, proxy).await?;
        let io = TokioIo::new(socket);

        let (sender, connection) = http1::handshake(io)
            .await
            .map_err(|e| ReqError::RequestError(format!("HTTP handshake failed: {e}")))?;

        // Drive the connection until the exchange finishes or the socket drops.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "connection driver terminated");
            }
        });

        Ok(Self { sender })
    }

    /// Send one request and await the response head.
    pub async fn send(
        &mut self,
        request: Request<Full<Bytes>>,
    ) -> Result<Response<Incoming>, ReqError> {
        self.sender.send_request(request).await.map_err(|e| {
            if e.is_timeout() {
                ReqError::RequestTimeout
            } else {
                ReqError::RequestError(format!("HTTP exchange failed: {e}"))
            }
        })
    }
}
