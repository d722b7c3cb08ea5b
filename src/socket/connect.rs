//! Connection setup: DNS -> TCP -> optional CONNECT tunnel -> optional TLS.

use crate::base::error::ReqError;
use crate::socket::proxy::{ProxyKind, ProxySettings};
use crate::socket::SocketType;
use boring::ssl::{SslConnector, SslMethod};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

pub struct ConnectJob;

impl ConnectJob {
    /// Establish a stream to the URL's origin, through the proxy if one is
    /// configured. For https targets the TLS handshake happens after any
    /// tunnel is in place.
    pub async fn connect(url: &Url, proxy: Option<&ProxySettings>) -> Result<SocketType, ReqError> {
        let target_host = url
            .host_str()
            .ok_or_else(|| ReqError::UrlParse(format!("`{url}` has no host")))?;
        let target_port = url
            .port_or_known_default()
            .ok_or_else(|| ReqError::UrlParse(format!("`{url}` has no usable port")))?;

        let (dial_host, dial_port) = match proxy {
            Some(p) => {
                if p.kind() != ProxyKind::Http {
                    return Err(ReqError::RequestError(format!(
                        "proxy scheme `{}` is not supported",
                        p.url.scheme()
                    )));
                }
                p.host_port().ok_or_else(|| {
                    ReqError::UrlParse(format!("proxy URL `{}` has no host", p.url))
                })?
            }
            None => (target_host, target_port),
        };

        let mut stream = Self::dial(dial_host, dial_port).await?;

        if let Some(p) = proxy {
            Self::tunnel(&mut stream, target_host, target_port, p).await?;
        }

        if url.scheme() == "https" {
            let tls = Self::tls_handshake(stream, target_host).await?;
            Ok(SocketType::Ssl(tls))
        } else {
            Ok(SocketType::Tcp(stream))
        }
    }

    async fn dial(host: &str, port: u16) -> Result<TcpStream, ReqError> {
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ReqError::RequestError(format!("DNS resolution of `{host}` failed: {e}")))?;

        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => debug!(%addr, error = %e, "TCP connect attempt failed"),
            }
        }

        Err(ReqError::RequestError(format!(
            "could not connect to {host}:{port}"
        )))
    }

    /// Issue an HTTP CONNECT through an already-dialed proxy stream.
    async fn tunnel(
        stream: &mut TcpStream,
        host: &str,
        port: u16,
        proxy: &ProxySettings,
    ) -> Result<(), ReqError> {
        let target = format!("{host}:{port}");
        let mut connect_req = format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n");
        if let Some(auth) = proxy.auth_header() {
            connect_req.push_str("Proxy-Authorization: ");
            connect_req.push_str(&auth);
            connect_req.push_str("\r\n");
        }
        connect_req.push_str("\r\n");

        stream
            .write_all(connect_req.as_bytes())
            .await
            .map_err(|e| ReqError::RequestError(format!("proxy tunnel write failed: {e}")))?;

        let mut buf = [0u8; 1024];
        let n = stream
            .read(&mut buf)
            .await
            .map_err(|e| ReqError::RequestError(format!("proxy tunnel read failed: {e}")))?;
        let reply = String::from_utf8_lossy(&buf[..n]);

        if reply.starts_with("HTTP/1.1 200") || reply.starts_with("HTTP/1.0 200") {
            debug!(%target, "proxy tunnel established");
            Ok(())
        } else {
            Err(ReqError::RequestError(format!(
                "proxy refused CONNECT to {target}: {}",
                reply.lines().next().unwrap_or("")
            )))
        }
    }

    async fn tls_handshake(
        stream: TcpStream,
        host: &str,
    ) -> Result<tokio_boring::SslStream<TcpStream>, ReqError> {
        let mut builder = SslConnector::builder(SslMethod::tls())
            .map_err(|e| ReqError::RequestError(format!("TLS context setup failed: {e}")))?;
        builder
            .set_alpn_protos(b"\x08http/1.1")
            .map_err(|e| ReqError::RequestError(format!("TLS ALPN setup failed: {e}")))?;

        let config = builder
            .build()
            .configure()
            .map_err(|e| ReqError::RequestError(format!("TLS configuration failed: {e}")))?;

        tokio_boring::connect(config, host, stream)
            .await
            .map_err(|e| ReqError::RequestError(format!("TLS handshake with {host} failed: {e:?}")))
    }
}
