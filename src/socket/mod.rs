//! Transport socket layer.
//!
//! [`SocketType`] gives the exchange layer one stream type over plain TCP
//! and TLS; [`ConnectJob`](connect::ConnectJob) performs the
//! DNS → TCP → tunnel → TLS setup.

pub mod connect;
pub mod proxy;

pub use connect::ConnectJob;
pub use proxy::ProxySettings;

use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

/// A connected transport stream, plain or TLS.
#[derive(Debug)]
pub enum SocketType {
    Tcp(TcpStream),
    Ssl(tokio_boring::SslStream<TcpStream>),
}

impl AsyncRead for SocketType {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            SocketType::Ssl(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SocketType {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            SocketType::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            SocketType::Ssl(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            SocketType::Ssl(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            SocketType::Ssl(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}
