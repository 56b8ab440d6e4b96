//! Async byte-stream transport seam.
//!
//! The client drives any `AsyncRead + AsyncWrite` stream, delivered as
//! arbitrary byte chunks with no framing guarantees. Real connections come
//! from [`TcpConnector`]; tests hand the client one end of a
//! [`tokio::io::duplex`] pair through their own [`Connector`]
//! implementation.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Trait alias for the byte streams the client can drive.
///
/// Satisfied by `TcpStream` for real servers and by
/// `tokio::io::DuplexStream` in tests.
pub trait TransportIO: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> TransportIO for T {}

/// Type-erased boxed transport.
pub type DynTransport = Box<dyn TransportIO>;

/// Opens transport connections on behalf of the client.
///
/// The client wraps `connect` in its configured timeout; implementations
/// should not impose their own.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a connection to `host:port`.
    async fn connect(&self, host: &str, port: u16) -> io::Result<DynTransport>;
}

/// The production connector: plain TCP with Nagle disabled.
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &str, port: u16) -> io::Result<DynTransport> {
        let stream = TcpStream::connect((host, port)).await?;
        // Commands are small and latency-sensitive.
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}
