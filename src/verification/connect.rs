//! Deadline-aware TCP dialing for the connect check.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;

/// Dialing seam; swapped for a stub in tests.
pub trait Dial: Send + Sync {
    /// Attempt a connection to `addr`, bounded by `timeout`.
    fn dial(
        &self,
        addr: SocketAddr,
        timeout: Duration,
    ) -> impl Future<Output = io::Result<TcpStream>> + Send;
}

/// The production dialer: `tokio::net::TcpStream` with a per-attempt
/// timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDialer;

impl Dial for TokioDialer {
    async fn dial(&self, addr: SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("dial to {addr} timed out after {timeout:?}"),
            )),
        }
    }
}
