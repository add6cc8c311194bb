//! One outbound TCP connection: connect, send, one bounded receive, close.

use crate::error::ClientError;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Host and port to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    /// Validate a host and port. `[::1]` style brackets are accepted.
    pub fn new(host: &str, port: u16) -> Result<Self, ClientError> {
        let host = host.trim();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if host.is_empty() {
            return Err(ClientError::Argument("address must not be empty".to_string()));
        }
        if host.chars().any(char::is_whitespace) {
            return Err(ClientError::Argument(format!("invalid address: {:?}", host)));
        }
        if port == 0 {
            return Err(ClientError::Argument("port must be between 1 and 65535".to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(addr)) => write!(f, "[{}]:{}", addr, self.port),
            _ => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

/// An open connection. The socket is released when this is dropped.
pub struct Session {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Session {
    /// Resolve `target` and connect to the first address that accepts.
    ///
    /// Resolution and every connection attempt share one `timeout` budget.
    pub async fn connect(target: &Target, timeout: Duration) -> Result<Self, ClientError> {
        match tokio::time::timeout(timeout, Self::connect_any(target)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::ConnectTimeout {
                target: target.to_string(),
                timeout,
            }),
        }
    }

    async fn connect_any(target: &Target) -> Result<Self, ClientError> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((target.host.as_str(), target.port))
            .await
            .map_err(|source| ClientError::Resolve {
                host: target.host.clone(),
                source,
            })?
            .collect();
        debug!("{} resolved to {:?}", target, addrs);

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    info!("Client connected to {}", addr);
                    return Ok(Self { stream, peer: addr });
                }
                Err(e) => {
                    debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(ClientError::Connect {
            target: target.to_string(),
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found")
            }),
        })
    }

    /// Address of the connected peer.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Write the payload, bounded by `timeout`. An empty payload writes nothing.
    pub async fn send(&mut self, payload: &[u8], timeout: Duration) -> Result<(), ClientError> {
        if payload.is_empty() {
            debug!("Empty payload; waiting for the server to speak first");
            return Ok(());
        }

        let stream = &mut self.stream;
        let write = async move {
            stream.write_all(payload).await?;
            stream.flush().await
        };
        tokio::time::timeout(timeout, write)
            .await
            .map_err(|_| ClientError::SendTimeout(timeout))?
            .map_err(ClientError::Send)?;

        debug!("Sent {} bytes to {}", payload.len(), self.peer);
        Ok(())
    }

    /// A single read of at most `buffer_size` bytes, bounded by `timeout`.
    ///
    /// Whatever arrives in that one read is the response; anything beyond
    /// it stays unread.
    pub async fn receive(
        &mut self,
        timeout: Duration,
        buffer_size: usize,
    ) -> Result<Vec<u8>, ClientError> {
        let mut buf = vec![0u8; buffer_size];
        let n = tokio::time::timeout(timeout, self.stream.read(&mut buf))
            .await
            .map_err(|_| ClientError::ReceiveTimeout(timeout))?
            .map_err(ClientError::Receive)?;

        if n == 0 {
            return Err(ClientError::PeerClosed);
        }
        buf.truncate(n);
        debug!("Received {} bytes from {}", n, self.peer);
        Ok(buf)
    }

    /// Send `payload`, then one bounded receive. Each step gets the full `timeout`.
    pub async fn send_receive(
        &mut self,
        payload: &[u8],
        timeout: Duration,
        buffer_size: usize,
    ) -> Result<Vec<u8>, ClientError> {
        self.send(payload, timeout).await?;
        self.receive(timeout, buffer_size).await
    }

    /// Shut down the write side and release the socket.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("Shutdown of {} failed: {}", self.peer, e);
        }
        info!("Client disconnected from {}", self.peer);
    }
}
