//! Socket adapter for the automation backend.
//!
//! One connection per request: write the request line, then read the whole
//! response until the backend closes the connection.

use std::{fmt, path::PathBuf, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::debug;

use relay_core::{
    backend::{
        client::BackendClient,
        types::BackendRequest,
        wire::{decode_response, encode_request},
    },
    errors::Error,
    Result,
};

const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Where the backend listens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendAddr {
    Unix(PathBuf),
    Tcp(String),
}

impl BackendAddr {
    /// `tcp://host:port` or a bare `host:port` is TCP; `unix:/path` or any
    /// other string is a Unix socket path.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::Config("backend socket address is empty".to_string()));
        }
        if let Some(rest) = raw.strip_prefix("tcp://") {
            return Ok(BackendAddr::Tcp(rest.to_string()));
        }
        if let Some(rest) = raw.strip_prefix("unix:") {
            return Ok(BackendAddr::Unix(PathBuf::from(rest)));
        }
        if looks_like_host_port(raw) {
            return Ok(BackendAddr::Tcp(raw.to_string()));
        }
        Ok(BackendAddr::Unix(PathBuf::from(raw)))
    }
}

fn looks_like_host_port(raw: &str) -> bool {
    if raw.contains('/') {
        return false;
    }
    raw.rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
}

impl fmt::Display for BackendAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendAddr::Unix(path) => write!(f, "unix:{}", path.display()),
            BackendAddr::Tcp(addr) => write!(f, "tcp://{addr}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SocketBackend {
    addr: BackendAddr,
    call_timeout: Option<Duration>,
}

impl SocketBackend {
    pub fn new(addr: BackendAddr) -> Self {
        Self {
            addr,
            call_timeout: None,
        }
    }

    pub fn from_config(raw: &str) -> Result<Self> {
        Ok(Self::new(BackendAddr::parse(raw)?))
    }

    pub fn with_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn addr(&self) -> &BackendAddr {
        &self.addr
    }

    async fn exchange(&self, line: &[u8]) -> Result<Vec<u8>> {
        match &self.addr {
            BackendAddr::Tcp(addr) => {
                let stream = TcpStream::connect(addr)
                    .await
                    .map_err(|e| Error::Transport(format!("connect {}: {e}", self.addr)))?;
                round_trip(stream, line).await
            }
            #[cfg(unix)]
            BackendAddr::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(|e| Error::Transport(format!("connect {}: {e}", self.addr)))?;
                round_trip(stream, line).await
            }
            #[cfg(not(unix))]
            BackendAddr::Unix(_) => Err(Error::Config(
                "unix socket backends are not supported on this platform".to_string(),
            )),
        }
    }
}

async fn round_trip<S>(mut stream: S, line: &[u8]) -> Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(line)
        .await
        .map_err(|e| Error::Transport(format!("write request: {e}")))?;
    stream
        .flush()
        .await
        .map_err(|e| Error::Transport(format!("write request: {e}")))?;

    let mut buf = Vec::new();
    let mut limited = (&mut stream).take(MAX_RESPONSE_BYTES as u64 + 1);
    limited
        .read_to_end(&mut buf)
        .await
        .map_err(|e| Error::Transport(format!("read response: {e}")))?;
    if buf.len() > MAX_RESPONSE_BYTES {
        return Err(Error::Protocol(format!(
            "backend response exceeds {MAX_RESPONSE_BYTES} bytes"
        )));
    }
    Ok(buf)
}

#[async_trait]
impl BackendClient for SocketBackend {
    async fn call(&self, req: BackendRequest) -> Result<Value> {
        let kind = req.kind();
        let line = encode_request(&req)?;

        let raw = match self.call_timeout {
            Some(limit) => timeout(limit, self.exchange(&line)).await.map_err(|_| {
                Error::Transport(format!(
                    "`{kind}` request to {} timed out after {limit:?}",
                    self.addr
                ))
            })??,
            None => self.exchange(&line).await?,
        };

        debug!(kind, bytes = raw.len(), "backend response");
        decode_response(&raw)
    }
}
