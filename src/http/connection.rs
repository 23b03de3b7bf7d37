use std::io;
use std::net::Shutdown;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::{Buf, Bytes, BytesMut};
use socket2::SockRef;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::http::parser::{find_headers_end, parse_http_request};
use crate::http::request::Method;
use crate::http::resolver::{DocRoot, ResolvedTarget};
use crate::http::response::ResponseBuilder;

/// Bytes requested from the socket per read.
const READ_CHUNK: usize = 1024;

/// Reading stops once this much has accumulated without a header terminator.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Owns one accepted connection for a single request/response exchange.
///
/// The socket is shut down in both directions when the connection is
/// dropped, so every exit from [`Connection::run`] closes it.
pub struct Connection {
    stream: TcpStream,
    buffer: BytesMut,
    state: ConnectionState,
    root: Arc<DocRoot>,
    read_timeout: Duration,
}

pub enum ConnectionState {
    Reading,
    Parsed,
    /// Encoded response; consumed from the front as it is written.
    Responding(Bytes),
    Closed,
}

/// Result of one bounded read attempt.
enum Chunk {
    Data(usize),
    Eof,
    TimedOut,
}

impl Connection {
    pub fn new(stream: TcpStream, root: Arc<DocRoot>, read_timeout: Duration) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::Reading,
            root,
            read_timeout,
        }
    }

    /// Drives the connection to `Closed`.
    ///
    /// Only a failing socket read is returned as an error; write failures
    /// are logged here and the connection is closed regardless.
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            match &mut self.state {
                ConnectionState::Reading => {
                    self.read_request().await?;

                    if self.buffer.is_empty() {
                        tracing::debug!("Client sent no data");
                        self.state = ConnectionState::Closed;
                    } else {
                        self.state = ConnectionState::Parsed;
                    }
                }

                ConnectionState::Parsed => {
                    let (method, target) = self.process().await;
                    let response = ResponseBuilder::for_target(method, &target).await;

                    tracing::info!(
                        status = response.status.as_u16(),
                        length = response.body.len(),
                        "Responding"
                    );
                    self.state = ConnectionState::Responding(response.encode());
                }

                ConnectionState::Responding(pending) => {
                    let sent = match self.stream.write_all_buf(pending).await {
                        Ok(()) => self.stream.flush().await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = sent {
                        tracing::warn!(
                            error = %e,
                            unsent = pending.remaining(),
                            "Failed to send response"
                        );
                    }
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Accumulates bytes until the header terminator shows up, the peer
    /// closes, a read times out, or the head grows past [`MAX_HEAD_BYTES`].
    async fn read_request(&mut self) -> anyhow::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            match self.read_chunk(&mut chunk).await? {
                Chunk::Data(n) => {
                    // The terminator may straddle the previous chunk.
                    let scan_from = self.buffer.len().saturating_sub(3);
                    self.buffer.extend_from_slice(&chunk[..n]);

                    if find_headers_end(&self.buffer[scan_from..]).is_some() {
                        return Ok(());
                    }
                    if self.buffer.len() >= MAX_HEAD_BYTES {
                        tracing::debug!(received = self.buffer.len(), "Request head too large");
                        return Ok(());
                    }
                }
                Chunk::Eof => return Ok(()),
                Chunk::TimedOut => {
                    tracing::debug!(received = self.buffer.len(), "Read timed out");
                    return Ok(());
                }
            }
        }
    }

    async fn read_chunk(&mut self, chunk: &mut [u8]) -> anyhow::Result<Chunk> {
        match timeout(self.read_timeout, self.stream.read(chunk)).await {
            Ok(Ok(0)) => Ok(Chunk::Eof),
            Ok(Ok(n)) => Ok(Chunk::Data(n)),
            Ok(Err(e)) => Err(e).context("failed to read request"),
            Err(_) => Ok(Chunk::TimedOut),
        }
    }

    async fn process(&self) -> (Option<Method>, ResolvedTarget) {
        match parse_http_request(&self.buffer) {
            Ok(request) => {
                tracing::info!(
                    method = %request.method,
                    target = %request.target,
                    version = %request.version,
                    "Parsing request"
                );
                let target = self.root.resolve(&request.decoded_path()).await;
                (Some(request.method), target)
            }
            Err(e) => {
                tracing::info!(error = %e, "Rejecting request");
                (None, ResolvedTarget::rejected(e.outcome()))
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = SockRef::from(&self.stream).shutdown(Shutdown::Both) {
            if e.kind() != io::ErrorKind::NotConnected {
                tracing::debug!(error = %e, "Failed to shut down connection");
            }
        }
    }
}
