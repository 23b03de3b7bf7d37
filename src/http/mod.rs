//! HTTP protocol implementation.
//!
//! This module implements the single-exchange HTTP/1.1 side of the server:
//! one request line in, one response out, connection closed.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The connection handler implementing the read-respond-close state machine
//! - **`parser`**: Parses the request line out of the bytes read from a client
//! - **`request`**: Request representation and request-target decoding
//! - **`resolver`**: Confines request paths to the document root and locates files
//! - **`response`**: Status codes, the response builder with its fixed header set, wire encoding
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Accumulate bytes until CRLFCRLF, EOF or timeout
//!        └──────┬──────┘
//!               │ Bytes received (nothing received → Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │     Parsed       │ ← Parse request line, resolve path, build response
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │   Responding     │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Sent (or write failed)
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │ ← Socket shut down and released on drop
//!        └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use fileserve::http::connection::Connection;
//! use fileserve::http::resolver::DocRoot;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let root = Arc::new(DocRoot::new("./www")?);
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let conn = Connection::new(socket, root.clone(), Duration::from_secs(5));
//!         tokio::spawn(async move {
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod request;
pub mod response;
pub mod parser;
pub mod resolver;
pub mod connection;
pub mod mime;
