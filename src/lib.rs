//! fileserve - Minimal static file server
//!
//! Core library for request parsing, path resolution and the connection
//! lifecycle.

pub mod config;
pub mod http;
pub mod logging;
pub mod server;
