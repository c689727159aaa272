//! Error types for the proxy
//!
//! Provides unified error handling using thiserror. Every failure is local
//! to one connection; the listener logs these by class and moves on.

use thiserror::Error;

// == Proxy Error Enum ==
/// Unified error type for the proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Client closed the connection before sending a request line
    #[error("client closed before sending a request")]
    EmptyRequest,

    /// Request line or URI could not be parsed
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Request method other than GET
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// Origin server could not be reached; the client sees only a closed
    /// socket, never a proxy-generated response
    #[error("origin {host}:{port} unreachable")]
    OriginUnreachable {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Response body too large to cache
    #[error("object of {size} bytes exceeds cache limit of {limit} bytes")]
    ObjectTooLarge { size: usize, limit: usize },

    /// Socket read/write failure on either side of the relay
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
