//! HTTP Module
//!
//! Request-line parsing, URI splitting, and construction of the header
//! block forwarded to origin servers. Everything here is plain string
//! work with no sockets, so it can be tested in isolation.

pub mod request;
pub mod uri;

pub use request::{
    build_forward_request, drain_headers, parse_request_line, RequestLine, FORWARD_USER_AGENT,
};
pub use uri::{parse_target, RequestTarget};
