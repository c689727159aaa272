//! URI Parser Module
//!
//! Splits a request-target string into host, port, and path, and derives
//! the canonical cache key.

use crate::error::{ProxyError, Result};

// == Request Target ==
/// The parsed components of a proxied request URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Origin hostname
    pub host: String,
    /// Origin port, defaulted to 80 when the URI names none
    pub port: u16,
    /// Absolute path including the leading `/`, defaulted to `/`
    pub path: String,
}

impl RequestTarget {
    /// Renders the canonical cache key `host:port/path`.
    ///
    /// The port is always present so `http://example.com/` and
    /// `http://example.com:80/` share one cache entry.
    pub fn cache_key(&self) -> String {
        format!("{}:{}{}", self.host, self.port, self.path)
    }
}

// == Parser ==
/// Parses a request target of the form `http://host[:port][/path]` or
/// `host[:port][/path]`.
///
/// Pure and side-effect-free. Fails on an empty host or an unparsable
/// port; everything else in the path is passed through untouched.
pub fn parse_target(raw: &str) -> Result<RequestTarget> {
    let rest = match raw.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("http://") => &raw[7..],
        _ => raw,
    };

    let (authority, path) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, "/"),
    };

    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| ProxyError::MalformedRequest(format!("invalid port in '{raw}'")))?;
            (host, port)
        }
        None => (authority, 80),
    };

    if host.is_empty() {
        return Err(ProxyError::MalformedRequest(format!(
            "missing host in '{raw}'"
        )));
    }

    Ok(RequestTarget {
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}
