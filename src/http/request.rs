//! Request Module
//!
//! Parses the client's request line and rewrites its header block into the
//! HTTP/1.0 request forwarded to the origin.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{ProxyError, Result};

// == Constants ==
/// Fixed User-Agent presented to every origin, replacing whatever the
/// client sent.
pub const FORWARD_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3";

// == Request Line ==
/// The three fields of an HTTP request line.
#[derive(Debug, Clone)]
pub struct RequestLine {
    pub method: String,
    pub uri: String,
    pub version: String,
}

impl RequestLine {
    /// Returns true for GET in any letter case.
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// Parses `METHOD SP REQUEST-URI SP VERSION` from one request line.
pub fn parse_request_line(line: &str) -> Result<RequestLine> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(uri), Some(version)) => Ok(RequestLine {
            method: method.to_string(),
            uri: uri.to_string(),
            version: version.to_string(),
        }),
        _ => Err(ProxyError::MalformedRequest(line.trim_end().to_string())),
    }
}

// == Forwarded Request Builder ==
/// Consumes the client's header block and builds the request forwarded to
/// the origin.
///
/// Header lines are read until the blank terminator (or end of stream). A
/// client-supplied `Host:` header is kept verbatim; one is synthesized
/// from the parsed hostname only when absent. `User-Agent`, `Connection`,
/// and `Proxy-Connection` are replaced with fixed values; every other
/// header passes through untouched, in its original order. The forced
/// `Connection: close` / `Proxy-Connection: close` make the origin close
/// after one response, which the relay relies on to detect the end of the
/// body.
pub async fn build_forward_request<R>(reader: &mut R, path: &str, hostname: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut host_line: Option<String> = None;
    let mut passthrough = String::new();
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        if line == "\r\n" || line == "\n" {
            break;
        }

        let name = line.split(':').next().unwrap_or("").trim();
        if name.eq_ignore_ascii_case("Host") {
            host_line = Some(line.clone());
        } else if !name.eq_ignore_ascii_case("User-Agent")
            && !name.eq_ignore_ascii_case("Connection")
            && !name.eq_ignore_ascii_case("Proxy-Connection")
        {
            passthrough.push_str(&line);
        }
    }

    let host_line = host_line.unwrap_or_else(|| format!("Host: {hostname}\r\n"));

    let mut request = format!("GET {path} HTTP/1.0\r\n");
    request.push_str(&host_line);
    request.push_str("User-Agent: ");
    request.push_str(FORWARD_USER_AGENT);
    request.push_str("\r\n");
    request.push_str("Connection: close\r\n");
    request.push_str("Proxy-Connection: close\r\n");
    request.push_str(&passthrough);
    request.push_str("\r\n");
    Ok(request)
}

/// Reads and discards the client's header block.
///
/// Used on the cache-hit path, where the headers influence nothing but
/// still belong to this request on the wire.
pub async fn drain_headers<R>(reader: &mut R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        if line == "\r\n" || line == "\n" {
            return Ok(());
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn test_parse_request_line() {
        let line = parse_request_line("GET http://example.com/ HTTP/1.0\r\n").unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.uri, "http://example.com/");
        assert_eq!(line.version, "HTTP/1.0");
        assert!(line.is_get());
    }

    #[test]
    fn test_method_case_insensitive() {
        let line = parse_request_line("get http://example.com/ HTTP/1.0\r\n").unwrap();
        assert!(line.is_get());
    }

    #[test]
    fn test_non_get_detected() {
        let line = parse_request_line("POST /x HTTP/1.0\r\n").unwrap();
        assert!(!line.is_get());
    }

    #[test]
    fn test_malformed_request_line_rejected() {
        assert!(matches!(
            parse_request_line("GET\r\n"),
            Err(ProxyError::MalformedRequest(_))
        ));
        assert!(matches!(
            parse_request_line("\r\n"),
            Err(ProxyError::MalformedRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_forward_request_keeps_client_host() {
        let mut reader = BufReader::new(&b"Host: foo\r\nX-Test: 1\r\n\r\n"[..]);
        let request = build_forward_request(&mut reader, "/p", "example.com")
            .await
            .unwrap();

        let expected = format!(
            "GET /p HTTP/1.0\r\n\
             Host: foo\r\n\
             User-Agent: {FORWARD_USER_AGENT}\r\n\
             Connection: close\r\n\
             Proxy-Connection: close\r\n\
             X-Test: 1\r\n\
             \r\n"
        );
        assert_eq!(request, expected);
        // No Host line synthesized beyond the client's own.
        assert_eq!(request.matches("Host:").count(), 1);
    }

    #[tokio::test]
    async fn test_forward_request_synthesizes_host() {
        let mut reader = BufReader::new(&b"X-Test: 1\r\n\r\n"[..]);
        let request = build_forward_request(&mut reader, "/", "example.com")
            .await
            .unwrap();
        assert!(request.contains("Host: example.com\r\n"));
    }

    #[tokio::test]
    async fn test_forward_request_replaces_hop_headers() {
        let mut reader = BufReader::new(
            &b"User-Agent: curl/8.0\r\nConnection: keep-alive\r\nProxy-Connection: keep-alive\r\n\r\n"[..],
        );
        let request = build_forward_request(&mut reader, "/", "example.com")
            .await
            .unwrap();

        assert!(!request.contains("curl"));
        assert!(!request.contains("keep-alive"));
        assert!(request.contains("Connection: close\r\n"));
        assert!(request.contains("Proxy-Connection: close\r\n"));
        assert!(request.contains(FORWARD_USER_AGENT));
    }

    #[tokio::test]
    async fn test_forward_request_preserves_header_order() {
        let mut reader = BufReader::new(&b"B: 2\r\nA: 1\r\nC: 3\r\n\r\n"[..]);
        let request = build_forward_request(&mut reader, "/", "example.com")
            .await
            .unwrap();

        let b = request.find("B: 2").unwrap();
        let a = request.find("A: 1").unwrap();
        let c = request.find("C: 3").unwrap();
        assert!(b < a && a < c, "pass-through order must be preserved");
    }

    #[tokio::test]
    async fn test_forward_request_tolerates_missing_terminator() {
        // Client closed the stream without the final blank line.
        let mut reader = BufReader::new(&b"X-Test: 1\r\n"[..]);
        let request = build_forward_request(&mut reader, "/", "example.com")
            .await
            .unwrap();
        assert!(request.contains("X-Test: 1\r\n"));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_forward_request_split_reads() {
        // Header block arriving across two socket reads.
        let mock = tokio_test::io::Builder::new()
            .read(b"Host: foo\r\nX-")
            .read(b"Test: 1\r\n\r\n")
            .build();
        let mut reader = BufReader::new(mock);
        let request = build_forward_request(&mut reader, "/p", "foo")
            .await
            .unwrap();
        assert!(request.contains("Host: foo\r\n"));
        assert!(request.contains("X-Test: 1\r\n"));
    }

    #[tokio::test]
    async fn test_drain_headers_stops_at_blank_line() {
        let mut reader = BufReader::new(&b"A: 1\r\n\r\ntrailing"[..]);
        drain_headers(&mut reader).await.unwrap();

        let mut rest = String::new();
        tokio::io::AsyncBufReadExt::read_line(&mut reader, &mut rest)
            .await
            .unwrap();
        assert_eq!(rest, "trailing");
    }
}
