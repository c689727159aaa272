//! Connection Handler Module
//!
//! Per-connection orchestration: reads one request, answers it from the
//! cache or relays it to the origin, and feeds eligible responses back
//! into the cache.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::cache::SharedCache;
use crate::error::{ProxyError, Result};
use crate::http::{build_forward_request, drain_headers, parse_request_line, parse_target};
use crate::proxy::origin;

/// Response sent to clients using any method other than GET, so they can
/// tell why nothing came back before the connection closes.
const NOT_IMPLEMENTED_RESPONSE: &str = "HTTP/1.0 501 Not Implemented\r\nConnection: close\r\n\r\n";

// == Connection Handler ==
/// Serves one client connection to completion.
///
/// Sequence: request line, method filter, URI parse, cache lookup; on a
/// hit the cached bytes are replayed and the origin is never contacted.
/// On a miss the rewritten request goes upstream and the response is
/// streamed through, with a size-capped copy inserted into the cache once
/// the origin closes.
///
/// Every error is local to this connection. An unreachable origin aborts
/// the relay with nothing written, so the client only observes the socket
/// closing.
pub async fn handle_connection(stream: TcpStream, cache: SharedCache) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Err(ProxyError::EmptyRequest);
    }

    let request = parse_request_line(&request_line)?;
    if !request.is_get() {
        write_half
            .write_all(NOT_IMPLEMENTED_RESPONSE.as_bytes())
            .await?;
        return Err(ProxyError::UnsupportedMethod(request.method));
    }

    let target = parse_target(&request.uri)?;
    let key = target.cache_key();

    // Lookup promotes recency and therefore needs the write lock; the
    // body is copied out so the lock is released before any socket write.
    let cached = cache.write().await.lookup(&key);
    if let Some(body) = cached {
        debug!(%key, bytes = body.len(), "cache hit");
        drain_headers(&mut reader).await?;
        write_half.write_all(&body).await?;
        write_half.flush().await?;
        return Ok(());
    }
    debug!(%key, "cache miss");

    let forward = build_forward_request(&mut reader, &target.path, &target.host).await?;
    let capture =
        origin::relay_from_origin(&target.host, target.port, &forward, &mut write_half).await?;

    if let Some(body) = capture {
        cache.write().await.insert(&key, body)?;
        debug!(%key, "response cached");
    }
    Ok(())
}
