//! Origin Client Module
//!
//! Opens the upstream connection, sends the forwarded request, and streams
//! the response back to the client while capturing a bounded copy for the
//! cache.

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::cache::MAX_OBJECT_SIZE;
use crate::error::{ProxyError, Result};
use crate::proxy::IO_CHUNK_SIZE;

/// Relays one origin response to the client.
///
/// The response bytes are not interpreted: status line, headers, and body
/// are copied verbatim in `IO_CHUNK_SIZE` chunks until the origin closes
/// its end (the forwarded `Connection: close` guarantees it will).
///
/// While streaming, up to `MAX_OBJECT_SIZE` bytes are accumulated for the
/// cache. The moment the copy would reach that limit it is abandoned and
/// only the relay continues. Returns the captured bytes if the whole
/// response stayed under the limit, `None` otherwise.
pub async fn relay_from_origin<W>(
    host: &str,
    port: u16,
    forward_request: &str,
    client: &mut W,
) -> Result<Option<Vec<u8>>>
where
    W: AsyncWrite + Unpin,
{
    let mut origin = TcpStream::connect((host, port))
        .await
        .map_err(|source| ProxyError::OriginUnreachable {
            host: host.to_string(),
            port,
            source,
        })?;
    origin.write_all(forward_request.as_bytes()).await?;

    let mut chunk = vec![0u8; IO_CHUNK_SIZE];
    let mut capture: Option<Vec<u8>> = Some(Vec::new());
    let mut relayed = 0usize;

    loop {
        let n = origin.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        client.write_all(&chunk[..n]).await?;
        relayed += n;

        if let Some(body) = capture.as_mut() {
            if body.len() + n >= MAX_OBJECT_SIZE {
                capture = None;
            } else {
                body.extend_from_slice(&chunk[..n]);
            }
        }
    }
    client.flush().await?;

    debug!(
        host,
        port,
        relayed,
        cacheable = capture.is_some(),
        "origin response relayed"
    );
    Ok(capture)
}
