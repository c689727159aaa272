//! Listener Module
//!
//! Accepts client connections and dispatches one handler task per
//! connection, bounded by an admission semaphore.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::cache::SharedCache;
use crate::error::ProxyError;
use crate::proxy::handler;

// == Serve Loop ==
/// Runs the accept loop until the listener fails.
///
/// At most `max_connections` handlers run at once; further connections
/// queue in the accept backlog until a permit frees up, rather than
/// spawning without bound.
pub async fn serve(
    listener: TcpListener,
    cache: SharedCache,
    max_connections: usize,
) -> std::io::Result<()> {
    let admission = Arc::new(Semaphore::new(max_connections));

    loop {
        let permit = match Arc::clone(&admission).acquire_owned().await {
            Ok(permit) => permit,
            // The semaphore is never closed while serving; treat closure
            // as a shutdown request.
            Err(_) => return Ok(()),
        };
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "connection accepted");

        let cache = cache.clone();
        tokio::spawn(async move {
            match handler::handle_connection(stream, cache).await {
                Ok(()) => {}
                Err(ProxyError::EmptyRequest) => {
                    debug!(%peer, "client closed without a request");
                }
                Err(err @ ProxyError::MalformedRequest(_))
                | Err(err @ ProxyError::UnsupportedMethod(_)) => {
                    debug!(%peer, %err, "request rejected");
                }
                Err(err @ ProxyError::OriginUnreachable { .. }) => {
                    warn!(%peer, %err, "relay aborted");
                }
                Err(err) => {
                    debug!(%peer, %err, "connection ended with error");
                }
            }
            drop(permit);
        });
    }
}
