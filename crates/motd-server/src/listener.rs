//! TCP listener serving one random cache entry per connection
//!
//! The protocol has no request and no framing: the server writes the full
//! envelope of one entry and closes. If nothing can be served the connection
//! is closed without writing anything.

use crate::error::{Result, ServerError};
use motd_cache::{CacheError, CacheStore};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Attempts per connection when the chosen entry is trimmed before it is read
const READ_ATTEMPTS: usize = 3;

/// A bound listener, ready to serve
pub struct TcpServer {
    listener: TcpListener,
    cache: Arc<CacheStore>,
}

impl TcpServer {
    /// Bind `host:port`. Port 0 picks a free port.
    pub async fn bind(host: &str, port: u16, cache: Arc<CacheStore>) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: Box::new(e),
            })?;

        info!(address = %addr, "Server started");
        Ok(Self { listener, cache })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `stop` turns true.
    ///
    /// Each connection is handled on its own task. After the listener closes,
    /// in-flight connections are left to finish before this returns.
    pub async fn serve(self, mut stop: watch::Receiver<bool>) -> Result<()> {
        let TcpServer { listener, cache } = self;
        let mut handlers = JoinSet::new();

        let result = loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        handlers.spawn(handle_connection(stream, peer, cache.clone()));
                    }
                    Err(e) if is_transient(&e) => {
                        warn!(error = %e, "Dropped connection during accept");
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        break Err(ServerError::Accept(Box::new(e)));
                    }
                },
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Connection handler failed");
                    }
                }
                _ = async { let _ = stop.wait_for(|stopped| *stopped).await; } => {
                    info!("Listener closed");
                    break Ok(());
                }
            }
        };

        drop(listener);
        let in_flight = handlers.len();
        if in_flight > 0 {
            debug!(in_flight, "Waiting for open connections");
        }
        while handlers.join_next().await.is_some() {}

        result
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset | io::ErrorKind::Interrupted
    )
}

async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, cache: Arc<CacheStore>) {
    let data = match random_entry(|| cache.get_random()).await {
        Ok(data) => data,
        Err(CacheError::EmptyCache) => {
            warn!(%peer, "No cached content to serve");
            return;
        }
        Err(e) => {
            error!(%peer, error = %e, "Failed to get random file");
            return;
        }
    };

    if let Err(e) = stream.write_all(&data).await {
        error!(%peer, error = %e, "Failed to write to connection");
    } else {
        debug!(%peer, bytes = data.len(), "Served cache entry");
    }
    let _ = stream.shutdown().await;
}

/// Random entry from `pick`, retried when a concurrent trim removed the pick
async fn random_entry<F, Fut>(mut pick: F) -> motd_cache::Result<Vec<u8>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = motd_cache::Result<Vec<u8>>>,
{
    let mut attempt = 1;
    loop {
        match pick().await {
            Err(e) if e.is_vanished() && attempt < READ_ATTEMPTS => {
                debug!(attempt, "Picked entry vanished, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}
