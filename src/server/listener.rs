use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket, lookup_host};
use tracing::{Instrument, info};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::http::resolver::DocRoot;
use crate::server::pool::WorkerPool;

/// Pending connections the kernel queues before `accept`.
pub const BACKLOG: u32 = 5;

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let root = Arc::new(DocRoot::new(&cfg.doc_root)?);
    let listener = bind(&cfg.host, cfg.port).await?;

    info!(
        "Listening on {} with {} workers, document root {}",
        cfg.listen_addr(),
        cfg.workers,
        root.path().display()
    );

    serve(listener, root, WorkerPool::new(cfg.workers), cfg.read_timeout()).await
}

/// Binds a listening socket with address reuse enabled.
pub async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    let addr = lookup_host((host, port))
        .await
        .with_context(|| format!("failed to resolve {host}"))?
        .next()
        .with_context(|| format!("no address found for {host}"))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket
        .bind(addr)
        .with_context(|| format!("failed to bind {addr}"))?;

    Ok(socket.listen(BACKLOG)?)
}

/// Accepts connections forever, one pool slot per connection.
pub async fn serve(
    listener: TcpListener,
    root: Arc<DocRoot>,
    pool: WorkerPool,
    read_timeout: Duration,
) -> anyhow::Result<()> {
    loop {
        let slot = pool.reserve().await?;

        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        let span = tracing::info_span!("conn", %peer);
        span.in_scope(|| info!("Accepted connection"));

        let conn = Connection::new(socket, root.clone(), read_timeout);
        slot.spawn(
            async move {
                if let Err(e) = conn.run().await {
                    tracing::error!("Connection error: {:#}", e);
                }
            }
            .instrument(span),
        );
    }
}
