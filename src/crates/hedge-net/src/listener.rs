//! Accepting inbound worker connections.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use hedge_core::{Algebra, Result, Scheduler, Worker};

use crate::proxy::NetCompute;

/// Accepts TCP connections and registers one network worker per peer.
///
/// Any client that connects is treated as a new worker; the worker's name
/// carries the peer address for logs. Dropping the listener stops the accept
/// loop; workers that already registered stay with the scheduler.
pub struct Listener {
    local_addr: SocketAddr,
    accept_loop: Option<JoinHandle<()>>,
}

impl Listener {
    /// Binds `addr` and starts accepting. Bind to port 0 to let the OS pick
    /// a port, then read it back from [`Listener::local_addr`].
    pub async fn bind<A>(
        addr: impl ToSocketAddrs,
        scheduler: Arc<Scheduler<A>>,
        algebra: A,
    ) -> Result<Self>
    where
        A: Algebra,
    {
        let socket = TcpListener::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        info!(addr = %local_addr, "listening for worker connections");
        let accept_loop = tokio::spawn(accept_loop(socket, scheduler, algebra));
        Ok(Self {
            local_addr,
            accept_loop: Some(accept_loop),
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops the accept loop and waits for it to wind down.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.accept_loop.take() {
            info!(addr = %self.local_addr, "listener stopping");
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(handle) = self.accept_loop.take() {
            handle.abort();
        }
    }
}

async fn accept_loop<A>(socket: TcpListener, scheduler: Arc<Scheduler<A>>, algebra: A)
where
    A: Algebra,
{
    loop {
        match socket.accept().await {
            Ok((stream, peer)) => {
                info!(%peer, "new worker connection");
                let compute = NetCompute::new(algebra.clone(), stream, peer.to_string());
                Worker::spawn(&scheduler, compute, format!("net-{peer}"));
            }
            Err(err) => {
                warn!(%err, "failed to accept connection");
            }
        }
    }
}
