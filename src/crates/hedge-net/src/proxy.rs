//! Coordinator-side proxy for a remote worker.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

use hedge_core::{Algebra, Compute, Result};

use crate::wire::{self, Request, WireOp};

/// A [`Compute`] implementation that forwards every operation to a peer over
/// one bidirectional stream and blocks until the reply arrives.
///
/// There is no multiplexing: the stream carries one request at a time, which
/// is exactly the cadence of the worker loop driving this proxy. A clean EOF
/// while awaiting a reply surfaces as [`hedge_core::EngineError::TransportEof`],
/// which the worker loop treats as a graceful departure.
pub struct NetCompute<A: Algebra, S = TcpStream> {
    algebra: A,
    peer: String,
    stream: Mutex<S>,
}

impl<A, S> NetCompute<A, S>
where
    A: Algebra,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an established stream to `peer`.
    pub fn new(algebra: A, stream: S, peer: impl Into<String>) -> Self {
        Self {
            algebra,
            peer: peer.into(),
            stream: Mutex::new(stream),
        }
    }

    /// The peer this proxy forwards to, for logs.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    async fn offload(&self, op: WireOp, left: A::Value, right: A::Value) -> Result<A::Value> {
        let mut stream = self.stream.lock().await;
        debug!(peer = %self.peer, op = ?op, "sending request");
        wire::write_request(&mut *stream, &self.algebra, &Request { op, left, right }).await?;
        let reply = wire::read_value(&mut *stream, &self.algebra).await?;
        debug!(peer = %self.peer, "reply received");
        Ok(reply)
    }
}

#[async_trait]
impl<A, S> Compute<A> for NetCompute<A, S>
where
    A: Algebra,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn sum(&self, left: A::Value, right: A::Value) -> Result<A::Value> {
        self.offload(WireOp::Sum, left, right).await
    }

    async fn prod(&self, left: A::Value, right: A::Value) -> Result<A::Value> {
        self.offload(WireOp::Prod, left, right).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote;
    use hedge_algebra::Int64;
    use hedge_core::EngineError;

    #[tokio::test]
    async fn offloads_against_a_serving_peer() {
        let (local, far) = tokio::io::duplex(1024);
        let server = tokio::spawn(remote::serve(Int64, far));

        let proxy = NetCompute::new(Int64, local, "test-peer");
        assert_eq!(proxy.sum(2, 3).await.unwrap(), 5);
        assert_eq!(proxy.prod(6, 7).await.unwrap(), 42);

        drop(proxy);
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn peer_departure_surfaces_as_transport_eof() {
        let (local, far) = tokio::io::duplex(1024);
        drop(far);

        let proxy = NetCompute::new(Int64, local, "gone-peer");
        match proxy.sum(1, 1).await {
            Err(EngineError::TransportEof) | Err(EngineError::Transport(_)) => {}
            other => panic!("expected a transport failure, got {other:?}"),
        }
    }
}
