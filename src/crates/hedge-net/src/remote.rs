//! The remote end of a worker connection.
//!
//! A remote worker is a standalone process that dials the coordinator,
//! enters a receive-compute-reply loop and exits when the coordinator closes
//! the stream. There is no reconnect logic: a departed remote is simply a
//! worker the scheduler no longer has.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, info};

use hedge_core::{Algebra, Result};

use crate::wire::{self, WireOp};

/// Dials `addr` and serves requests until the coordinator hangs up.
///
/// Returns `Ok(())` on a clean EOF; any other stream failure or algebra
/// failure propagates as an error (the process exits non-zero).
pub async fn connect<A>(algebra: A, addr: impl ToSocketAddrs + std::fmt::Display) -> Result<()>
where
    A: Algebra,
{
    info!(%addr, "connecting to coordinator");
    let stream = TcpStream::connect(&addr).await?;
    info!(%addr, "connected");
    serve(algebra, stream).await
}

/// Receive-compute-reply loop over an established stream.
pub async fn serve<A, S>(algebra: A, mut stream: S) -> Result<()>
where
    A: Algebra,
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    loop {
        let Some(request) = wire::read_request(&mut stream, &algebra).await? else {
            info!("coordinator closed the connection, exiting");
            return Ok(());
        };
        debug!(op = ?request.op, "processing request");
        let value = match request.op {
            WireOp::Sum => algebra.sum(&request.left, &request.right)?,
            WireOp::Prod => algebra.prod(&request.left, &request.right)?,
        };
        wire::write_value(&mut stream, &algebra, &value).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Request;
    use hedge_algebra::{Gf, GfAlgebra};

    #[tokio::test]
    async fn serves_a_sequence_of_requests() {
        let algebra = GfAlgebra::<2>;
        let (mut local, far) = tokio::io::duplex(1024);
        let server = tokio::spawn(serve(algebra, far));

        for (op, left, right, expected) in [
            (WireOp::Sum, 1, 1, 0),
            (WireOp::Sum, 0, 1, 1),
            (WireOp::Prod, 1, 1, 1),
            (WireOp::Prod, 1, 0, 0),
        ] {
            let request = Request {
                op,
                left: Gf::<2>::new(left),
                right: Gf::new(right),
            };
            wire::write_request(&mut local, &algebra, &request)
                .await
                .unwrap();
            let reply = wire::read_value(&mut local, &algebra).await.unwrap();
            assert_eq!(reply, Gf::new(expected));
        }

        drop(local);
        server.await.unwrap().unwrap();
    }
}
