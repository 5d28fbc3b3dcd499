//! Wire framing for offloaded operations.
//!
//! A request is one byte of operation kind (`0` = sum, `1` = prod) followed
//! by the two operands; a reply is a single value. Every value is
//! length-prefixed: an 8-byte little-endian byte count, then that many bytes
//! of the algebra's serialization. All fixed-size primitives are pinned
//! little-endian so heterogeneous peers agree on the framing.
//!
//! End-of-stream is meaningful only at a frame boundary: zero bytes where an
//! op byte or a reply's length prefix was expected is a clean departure
//! ([`EngineError::TransportEof`]); running dry inside a frame is a transport
//! fault like any other I/O error.

use hedge_core::{Algebra, EngineError, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single value frame. A length prefix beyond this is a
/// protocol violation, not an allocation.
pub const MAX_FRAME_LEN: u64 = 64 * 1024 * 1024;

/// Operation kind as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireOp {
    /// The algebra's `sum`; wire code `0`.
    Sum,
    /// The algebra's `prod`; wire code `1`.
    Prod,
}

impl WireOp {
    /// The single-byte wire encoding.
    pub fn code(self) -> u8 {
        match self {
            WireOp::Sum => 0,
            WireOp::Prod => 1,
        }
    }

    /// Parses a wire code.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(WireOp::Sum),
            1 => Ok(WireOp::Prod),
            other => Err(EngineError::Protocol(format!(
                "unknown operation code {other}"
            ))),
        }
    }
}

/// One offloaded operation: the kind and both operand values.
#[derive(Debug, Clone, PartialEq)]
pub struct Request<V> {
    /// Which operation to perform.
    pub op: WireOp,
    /// Left operand.
    pub left: V,
    /// Right operand.
    pub right: V,
}

/// Writes a request frame and flushes the stream.
pub async fn write_request<A, W>(
    stream: &mut W,
    algebra: &A,
    request: &Request<A::Value>,
) -> Result<()>
where
    A: Algebra,
    W: AsyncWrite + Unpin,
{
    stream.write_u8(request.op.code()).await?;
    write_value(stream, algebra, &request.left).await?;
    write_value(stream, algebra, &request.right).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads a request frame. `Ok(None)` means the peer closed the stream
/// cleanly before a new frame began.
pub async fn read_request<A, R>(stream: &mut R, algebra: &A) -> Result<Option<Request<A::Value>>>
where
    A: Algebra,
    R: AsyncRead + Unpin,
{
    let mut code = [0u8; 1];
    if !read_exact_or_eof(stream, &mut code).await? {
        return Ok(None);
    }
    let op = WireOp::from_code(code[0])?;
    let left = read_value(stream, algebra).await.map_err(eof_inside_request)?;
    let right = read_value(stream, algebra).await.map_err(eof_inside_request)?;
    Ok(Some(Request { op, left, right }))
}

/// Once the op byte is consumed, running dry anywhere in the request is a
/// transport fault, not a clean departure.
fn eof_inside_request(err: EngineError) -> EngineError {
    match err {
        EngineError::TransportEof => EngineError::Transport(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "stream ended inside a request",
        )),
        other => other,
    }
}

/// Writes one length-prefixed value.
pub async fn write_value<A, W>(stream: &mut W, algebra: &A, value: &A::Value) -> Result<()>
where
    A: Algebra,
    W: AsyncWrite + Unpin,
{
    let payload = algebra.encode(value)?;
    stream.write_u64_le(payload.len() as u64).await?;
    stream.write_all(&payload).await?;
    Ok(())
}

/// Reads one length-prefixed value. A stream that ends before the length
/// prefix maps to [`EngineError::TransportEof`].
pub async fn read_value<A, R>(stream: &mut R, algebra: &A) -> Result<A::Value>
where
    A: Algebra,
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 8];
    if !read_exact_or_eof(stream, &mut prefix).await? {
        return Err(EngineError::TransportEof);
    }
    let len = u64::from_le_bytes(prefix);
    if len > MAX_FRAME_LEN {
        return Err(EngineError::Protocol(format!(
            "value frame of {len} bytes exceeds the {MAX_FRAME_LEN} byte limit"
        )));
    }
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await?;
    algebra.decode(&payload)
}

/// Fills `buf` completely, returning `Ok(false)` when the stream ended
/// before the first byte. Ending mid-buffer is a transport error.
async fn read_exact_or_eof<R>(stream: &mut R, buf: &mut [u8]) -> Result<bool>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(EngineError::Transport(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream ended inside a frame",
            )));
        }
        filled += n;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hedge_algebra::Int64;

    #[tokio::test]
    async fn request_layout_is_pinned_little_endian() {
        let algebra = Int64;
        let mut frame = Vec::new();
        let request = Request {
            op: WireOp::Prod,
            left: 10i64,
            right: 20i64,
        };
        write_request(&mut frame, &algebra, &request).await.unwrap();

        // Op byte, then per operand: 8-byte LE length followed by the
        // payload (bincode fixint: 8 LE bytes for an i64).
        assert_eq!(frame.len(), 1 + 2 * (8 + 8));
        assert_eq!(frame[0], 1);
        assert_eq!(&frame[1..9], &8u64.to_le_bytes());
        assert_eq!(&frame[9..17], &10i64.to_le_bytes());
        assert_eq!(&frame[17..25], &8u64.to_le_bytes());
        assert_eq!(&frame[25..33], &20i64.to_le_bytes());
    }

    #[tokio::test]
    async fn request_round_trips() {
        let algebra = Int64;
        let request = Request {
            op: WireOp::Sum,
            left: -42i64,
            right: 1_000_000i64,
        };
        let mut frame = Vec::new();
        write_request(&mut frame, &algebra, &request).await.unwrap();
        let decoded = read_request(&mut frame.as_slice(), &algebra)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decoded, request);
    }

    #[tokio::test]
    async fn clean_eof_before_a_frame_is_none() {
        let algebra = Int64;
        let mut empty: &[u8] = &[];
        let decoded = read_request(&mut empty, &algebra).await.unwrap();
        assert!(decoded.is_none());
    }

    #[tokio::test]
    async fn eof_inside_a_frame_is_a_transport_error() {
        let algebra = Int64;
        let mut frame = Vec::new();
        let request = Request {
            op: WireOp::Sum,
            left: 1i64,
            right: 2i64,
        };
        write_request(&mut frame, &algebra, &request).await.unwrap();
        frame.truncate(12);
        match read_request(&mut frame.as_slice(), &algebra).await {
            Err(EngineError::Transport(_)) => {}
            other => panic!("expected Transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let algebra = Int64;
        let mut frame = Vec::new();
        frame.extend_from_slice(&(MAX_FRAME_LEN + 1).to_le_bytes());
        match read_value(&mut frame.as_slice(), &algebra).await {
            Err(EngineError::Protocol(_)) => {}
            other => panic!("expected Protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_op_code_is_rejected() {
        let algebra = Int64;
        let frame = [9u8];
        match read_request(&mut frame.as_slice(), &algebra).await {
            Err(EngineError::Protocol(_)) => {}
            other => panic!("expected Protocol error, got {other:?}"),
        }
    }

    mod properties {
        use super::*;
        use hedge_algebra::{Gf, GfAlgebra};
        use proptest::prelude::*;

        fn runtime() -> tokio::runtime::Runtime {
            tokio::runtime::Builder::new_current_thread()
                .build()
                .expect("tokio runtime")
        }

        async fn assert_round_trips<A: Algebra>(algebra: &A, request: Request<A::Value>) {
            let mut frame = Vec::new();
            write_request(&mut frame, algebra, &request).await.unwrap();
            let mut cursor = frame.as_slice();
            let decoded = read_request(&mut cursor, algebra).await.unwrap().unwrap();
            assert_eq!(decoded, request);
            // The frame was consumed exactly; the next read sees a clean EOF.
            assert!(read_request(&mut cursor, algebra).await.unwrap().is_none());
        }

        proptest! {
            #[test]
            fn any_integer_request_round_trips(
                is_sum in any::<bool>(),
                left in any::<i64>(),
                right in any::<i64>(),
            ) {
                let op = if is_sum { WireOp::Sum } else { WireOp::Prod };
                runtime().block_on(assert_round_trips(&Int64, Request { op, left, right }));
            }

            #[test]
            fn any_gf256_request_round_trips(
                is_sum in any::<bool>(),
                left in any::<u64>(),
                right in any::<u64>(),
            ) {
                let op = if is_sum { WireOp::Sum } else { WireOp::Prod };
                let request = Request {
                    op,
                    left: Gf::<256>::new(left),
                    right: Gf::new(right),
                };
                runtime().block_on(assert_round_trips(&GfAlgebra::<256>, request));
            }
        }
    }
}
