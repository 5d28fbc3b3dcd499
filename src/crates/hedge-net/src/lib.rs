//! Network workers for the hedge evaluation engine.
//!
//! Remote offload works over a single bidirectional byte stream per
//! connection, one request in flight at a time — concurrency comes from many
//! connections, each driving one worker registered with the scheduler.
//!
//! - [`wire`] defines the framing: an op byte plus length-prefixed operand
//!   payloads, all fixed-size primitives pinned little-endian.
//! - [`NetCompute`] is the coordinator-side proxy: a
//!   [`hedge_core::Compute`] that ships each operation to its peer and
//!   blocks on the reply.
//! - [`Listener`] accepts inbound connections and registers one network
//!   worker per peer.
//! - [`remote`] is the other end: the receive-compute-reply loop run by the
//!   standalone `hedge-worker` process.

pub mod listener;
pub mod proxy;
pub mod remote;
pub mod wire;

pub use listener::Listener;
pub use proxy::NetCompute;
pub use wire::{Request, WireOp};
