//! # hedge-core — distributed evaluation of arithmetic expression DAGs
//!
//! A client builds a directed acyclic graph whose leaves are constant values
//! and whose internal vertices are binary operations (sum, product), marks
//! some vertices as outputs and calls [`Evaluator::exec`]. The engine
//! schedules every unresolved vertex onto a dynamic pool of workers — in
//! process or reached over the network — and returns when every requested
//! vertex holds a value.
//!
//! The algebra is generic: the engine never interprets what sum and product
//! mean, only that operands must be resolved before a vertex becomes
//! executable. The same machinery therefore drives machine integers, modular
//! arithmetic over GF(2ⁿ) and ciphertext-level arithmetic under a leveled
//! homomorphic-encryption scheme — the workload slow enough per operation to
//! make the offload architecture pay for itself.
//!
//! ## Components
//!
//! - [`Graph`] owns the vertices of a single DAG and interns equivalent
//!   subexpressions.
//! - [`Evaluator`] walks requested vertices to their unresolved dependencies
//!   and drives the readiness loop.
//! - [`Scheduler`] brokers tasks between the evaluator and a dynamic set of
//!   workers.
//! - [`Worker`] pulls tasks and performs the arithmetic through a
//!   [`Compute`] implementation; the network-proxied variant lives in the
//!   `hedge-net` crate.
//!
//! Everything is driven by tokio: workers are spawned tasks, `exec` is an
//! async fn that suspends on a completion channel, and the queue hand-off
//! uses a notify primitive in place of a condition variable.

pub mod algebra;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod scheduler;
pub mod worker;

pub use algebra::{Algebra, BinaryAlgebra};
pub use error::{EngineError, Result};
pub use evaluator::Evaluator;
pub use graph::{Graph, OpKind, VertexRef, VertexState};
pub use scheduler::{Scheduler, Task, TaskOutcome, WorkerHandle, WorkerId};
pub use worker::{Compute, LocalCompute, Worker};

#[cfg(test)]
pub(crate) mod testing;
