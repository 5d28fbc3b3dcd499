//! The algebra contract the engine evaluates over.
//!
//! The engine never interprets what `sum` and `prod` mean — it only requires
//! that operands are resolved before a vertex is dispatched. The same DAG
//! machinery therefore drives machine integers, modular arithmetic and
//! ciphertext-level arithmetic under a leveled homomorphic-encryption scheme;
//! the latter is the workload the offload architecture is designed for.

use std::fmt::Debug;

use crate::error::Result;

/// A value type the engine can evaluate over.
///
/// Implementations are instances rather than bare types so an algebra can
/// carry context: a homomorphic-encryption algebra keeps its evaluation keys
/// next to the operations, a plain integer algebra is a unit struct.
///
/// `sum` and `prod` must be pure and deterministic modulo the algebra's own
/// semantics. Both are fallible: a reported failure becomes a task failure,
/// the task is retried elsewhere and the worker that hit it retires.
///
/// `encode`/`decode` are the byte-level codec used by the network transport.
/// An encoded value must round-trip through `decode` on any peer constructed
/// with an equivalent algebra instance.
pub trait Algebra: Clone + Send + Sync + 'static {
    /// The value the DAG computes over.
    type Value: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Binary sum of two values.
    fn sum(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value>;

    /// Binary product of two values.
    fn prod(&self, left: &Self::Value, right: &Self::Value) -> Result<Self::Value>;

    /// Serialize a single value for the wire.
    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>>;

    /// Deserialize a single value from the wire.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Value>;
}

/// An algebra with distinguished zero and one elements.
///
/// The bound for the GF(2)-flavored client sugar: the compare-and-swap
/// construction and multi-bit composites both need a constant `1` (logical
/// NOT over GF(2) is `x + 1`).
pub trait BinaryAlgebra: Algebra {
    /// The additive identity.
    fn zero(&self) -> Self::Value;

    /// The multiplicative identity.
    fn one(&self) -> Self::Value;
}
