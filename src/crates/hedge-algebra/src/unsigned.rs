//! Multi-bit unsigned integers built from single-bit graph leaves.
//!
//! Pure client-side sugar: the engine only ever sees the individual bit
//! vertices. Bits are stored little-endian, each as a leaf carrying the
//! algebra's zero or one.

use std::sync::atomic::{AtomicU32, Ordering};

use hedge_core::{BinaryAlgebra, Graph, VertexRef};

static NEXT_UINT_LABEL: AtomicU32 = AtomicU32::new(0);

/// An unsigned integer decomposed into bit leaves of a graph.
pub struct UInt<A: BinaryAlgebra> {
    label: String,
    bits: Vec<VertexRef<A>>,
}

impl<A: BinaryAlgebra> UInt<A> {
    /// Decomposes `value` into `width` bit leaves with an auto-assigned
    /// label (`I{k}`, each bit suffixed `b{i}`).
    pub fn new(graph: &Graph<A>, width: usize, value: u64) -> Self {
        let label = format!("I{}", NEXT_UINT_LABEL.fetch_add(1, Ordering::Relaxed));
        Self::build(graph, width, value, label)
    }

    /// Like [`UInt::new`] with an explicit label.
    pub fn named(graph: &Graph<A>, width: usize, value: u64, label: impl Into<String>) -> Self {
        Self::build(graph, width, value, label.into())
    }

    fn build(graph: &Graph<A>, width: usize, mut value: u64, label: String) -> Self {
        let algebra = graph.algebra();
        let bits = (0..width)
            .map(|i| {
                let bit = if value % 2 == 1 {
                    algebra.one()
                } else {
                    algebra.zero()
                };
                value /= 2;
                graph.leaf_named(bit, format!("{label}b{i}"))
            })
            .collect();
        Self { label, bits }
    }

    /// The bit vertices, least significant first.
    pub fn bits(&self) -> &[VertexRef<A>] {
        &self.bits
    }

    /// Bit width.
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// The composite's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Reassembles the integer from the bit values.
    ///
    /// `None` while any bit is still unresolved. A bit counts as set when it
    /// equals the algebra's one.
    pub fn value(&self, algebra: &A) -> Option<u64> {
        let one = algebra.one();
        let mut out = 0u64;
        for bit in self.bits.iter().rev() {
            let value = bit.value()?;
            out = (out << 1) | u64::from(value == one);
        }
        Some(out)
    }
}
