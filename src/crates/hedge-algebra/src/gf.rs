//! Arithmetic modulo `N`.

use std::ops::{Add, BitXor, Mul, Not};

use serde::{Deserialize, Serialize};

use hedge_core::{Algebra, BinaryAlgebra, Result};

/// An integer modulo `N`, always stored reduced.
///
/// `Gf<2>` is the workhorse: its sum is XOR and its product is AND, which is
/// what the compare-and-swap construction and the bit-vector sugar build on.
/// `N` must be non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gf<const N: u64>(u64);

/// GF(2), the two-element field.
pub type Gf2 = Gf<2>;

impl<const N: u64> Gf<N> {
    /// Wraps `value` into the ring, reducing modulo `N`.
    pub fn new(value: u64) -> Self {
        Self(value % N)
    }

    /// The reduced representative in `0..N`.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl<const N: u64> Add for Gf<N> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.0.wrapping_add(rhs.0))
    }
}

impl<const N: u64> Mul for Gf<N> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(self.0.wrapping_mul(rhs.0))
    }
}

impl<const N: u64> From<u64> for Gf<N> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

// The boolean reading of the arithmetic. Only meaningful over GF(2), where
// sum is XOR and product is AND.
impl Gf<2> {
    /// Logical AND.
    pub fn and(self, rhs: Self) -> Self {
        self * rhs
    }

    /// Logical OR, via De Morgan.
    pub fn or(self, rhs: Self) -> Self {
        !(!self).and(!rhs)
    }
}

impl Not for Gf<2> {
    type Output = Self;

    fn not(self) -> Self {
        self + Gf::new(1)
    }
}

impl BitXor for Gf<2> {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        self + rhs
    }
}

/// [`Algebra`] over [`Gf<N>`] values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GfAlgebra<const N: u64>;

impl<const N: u64> Algebra for GfAlgebra<N> {
    type Value = Gf<N>;

    fn sum(&self, left: &Gf<N>, right: &Gf<N>) -> Result<Gf<N>> {
        Ok(*left + *right)
    }

    fn prod(&self, left: &Gf<N>, right: &Gf<N>) -> Result<Gf<N>> {
        Ok(*left * *right)
    }

    fn encode(&self, value: &Gf<N>) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Gf<N>> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl BinaryAlgebra for GfAlgebra<2> {
    fn zero(&self) -> Gf<2> {
        Gf::new(0)
    }

    fn one(&self) -> Gf<2> {
        Gf::new(1)
    }
}
