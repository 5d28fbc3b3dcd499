//! Concrete algebras for the hedge evaluation engine.
//!
//! The engine itself only knows the [`hedge_core::Algebra`] contract; this
//! crate provides the stock instantiations:
//!
//! - [`Int64`] — plain machine integers, the simplest thing to test an
//!   engine with.
//! - [`Gf`] / [`GfAlgebra`] — arithmetic modulo `N`, with `Gf<2>` carrying
//!   the boolean-flavored helpers (XOR, AND, NOT).
//! - [`UInt`] — a multi-bit unsigned integer assembled from single-bit graph
//!   leaves; pure client-side sugar with no engine involvement.
//!
//! A homomorphic-encryption algebra is deliberately not here: it lives with
//! whatever FHE library provides the ciphertexts, implementing `Algebra`
//! with its keys as the instance context and its own ciphertext codec.

mod gf;
mod int;
mod unsigned;

pub use gf::{Gf, Gf2, GfAlgebra};
pub use int::Int64;
pub use unsigned::UInt;
