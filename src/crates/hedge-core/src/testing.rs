//! Shared fixtures for the crate's unit tests.

use crate::algebra::Algebra;
use crate::error::Result;

/// Plain machine-integer algebra for exercising the engine without pulling
/// in the real algebra crate.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TestAlgebra;

impl Algebra for TestAlgebra {
    type Value = i64;

    fn sum(&self, left: &i64, right: &i64) -> Result<i64> {
        Ok(left.wrapping_add(*right))
    }

    fn prod(&self, left: &i64, right: &i64) -> Result<i64> {
        Ok(left.wrapping_mul(*right))
    }

    fn encode(&self, value: &i64) -> Result<Vec<u8>> {
        Ok(value.to_le_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<i64> {
        let bytes: [u8; 8] = bytes.try_into().map_err(|_| {
            crate::error::EngineError::Protocol("expected an 8-byte integer".into())
        })?;
        Ok(i64::from_le_bytes(bytes))
    }
}
