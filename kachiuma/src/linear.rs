//! Support for linear algebra.

pub mod matrix;
pub mod regression;
