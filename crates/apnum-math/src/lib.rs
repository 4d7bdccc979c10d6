//! High-precision functions over the apnum numeric types.
//!
//! - [`int`]: integer pow, root-with-remainder, division-with-remainder,
//!   gcd/lcm, and modular exponentiation with a precomputed reciprocal.
//! - [`real`]: Newton inverse roots and division, AGM, logarithm and
//!   exponential for real values.
//! - [`complexmath`]: the same machinery over complex values, plus the
//!   trigonometric and hyperbolic families by exp/log identities.
//! - [`consts`]: cached π (Brent–Salamin) and ln(B).
//!
//! All functions return the error taxonomy of `apnum-core`; none panic on
//! numeric conditions. Results are rounded to the working precision of the
//! operands, and exact (infinite-precision) operands are rejected by the
//! transcendental functions.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

pub mod complexmath;
pub mod consts;
pub mod int;
pub mod real;

pub use real::EXTRA_PRECISION;
