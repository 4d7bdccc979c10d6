//! Arbitrary-precision numeric types for apnum.
//!
//! - [`apfloat`]: the digit-sequence floating-point number (sign, word
//!   exponent, precision, little-endian mantissa).
//! - [`apint`]: exact integers over the floating core.
//! - [`complex`]: real/imaginary pairs sharing one base.
//! - [`format`]: decimal parsing and `Display` for power-of-ten bases.
//!
//! Multiplication routes through `apnum-conv`; division, roots and the
//! transcendental functions live one crate up in `apnum-math`.

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

pub mod apfloat;
pub mod apint;
pub mod complex;
pub mod format;

pub use apfloat::{ApFloat, INFINITE};
pub use apint::ApInt;
pub use complex::ApComplex;
pub use format::{parse_float, parse_int};
