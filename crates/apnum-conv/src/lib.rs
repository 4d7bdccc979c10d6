//! Transform-domain convolution for apnum: three parallel NTTs over the
//! element type's prime triple, pointwise multiplication, inverse NTTs, and
//! Chinese-remainder recombination into radix-B digits.
//!
//! This is the hot path for every large multiplication, and therefore for
//! every higher-level function built on top of multiplication.

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

pub mod carry_crt;
pub mod convolution;

pub use carry_crt::CarryCrt;
pub use convolution::ConvolutionEngine;
