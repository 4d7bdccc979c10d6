//! Number-theoretic transform strategies over the apnum prime triples.
//!
//! - [`modmath`]: arithmetic modulo one NTT prime, roots of unity, twiddle
//!   tables.
//! - [`table`]: in-cache DIT radix-2 FNT.
//! - [`six_step`]: Bailey's matrix decomposition for in-memory transforms.
//! - [`two_pass`]: disk-backed two-pass decomposition.
//! - [`factor3`]: 3-point WFTA decorator and the fused six-step variant.
//! - [`builder`]: `round23up` and threshold-based strategy selection.
//!
//! Strategies form a tagged variant, [`NttStrategy`], rather than a class
//! hierarchy; the factor-3 decorator composes over a boxed inner variant.
//! Instances are single-use per transform and require external
//! synchronization — the convolution layer owns that contract.

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

pub mod builder;
pub mod factor3;
pub mod modmath;
pub mod six_step;
pub mod table;
pub mod two_pass;

pub use builder::{round23up, NttBuilder};
pub use factor3::{Factor3Ntt, Factor3SixStepFnt};
pub use modmath::ModMath;
pub use six_step::SixStepFnt;
pub use table::TableFnt;
pub use two_pass::TwoPassFnt;

use apnum_core::{DataStorage, NttWord, Result};

/// A forward/inverse transform strategy of a fixed length.
#[derive(Debug)]
pub enum NttStrategy {
    /// In-cache table FNT.
    Table(TableFnt),
    /// In-memory six-step FNT.
    SixStep(SixStepFnt),
    /// Disk-backed two-pass FNT.
    TwoPass(TwoPassFnt),
    /// Factor-3 WFTA around any inner strategy.
    Factor3(Factor3Ntt),
    /// Fused factor-3 + six-step.
    Factor3SixStep(Factor3SixStepFnt),
}

impl NttStrategy {
    /// Transform length this strategy was built for.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Table(s) => s.len(),
            Self::SixStep(s) => s.len(),
            Self::TwoPass(s) => s.len(),
            Self::Factor3(s) => s.len(),
            Self::Factor3SixStep(s) => s.len(),
        }
    }

    /// Short display name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::SixStep(_) => "six-step",
            Self::TwoPass(_) => "two-pass",
            Self::Factor3(_) => "factor3",
            Self::Factor3SixStep(_) => "factor3-six-step",
        }
    }

    /// Forward transform of the whole storage under the `modulus`-th prime.
    pub fn transform<W: NttWord>(&self, storage: &mut DataStorage<W>, modulus: usize) -> Result<()> {
        debug_assert_eq!(storage.len(), self.len());
        self.transform_range(storage, 0, modulus)
    }

    /// Inverse transform; the storage already holds unnormalized output and
    /// the 1/`total_len` factor is applied as the final step.
    pub fn inverse_transform<W: NttWord>(
        &self,
        storage: &mut DataStorage<W>,
        modulus: usize,
        total_len: u64,
    ) -> Result<()> {
        debug_assert_eq!(storage.len(), self.len());
        self.inverse_transform_range(storage, 0, modulus, total_len)
    }

    pub(crate) fn transform_range<W: NttWord>(
        &self,
        storage: &mut DataStorage<W>,
        offset: usize,
        modulus: usize,
    ) -> Result<()> {
        match self {
            Self::Table(s) => s.transform_range(storage, offset, modulus),
            Self::SixStep(s) => s.transform_range(storage, offset, modulus),
            Self::TwoPass(s) => s.transform_range(storage, offset, modulus),
            Self::Factor3(s) => s.transform_range(storage, offset, modulus),
            Self::Factor3SixStep(s) => s.transform_range(storage, offset, modulus),
        }
    }

    pub(crate) fn inverse_transform_range<W: NttWord>(
        &self,
        storage: &mut DataStorage<W>,
        offset: usize,
        modulus: usize,
        total_len: u64,
    ) -> Result<()> {
        match self {
            Self::Table(s) => s.inverse_transform_range(storage, offset, modulus, total_len),
            Self::SixStep(s) => s.inverse_transform_range(storage, offset, modulus, total_len),
            Self::TwoPass(s) => s.inverse_transform_range(storage, offset, modulus, total_len),
            Self::Factor3(s) => s.inverse_transform_range(storage, offset, modulus, total_len),
            Self::Factor3SixStep(s) => {
                s.inverse_transform_range(storage, offset, modulus, total_len)
            }
        }
    }
}
