//! Strategy selection from transform length, cache size and memory budget.
//!
//! The builder rounds the requested length up with [`round23up`], extracts
//! the power-of-two part, and picks the cheapest access pattern that fits:
//!
//! | condition                              | inner strategy |
//! |----------------------------------------|----------------|
//! | fits half the L1 cache                 | table FNT      |
//! | fits the memory budget and a `u32`     | six-step FNT   |
//! | otherwise                              | two-pass FNT   |
//!
//! A factor of three wraps the inner strategy in the WFTA decorator, fused
//! with six-step when the full length still fits in memory.

use crate::factor3::{Factor3Ntt, Factor3SixStepFnt};
use crate::six_step::SixStepFnt;
use crate::table::TableFnt;
use crate::two_pass::TwoPassFnt;
use crate::NttStrategy;
use apnum_core::{ApError, Context, NttWord, Result};
use std::marker::PhantomData;

/// Round `n` up to the next 2^k or 3·2^k.
#[must_use]
pub fn round23up(n: u64) -> u64 {
    if n <= 2 {
        return n.max(1);
    }
    let p2 = n.next_power_of_two();
    let f3 = p2 / 4 * 3;
    if n <= f3 {
        f3
    } else {
        p2
    }
}

/// Builds transform strategies for one element type against a context.
#[derive(Clone, Debug)]
pub struct NttBuilder<W: NttWord> {
    ctx: Context,
    _marker: PhantomData<W>,
}

impl<W: NttWord> NttBuilder<W> {
    /// Builder bound to a context snapshot.
    #[must_use]
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            _marker: PhantomData,
        }
    }

    /// Smallest supported transform length ≥ `n`.
    #[must_use]
    pub fn transform_length(n: u64) -> u64 {
        round23up(n)
    }

    /// Upper bound on transform lengths for this element type.
    #[must_use]
    pub fn max_transform_length() -> u64 {
        W::MAX_TRANSFORM_LENGTH
    }

    /// Select a strategy for the smallest supported length ≥ `min_len`.
    pub fn build(&self, min_len: u64) -> Result<NttStrategy> {
        let n = round23up(min_len);
        if n > W::MAX_TRANSFORM_LENGTH {
            return Err(ApError::resource(format!(
                "transform length {n} exceeds the element-type maximum {}",
                W::MAX_TRANSFORM_LENGTH
            )));
        }
        let pow2 = (n & n.wrapping_neg()) as usize;
        let has_factor3 = pow2 as u64 != n;
        let parallel = self.ctx.num_processors > 1;

        let word_bytes = |words: usize| words * W::BYTES;
        let inner = if word_bytes(pow2) <= self.ctx.cache_l1_size / 2 {
            NttStrategy::Table(TableFnt::new(pow2))
        } else if word_bytes(pow2) <= self.ctx.max_memory_block_size
            && u32::try_from(pow2).is_ok()
        {
            NttStrategy::SixStep(SixStepFnt::new(pow2, parallel))
        } else {
            NttStrategy::TwoPass(TwoPassFnt::new(pow2))
        };

        let strategy = if has_factor3 {
            let fits_memory = word_bytes(n as usize) <= self.ctx.max_memory_block_size;
            if fits_memory && matches!(inner, NttStrategy::SixStep(_)) {
                NttStrategy::Factor3SixStep(Factor3SixStepFnt::new(n as usize, parallel))
            } else {
                NttStrategy::Factor3(Factor3Ntt::new(n as usize, inner))
            }
        } else {
            inner
        };
        tracing::debug!(min_len, n, kind = strategy.kind(), "selected NTT strategy");
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round23up_prefers_the_nearest_supported_length() {
        let cases = [
            (1, 1),
            (2, 2),
            (3, 3),
            (4, 4),
            (5, 6),
            (6, 6),
            (7, 8),
            (9, 12),
            (13, 16),
            (17, 24),
            (25, 32),
            (97, 128),
            (96, 96),
        ];
        for (n, expect) in cases {
            assert_eq!(round23up(n), expect, "round23up({n})");
        }
    }

    #[test]
    fn selection_follows_cache_and_memory_thresholds() {
        let ctx = Context {
            cache_l1_size: 1024,           // table up to 128 u32 words
            max_memory_block_size: 65_536, // six-step up to 16384 u32 words
            num_processors: 4,
            shared_memory_threshold: 1 << 20,
        };
        let b = NttBuilder::<u32>::new(ctx);
        assert_eq!(b.build(64).unwrap().kind(), "table");
        assert_eq!(b.build(1024).unwrap().kind(), "six-step");
        assert_eq!(b.build(1 << 20).unwrap().kind(), "two-pass");
    }

    #[test]
    fn factor3_wraps_or_fuses() {
        let ctx = Context {
            cache_l1_size: 1024,
            max_memory_block_size: 65_536,
            num_processors: 1,
            shared_memory_threshold: 1 << 20,
        };
        let b = NttBuilder::<u32>::new(ctx);
        // 3·2^10 words: inner 2^10 is six-step territory, total fits memory.
        assert_eq!(b.build(3 << 10).unwrap().kind(), "factor3-six-step");
        // 3·2^5 words: inner is a table transform, generic decorator.
        assert_eq!(b.build(96).unwrap().kind(), "factor3");
        // Too large for memory: generic decorator around two-pass.
        assert_eq!(b.build(3 << 14).unwrap().kind(), "factor3");
    }

    #[test]
    fn oversized_lengths_are_resource_errors() {
        let b = NttBuilder::<u16>::new(Context::default());
        assert!(b.build(<u16 as NttWord>::MAX_TRANSFORM_LENGTH + 1).is_err());
    }
}
