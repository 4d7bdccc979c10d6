//! Chinese-remainder recombination and radix-B carry propagation.
//!
//! After the three per-modulus convolutions, every position i holds a
//! residue triple (r₀, r₁, r₂). Garner's mixed-radix reconstruction lifts
//! the triple to the unique v < p₀p₁p₂ with v ≡ rₖ (mod pₖ); v is then fed
//! into a three-limb accumulator together with the carry chained from the
//! previous position, and base-B digits are peeled off least-significant
//! first. The high carry left after the last position produces the leading
//! digits of the result.
//!
//! Exactness: provided the transform length covered the true product and
//! p₀p₁p₂ > N·(B−1)², the emitted digit stream is the exact integer product.

use apnum_core::{ApError, DataStorage, NttWord, Result};
use apnum_ntt::ModMath;
use std::marker::PhantomData;

/// Carry-CRT step bound to one element type and base.
#[derive(Clone, Debug)]
pub struct CarryCrt<W: NttWord> {
    base: u64,
    // Garner coefficients: p0^{-1} (mod p1) and (p0·p1)^{-1} (mod p2).
    inv_p0_mod_p1: u64,
    inv_p01_mod_p2: u64,
    p01: u128,
    _marker: PhantomData<W>,
}

impl<W: NttWord> CarryCrt<W> {
    /// Precompute the Garner coefficients for base `base`.
    #[must_use]
    pub fn new(base: u64) -> Self {
        let [p0, p1, p2] = W::MODULI;
        let mm1 = ModMath::new(p1);
        let mm2 = ModMath::new(p2);
        let p01 = u128::from(p0) * u128::from(p1);
        Self {
            base,
            inv_p0_mod_p1: mm1.mod_inverse(p0 % p1),
            inv_p01_mod_p2: mm2.mod_inverse((p01 % u128::from(p2)) as u64),
            p01,
            _marker: PhantomData,
        }
    }

    /// Reconstruct v < p₀p₁p₂ from one residue triple.
    fn reconstruct(&self, r0: u64, r1: u64, r2: u64) -> [u64; 3] {
        let [p0, _p1, p2] = W::MODULI;
        let mm1 = ModMath::new(W::MODULI[1]);
        let mm2 = ModMath::new(p2);

        let c1 = mm1.mod_multiply(mm1.mod_subtract(r1 % mm1.modulus(), r0 % mm1.modulus()), self.inv_p0_mod_p1);
        // base2 = (r0 + p0·c1) mod p2, without dividing the 128-bit sum.
        let base2 = ((u128::from(r0) + u128::from(p0) * u128::from(c1)) % u128::from(p2)) as u64;
        let c2 = mm2.mod_multiply(mm2.mod_subtract(r2, base2), self.inv_p01_mod_p2);

        // v = r0 + p0·c1 + p0·p1·c2 as three little-endian limbs.
        let low = u128::from(r0) + u128::from(p0) * u128::from(c1);
        let mut v = [low as u64, (low >> 64) as u64, 0u64];
        let m0 = (self.p01 as u64 as u128) * u128::from(c2);
        let m1 = ((self.p01 >> 64) as u128) * u128::from(c2);
        v = add3(v, [m0 as u64, (m0 >> 64) as u64, 0]);
        v = add3(v, [0, m1 as u64, (m1 >> 64) as u64]);
        v
    }

    /// Lift three residue sequences into `result_size` base-B digits of the
    /// target storage, propagating the carry from least to most significant.
    pub fn carry_crt(
        &self,
        residues: [&DataStorage<W>; 3],
        result: &mut DataStorage<W>,
        result_size: usize,
    ) -> Result<()> {
        let n = residues[0].len();
        debug_assert!(residues.iter().all(|r| r.len() == n));

        let mut r0 = residues[0].reader(0..n)?;
        let mut r1 = residues[1].reader(0..n)?;
        let mut r2 = residues[2].reader(0..n)?;
        let mut out = result.writer(0..result_size)?;

        let mut carry = [0u64; 3];
        let mut emitted = 0usize;
        for _ in 0..n {
            let v = self.reconstruct(
                r0.next_word()?.to_u64(),
                r1.next_word()?.to_u64(),
                r2.next_word()?.to_u64(),
            );
            let sum = add3(v, carry);
            let (digit, rest) = divrem3(sum, self.base);
            carry = rest;
            if emitted < result_size {
                out.write_word(W::from_u64(digit))?;
                emitted += 1;
            } else if digit != 0 {
                return Err(ApError::resource(
                    "carry-CRT result does not fit the requested size",
                ));
            }
        }
        // Flush the final high carries.
        while carry != [0, 0, 0] && emitted < result_size {
            let (digit, rest) = divrem3(carry, self.base);
            carry = rest;
            out.write_word(W::from_u64(digit))?;
            emitted += 1;
        }
        if carry != [0, 0, 0] {
            return Err(ApError::resource(
                "carry-CRT result does not fit the requested size",
            ));
        }
        // Zero-pad up to the requested size.
        while emitted < result_size {
            out.write_word(W::from_u64(0))?;
            emitted += 1;
        }
        out.finish()
    }
}

/// Little-endian three-limb addition; the callers keep sums below 2^192.
#[inline]
fn add3(a: [u64; 3], b: [u64; 3]) -> [u64; 3] {
    let s0 = u128::from(a[0]) + u128::from(b[0]);
    let s1 = u128::from(a[1]) + u128::from(b[1]) + (s0 >> 64);
    let s2 = u128::from(a[2]) + u128::from(b[2]) + (s1 >> 64);
    [s0 as u64, s1 as u64, s2 as u64]
}

/// (a mod d, a / d) for a three-limb value and a word divisor.
#[inline]
fn divrem3(a: [u64; 3], d: u64) -> (u64, [u64; 3]) {
    let mut rem = 0u64;
    let mut q = [0u64; 3];
    for i in (0..3).rev() {
        let cur = (u128::from(rem) << 64) | u128::from(a[i]);
        q[i] = (cur / u128::from(d)) as u64;
        rem = (cur % u128::from(d)) as u64;
    }
    (rem, q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apnum_core::Word;

    #[test]
    fn reconstruct_matches_small_values() {
        let crt = CarryCrt::<u32>::new(1_000_000_000);
        for v in [0u64, 1, 12_345, 999_999_999_999] {
            let [p0, p1, p2] = <u32 as NttWord>::MODULI;
            let got = crt.reconstruct(v % p0, v % p1, v % p2);
            assert_eq!(got, [v, 0, 0]);
        }
    }

    #[test]
    fn reconstruct_matches_a_wide_value() {
        // v = 2^100 + 12345: residues computed with 128-bit arithmetic.
        let v = (1u128 << 100) + 12_345;
        let crt = CarryCrt::<u32>::new(1_000_000_000);
        let [p0, p1, p2] = <u32 as NttWord>::MODULI;
        let got = crt.reconstruct(
            (v % u128::from(p0)) as u64,
            (v % u128::from(p1)) as u64,
            (v % u128::from(p2)) as u64,
        );
        assert_eq!(got, [v as u64, (v >> 64) as u64, 0]);
    }

    #[test]
    fn divrem3_agrees_with_u128_division() {
        let a = [0x1234_5678_9ABC_DEF0u64, 0x0FED_CBA9_8765_4321u64, 0];
        let wide = u128::from(a[0]) | (u128::from(a[1]) << 64);
        let (rem, q) = divrem3(a, 1_000_000_000);
        assert_eq!(u128::from(rem), wide % 1_000_000_000);
        assert_eq!(u128::from(q[0]) | (u128::from(q[1]) << 64), wide / 1_000_000_000);
    }

    #[test]
    fn carries_chain_across_positions() {
        // Residues all equal to base-1 squared at one position: the digit
        // stream must carry into the next word.
        let base = 10_000u64;
        let crt = CarryCrt::<u16>::new(base);
        let v = (base - 1) * (base - 1);
        let [p0, p1, p2] = <u16 as NttWord>::MODULI;
        let words = |r: u64| DataStorage::from_words(vec![u16::from_u64(r), 0]);
        let r0 = words(v % p0);
        let r1 = words(v % p1);
        let r2 = words(v % p2);
        let mut out = DataStorage::cached(2);
        crt.carry_crt([&r0, &r1, &r2], &mut out, 2).unwrap();
        let s = out.as_slice().unwrap();
        assert_eq!(u64::from(s[0]), v % base);
        assert_eq!(u64::from(s[1]), v / base);
    }
}
