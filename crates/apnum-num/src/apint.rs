//! Exact integers over the floating core.
//!
//! An [`ApInt`] is an [`ApFloat`] constrained to integral values at
//! [`INFINITE`] precision. Trailing zero words are absorbed into the
//! exponent by the shared normalization, so 10^9 in base 10^9 is the single
//! word [1] at exponent 1. Small-divisor helpers (`divmod_small`,
//! `mul_small`) support decimal parsing and the bit-walk in modular
//! exponentiation.

use crate::apfloat::{ApFloat, INFINITE};
use apnum_core::{ApError, NttWord, Result};
use std::cmp::Ordering;

/// Exact arbitrary-precision integer.
#[derive(Clone, Debug)]
pub struct ApInt<W: NttWord> {
    value: ApFloat<W>,
}

impl<W: NttWord> ApInt<W> {
    /// Zero in the default base.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            value: ApFloat::zero(),
        }
    }

    /// Small integer in the default base.
    #[must_use]
    pub fn from_i64(v: i64) -> Self {
        Self {
            value: ApFloat::from_i64(v),
        }
    }

    /// Small integer in an explicit base.
    #[must_use]
    pub fn from_i64_in_base(v: i64, base: u64) -> Self {
        Self {
            value: ApFloat::from_i64_in_base(v, base),
        }
    }

    /// Wrap an integral float; fails on fractional input.
    pub fn from_float(value: ApFloat<W>) -> Result<Self> {
        if !value.is_integer() {
            return Err(ApError::domain("integer", "value has a fractional part"));
        }
        Ok(Self {
            value: value.with_precision(INFINITE),
        })
    }

    /// The underlying float view (infinite precision).
    #[must_use]
    pub const fn as_float(&self) -> &ApFloat<W> {
        &self.value
    }

    /// View at a working precision (for Newton seeds and approximations).
    #[must_use]
    pub fn to_float(&self, precision: u64) -> ApFloat<W> {
        self.value.with_precision(precision)
    }

    /// Sign ∈ {−1, 0, +1}.
    #[must_use]
    pub const fn signum(&self) -> i8 {
        self.value.signum()
    }

    /// Whether the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Base-B exponent of the most significant word.
    #[must_use]
    pub const fn scale(&self) -> i64 {
        self.value.scale()
    }

    /// The per-word base.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.value.base()
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self {
            value: self.value.abs(),
        }
    }

    /// Negation.
    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            value: self.value.negate(),
        }
    }

    /// Sum.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self {
            value: self.value.add(&other.value),
        }
    }

    /// Difference.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        Self {
            value: self.value.subtract(&other.value),
        }
    }

    /// Product (exact, via the convolution engine).
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        Ok(Self {
            value: self.value.multiply(&other.value)?,
        })
    }

    /// Square (exact).
    pub fn square(&self) -> Result<Self> {
        Ok(Self {
            value: self.value.square()?,
        })
    }

    /// Signed comparison.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        self.value.compare(&other.value)
    }

    /// Comparison of absolute values.
    #[must_use]
    pub fn compare_abs(&self, other: &Self) -> Ordering {
        self.value.compare_abs(&other.value)
    }

    /// Little-endian words including the trailing zeros implied by the
    /// exponent (the full integer magnitude).
    #[must_use]
    pub fn magnitude_words(&self) -> Vec<u64> {
        if self.is_zero() {
            return Vec::new();
        }
        let stored = self.value.word_vec();
        let shift = usize::try_from(self.value.scale() + 1 - stored.len() as i64).unwrap_or(0);
        let mut words = vec![0u64; shift];
        words.extend_from_slice(&stored);
        words
    }

    /// Rebuild from full little-endian magnitude words.
    #[must_use]
    pub fn from_magnitude_words(sign: i8, words: Vec<u64>, base: u64) -> Self {
        let exponent = words.len() as i64 - 1;
        Self {
            value: ApFloat::from_word_vec(sign, exponent, words, INFINITE, base),
        }
    }

    /// Value as `u128` when it fits.
    #[must_use]
    pub fn to_u128(&self) -> Option<u128> {
        if self.signum() < 0 {
            return None;
        }
        let words = self.magnitude_words();
        let mut acc: u128 = 0;
        for &w in words.iter().rev() {
            acc = acc.checked_mul(u128::from(self.base()))?;
            acc = acc.checked_add(u128::from(w))?;
        }
        Some(acc)
    }

    /// Value as `i64` when it fits.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        let mag = self.to_u128().or_else(|| self.abs().to_u128())?;
        if self.signum() < 0 {
            (mag <= i64::MIN.unsigned_abs().into()).then(|| (mag as u64).wrapping_neg() as i64)
        } else {
            i64::try_from(mag).ok()
        }
    }

    /// Multiply by a small word (m < base).
    #[must_use]
    pub fn mul_small(&self, m: u64) -> Self {
        if self.is_zero() || m == 0 {
            return Self::zero_in_base(self.base());
        }
        let base = self.base();
        let mut words = self.magnitude_words();
        let mut carry: u128 = 0;
        for w in &mut words {
            let cur = u128::from(*w) * u128::from(m) + carry;
            *w = (cur % u128::from(base)) as u64;
            carry = cur / u128::from(base);
        }
        while carry > 0 {
            words.push((carry % u128::from(base)) as u64);
            carry /= u128::from(base);
        }
        Self::from_magnitude_words(self.signum(), words, base)
    }

    /// Add a small word to the magnitude (sign untouched).
    #[must_use]
    pub fn add_small(&self, m: u64) -> Self {
        let base = self.base();
        let mut words = self.magnitude_words();
        let mut carry = u128::from(m);
        let mut i = 0usize;
        while carry > 0 {
            if i == words.len() {
                words.push(0);
            }
            let s = u128::from(words[i]) + carry;
            words[i] = (s % u128::from(base)) as u64;
            carry = s / u128::from(base);
            i += 1;
        }
        let sign = if self.is_zero() { 1 } else { self.signum() };
        Self::from_magnitude_words(sign, words, base)
    }

    /// Quotient and remainder by a small divisor, magnitudes only.
    pub fn divmod_small(&self, d: u64) -> Result<(Self, u64)> {
        if d == 0 {
            return Err(ApError::domain("divide", "division by zero"));
        }
        if self.is_zero() {
            return Ok((Self::zero_in_base(self.base()), 0));
        }
        let base = self.base();
        let mut words = self.magnitude_words();
        let mut rem: u128 = 0;
        for w in words.iter_mut().rev() {
            let cur = rem * u128::from(base) + u128::from(*w);
            *w = (cur / u128::from(d)) as u64;
            rem = cur % u128::from(d);
        }
        Ok((
            Self::from_magnitude_words(self.signum(), words, base),
            rem as u64,
        ))
    }

    /// Whether the integer is even. Decimal-power bases are even, so any
    /// value with absorbed trailing zero words is even.
    #[must_use]
    pub fn is_even(&self) -> bool {
        if self.is_zero() {
            return true;
        }
        let stored = self.value.word_vec();
        let shifted = self.value.scale() + 1 > stored.len() as i64;
        if shifted {
            self.base() % 2 == 0
        } else {
            stored[0] % 2 == 0
        }
    }

    fn zero_in_base(base: u64) -> Self {
        Self {
            value: ApFloat::zero_in_base(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type I = ApInt<u32>;

    #[test]
    fn magnitude_words_include_absorbed_zeros() {
        // 10^9 normalizes to [1] at exponent 1; the magnitude restores [0, 1].
        let x = I::from_i64(1_000_000_000);
        assert_eq!(x.magnitude_words(), vec![0, 1]);
        assert_eq!(x.to_u128(), Some(1_000_000_000));
    }

    #[test]
    fn small_divmod_round_trips() {
        let x = I::from_i64(123_456_789_012_345);
        let (q, r) = x.divmod_small(997).unwrap();
        assert_eq!(q.to_u128(), Some(123_456_789_012_345 / 997));
        assert_eq!(u128::from(r), 123_456_789_012_345 % 997);
        assert_eq!(
            q.mul_small(997).add_small(r).compare(&x),
            Ordering::Equal
        );
    }

    #[test]
    fn parity_accounts_for_the_exponent() {
        assert!(I::from_i64(1_000_000_000).is_even());
        assert!(!I::from_i64(7).is_even());
        assert!(I::from_i64(0).is_even());
        assert!(!I::from_i64(1_000_000_001).is_even());
    }

    #[test]
    fn i64_round_trip_covers_the_extremes() {
        for v in [0i64, 1, -1, i64::MAX, i64::MIN, 42] {
            assert_eq!(I::from_i64(v).to_i64(), Some(v), "{v}");
        }
    }

    #[test]
    fn fractional_floats_are_rejected() {
        let half = ApFloat::<u32>::from_word_vec(1, -1, vec![500_000_000], 10, 1_000_000_000);
        assert!(ApInt::from_float(half).is_err());
    }
}
