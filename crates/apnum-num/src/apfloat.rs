//! The digit-sequence number: sign, word-exponent, precision, and a
//! little-endian mantissa in a fixed per-word base B.
//!
//! Value = sign · Σᵢ digits[i] · B^(exponent − (len−1) + i). Invariants:
//!
//! - zero has sign 0, an empty mantissa and an undefined exponent (kept 0);
//! - the first (least significant) and last (most significant) stored words
//!   of a non-zero mantissa are non-zero;
//! - `precision ≥ 1` in words for non-zero values; [`INFINITE`] marks exact
//!   values.
//!
//! The mantissa lives behind an `Arc`, so cloning a number is cheap and all
//! arithmetic builds fresh storages. Multiplication routes through the
//! three-modulus convolution engine; addition, subtraction and comparison
//! walk the aligned word windows directly.

use apnum_conv::ConvolutionEngine;
use apnum_core::{ApError, Context, DataStorage, NttWord, Result};
use std::cmp::Ordering;
use std::sync::Arc;

/// Sentinel precision for exact values.
pub const INFINITE: u64 = u64::MAX;

/// Arbitrary-precision floating-point number over element type `W`.
#[derive(Clone, Debug)]
pub struct ApFloat<W: NttWord> {
    sign: i8,
    exponent: i64,
    precision: u64,
    base: u64,
    digits: Arc<DataStorage<W>>,
}

impl<W: NttWord> ApFloat<W> {
    /// Zero in the element type's default base.
    #[must_use]
    pub fn zero() -> Self {
        Self::zero_in_base(W::DEFAULT_BASE)
    }

    /// Zero in an explicit base.
    #[must_use]
    pub fn zero_in_base(base: u64) -> Self {
        Self {
            sign: 0,
            exponent: 0,
            precision: INFINITE,
            base,
            digits: Arc::new(DataStorage::cached(0)),
        }
    }

    /// Exact small integer in the default base.
    #[must_use]
    pub fn from_i64(v: i64) -> Self {
        Self::from_i64_in_base(v, W::DEFAULT_BASE)
    }

    /// Exact small integer in an explicit base.
    #[must_use]
    pub fn from_i64_in_base(v: i64, base: u64) -> Self {
        let sign = match v.cmp(&0) {
            Ordering::Less => -1,
            Ordering::Equal => return Self::zero_in_base(base),
            Ordering::Greater => 1,
        };
        let mut words = Vec::new();
        let mut m = v.unsigned_abs();
        while m > 0 {
            words.push(m % base);
            m /= base;
        }
        let exponent = (words.len() - 1) as i64;
        Self::from_word_vec(sign, exponent, words, INFINITE, base)
    }

    /// Assemble and normalize a number from little-endian words.
    ///
    /// `exponent` is the base-B exponent of `words[len-1]`. Leading and
    /// trailing zero words are stripped (adjusting the exponent), and the
    /// mantissa is truncated to `precision` words from the most significant
    /// end.
    #[must_use]
    pub fn from_word_vec(
        sign: i8,
        exponent: i64,
        words: Vec<u64>,
        precision: u64,
        base: u64,
    ) -> Self {
        debug_assert!(words.iter().all(|&w| w < base));
        let mut hi = words.len();
        while hi > 0 && words[hi - 1] == 0 {
            hi -= 1;
        }
        if hi == 0 || sign == 0 {
            return Self::zero_in_base(base);
        }
        let exponent = exponent - (words.len() - hi) as i64;
        let mut lo = 0usize;
        while words[lo] == 0 {
            lo += 1;
        }
        // Truncate to the requested precision from the top.
        if precision != INFINITE {
            let keep = usize::try_from(precision).unwrap_or(usize::MAX);
            if hi - lo > keep {
                lo = hi - keep;
                while words[lo] == 0 {
                    lo += 1;
                }
            }
        }
        let mantissa: Vec<W> = words[lo..hi].iter().map(|&w| W::from_u64(w)).collect();
        Self {
            sign,
            exponent,
            precision,
            base,
            digits: Arc::new(DataStorage::from_words(mantissa)),
        }
    }

    /// Sign ∈ {−1, 0, +1}.
    #[must_use]
    pub const fn signum(&self) -> i8 {
        self.sign
    }

    /// Base-B exponent of the most significant word (the scale).
    #[must_use]
    pub const fn scale(&self) -> i64 {
        self.exponent
    }

    /// Precision in words ([`INFINITE`] for exact values).
    #[must_use]
    pub const fn precision(&self) -> u64 {
        self.precision
    }

    /// The per-word base B.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Number of stored mantissa words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    /// Whether the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.sign == 0
    }

    /// Whether the value has no fractional part.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.is_zero() || self.low_position() >= 0
    }

    /// Base-B exponent of the least significant stored word.
    fn low_position(&self) -> i64 {
        self.exponent - (self.len() as i64 - 1)
    }

    /// Mantissa as little-endian `u64` words.
    pub fn word_vec(&self) -> Vec<u64> {
        match self.digits.as_slice() {
            Some(s) => s.iter().map(|&w| w.to_u64()).collect(),
            None => {
                let mut buf = vec![W::default(); self.digits.len()];
                // Disk mantissas only arise from oversized convolution
                // results; a read failure here would already have failed the
                // convolution that produced them.
                if self.digits.read_block(0, &mut buf).is_err() {
                    buf.clear();
                }
                buf.iter().map(|&w| w.to_u64()).collect()
            }
        }
    }

    /// The raw digit storage (for the convolution engine).
    #[must_use]
    pub fn digits(&self) -> &DataStorage<W> {
        &self.digits
    }

    /// Same value with sign flipped.
    #[must_use]
    pub fn negate(&self) -> Self {
        let mut out = self.clone();
        out.sign = -out.sign;
        out
    }

    /// Absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        let mut out = self.clone();
        out.sign = out.sign.abs();
        out
    }

    /// Magnitude of `self` with the sign of `other` (zero stays zero).
    #[must_use]
    pub fn copy_sign(&self, other: &Self) -> Self {
        let mut out = self.clone();
        if out.sign != 0 {
            out.sign = if other.sign < 0 { -out.sign.abs() } else { out.sign.abs() };
        }
        out
    }

    /// Multiply by B^k (exponent shift); exact and O(1).
    pub fn scaled(&self, k: i64) -> Result<Self> {
        if self.is_zero() {
            return Ok(self.clone());
        }
        let mut out = self.clone();
        out.exponent = self
            .exponent
            .checked_add(k)
            .ok_or(ApError::Overflow { op: "scale" })?;
        Ok(out)
    }

    /// Same value truncated to `precision` words.
    #[must_use]
    pub fn with_precision(&self, precision: u64) -> Self {
        if self.is_zero() {
            return self.clone();
        }
        if precision >= self.len() as u64 {
            let mut out = self.clone();
            out.precision = precision;
            return out;
        }
        Self::from_word_vec(self.sign, self.exponent, self.word_vec(), precision, self.base)
    }

    /// Integer part (truncation toward zero), as an exact value.
    #[must_use]
    pub fn truncated(&self) -> Self {
        if self.is_zero() || self.low_position() >= 0 {
            let mut out = self.clone();
            out.precision = INFINITE;
            return out;
        }
        if self.exponent < 0 {
            return Self::zero_in_base(self.base);
        }
        let drop = usize::try_from(-self.low_position()).unwrap_or(usize::MAX);
        let words = self.word_vec();
        if drop >= words.len() {
            return Self::zero_in_base(self.base);
        }
        Self::from_word_vec(
            self.sign,
            self.exponent,
            words[drop..].to_vec(),
            INFINITE,
            self.base,
        )
    }

    /// Fractional part: `self − truncated(self)`, exact.
    #[must_use]
    pub fn fractional(&self) -> Self {
        if self.is_zero() || self.low_position() >= 0 {
            return Self::zero_in_base(self.base);
        }
        let words = self.word_vec();
        let keep = usize::try_from(self.exponent + 1)
            .map_or(words.len(), |int_words| words.len().saturating_sub(int_words));
        if keep == 0 {
            return Self::zero_in_base(self.base);
        }
        Self::from_word_vec(
            self.sign,
            self.low_position() + keep as i64 - 1,
            words[..keep].to_vec(),
            INFINITE,
            self.base,
        )
    }

    /// Compare absolute values.
    #[must_use]
    pub fn compare_abs(&self, other: &Self) -> Ordering {
        debug_assert_eq!(self.base, other.base);
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        if self.exponent != other.exponent {
            return self.exponent.cmp(&other.exponent);
        }
        let a = self.word_vec();
        let b = other.word_vec();
        // Walk from the most significant word down; missing words are zero.
        let mut i = a.len();
        let mut j = b.len();
        while i > 0 || j > 0 {
            let da = if i > 0 { a[i - 1] } else { 0 };
            let db = if j > 0 { b[j - 1] } else { 0 };
            if da != db {
                return da.cmp(&db);
            }
            i = i.saturating_sub(1);
            j = j.saturating_sub(1);
        }
        Ordering::Equal
    }

    /// Signed comparison.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match self.sign.cmp(&other.sign) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match self.sign {
            1 => self.compare_abs(other),
            -1 => other.compare_abs(self),
            _ => Ordering::Equal,
        }
    }

    /// Sum at precision min(p(self), p(other)).
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        debug_assert_eq!(self.base, other.base);
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let prec = self.precision.min(other.precision);
        if self.sign == other.sign {
            let (words, hi) = add_abs(self, other, prec);
            Self::from_word_vec(self.sign, hi, words, prec, self.base)
        } else {
            match self.compare_abs(other) {
                Ordering::Equal => Self::zero_in_base(self.base),
                Ordering::Greater => {
                    let (words, hi) = sub_abs(self, other, prec);
                    Self::from_word_vec(self.sign, hi, words, prec, self.base)
                }
                Ordering::Less => {
                    let (words, hi) = sub_abs(other, self, prec);
                    Self::from_word_vec(other.sign, hi, words, prec, self.base)
                }
            }
        }
    }

    /// Difference at precision min(p(self), p(other)).
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        self.add(&other.negate())
    }

    /// Product via the three-modulus convolution engine, truncated to
    /// precision min(p(self), p(other)).
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        debug_assert_eq!(self.base, other.base);
        if self.is_zero() || other.is_zero() {
            return Ok(Self::zero_in_base(self.base));
        }
        let engine = ConvolutionEngine::<W>::with_base(Context::global(), self.base);
        let size = self.len() + other.len();
        tracing::trace!(size, "mantissa multiply");
        let product = engine.convolute(self.digits(), other.digits(), size)?;

        let prec = self.precision.min(other.precision);
        let words = storage_words(&product)?;
        // The mantissa product spans positions lo(self)+lo(other) upward.
        let hi = self
            .low_position()
            .checked_add(other.low_position())
            .and_then(|lo| lo.checked_add(size as i64 - 1))
            .ok_or(ApError::Overflow { op: "multiply" })?;
        Ok(Self::from_word_vec(
            self.sign * other.sign,
            hi,
            words,
            prec,
            self.base,
        ))
    }

    /// Square via the single-transform squaring path.
    pub fn square(&self) -> Result<Self> {
        if self.is_zero() {
            return Ok(self.clone());
        }
        let engine = ConvolutionEngine::<W>::with_base(Context::global(), self.base);
        let size = 2 * self.len();
        let product = engine.auto_convolute(self.digits(), size)?;
        let words = storage_words(&product)?;
        let hi = self
            .low_position()
            .checked_mul(2)
            .and_then(|lo| lo.checked_add(size as i64 - 1))
            .ok_or(ApError::Overflow { op: "square" })?;
        Ok(Self::from_word_vec(
            1,
            hi,
            words,
            self.precision,
            self.base,
        ))
    }

    /// Number of equal leading base-B words of `self` and `other`.
    ///
    /// Equal values (to their common precision) report that precision.
    #[must_use]
    pub fn equal_digits(&self, other: &Self) -> u64 {
        if self.sign != other.sign {
            return 0;
        }
        if self.is_zero() && other.is_zero() {
            return INFINITE;
        }
        let prec = self.precision.min(other.precision);
        let diff = self.subtract(other);
        if diff.is_zero() {
            return prec;
        }
        if diff.scale() >= self.scale() {
            return 0;
        }
        u64::try_from(self.scale() - diff.scale()).unwrap_or(0)
    }

    /// Leading mantissa as an f64 in [1, B) together with its word
    /// exponent: value ≈ m · B^e. Usable as a Newton seed even when the
    /// exponent itself would overflow an f64.
    #[must_use]
    pub fn to_f64_parts(&self) -> (f64, i64) {
        if self.is_zero() {
            return (0.0, 0);
        }
        let words = self.word_vec();
        let b = self.base as f64;
        let mut m = 0.0f64;
        // Three words always exceed the 53-bit significand.
        for k in 0..3.min(words.len()) {
            m += words[words.len() - 1 - k] as f64 / b.powi(k as i32);
        }
        (m * f64::from(self.sign), self.exponent)
    }

    /// Build a number from an f64 mantissa and word exponent:
    /// value ≈ m · B^e with `prec` words retained.
    #[must_use]
    pub fn from_f64_parts(m: f64, e: i64, prec: u64, base: u64) -> Self {
        if m == 0.0 || !m.is_finite() {
            return Self::zero_in_base(base);
        }
        let sign = if m < 0.0 { -1 } else { 1 };
        let mut m = m.abs();
        let b = base as f64;
        // Renormalize into [1, B).
        let mut e = e;
        while m >= b {
            m /= b;
            e += 1;
        }
        while m < 1.0 {
            m *= b;
            e -= 1;
        }
        // Peel enough words to exhaust the f64 significand.
        let mut words_rev = Vec::new();
        for _ in 0..=(64 / base.ilog2().max(1) as usize + 1) {
            let w = m as u64;
            words_rev.push(w.min(base - 1));
            m = (m - w as f64) * b;
            if m <= 0.0 {
                break;
            }
        }
        words_rev.reverse();
        Self::from_word_vec(sign, e, words_rev, prec, base)
    }
}

fn storage_words<W: NttWord>(s: &DataStorage<W>) -> Result<Vec<u64>> {
    match s.as_slice() {
        Some(v) => Ok(v.iter().map(|&w| w.to_u64()).collect()),
        None => {
            let mut buf = vec![W::default(); s.len()];
            s.read_block(0, &mut buf)?;
            Ok(buf.iter().map(|&w| w.to_u64()).collect())
        }
    }
}

/// Digit of `x` at absolute word position `p`, zero outside the window.
fn digit_at<W: NttWord>(words: &[u64], x: &ApFloat<W>, p: i64) -> u64 {
    let lo = x.scale() - (words.len() as i64 - 1);
    if p < lo || p > x.scale() {
        0
    } else {
        words[usize::try_from(p - lo).unwrap_or(0)]
    }
}

/// |x| + |y| over the aligned window, truncated to `prec` + guard words.
fn add_abs<W: NttWord>(x: &ApFloat<W>, y: &ApFloat<W>, prec: u64) -> (Vec<u64>, i64) {
    let base = x.base();
    let xw = x.word_vec();
    let yw = y.word_vec();
    let hi = x.scale().max(y.scale());
    let mut lo = (x.scale() - xw.len() as i64 + 1).min(y.scale() - yw.len() as i64 + 1);
    if prec != INFINITE {
        let floor = hi - i64::try_from(prec).unwrap_or(i64::MAX).saturating_add(2) + 1;
        lo = lo.max(floor);
    }
    let width = usize::try_from(hi - lo + 1).unwrap_or(0);
    let mut out = Vec::with_capacity(width + 1);
    let mut carry = 0u64;
    for i in 0..width {
        let p = lo + i as i64;
        let s = digit_at(&xw, x, p) + digit_at(&yw, y, p) + carry;
        out.push(s % base);
        carry = s / base;
    }
    let mut hi = hi;
    if carry > 0 {
        out.push(carry);
        hi += 1;
    }
    (out, hi)
}

/// |x| − |y| (requires |x| ≥ |y|) over the aligned window.
fn sub_abs<W: NttWord>(x: &ApFloat<W>, y: &ApFloat<W>, prec: u64) -> (Vec<u64>, i64) {
    let base = x.base();
    let xw = x.word_vec();
    let yw = y.word_vec();
    let hi = x.scale().max(y.scale());
    let mut lo = (x.scale() - xw.len() as i64 + 1).min(y.scale() - yw.len() as i64 + 1);
    if prec != INFINITE {
        let floor = hi - i64::try_from(prec).unwrap_or(i64::MAX).saturating_add(2) + 1;
        lo = lo.max(floor);
    }
    let width = usize::try_from(hi - lo + 1).unwrap_or(0);
    let mut out = Vec::with_capacity(width);
    let mut borrow = 0i64;
    for i in 0..width {
        let p = lo + i as i64;
        let mut d = digit_at(&xw, x, p) as i64 - digit_at(&yw, y, p) as i64 - borrow;
        if d < 0 {
            d += base as i64;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out.push(d as u64);
    }
    debug_assert_eq!(borrow, 0, "sub_abs requires |x| >= |y|");
    (out, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    type F = ApFloat<u32>;

    #[test]
    fn normalization_strips_zero_padding() {
        // 0 042 000 000 000 with word exponent 3 is 42·10^9·10^9.
        let x = F::from_word_vec(1, 3, vec![0, 0, 42, 0], INFINITE, 1_000_000_000);
        assert_eq!(x.len(), 1);
        assert_eq!(x.scale(), 2);
        assert_eq!(x.word_vec(), vec![42]);
    }

    #[test]
    fn zero_has_the_documented_shape() {
        let z = F::zero();
        assert_eq!(z.signum(), 0);
        assert_eq!(z.len(), 0);
        assert_eq!(z.precision(), INFINITE);
        assert!(z.is_integer());
    }

    #[test]
    fn small_integer_round_trip() {
        let x = F::from_i64(123_456_789_012);
        assert_eq!(x.word_vec(), vec![456_789_012, 123]);
        assert_eq!(x.scale(), 1);
        assert_eq!(x.signum(), 1);
        assert_eq!(F::from_i64(-7).signum(), -1);
    }

    #[test]
    fn addition_carries_across_words() {
        let x = F::from_i64(999_999_999);
        let y = F::from_i64(1);
        let s = x.add(&y);
        // 10^9 normalizes to a single word with the exponent absorbing the
        // trailing zero.
        assert_eq!(s.scale(), 1);
        assert_eq!(s.word_vec(), vec![1]);
    }

    #[test]
    fn subtraction_cancels_and_normalizes() {
        let x = F::from_i64(1_000_000_007);
        let y = F::from_i64(1_000_000_000);
        let d = x.subtract(&y);
        assert_eq!(d.word_vec(), vec![7]);
        assert_eq!(d.scale(), 0);
        assert!(x.subtract(&x).is_zero());
    }

    #[test]
    fn signed_addition_matches_i64() {
        for (a, b) in [(5i64, -3i64), (-5, 3), (-5, -3), (123_456, -123_456)] {
            let got = F::from_i64(a).add(&F::from_i64(b));
            let expect = F::from_i64(a + b);
            assert_eq!(got.compare(&expect), Ordering::Equal, "{a} + {b}");
        }
    }

    #[test]
    fn multiply_small_numbers_exactly() {
        let x = F::from_i64(123_456_789);
        let y = F::from_i64(987_654_321);
        let p = x.multiply(&y).unwrap();
        // 123456789 · 987654321 = 121932631112635269
        assert_eq!(p.word_vec(), vec![112_635_269, 121_932_631]);
        assert_eq!(p.scale(), 1);
    }

    #[test]
    fn multiply_tracks_fractional_scales() {
        // 0.5 · 0.5 = 0.25 with B = 10^9: mantissa [500000000] at exponent -1.
        let half = F::from_word_vec(1, -1, vec![500_000_000], 10, 1_000_000_000);
        let q = half.multiply(&half).unwrap();
        assert_eq!(q.word_vec(), vec![250_000_000]);
        assert_eq!(q.scale(), -1);
    }

    #[test]
    fn truncation_and_fraction_split() {
        // 1.5 = [500000000, 1] with exponent 0.
        let x = F::from_word_vec(1, 0, vec![500_000_000, 1], 10, 1_000_000_000);
        let t = x.truncated();
        assert_eq!(t.word_vec(), vec![1]);
        assert_eq!(t.scale(), 0);
        let f = x.fractional();
        assert_eq!(f.word_vec(), vec![500_000_000]);
        assert_eq!(f.scale(), -1);
        assert_eq!(x.truncated().add(&x.fractional()).compare(&x), Ordering::Equal);
    }

    #[test]
    fn equal_digits_counts_agreement() {
        let x = F::from_word_vec(1, 1, vec![5, 123], 8, 1_000_000_000);
        let y = F::from_word_vec(1, 1, vec![6, 123], 8, 1_000_000_000);
        // Differ in the second word: exactly one word agrees.
        assert_eq!(x.equal_digits(&y), 1);
        assert_eq!(x.equal_digits(&x), 8);
        assert_eq!(x.equal_digits(&x.negate()), 0);
    }

    #[test]
    fn precision_truncation_keeps_leading_words() {
        let x = F::from_word_vec(1, 3, vec![4, 3, 2, 1], INFINITE, 1_000_000_000);
        let t = x.with_precision(2);
        assert_eq!(t.word_vec(), vec![2, 1]);
        assert_eq!(t.scale(), 3);
        assert_eq!(t.precision(), 2);
    }

    #[test]
    fn f64_parts_round_trip_for_seeds() {
        let x = F::from_word_vec(1, 5, vec![123_456_789, 987_654_321], 10, 1_000_000_000);
        let (m, e) = x.to_f64_parts();
        assert_eq!(e, 5);
        let back = F::from_f64_parts(m, e, 2, 1_000_000_000);
        // The seed agrees in the leading word.
        assert_eq!(back.scale(), 5);
        assert_eq!(back.word_vec().last(), x.word_vec().last());
    }

    #[test]
    fn copy_sign_transfers_only_the_sign() {
        let x = F::from_i64(42);
        let neg = F::from_i64(-5);
        assert_eq!(x.copy_sign(&neg).signum(), -1);
        assert_eq!(x.copy_sign(&neg).word_vec(), vec![42]);
        assert_eq!(F::zero().copy_sign(&neg).signum(), 0);
        assert_eq!(neg.copy_sign(&x).signum(), 1);
    }

    #[test]
    fn scaling_shifts_the_exponent_only() {
        let x = F::from_i64(42);
        let y = x.scaled(3).unwrap();
        assert_eq!(y.scale(), 3);
        assert_eq!(y.word_vec(), vec![42]);
        assert!(F::from_i64(1).scaled(i64::MAX).and_then(|v| v.scaled(1)).is_err());
    }
}
