//! Cached high-precision constants: π and ln(B).
//!
//! π comes from the Brent–Salamin (Gauss–Legendre) AGM iteration; ln(B)
//! reuses the logarithm's own AGM identity applied to a pure power of the
//! base, where 4/s is an exact exponent shift and no division is needed.
//! Both are cached per (element width, base) at the highest precision
//! computed so far; a request beyond the cached precision recomputes and
//! replaces the entry.

use crate::real::{agm, div_small, inverse_root, sqrt, EXTRA_PRECISION};
use apnum_core::{NttWord, Result};
use apnum_num::ApFloat;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;

/// Cached number, stored word-width-independently.
#[derive(Clone, Debug)]
struct CachedValue {
    precision: u64,
    sign: i8,
    exponent: i64,
    words: Vec<u64>,
}

type Cache = Mutex<HashMap<(usize, u64), CachedValue>>;

static PI_CACHE: Lazy<Cache> = Lazy::new(|| Mutex::new(HashMap::new()));
static LN_BASE_CACHE: Lazy<Cache> = Lazy::new(|| Mutex::new(HashMap::new()));

fn cache_get<W: NttWord>(cache: &Cache, base: u64, prec: u64) -> Option<ApFloat<W>> {
    let guard = cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let v = guard.get(&(W::BYTES, base))?;
    if v.precision < prec {
        return None;
    }
    Some(
        ApFloat::from_word_vec(v.sign, v.exponent, v.words.clone(), v.precision, base)
            .with_precision(prec),
    )
}

fn cache_put<W: NttWord>(cache: &Cache, base: u64, prec: u64, value: &ApFloat<W>) {
    let mut guard = cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    guard.insert(
        (W::BYTES, base),
        CachedValue {
            precision: prec,
            sign: value.signum(),
            exponent: value.scale(),
            words: value.word_vec(),
        },
    );
}

/// π to `prec` words by the Brent–Salamin iteration:
/// a ← (a+b)/2, b ← √(ab), t ← t − p·(a−a')², p ← 2p; π ≈ (a+b)²/(4t).
pub fn pi<W: NttWord>(prec: u64, base: u64) -> Result<ApFloat<W>> {
    if let Some(v) = cache_get::<W>(&PI_CACHE, base, prec) {
        return Ok(v);
    }
    tracing::debug!(prec, base, "computing pi");
    let wp = prec + EXTRA_PRECISION + 2;
    let one = ApFloat::<W>::from_i64_in_base(1, base).with_precision(wp);
    let two = ApFloat::<W>::from_i64_in_base(2, base).with_precision(wp);

    let mut a = one;
    let mut b = inverse_root(&two, 2, wp)?; // 1/√2
    let mut t = div_small(&ApFloat::from_i64_in_base(1, base), 4, wp);
    let mut p = 1u64;

    // Digits double per pass; one pass per bit of precision is plenty.
    for _ in 0..128 {
        let next_a = div_small(&a.add(&b), 2, wp);
        let next_b = sqrt(&a.multiply(&b)?.with_precision(wp))?;
        let d = a.subtract(&next_a);
        t = t.subtract(&d.square()?.multiply(&ApFloat::from_i64_in_base(
            i64::try_from(p).unwrap_or(i64::MAX),
            base,
        ))?);
        a = next_a;
        b = next_b;
        p = p.saturating_mul(2);
        if a.equal_digits(&b) >= wp {
            break;
        }
    }
    let sum = a.add(&b);
    let four_t = t.multiply(&ApFloat::from_i64_in_base(4, base))?;
    let value = sum.square()?.multiply(&inverse_root(&four_t, 1, wp)?)?;
    let value = value.with_precision(prec);
    cache_put::<W>(&PI_CACHE, base, prec, &value);
    Ok(value)
}

/// ln(B) to `prec` words: with s = B^(n+1),
/// ln(B) = π / (2·AGM(1, 4/s)) / (n+1), and 4/s is exact.
pub fn ln_base<W: NttWord>(prec: u64, base: u64) -> Result<ApFloat<W>> {
    if let Some(v) = cache_get::<W>(&LN_BASE_CACHE, base, prec) {
        return Ok(v);
    }
    tracing::debug!(prec, base, "computing ln(base)");
    let wp = prec + EXTRA_PRECISION + 2;
    let shift = i64::try_from(wp / 2 + 2).unwrap_or(i64::MAX);

    let one = ApFloat::<W>::from_i64_in_base(1, base).with_precision(wp);
    // 4/s = 4·B^-(shift+1), an exact exponent shift.
    let four_over_s = ApFloat::<W>::from_i64_in_base(4, base)
        .with_precision(wp)
        .scaled(-(shift + 1))?;

    let a = agm(&one, &four_over_s, wp)?;
    let two_a = a.add(&a);
    let ln_s = pi::<W>(wp, base)?.multiply(&inverse_root(&two_a, 1, wp)?)?;
    let value = div_small(&ln_s, (shift + 1).unsigned_abs(), wp).with_precision(prec);
    cache_put::<W>(&LN_BASE_CACHE, base, prec, &value);
    Ok(value)
}
