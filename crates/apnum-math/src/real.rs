//! Real-valued high-precision functions: inverse roots and division by
//! Newton iteration, AGM, logarithm and exponential.
//!
//! Every Newton-based function follows the same schedule: a double-precision
//! seed, precision doubling on each iteration, and one final "precising"
//! iteration repeated at the target precision to absorb residual error.
//! Working precisions carry [`EXTRA_PRECISION`] guard words wherever
//! round-off is expected.

use crate::consts::{ln_base, pi};
use apnum_core::{ApError, NttWord, Result};
use apnum_num::{ApFloat, INFINITE};
use std::cmp::Ordering;

/// Guard words added wherever round-off is expected (two words is on the
/// order of twenty decimal digits at the default bases).
pub const EXTRA_PRECISION: u64 = 2;

const MAX_NEWTON_ITERATIONS: usize = 96;
const MAX_AGM_ITERATIONS: usize = 512;

/// x / d for a small positive divisor, to `prec` quotient words.
#[must_use]
pub fn div_small<W: NttWord>(x: &ApFloat<W>, d: u64, prec: u64) -> ApFloat<W> {
    debug_assert!(d > 0);
    if x.is_zero() {
        return x.clone();
    }
    let base = x.base();
    let words = x.word_vec();
    let n_out = usize::try_from(prec.min(u64::from(u32::MAX)))
        .unwrap_or(usize::MAX)
        .saturating_add(2);
    let mut out_rev = Vec::with_capacity(n_out);
    let mut rem: u128 = 0;
    for i in 0..n_out {
        let digit = if i < words.len() {
            words[words.len() - 1 - i]
        } else {
            0
        };
        let cur = rem * u128::from(base) + u128::from(digit);
        out_rev.push((cur / u128::from(d)) as u64);
        rem = cur % u128::from(d);
    }
    out_rev.reverse();
    ApFloat::from_word_vec(x.signum(), x.scale(), out_rev, x.precision().min(prec), base)
}

/// x^n for a small positive exponent by binary powering at precision `prec`.
pub fn pow_small<W: NttWord>(x: &ApFloat<W>, n: u64, prec: u64) -> Result<ApFloat<W>> {
    debug_assert!(n >= 1);
    let mut acc: Option<ApFloat<W>> = None;
    let mut sq = x.with_precision(prec);
    let mut e = n;
    while e > 0 {
        if e & 1 == 1 {
            acc = Some(match acc {
                Some(a) => a.multiply(&sq)?,
                None => sq.clone(),
            });
        }
        e >>= 1;
        if e > 0 {
            sq = sq.square()?;
        }
    }
    Ok(acc.unwrap_or_else(|| ApFloat::from_i64_in_base(1, x.base())))
}

/// z^(−1/n) by Newton iteration on f(r) = 1 − z·rⁿ, to `prec` words.
///
/// The double-precision seed splits the word exponent e = n·q + s so the
/// iteration survives scales far outside the f64 range.
pub fn inverse_root<W: NttWord>(z: &ApFloat<W>, n: i64, prec: u64) -> Result<ApFloat<W>> {
    if z.is_zero() {
        return Err(ApError::domain("inverseRoot", "inverse root of zero"));
    }
    if n <= 0 {
        return Err(ApError::domain("inverseRoot", "root order must be positive"));
    }
    if prec == INFINITE {
        return Err(ApError::Precision { op: "inverseRoot" });
    }
    if z.signum() < 0 {
        if n % 2 == 0 {
            return Err(ApError::domain("inverseRoot", "even root of a negative value"));
        }
        return Ok(inverse_root(&z.abs(), n, prec)?.negate());
    }

    let base = z.base();
    let target = prec + EXTRA_PRECISION;

    // Seed: z ≈ m·B^e with m in [1, B); write e = n·q + s, 0 ≤ s < n, so
    // z^(−1/n) = (m·B^s)^(−1/n) · B^(−q). The mantissa factor stays within
    // f64 range because s/n < 1.
    let (m, e) = z.to_f64_parts();
    let q = e.div_euclid(n);
    let s = e.rem_euclid(n);
    let ln_b = (base as f64).ln();
    let mant = (-m.ln() / n as f64 - s as f64 / n as f64 * ln_b).exp();
    let mut r = ApFloat::<W>::from_f64_parts(mant, -q, target, base);

    newton_inverse_root(z, &mut r, n, target)?;
    Ok(r.with_precision(prec))
}

/// Shared Newton loop: r ← r + r·(1 − z·rⁿ)/n with doubling precision and a
/// final precising pass.
fn newton_inverse_root<W: NttWord>(
    z: &ApFloat<W>,
    r: &mut ApFloat<W>,
    n: i64,
    target: u64,
) -> Result<()> {
    let nu = n.unsigned_abs();
    let mut p: u64 = 2;
    let mut precising = false;
    for iteration in 0..MAX_NEWTON_ITERATIONS {
        let at_target = p >= target;
        p = (p * 2).min(target);
        let zp = z.with_precision(p);
        let rp = r.with_precision(p);
        let rn = pow_small(&rp, nu, p)?;
        let residual = ApFloat::from_i64_in_base(1, z.base()).subtract(&zp.multiply(&rn)?);
        let correction = div_small(&rp.multiply(&residual)?, nu, p);
        *r = rp.add(&correction);
        tracing::trace!(iteration, p, "inverse-root newton step");
        if at_target {
            if precising {
                return Ok(());
            }
            precising = true;
        }
    }
    Ok(())
}

/// x / y at precision min(p(x), p(y)) via the Newton reciprocal.
pub fn divide<W: NttWord>(x: &ApFloat<W>, y: &ApFloat<W>) -> Result<ApFloat<W>> {
    if y.is_zero() {
        return Err(ApError::domain("divide", "division by zero"));
    }
    if x.is_zero() {
        return Ok(x.clone());
    }
    let prec = working_precision(x, y, "divide")?;
    let inv = inverse_root(y, 1, prec + EXTRA_PRECISION)?;
    Ok(x.multiply(&inv)?.with_precision(prec))
}

/// √x = x · x^(−1/2).
pub fn sqrt<W: NttWord>(x: &ApFloat<W>) -> Result<ApFloat<W>> {
    if x.is_zero() {
        return Ok(x.clone());
    }
    let prec = finite_precision(x, "sqrt")?;
    let inv = inverse_root(x, 2, prec + EXTRA_PRECISION)?;
    Ok(x.multiply(&inv)?.with_precision(prec))
}

/// ∛x = x · (x^(−1/3))², sign-preserving.
pub fn cbrt<W: NttWord>(x: &ApFloat<W>) -> Result<ApFloat<W>> {
    if x.is_zero() {
        return Ok(x.clone());
    }
    let prec = finite_precision(x, "cbrt")?;
    let inv = inverse_root(x, 3, prec + EXTRA_PRECISION)?;
    Ok(x.multiply(&inv.square()?)?.with_precision(prec))
}

/// Arithmetic-geometric mean, quadratically convergent.
pub fn agm<W: NttWord>(a: &ApFloat<W>, b: &ApFloat<W>, prec: u64) -> Result<ApFloat<W>> {
    if a.is_zero() || b.is_zero() {
        return Ok(ApFloat::zero_in_base(a.base()));
    }
    if a.signum() != b.signum() {
        return Err(ApError::domain("agm", "operands of opposite sign"));
    }
    let wp = prec + EXTRA_PRECISION;
    let mut x = a.with_precision(wp);
    let mut y = b.with_precision(wp);
    for iteration in 0..MAX_AGM_ITERATIONS {
        // Once the operands agree to half the working precision one more
        // step doubles that to full agreement.
        let last = x.equal_digits(&y) >= wp.div_ceil(2);
        let mean = div_small(&x.add(&y), 2, wp);
        let gmean = sqrt(&x.multiply(&y)?.with_precision(wp))?;
        x = mean;
        y = gmean;
        if last || x.equal_digits(&y) >= wp {
            tracing::trace!(iteration, "agm converged");
            break;
        }
    }
    Ok(div_small(&x.add(&y), 2, wp).with_precision(prec))
}

/// Natural logarithm via the AGM identity
/// ln(x) = π / (2·AGM(1, 4/s)) − n·ln(B), with s = x·B^n scaled so the
/// identity's O(s⁻²) error stays below the working precision.
pub fn log<W: NttWord>(x: &ApFloat<W>) -> Result<ApFloat<W>> {
    let prec = finite_precision(x, "log")?;
    if x.signum() <= 0 {
        return Err(ApError::domain("log", "logarithm of a non-positive value"));
    }
    let base = x.base();
    let one = ApFloat::from_i64_in_base(1, base);
    if x.compare(&one) == Ordering::Equal {
        return Ok(ApFloat::zero_in_base(base));
    }
    // Cancellation near 1 costs leading digits; compensate up front.
    let cancel = x.equal_digits(&one);
    let wp = prec + EXTRA_PRECISION + cancel;

    log_at(x, wp, prec)
}

/// Words occupied by the magnitude of `v` in base B (for guard sizing when
/// a multi-word multiple of ln B is subtracted off).
pub(crate) fn shift_guard(v: i64, base: u64) -> u64 {
    let mut m = v.unsigned_abs();
    let mut words = 1u64;
    while m >= base {
        m /= base;
        words += 1;
    }
    words
}

/// Logarithm at an explicit working precision (shared with the Newton
/// callers that manage their own schedules).
pub(crate) fn log_at<W: NttWord>(x: &ApFloat<W>, wp: u64, prec: u64) -> Result<ApFloat<W>> {
    let base = x.base();
    let one = ApFloat::from_i64_in_base(1, base);

    // Scale so s = x·B^n has s² beyond the working precision. Subtracting
    // n·ln B at the end cancels as many leading words as n occupies, so
    // those words are added to the working precision up front.
    let shift = i64::try_from(wp / 2 + 2).map_err(|_| ApError::Overflow { op: "log" })?;
    let n_est = shift
        .checked_sub(x.scale())
        .ok_or(ApError::Overflow { op: "log" })?;
    let wp = wp + shift_guard(n_est, base);
    let shift = i64::try_from(wp / 2 + 2).map_err(|_| ApError::Overflow { op: "log" })?;
    let n = shift
        .checked_sub(x.scale())
        .ok_or(ApError::Overflow { op: "log" })?;
    let s = x.with_precision(wp).scaled(n)?;

    // 4/s via one Newton reciprocal.
    let four = ApFloat::from_i64_in_base(4, base);
    let inv_s = inverse_root(&s, 1, wp + EXTRA_PRECISION)?;
    let b_small = four.multiply(&inv_s)?;

    let a = agm(&one.with_precision(wp), &b_small, wp)?;
    let pi_wp = pi::<W>(wp, base)?;
    let two_a = a.add(&a);
    let ln_s = pi_wp.multiply(&inverse_root(&two_a, 1, wp)?)?;

    // ln(x) = ln(s) − n·ln(B).
    let ln_b = ln_base::<W>(wp, base)?;
    let correction = ln_b.multiply(&ApFloat::from_i64_in_base(n, base))?;
    Ok(ln_s.subtract(&correction).with_precision(prec))
}

/// e^x by Newton iteration on w ↦ log(w) = x, with the argument reduced by
/// an exact exponent shift: e^x = e^(x − k·ln B) · B^k.
pub fn exp<W: NttWord>(x: &ApFloat<W>) -> Result<ApFloat<W>> {
    let base = x.base();
    if x.is_zero() {
        return Ok(ApFloat::from_i64_in_base(1, base));
    }
    let prec = finite_precision(x, "exp")?;
    let wp = prec + EXTRA_PRECISION;

    // Magnitude guard: the result exponent k ≈ x / ln B must fit an i64.
    let (m, e) = x.to_f64_parts();
    let ln_b = (base as f64).ln();
    let log_mag = m.abs().log10() + e as f64 * (base as f64).log10();
    if log_mag > (i64::MAX as f64 * ln_b).log10() {
        return Err(ApError::Overflow { op: "exp" });
    }

    // Digits consumed by the integer part of x/ln(B) are lost to the
    // fractional remainder.
    if x.scale() > 0 && u64::try_from(x.scale()).map_or(true, |s| s >= wp) {
        return Err(ApError::LossOfAccuracy { op: "exp" });
    }

    // k = floor(x / ln B) so the reduced argument lies in [0, ln B).
    let x_f = m * (base as f64).powi(i32::try_from(e.clamp(-512, 512)).unwrap_or(512));
    let k = (x_f / ln_b).floor();
    if !(i64::MIN as f64..=i64::MAX as f64).contains(&k) {
        return Err(ApError::Overflow { op: "exp" });
    }
    let k = k as i64;
    let reduced = if k == 0 {
        x.with_precision(wp)
    } else {
        // The reduction cancels the words occupied by k·ln B.
        let guard = wp + EXTRA_PRECISION + shift_guard(k, base);
        let shift = ln_base::<W>(guard, base)?.multiply(&ApFloat::from_i64_in_base(k, base))?;
        x.with_precision(guard).subtract(&shift)
    };

    let w = exp_reduced(&reduced, wp)?;
    w.scaled(k).map(|v| v.with_precision(prec))
}

/// Newton loop for e^y with y in roughly [−ln B, ln B].
fn exp_reduced<W: NttWord>(y: &ApFloat<W>, target: u64) -> Result<ApFloat<W>> {
    let base = y.base();
    let one = ApFloat::from_i64_in_base(1, base);
    let (m, e) = y.to_f64_parts();
    let y_f = m * (base as f64).powi(i32::try_from(e.clamp(-64, 64)).unwrap_or(0));
    let mut w = ApFloat::<W>::from_f64_parts(y_f.exp(), 0, target, base);
    if w.is_zero() {
        w = one.clone();
    }

    let mut p: u64 = 2;
    let mut precising = false;
    for iteration in 0..MAX_NEWTON_ITERATIONS {
        let at_target = p >= target;
        p = (p * 2).min(target);
        let wp = w.with_precision(p);
        // w ← w·(1 + y − log w)
        let ln_w = log_at(&wp, p + EXTRA_PRECISION, p)?;
        let delta = y.with_precision(p).subtract(&ln_w);
        w = wp.multiply(&one.add(&delta))?;
        tracing::trace!(iteration, p, "exp newton step");
        if at_target {
            if precising {
                break;
            }
            precising = true;
        }
    }
    Ok(w)
}

/// x^y = e^(y·ln x) for positive x; negative x needs an integral y, and the
/// usual zero rules apply (0⁰ fails, 0^negative fails).
pub fn pow<W: NttWord>(x: &ApFloat<W>, y: &ApFloat<W>) -> Result<ApFloat<W>> {
    let base = x.base();
    if x.is_zero() {
        return match y.signum() {
            0 => Err(ApError::ZeroToZero),
            1 => Ok(ApFloat::zero_in_base(base)),
            _ => Err(ApError::domain("pow", "zero to a negative power")),
        };
    }
    if y.is_zero() {
        return Ok(ApFloat::from_i64_in_base(1, base));
    }
    let prec = working_precision(x, y, "pow")?;
    if x.signum() < 0 {
        if !y.is_integer() {
            return Err(ApError::domain("pow", "negative base with a fractional exponent"));
        }
        // Parity of the integer exponent decides the sign.
        let even = apnum_num::ApInt::from_float(y.clone())?.is_even();
        let mag = pow(&x.abs().with_precision(prec), &y.with_precision(prec))?;
        return Ok(if even { mag } else { mag.negate() });
    }
    let ln_x = log(&x.with_precision(prec + EXTRA_PRECISION))?;
    exp(&y.with_precision(prec + EXTRA_PRECISION).multiply(&ln_x)?).map(|v| v.with_precision(prec))
}

/// Precision of the operand, rejecting INFINITE for inexact functions.
pub(crate) fn finite_precision<W: NttWord>(x: &ApFloat<W>, op: &'static str) -> Result<u64> {
    match x.precision() {
        INFINITE => Err(ApError::Precision { op }),
        0 => Err(ApError::LossOfAccuracy { op }),
        p => Ok(p),
    }
}

/// min(p(x), p(y)), rejecting INFINITE.
fn working_precision<W: NttWord>(
    x: &ApFloat<W>,
    y: &ApFloat<W>,
    op: &'static str,
) -> Result<u64> {
    let p = x.precision().min(y.precision());
    if p == INFINITE {
        return Err(ApError::Precision { op });
    }
    Ok(p)
}
