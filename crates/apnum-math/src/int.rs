//! Integer functions: power, root with remainder, division with remainder,
//! gcd/lcm, and modular exponentiation.
//!
//! Division and roots get a floating-point approximation from the Newton
//! inverse-root machinery at `scale/n + EXTRA_PRECISION` words, truncate it,
//! and correct the candidate by ±1 against the defining identity. The ±1
//! powers use binomial shortcuts for n = 2 and n = 3 instead of a full
//! recomputation.

use crate::real::{self, EXTRA_PRECISION};
use apnum_core::{ApError, NttWord, Result};
use apnum_num::{ApFloat, ApInt};
use std::cmp::Ordering;

/// x^n for n ≥ 0 (0⁰ fails). Negative n truncates toward zero: the result
/// is 0 for |x| > 1 and ±1 for |x| = 1.
pub fn pow<W: NttWord>(x: &ApInt<W>, n: i64) -> Result<ApInt<W>> {
    let one = ApInt::from_i64_in_base(1, x.base());
    if n == 0 {
        if x.is_zero() {
            return Err(ApError::ZeroToZero);
        }
        return Ok(one);
    }
    if x.is_zero() {
        if n < 0 {
            return Err(ApError::domain("pow", "zero to a negative power"));
        }
        return Ok(ApInt::from_i64_in_base(0, x.base()));
    }
    if n < 0 {
        // |x|^n < 1 truncates to zero; only |x| = 1 survives.
        return Ok(match x.abs().compare(&one) {
            Ordering::Greater => ApInt::from_i64_in_base(0, x.base()),
            _ => pow_sign(x, n.unsigned_abs(), &one),
        });
    }
    let n = n.unsigned_abs();

    // Strip trailing zero bits of the exponent and square them back in at
    // the end, so the loop multiplies with the smallest possible operands.
    let doublings = n.trailing_zeros();
    let mut e = n >> doublings;
    let mut sq = x.clone();
    let mut acc: Option<ApInt<W>> = None;
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
    let mut result = acc.unwrap_or(one);
    for _ in 0..doublings {
        result = result.square()?;
    }
    Ok(result)
}

fn pow_sign<W: NttWord>(x: &ApInt<W>, n: u64, one: &ApInt<W>) -> ApInt<W> {
    if x.signum() < 0 && n % 2 == 1 {
        one.negate()
    } else {
        one.clone()
    }
}

/// (x+1)^n from x and x^n, with binomial shortcuts for n = 2 and n = 3.
fn pow_x_plus_1<W: NttWord>(x: &ApInt<W>, x_pow: &ApInt<W>, n: u64) -> Result<ApInt<W>> {
    let one = ApInt::from_i64_in_base(1, x.base());
    match n {
        2 => {
            // (x+1)² = x² + 2x + 1
            Ok(x_pow.add(&x.add(x)).add(&one))
        }
        3 => {
            // (x+1)³ = x³ + 3x² + 3x + 1
            let sq3 = x.square()?.mul_small(3);
            Ok(x_pow.add(&sq3).add(&x.mul_small(3)).add(&one))
        }
        _ => pow(&x.add(&one), i64::try_from(n).unwrap_or(i64::MAX)),
    }
}

/// (x−1)^n from x and x^n, with binomial shortcuts for n = 2 and n = 3.
fn pow_x_minus_1<W: NttWord>(x: &ApInt<W>, x_pow: &ApInt<W>, n: u64) -> Result<ApInt<W>> {
    let one = ApInt::from_i64_in_base(1, x.base());
    match n {
        2 => {
            // (x−1)² = x² − 2x + 1
            Ok(x_pow.subtract(&x.add(x)).add(&one))
        }
        3 => {
            // (x−1)³ = x³ − 3x² + 3x − 1
            let sq3 = x.square()?.mul_small(3);
            Ok(x_pow.subtract(&sq3).add(&x.mul_small(3)).subtract(&one))
        }
        _ => pow(&x.subtract(&one), i64::try_from(n).unwrap_or(i64::MAX)),
    }
}

/// n-th root with remainder: returns [q, r] with qⁿ + r = x and
/// sign(r) = sign(x). Fails for n ≤ 0 and for even roots of negatives.
pub fn root<W: NttWord>(x: &ApInt<W>, n: i64) -> Result<(ApInt<W>, ApInt<W>)> {
    if n <= 0 {
        return Err(ApError::domain("root", "root order must be positive"));
    }
    if x.is_zero() {
        return Ok((ApInt::from_i64_in_base(0, x.base()), ApInt::from_i64_in_base(0, x.base())));
    }
    if x.signum() < 0 {
        if n % 2 == 0 {
            return Err(ApError::domain("root", "even root of a negative value"));
        }
        let (q, r) = root(&x.abs(), n)?;
        return Ok((q.negate(), r.negate()));
    }
    if n == 1 {
        return Ok((x.clone(), ApInt::from_i64_in_base(0, x.base())));
    }
    let nu = n.unsigned_abs();

    // Floating approximation of x^(1/n) = x · (x^(−1/n))^(n−1).
    let prec = u64::try_from(x.scale() / n + 1).unwrap_or(1).max(1) + EXTRA_PRECISION;
    let fx = x.to_float(prec + EXTRA_PRECISION);
    let inv_root = real::inverse_root(&fx, n, prec + EXTRA_PRECISION)?;
    let approx = fx.multiply(&real::pow_small(&inv_root, nu - 1, prec + EXTRA_PRECISION)?)?;
    let mut q = ApInt::from_float(approx.truncated())?;

    let mut q_pow = pow(&q, n)?;
    // Correct downward while qⁿ > x, upward while (q+1)ⁿ ≤ x.
    for _ in 0..64 {
        if q_pow.compare(x) == Ordering::Greater {
            q_pow = pow_x_minus_1(&q, &q_pow, nu)?;
            q = q.subtract(&ApInt::from_i64_in_base(1, x.base()));
            continue;
        }
        let next_pow = pow_x_plus_1(&q, &q_pow, nu)?;
        if next_pow.compare(x) != Ordering::Greater {
            q = q.add(&ApInt::from_i64_in_base(1, x.base()));
            q_pow = next_pow;
            continue;
        }
        break;
    }
    debug_assert!(q_pow.compare(x) != Ordering::Greater);
    let r = x.subtract(&q_pow);
    Ok((q, r))
}

/// Truncated division with remainder: [q, r] with x = q·y + r,
/// sign(r) = sign(x), |r| < |y|.
pub fn div<W: NttWord>(x: &ApInt<W>, y: &ApInt<W>) -> Result<(ApInt<W>, ApInt<W>)> {
    if y.is_zero() {
        return Err(ApError::domain("divide", "division by zero"));
    }
    if x.is_zero() || x.compare_abs(y) == Ordering::Less {
        return Ok((ApInt::from_i64_in_base(0, x.base()), x.clone()));
    }

    // Floating quotient at scale(x) − scale(y) + guard words.
    let prec = u64::try_from(x.scale() - y.scale() + 1).unwrap_or(1).max(1) + EXTRA_PRECISION;
    let fx = x.to_float(prec + EXTRA_PRECISION);
    let fy = y.to_float(prec + EXTRA_PRECISION);
    let approx = fx.multiply(&real::inverse_root(&fy, 1, prec + EXTRA_PRECISION)?)?;
    let mut q = ApInt::from_float(approx.truncated())?;
    let mut r = x.subtract(&q.multiply(y)?);

    // Unit step in the direction of the true quotient.
    let step = ApInt::from_i64_in_base(i64::from(x.signum()) * i64::from(y.signum()), x.base());
    let r_step = y.multiply(&step)?; // sign(x)·|y|
    for _ in 0..64 {
        if !r.is_zero() && r.signum() != x.signum() {
            // Overshot: pull the quotient back toward zero.
            q = q.subtract(&step);
            r = r.add(&r_step);
        } else if r.compare_abs(y) != Ordering::Less {
            q = q.add(&step);
            r = r.subtract(&r_step);
        } else {
            break;
        }
    }
    debug_assert!(r.is_zero() || r.signum() == x.signum());
    debug_assert_eq!(r.compare_abs(y), Ordering::Less);
    Ok((q, r))
}

/// Remainder of truncated division (sign follows the dividend).
pub fn mod_op<W: NttWord>(x: &ApInt<W>, y: &ApInt<W>) -> Result<ApInt<W>> {
    Ok(div(x, y)?.1)
}

/// Greatest common divisor by Euclid's algorithm; always non-negative.
pub fn gcd<W: NttWord>(a: &ApInt<W>, b: &ApInt<W>) -> Result<ApInt<W>> {
    let mut a = a.abs();
    let mut b = b.abs();
    while !b.is_zero() {
        let r = mod_op(&a, &b)?;
        a = b;
        b = r;
    }
    Ok(a)
}

/// Least common multiple: |a·b| / gcd(a, b); lcm(0, 0) = 0.
pub fn lcm<W: NttWord>(a: &ApInt<W>, b: &ApInt<W>) -> Result<ApInt<W>> {
    if a.is_zero() && b.is_zero() {
        return Ok(ApInt::from_i64_in_base(0, a.base()));
    }
    let g = gcd(a, b)?;
    let (quot, _) = div(&a.abs(), &g)?;
    quot.multiply(&b.abs())
}

/// a^b mod m for b ≥ 0; negative exponents are rejected (the modulus cannot
/// be factored). The reciprocal of |m| is computed once at
/// scale(m) + EXTRA_PRECISION words and reused by every modular multiply.
pub fn mod_pow<W: NttWord>(a: &ApInt<W>, b: &ApInt<W>, m: &ApInt<W>) -> Result<ApInt<W>> {
    if m.is_zero() {
        return Err(ApError::domain("modPow", "zero modulus"));
    }
    if b.signum() < 0 {
        return Err(ApError::domain(
            "modPow",
            "negative exponent: cannot factor the modulus",
        ));
    }
    if a.is_zero() && b.is_zero() {
        return Err(ApError::ZeroToZero);
    }
    let mm = ModReduction::new(m)?;
    let one = ApInt::from_i64_in_base(1, a.base());
    if b.is_zero() {
        return mm.reduce(&one);
    }

    let mut result = one;
    let mut base = mm.reduce(a)?;
    let mut e = b.abs();
    // Square-and-multiply over the bits of the exponent, least significant
    // first (the bit stream comes from repeated halving).
    loop {
        let (half, bit) = e.divmod_small(2)?;
        if bit == 1 {
            result = mm.multiply(&result, &base)?;
        }
        e = half;
        if e.is_zero() {
            break;
        }
        base = mm.multiply(&base, &base)?;
    }
    Ok(result)
}

/// Modular reduction with a precomputed floating reciprocal of |m|.
struct ModReduction<W: NttWord> {
    modulus: ApInt<W>,
    inverse: ApFloat<W>,
}

impl<W: NttWord> ModReduction<W> {
    fn new(m: &ApInt<W>) -> Result<Self> {
        let modulus = m.abs();
        // Products reach twice the modulus scale before reduction.
        let prec = u64::try_from(modulus.scale() + 1).unwrap_or(1).max(1) * 2 + EXTRA_PRECISION;
        let fm = modulus.to_float(prec);
        let inverse = real::inverse_root(&fm, 1, prec)?;
        Ok(Self { modulus, inverse })
    }

    /// x mod m into [0, |m|), using the precomputed reciprocal.
    fn reduce(&self, x: &ApInt<W>) -> Result<ApInt<W>> {
        let fx = x.to_float(self.inverse.precision() + EXTRA_PRECISION);
        let t = ApInt::from_float(fx.multiply(&self.inverse)?.truncated())?;
        let mut r = x.subtract(&t.multiply(&self.modulus)?);
        for _ in 0..64 {
            match (r.signum(), r.compare_abs(&self.modulus)) {
                (-1, _) => r = r.add(&self.modulus),
                (_, Ordering::Less) => break,
                _ => r = r.subtract(&self.modulus),
            }
        }
        debug_assert!(r.signum() >= 0 && r.compare_abs(&self.modulus) == Ordering::Less);
        Ok(r)
    }

    /// (u·v) mod m without recomputing the reciprocal.
    fn multiply(&self, u: &ApInt<W>, v: &ApInt<W>) -> Result<ApInt<W>> {
        self.reduce(&u.multiply(v)?)
    }
}
