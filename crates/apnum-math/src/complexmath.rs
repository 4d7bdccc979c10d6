//! Complex high-precision functions: inverse roots, AGM, log, exp, pow, and
//! the trigonometric/hyperbolic family by exp/log identities.
//!
//! The building blocks mirror the real module: Newton iteration with
//! precision doubling and a precising pass, AGM with complex square roots,
//! and the same log scaling identity with the argument rotated into the
//! right half-plane first. Trig and hyperbolic functions are reductions onto
//! `exp` and `log` (cos z = (e^{iz} + e^{−iz})/2 and friends), with branch
//! and negation choices that keep the exponential argument in the stable
//! half-plane.

use crate::consts::{ln_base, pi};
use crate::real::{self, EXTRA_PRECISION};
use apnum_core::{ApError, NttWord, Result};
use apnum_num::{ApComplex, ApFloat, INFINITE};

const MAX_NEWTON_ITERATIONS: usize = 96;
const MAX_AGM_ITERATIONS: usize = 512;

fn one<W: NttWord>(base: u64) -> ApComplex<W> {
    ApComplex::from_real(ApFloat::from_i64_in_base(1, base))
}

fn finite_precision<W: NttWord>(z: &ApComplex<W>, op: &'static str) -> Result<u64> {
    match z.precision() {
        INFINITE => Err(ApError::Precision { op }),
        0 => Err(ApError::LossOfAccuracy { op }),
        p => Ok(p),
    }
}

/// Both parts divided by a small positive word.
#[must_use]
pub fn div_small<W: NttWord>(z: &ApComplex<W>, d: u64, prec: u64) -> ApComplex<W> {
    ApComplex::new(
        real::div_small(z.re(), d, prec),
        real::div_small(z.im(), d, prec),
    )
}

/// z^n for small n ≥ 1 by binary powering.
pub fn pow_small<W: NttWord>(z: &ApComplex<W>, n: u64, prec: u64) -> Result<ApComplex<W>> {
    debug_assert!(n >= 1);
    let mut acc: Option<ApComplex<W>> = None;
    let mut sq = z.with_precision(prec);
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
    Ok(acc.unwrap_or_else(|| one(z.base())))
}

/// f64 view of the parts, aligned to a common word exponent.
///
/// The seed regimes of the spec fall out of the alignment: when one part is
/// so much larger that the other underflows an f64, the angle collapses to
/// 0, π or ±π/2 and `atan2` delivers exactly that.
fn aligned_parts<W: NttWord>(z: &ApComplex<W>) -> (f64, f64, i64) {
    let (mr, er) = z.re().to_f64_parts();
    let (mi, ei) = z.im().to_f64_parts();
    match (z.re().is_zero(), z.im().is_zero()) {
        (true, true) => (0.0, 0.0, 0),
        (false, true) => (mr, 0.0, er),
        (true, false) => (0.0, mi, ei),
        (false, false) => {
            let e = er.max(ei);
            let b = z.base() as f64;
            // Beyond ~40 words the smaller part underflows to zero, which is
            // exactly the dominant-part regime.
            let down = |m: f64, d: i64| {
                if d > 40 {
                    0.0
                } else {
                    m * b.powi(i32::try_from(-d).unwrap_or(0))
                }
            };
            (down(mr, e - er), down(mi, e - ei), e)
        }
    }
}

/// z^(−1/n) by Newton iteration on f(r) = 1 − z·rⁿ.
pub fn inverse_root<W: NttWord>(z: &ApComplex<W>, n: i64, prec: u64) -> Result<ApComplex<W>> {
    if z.is_zero() {
        return Err(ApError::domain("inverseRoot", "inverse root of zero"));
    }
    if n <= 0 {
        return Err(ApError::domain("inverseRoot", "root order must be positive"));
    }
    if prec == INFINITE {
        return Err(ApError::Precision { op: "inverseRoot" });
    }
    let base = z.base();
    let target = prec + EXTRA_PRECISION;

    // Polar seed: |z|^(−1/n)·e^(−iθ/n), with the magnitude exponent split
    // e = n·q + s exactly as in the real case.
    let (ar, ai, e) = aligned_parts(z);
    let theta = ai.atan2(ar);
    let mag = ar.hypot(ai);
    let q = e.div_euclid(n);
    let s = e.rem_euclid(n);
    let ln_b = (base as f64).ln();
    let mant = (-mag.ln() / n as f64 - s as f64 / n as f64 * ln_b).exp();
    let angle = -theta / n as f64;
    let mut r = ApComplex::new(
        ApFloat::<W>::from_f64_parts(mant * angle.cos(), -q, target, base),
        ApFloat::<W>::from_f64_parts(mant * angle.sin(), -q, target, base),
    );

    let nu = n.unsigned_abs();
    let mut p: u64 = 2;
    let mut precising = false;
    for iteration in 0..MAX_NEWTON_ITERATIONS {
        let at_target = p >= target;
        p = (p * 2).min(target);
        let zp = z.with_precision(p);
        let rp = r.with_precision(p);
        let rn = pow_small(&rp, nu, p)?;
        let residual = one(base).subtract(&zp.multiply(&rn)?);
        let correction = div_small(&rp.multiply(&residual)?, nu, p);
        r = rp.add(&correction);
        tracing::trace!(iteration, p, "complex inverse-root newton step");
        if at_target {
            if precising {
                break;
            }
            precising = true;
        }
    }
    Ok(r.with_precision(prec))
}

/// √z = z · z^(−1/2) (principal branch).
pub fn sqrt<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    if z.is_zero() {
        return Ok(z.clone());
    }
    let prec = finite_precision(z, "sqrt")?;
    let inv = inverse_root(z, 2, prec + EXTRA_PRECISION)?;
    Ok(z.multiply(&inv)?.with_precision(prec))
}

/// x / y via the Newton reciprocal.
pub fn divide<W: NttWord>(x: &ApComplex<W>, y: &ApComplex<W>) -> Result<ApComplex<W>> {
    if y.is_zero() {
        return Err(ApError::domain("divide", "division by zero"));
    }
    if x.is_zero() {
        return Ok(x.clone());
    }
    let prec = x.precision().min(y.precision());
    if prec == INFINITE {
        return Err(ApError::Precision { op: "divide" });
    }
    let inv = inverse_root(y, 1, prec + EXTRA_PRECISION)?;
    Ok(x.multiply(&inv)?.with_precision(prec))
}

/// Complex arithmetic-geometric mean.
pub fn agm<W: NttWord>(a: &ApComplex<W>, b: &ApComplex<W>, prec: u64) -> Result<ApComplex<W>> {
    if a.is_zero() || b.is_zero() {
        return Ok(ApComplex::from_real(ApFloat::zero_in_base(a.base())));
    }
    let wp = prec + EXTRA_PRECISION;
    let mut x = a.with_precision(wp);
    let mut y = b.with_precision(wp);
    for iteration in 0..MAX_AGM_ITERATIONS {
        let last = x.equal_digits(&y) >= wp.div_ceil(2);
        let mean = div_small(&x.add(&y), 2, wp);
        let gmean = sqrt(&x.multiply(&y)?.with_precision(wp))?;
        x = mean;
        y = gmean;
        if last || x.equal_digits(&y) >= wp {
            tracing::trace!(iteration, "complex agm converged");
            break;
        }
    }
    Ok(div_small(&x.add(&y), 2, wp).with_precision(prec))
}

/// Word scale of the dominant part.
fn dominant_scale<W: NttWord>(z: &ApComplex<W>) -> i64 {
    match (z.re().is_zero(), z.im().is_zero()) {
        (false, true) => z.re().scale(),
        (true, false) => z.im().scale(),
        (false, false) => z.re().scale().max(z.im().scale()),
        (true, true) => 0,
    }
}

/// Principal natural logarithm.
///
/// Arguments in the left half-plane are rotated (log z = log(−z) ± iπ, the
/// sign following Im z) so the AGM scaling identity runs with Re s ≥ 0,
/// away from the branch cut near the negative real axis.
pub fn log<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    if z.is_zero() {
        return Err(ApError::domain("log", "logarithm of zero"));
    }
    let prec = finite_precision(z, "log")?;
    let base = z.base();

    if z.re().signum() < 0 {
        let rotated = log(&z.negate())?;
        let pi_prec = pi::<W>(prec + EXTRA_PRECISION, base)?;
        let bias = if z.im().signum() < 0 {
            pi_prec.negate()
        } else {
            pi_prec
        };
        return Ok(ApComplex::new(
            rotated.re().clone(),
            rotated.im().add(&bias).with_precision(prec),
        ));
    }
    if z.is_real() && z.re().signum() > 0 {
        return Ok(ApComplex::from_real(real::log(z.re())?));
    }

    // Cancellation near 1 costs leading words.
    let near_one = z.subtract(&one(base));
    let cancel = if near_one.is_zero() {
        return Ok(ApComplex::from_real(ApFloat::zero_in_base(base)));
    } else {
        u64::try_from(-dominant_scale(&near_one)).unwrap_or(0)
    };
    let wp = prec + EXTRA_PRECISION + cancel;
    log_at(z, wp, prec)
}

/// Principal logarithm at an explicit working precision: the left-half-plane
/// rotation of [`log`] without its cancellation analysis. The Newton loop in
/// [`exp`] calls this on iterates whose real part can be negative.
fn log_principal<W: NttWord>(z: &ApComplex<W>, wp: u64, prec: u64) -> Result<ApComplex<W>> {
    if z.re().signum() >= 0 {
        return log_at(z, wp, prec);
    }
    let rotated = log_at(&z.negate(), wp, prec)?;
    let pi_p = pi::<W>(wp, z.base())?;
    let bias = if z.im().signum() < 0 {
        pi_p.negate()
    } else {
        pi_p
    };
    Ok(ApComplex::new(
        rotated.re().clone(),
        rotated.im().add(&bias).with_precision(prec),
    ))
}

fn log_at<W: NttWord>(z: &ApComplex<W>, wp: u64, prec: u64) -> Result<ApComplex<W>> {
    let base = z.base();
    // As in the real case, subtracting n·ln B cancels the words n occupies.
    let shift = i64::try_from(wp / 2 + 2).map_err(|_| ApError::Overflow { op: "log" })?;
    let n_est = shift
        .checked_sub(dominant_scale(z))
        .ok_or(ApError::Overflow { op: "log" })?;
    let wp = wp + real::shift_guard(n_est, base);
    let shift = i64::try_from(wp / 2 + 2).map_err(|_| ApError::Overflow { op: "log" })?;
    let n = shift
        .checked_sub(dominant_scale(z))
        .ok_or(ApError::Overflow { op: "log" })?;
    let s = z.with_precision(wp).scaled(n)?;

    let four = ApComplex::from_real(ApFloat::from_i64_in_base(4, base));
    let b_small = four.multiply(&inverse_root(&s, 1, wp + EXTRA_PRECISION)?)?;
    let a = agm(&one(base).with_precision(wp), &b_small, wp)?;
    let two_a = a.add(&a);
    let pi_wp = ApComplex::from_real(pi::<W>(wp, base)?);
    let ln_s = pi_wp.multiply(&inverse_root(&two_a, 1, wp)?)?;

    let ln_b = ln_base::<W>(wp, base)?;
    let correction = ln_b.multiply(&ApFloat::from_i64_in_base(n, base))?;
    Ok(ApComplex::new(
        ln_s.re().subtract(&correction).with_precision(prec),
        ln_s.im().with_precision(prec),
    ))
}

/// e^z by Newton iteration on w ↦ log(w) = z.
///
/// The real part is reduced by an exact exponent shift (e^x = e^(x−k·ln B)·B^k)
/// and the imaginary part by multiples of 2π into (−π, π]; the seed combines
/// the f64 `exp`, `cos` and `sin` of the reduced parts.
pub fn exp<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let base = z.base();
    if z.is_zero() {
        return Ok(one(base));
    }
    if z.is_real() {
        return Ok(ApComplex::from_real(real::exp(z.re())?));
    }
    let prec = finite_precision(z, "exp")?;
    let wp = prec + EXTRA_PRECISION;

    // Imaginary argument reduction: y' = y − 2π·round(y/(2π)). The Newton
    // iteration compares against a principal logarithm, so any |y| > π must
    // be reduced, not just multi-word ones.
    let y = z.im();
    let needs_reduction = !y.is_zero() && {
        let (ym, ye) = y.to_f64_parts();
        ye >= 1 || (ye == 0 && ym.abs() > 3.0)
    };
    let y_reduced = if needs_reduction {
        if u64::try_from(y.scale()).map_or(true, |s| s >= wp) {
            return Err(ApError::LossOfAccuracy { op: "exp" });
        }
        let angle_prec = wp + u64::try_from(y.scale()).unwrap_or(0) + EXTRA_PRECISION;
        let two_pi = {
            let p = pi::<W>(angle_prec, base)?;
            p.add(&p)
        };
        let turns = y
            .with_precision(angle_prec)
            .multiply(&real::inverse_root(&two_pi, 1, angle_prec)?)?;
        // Round to nearest turn count.
        let half = real::div_small(
            &ApFloat::from_i64_in_base(i64::from(y.signum()), base),
            2,
            4,
        );
        let m = turns.add(&half).truncated();
        y.with_precision(angle_prec)
            .subtract(&two_pi.multiply(&m)?)
            .with_precision(wp)
    } else {
        y.with_precision(wp)
    };

    // Real argument reduction, as in the real exponential.
    let x = z.re();
    let (m, e) = x.to_f64_parts();
    let ln_b = (base as f64).ln();
    if !x.is_zero() {
        let log_mag = m.abs().log10() + e as f64 * (base as f64).log10();
        if log_mag > (i64::MAX as f64 * ln_b).log10() {
            return Err(ApError::Overflow { op: "exp" });
        }
        if x.scale() > 0 && u64::try_from(x.scale()).map_or(true, |s| s >= wp) {
            return Err(ApError::LossOfAccuracy { op: "exp" });
        }
    }
    let x_f = m * (base as f64).powi(i32::try_from(e.clamp(-512, 512)).unwrap_or(0));
    let k = (x_f / ln_b).floor() as i64;
    let x_reduced = if k == 0 {
        x.with_precision(wp)
    } else {
        // The reduction cancels the words occupied by k·ln B.
        let guard = wp + EXTRA_PRECISION + real::shift_guard(k, base);
        let shift = ln_base::<W>(guard, base)?.multiply(&ApFloat::from_i64_in_base(k, base))?;
        x.with_precision(guard).subtract(&shift)
    };

    let zr = ApComplex::new(x_reduced, y_reduced);

    // Seed from f64 parts of the reduced argument.
    let (xm, xe) = zr.re().to_f64_parts();
    let (ym, ye) = zr.im().to_f64_parts();
    let b = base as f64;
    let xf = xm * b.powi(i32::try_from(xe.clamp(-64, 64)).unwrap_or(0));
    let yf = ym * b.powi(i32::try_from(ye.clamp(-64, 64)).unwrap_or(0));
    let mut w = ApComplex::new(
        ApFloat::<W>::from_f64_parts(xf.exp() * yf.cos(), 0, wp, base),
        ApFloat::<W>::from_f64_parts(xf.exp() * yf.sin(), 0, wp, base),
    );
    if w.is_zero() {
        w = one(base);
    }

    let mut p: u64 = 2;
    let mut precising = false;
    for iteration in 0..MAX_NEWTON_ITERATIONS {
        let at_target = p >= wp;
        p = (p * 2).min(wp);
        let wprec = w.with_precision(p);
        let ln_w = log_principal(&wprec, p + EXTRA_PRECISION, p)?;
        let mut delta = zr.with_precision(p).subtract(&ln_w);
        // A branch hop across ±π shows up as a ±2π offset in the delta;
        // unwrap it so the iteration stays on the target sheet.
        let pi_p = pi::<W>(p, base)?;
        let two_pi_p = pi_p.add(&pi_p);
        if delta.im().compare(&pi_p) == std::cmp::Ordering::Greater {
            delta = ApComplex::new(delta.re().clone(), delta.im().subtract(&two_pi_p));
        } else if delta.im().compare(&pi_p.negate()) == std::cmp::Ordering::Less {
            delta = ApComplex::new(delta.re().clone(), delta.im().add(&two_pi_p));
        }
        w = wprec.multiply(&one(base).add(&delta))?;
        tracing::trace!(iteration, p, "complex exp newton step");
        if at_target {
            if precising {
                break;
            }
            precising = true;
        }
    }
    w.scaled(k).map(|v| v.with_precision(prec))
}

/// z^w = e^(w·log z); 0^0 fails, 0^w needs Re w > 0 territory (positive
/// real part of the exponent's real component).
pub fn pow<W: NttWord>(z: &ApComplex<W>, w: &ApComplex<W>) -> Result<ApComplex<W>> {
    if z.is_zero() {
        if w.is_zero() {
            return Err(ApError::ZeroToZero);
        }
        if w.re().signum() > 0 {
            return Ok(ApComplex::from_real(ApFloat::zero_in_base(z.base())));
        }
        return Err(ApError::domain("pow", "zero base with a non-positive exponent"));
    }
    if w.is_zero() {
        return Ok(one(z.base()));
    }
    let ln_z = log(z)?;
    exp(&w.multiply(&ln_z)?)
}

/// cos z = (e^{iz} + e^{−iz}) / 2.
pub fn cos<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let prec = finite_precision(z, "cos")?;
    let u = exp(&stable_rotation(z))?;
    let inv = inverse_root(&u, 1, prec + EXTRA_PRECISION)?;
    let out = div_small(&u.add(&inv), 2, prec + EXTRA_PRECISION);
    Ok(fix_rotation(z, out).with_precision(prec))
}

/// sin z = (e^{iz} − e^{−iz}) / (2i).
pub fn sin<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let prec = finite_precision(z, "sin")?;
    let rotated = stable_rotation(z);
    let u = exp(&rotated)?;
    let inv = inverse_root(&u, 1, prec + EXTRA_PRECISION)?;
    // 1/(2i) = −i/2.
    let diff = u.subtract(&inv);
    let out = div_small(&diff.mul_i().negate(), 2, prec + EXTRA_PRECISION);
    // Undo the conjugation applied by the stable rotation.
    Ok(fix_rotation(z, out).with_precision(prec))
}

/// tan z = −i·(u² − 1)/(u² + 1) with u = e^{iz}; one exponential total.
pub fn tan<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let prec = finite_precision(z, "tan")?;
    let u2 = exp(&stable_rotation(z))?.square()?;
    let o = one(z.base());
    let den = u2.add(&o);
    if den.is_zero() {
        return Err(ApError::domain("tan", "tangent pole"));
    }
    let t = divide(&u2.subtract(&o), &den)?.mul_i().negate();
    Ok(fix_rotation(z, t).with_precision(prec))
}

/// Rotate z so the exponential argument iz has a non-positive real part:
/// for Im z < 0 take the conjugate (cos is even, sin flips sign — callers
/// undo it with [`fix_rotation`]).
fn stable_rotation<W: NttWord>(z: &ApComplex<W>) -> ApComplex<W> {
    if z.im().signum() < 0 {
        z.conjugate().mul_i()
    } else {
        z.mul_i()
    }
}

fn fix_rotation<W: NttWord>(z: &ApComplex<W>, out: ApComplex<W>) -> ApComplex<W> {
    if z.im().signum() < 0 {
        out.conjugate()
    } else {
        out
    }
}

/// cosh z = (e^z + e^{−z}) / 2.
pub fn cosh<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let prec = finite_precision(z, "cosh")?;
    let v = exp(&stable_negation(z))?;
    let inv = inverse_root(&v, 1, prec + EXTRA_PRECISION)?;
    Ok(div_small(&v.add(&inv), 2, prec + EXTRA_PRECISION).with_precision(prec))
}

/// sinh z = (e^z − e^{−z}) / 2.
pub fn sinh<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let prec = finite_precision(z, "sinh")?;
    let flipped = z.re().signum() < 0;
    let v = exp(&stable_negation(z))?;
    let inv = inverse_root(&v, 1, prec + EXTRA_PRECISION)?;
    let out = div_small(&v.subtract(&inv), 2, prec + EXTRA_PRECISION);
    Ok(if flipped { out.negate() } else { out }.with_precision(prec))
}

/// tanh z = (e^{2z} − 1)/(e^{2z} + 1).
pub fn tanh<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let prec = finite_precision(z, "tanh")?;
    let flipped = z.re().signum() < 0;
    let v2 = exp(&stable_negation(z))?.square()?;
    let o = one(z.base());
    let den = v2.add(&o);
    if den.is_zero() {
        return Err(ApError::domain("tanh", "hyperbolic tangent pole"));
    }
    let out = divide(&v2.subtract(&o), &den)?;
    Ok(if flipped { out.negate() } else { out }.with_precision(prec))
}

/// Negate into the half-plane where e^z does not overflow the exponent:
/// cosh is even and sinh/tanh are odd, so callers undo the flip.
fn stable_negation<W: NttWord>(z: &ApComplex<W>) -> ApComplex<W> {
    if z.re().signum() < 0 {
        z.negate()
    } else {
        z.clone()
    }
}

/// asin z = −i·log(iz + √(1 − z²)).
pub fn asin<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let prec = finite_precision(z, "asin")?;
    let o = one(z.base());
    let root = sqrt(&o.subtract(&z.square()?).with_precision(prec + EXTRA_PRECISION))?;
    let w = z.mul_i().add(&root);
    Ok(log(&w)?.mul_i().negate().with_precision(prec))
}

/// acos z = π/2 − asin z.
pub fn acos<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let prec = finite_precision(z, "acos")?;
    let half_pi = real::div_small(&pi::<W>(prec + EXTRA_PRECISION, z.base())?, 2, prec + EXTRA_PRECISION);
    let a = asin(z)?;
    Ok(ApComplex::new(half_pi.subtract(a.re()), a.im().negate()).with_precision(prec))
}

/// atan z = (i/2)·(log(1 − iz) − log(1 + iz)); fails at z = ±i.
pub fn atan<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let prec = finite_precision(z, "atan")?;
    let o = one(z.base());
    let iz = z.mul_i();
    let lo = o.subtract(&iz);
    let hi = o.add(&iz);
    if lo.is_zero() || hi.is_zero() {
        return Err(ApError::domain("atan", "arctangent pole at ±i"));
    }
    let d = log(&lo)?.subtract(&log(&hi)?);
    Ok(div_small(&d.mul_i(), 2, prec + EXTRA_PRECISION).with_precision(prec))
}

/// asinh z = log(z + √(z² + 1)).
pub fn asinh<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let prec = finite_precision(z, "asinh")?;
    let o = one(z.base());
    let root = sqrt(&z.square()?.add(&o).with_precision(prec + EXTRA_PRECISION))?;
    Ok(log(&z.add(&root))?.with_precision(prec))
}

/// acosh z = log(z + √(z² − 1)).
pub fn acosh<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let prec = finite_precision(z, "acosh")?;
    let o = one(z.base());
    let root = sqrt(&z.square()?.subtract(&o).with_precision(prec + EXTRA_PRECISION))?;
    Ok(log(&z.add(&root))?.with_precision(prec))
}

/// atanh z = (log(1 + z) − log(1 − z)) / 2; fails at z = ±1.
pub fn atanh<W: NttWord>(z: &ApComplex<W>) -> Result<ApComplex<W>> {
    let prec = finite_precision(z, "atanh")?;
    let o = one(z.base());
    let hi = o.add(z);
    let lo = o.subtract(z);
    if hi.is_zero() || lo.is_zero() {
        return Err(ApError::domain("atanh", "pole at ±1"));
    }
    let d = log(&hi)?.subtract(&log(&lo)?);
    Ok(div_small(&d, 2, prec + EXTRA_PRECISION).with_precision(prec))
}

/// Principal argument arg(z) = Im(log z) ∈ (−π, π].
pub fn arg<W: NttWord>(z: &ApComplex<W>) -> Result<ApFloat<W>> {
    Ok(log(z)?.into_parts().1)
}

/// Real cosine through e^{ix}.
pub fn cos_real<W: NttWord>(x: &ApFloat<W>) -> Result<ApFloat<W>> {
    let u = exp(&ApComplex::new(ApFloat::zero_in_base(x.base()), x.clone()))?;
    Ok(u.into_parts().0)
}

/// Real sine through e^{ix}.
pub fn sin_real<W: NttWord>(x: &ApFloat<W>) -> Result<ApFloat<W>> {
    let u = exp(&ApComplex::new(ApFloat::zero_in_base(x.base()), x.clone()))?;
    Ok(u.into_parts().1)
}

/// Real arctangent (imaginary residue of the complex formula discarded).
pub fn atan_real<W: NttWord>(x: &ApFloat<W>) -> Result<ApFloat<W>> {
    let a = atan(&ApComplex::from_real(x.clone()))?;
    Ok(a.into_parts().0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apnum_num::parse_float;

    const B: u64 = 1_000_000_000;

    fn f(s: &str) -> ApFloat<u32> {
        parse_float(s, 55, B).unwrap()
    }

    fn c(re: &str, im: &str) -> ApComplex<u32> {
        ApComplex::new(f(re), f(im))
    }

    fn assert_close(got: &ApFloat<u32>, expect: &str, words: u64) {
        let e = f(expect);
        assert!(
            got.equal_digits(&e) >= words,
            "expected ≈{expect}, got {got}"
        );
    }

    #[test]
    fn complex_inverse_root_squares_back() {
        let z = c("3", "4");
        let r = inverse_root(&z, 1, 6).unwrap();
        let back = z.multiply(&r).unwrap();
        // z·z⁻¹ = 1
        assert_close(back.re(), "1", 5);
        assert!(back.im().is_zero() || back.im().scale() < -4);
    }

    #[test]
    fn principal_square_root_of_minus_one_is_i() {
        let r = sqrt(&c("-1", "0")).unwrap();
        assert!(r.re().is_zero() || r.re().scale() < -4, "re ≈ 0, got {}", r.re());
        assert_close(r.im(), "1", 5);
    }

    #[test]
    fn complex_sqrt_matches_reference() {
        // √(3+4i) = 2 + i
        let r = sqrt(&c("3", "4")).unwrap();
        assert_close(r.re(), "2", 5);
        assert_close(r.im(), "1", 5);
    }

    #[test]
    fn complex_log_handles_the_left_half_plane() {
        // log(−1) = iπ
        let l = log(&c("-1", "0")).unwrap();
        assert!(l.re().is_zero() || l.re().scale() < -4);
        assert_close(l.im(), "3.1415926535897932384626433832795028841971693993751", 5);
        // log(i) = iπ/2
        let li = log(&c("0", "1")).unwrap();
        assert_close(li.im(), "1.5707963267948966192313216916397514420985846996876", 5);
    }

    #[test]
    fn exp_log_round_trip_on_a_complex_point() {
        let z = c("1.25", "0.75");
        let back = log(&exp(&z).unwrap()).unwrap();
        assert!(back.equal_digits(&z) >= 5, "log(exp(z)) = z, got {} + {}i", back.re(), back.im());
    }

    #[test]
    fn eulers_identity_holds() {
        // e^{iπ} = −1
        let pi_f = crate::consts::pi::<u32>(8, B).unwrap();
        let e_ipi = exp(&ApComplex::new(ApFloat::zero_in_base(B), pi_f)).unwrap();
        assert_close(e_ipi.re(), "-1", 5);
        assert!(e_ipi.im().is_zero() || e_ipi.im().scale() < -4);
    }

    #[test]
    fn sin_cos_match_references_on_reals() {
        // cos 1 = 0.54030230586813971740093660744297660373...
        let co = cos_real(&f("1")).unwrap();
        assert_close(&co, "0.5403023058681397174009366074429766037323104206179", 4);
        // sin 1 = 0.84147098480789650665250232163029899962...
        let si = sin_real(&f("1")).unwrap();
        assert_close(&si, "0.8414709848078965066525023216302989996225630607983", 4);
        // sin² + cos² = 1
        let unit = si.square().unwrap().add(&co.square().unwrap());
        assert_close(&unit, "1", 4);
    }

    #[test]
    fn tangent_matches_sine_over_cosine() {
        let z = c("0.5", "0.25");
        let t = tan(&z).unwrap();
        let quotient = divide(&sin(&z).unwrap(), &cos(&z).unwrap()).unwrap();
        assert!(t.equal_digits(&quotient) >= 4);
    }

    #[test]
    fn hyperbolics_satisfy_the_unit_identity() {
        // cosh² − sinh² = 1
        let z = c("0.8", "0.3");
        let ch = cosh(&z).unwrap();
        let sh = sinh(&z).unwrap();
        let d = ch.square().unwrap().subtract(&sh.square().unwrap());
        assert_close(d.re(), "1", 4);
        assert!(d.im().is_zero() || d.im().scale() < -3);
    }

    #[test]
    fn arc_functions_invert_the_forward_ones() {
        let z = c("0.4", "0.2");
        let round = sin(&asin(&z).unwrap()).unwrap();
        assert!(round.equal_digits(&z) >= 4, "sin(asin z) = z");
        let round_t = tan(&atan(&z).unwrap()).unwrap();
        assert!(round_t.equal_digits(&z) >= 4, "tan(atan z) = z");
    }

    #[test]
    fn atan_rejects_its_poles() {
        assert!(matches!(atan(&c("0", "1")), Err(ApError::Domain { .. })));
        assert!(matches!(atan(&c("0", "-1")), Err(ApError::Domain { .. })));
        assert!(matches!(atanh(&c("1", "0")), Err(ApError::Domain { .. })));
    }

    #[test]
    fn pow_handles_the_zero_rules() {
        let zero = ApComplex::<u32>::zero();
        assert!(matches!(pow(&zero, &zero), Err(ApError::ZeroToZero)));
        let z = c("2", "0");
        let p = pow(&z, &c("3", "0")).unwrap();
        assert_close(p.re(), "8", 4);
    }
}
