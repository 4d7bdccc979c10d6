//! Complex numbers: a pair of digit-sequence reals sharing one base.

use crate::apfloat::{ApFloat, INFINITE};
use apnum_core::{NttWord, Result};

/// Arbitrary-precision complex number.
#[derive(Clone, Debug)]
pub struct ApComplex<W: NttWord> {
    re: ApFloat<W>,
    im: ApFloat<W>,
}

impl<W: NttWord> ApComplex<W> {
    /// Build from real and imaginary parts.
    #[must_use]
    pub fn new(re: ApFloat<W>, im: ApFloat<W>) -> Self {
        debug_assert_eq!(re.base(), im.base());
        Self { re, im }
    }

    /// Purely real value.
    #[must_use]
    pub fn from_real(re: ApFloat<W>) -> Self {
        let im = ApFloat::zero_in_base(re.base());
        Self { re, im }
    }

    /// Zero in the default base.
    #[must_use]
    pub fn zero() -> Self {
        Self::from_real(ApFloat::zero())
    }

    /// The imaginary unit in the default base.
    #[must_use]
    pub fn i() -> Self {
        Self::new(ApFloat::zero(), ApFloat::from_i64(1))
    }

    /// Real part.
    #[must_use]
    pub const fn re(&self) -> &ApFloat<W> {
        &self.re
    }

    /// Imaginary part.
    #[must_use]
    pub const fn im(&self) -> &ApFloat<W> {
        &self.im
    }

    /// Decompose into parts.
    #[must_use]
    pub fn into_parts(self) -> (ApFloat<W>, ApFloat<W>) {
        (self.re, self.im)
    }

    /// The shared base.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.re.base()
    }

    /// Whether both parts are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.re.is_zero() && self.im.is_zero()
    }

    /// Whether the value is purely real.
    #[must_use]
    pub fn is_real(&self) -> bool {
        self.im.is_zero()
    }

    /// Working precision: the minimum over the non-zero parts.
    #[must_use]
    pub fn precision(&self) -> u64 {
        match (self.re.is_zero(), self.im.is_zero()) {
            (false, false) => self.re.precision().min(self.im.precision()),
            (false, true) => self.re.precision(),
            (true, false) => self.im.precision(),
            (true, true) => INFINITE,
        }
    }

    /// Both parts truncated to `precision` words.
    #[must_use]
    pub fn with_precision(&self, precision: u64) -> Self {
        Self {
            re: self.re.with_precision(precision),
            im: self.im.with_precision(precision),
        }
    }

    /// Negation.
    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            re: self.re.negate(),
            im: self.im.negate(),
        }
    }

    /// Complex conjugate.
    #[must_use]
    pub fn conjugate(&self) -> Self {
        Self {
            re: self.re.clone(),
            im: self.im.negate(),
        }
    }

    /// Multiplication by the imaginary unit: (a + bi)·i = −b + ai.
    #[must_use]
    pub fn mul_i(&self) -> Self {
        Self {
            re: self.im.negate(),
            im: self.re.clone(),
        }
    }

    /// Sum.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self {
            re: self.re.add(&other.re),
            im: self.im.add(&other.im),
        }
    }

    /// Difference.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        Self {
            re: self.re.subtract(&other.re),
            im: self.im.subtract(&other.im),
        }
    }

    /// Product: (ac − bd) + (ad + bc)i.
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        let ac = self.re.multiply(&other.re)?;
        let bd = self.im.multiply(&other.im)?;
        let ad = self.re.multiply(&other.im)?;
        let bc = self.im.multiply(&other.re)?;
        Ok(Self {
            re: ac.subtract(&bd),
            im: ad.add(&bc),
        })
    }

    /// Square: (a² − b²) + 2abi, using the squaring transform path.
    pub fn square(&self) -> Result<Self> {
        let aa = self.re.square()?;
        let bb = self.im.square()?;
        let ab = self.re.multiply(&self.im)?;
        Ok(Self {
            re: aa.subtract(&bb),
            im: ab.add(&ab),
        })
    }

    /// |z|² = a² + b², a real value.
    pub fn norm_sqr(&self) -> Result<ApFloat<W>> {
        Ok(self.re.square()?.add(&self.im.square()?))
    }

    /// Multiply both parts by B^k.
    pub fn scaled(&self, k: i64) -> Result<Self> {
        Ok(Self {
            re: self.re.scaled(k)?,
            im: self.im.scaled(k)?,
        })
    }

    /// Words of agreement between `self` and `other`, taken over both parts.
    #[must_use]
    pub fn equal_digits(&self, other: &Self) -> u64 {
        let re = self.re.equal_digits(&other.re);
        let im = self.im.equal_digits(&other.im);
        re.min(im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    type C = ApComplex<u32>;
    type F = ApFloat<u32>;

    fn c(re: i64, im: i64) -> C {
        C::new(F::from_i64(re), F::from_i64(im))
    }

    #[test]
    fn multiplication_follows_the_field_rules() {
        // (3 + 4i)(1 - 2i) = 11 - 2i
        let p = c(3, 4).multiply(&c(1, -2)).unwrap();
        assert_eq!(p.re().compare(&F::from_i64(11)), Ordering::Equal);
        assert_eq!(p.im().compare(&F::from_i64(-2)), Ordering::Equal);

        // i² = −1
        let i2 = C::i().multiply(&C::i()).unwrap();
        assert_eq!(i2.re().compare(&F::from_i64(-1)), Ordering::Equal);
        assert!(i2.im().is_zero());
    }

    #[test]
    fn square_matches_multiply() {
        let z = c(12_345, -678);
        let a = z.square().unwrap();
        let b = z.multiply(&z).unwrap();
        assert_eq!(a.re().compare(b.re()), Ordering::Equal);
        assert_eq!(a.im().compare(b.im()), Ordering::Equal);
    }

    #[test]
    fn norm_and_conjugate_agree() {
        let z = c(3, 4);
        let n = z.norm_sqr().unwrap();
        assert_eq!(n.compare(&F::from_i64(25)), Ordering::Equal);
        let zz = z.multiply(&z.conjugate()).unwrap();
        assert_eq!(zz.re().compare(&n), Ordering::Equal);
        assert!(zz.im().is_zero());
    }

    #[test]
    fn mul_i_rotates_by_a_quarter_turn() {
        let z = c(5, 7);
        let rotated = z.mul_i();
        assert_eq!(rotated.re().compare(&F::from_i64(-7)), Ordering::Equal);
        assert_eq!(rotated.im().compare(&F::from_i64(5)), Ordering::Equal);
        // Four rotations return to the start.
        let back = rotated.mul_i().mul_i().mul_i();
        assert_eq!(back.re().compare(z.re()), Ordering::Equal);
        assert_eq!(back.im().compare(z.im()), Ordering::Equal);
    }
}
