//! Elementary arithmetic modulo one NTT prime.
//!
//! A [`ModMath`] instance is bound to a single modulus at construction and
//! is `Copy`, so parallel workers each carry their own instance instead of
//! sharing a mutable modulus register. All residues are handled as `u64`
//! regardless of the element word width; products go through a 128-bit
//! intermediate.

use apnum_core::NttWord;

/// Modular arithmetic against one runtime-selected prime.
#[derive(Clone, Copy, Debug)]
pub struct ModMath {
    modulus: u64,
}

impl ModMath {
    /// Bind to an explicit modulus.
    #[inline]
    #[must_use]
    pub const fn new(modulus: u64) -> Self {
        Self { modulus }
    }

    /// Bind to the `idx`-th prime of the element type's triple.
    #[inline]
    #[must_use]
    pub fn for_modulus<W: NttWord>(idx: usize) -> Self {
        Self::new(W::MODULI[idx])
    }

    /// The bound modulus.
    #[inline]
    #[must_use]
    pub const fn modulus(&self) -> u64 {
        self.modulus
    }

    /// (a + b) mod p.
    #[inline]
    #[must_use]
    pub const fn mod_add(&self, a: u64, b: u64) -> u64 {
        let s = (a as u128) + (b as u128);
        if s >= self.modulus as u128 {
            (s - self.modulus as u128) as u64
        } else {
            s as u64
        }
    }

    /// (a − b) mod p.
    #[inline]
    #[must_use]
    pub const fn mod_subtract(&self, a: u64, b: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            ((a as u128) + (self.modulus as u128) - (b as u128)) as u64
        }
    }

    /// (a · b) mod p via a 128-bit intermediate.
    #[inline]
    #[must_use]
    pub const fn mod_multiply(&self, a: u64, b: u64) -> u64 {
        ((a as u128) * (b as u128) % (self.modulus as u128)) as u64
    }

    /// a^e mod p by square-and-multiply. Negative exponents substitute
    /// e ← p − 1 + e (Fermat); 0^0 is a caller-contract violation.
    #[must_use]
    pub fn mod_pow(&self, a: u64, e: i64) -> u64 {
        debug_assert!(!(a == 0 && e == 0), "0^0 is disallowed in mod_pow");
        let e = if e < 0 {
            // a^e = a^((p-1) - (|e| mod (p-1))) for a != 0 by Fermat.
            let r = e.unsigned_abs() % (self.modulus - 1);
            if r == 0 {
                0
            } else {
                self.modulus - 1 - r
            }
        } else {
            e as u64
        };
        self.mod_pow_unsigned(a, e)
    }

    fn mod_pow_unsigned(&self, mut a: u64, mut e: u64) -> u64 {
        let mut acc = 1u64;
        a %= self.modulus;
        while e > 0 {
            if e & 1 == 1 {
                acc = self.mod_multiply(acc, a);
            }
            a = self.mod_multiply(a, a);
            e >>= 1;
        }
        acc
    }

    /// a^(p−2) mod p: the multiplicative inverse for non-zero a.
    #[inline]
    #[must_use]
    pub fn mod_inverse(&self, a: u64) -> u64 {
        self.mod_pow_unsigned(a, self.modulus - 2)
    }

    /// a / b mod p.
    #[inline]
    #[must_use]
    pub fn mod_divide(&self, a: u64, b: u64) -> u64 {
        self.mod_multiply(a, self.mod_inverse(b))
    }

    /// −a mod p.
    #[inline]
    #[must_use]
    pub const fn negate(&self, a: u64) -> u64 {
        if a == 0 {
            0
        } else {
            self.modulus - a
        }
    }

    /// Root of unity for forward transforms of length `n`:
    /// g^(p−1−(p−1)/n). `n` must divide p − 1.
    #[must_use]
    pub fn forward_nth_root(&self, g: u64, n: u64) -> u64 {
        debug_assert_eq!((self.modulus - 1) % n, 0, "n must divide p-1");
        self.mod_pow_unsigned(g, self.modulus - 1 - (self.modulus - 1) / n)
    }

    /// Root of unity for inverse transforms of length `n`: g^((p−1)/n).
    #[must_use]
    pub fn inverse_nth_root(&self, g: u64, n: u64) -> u64 {
        debug_assert_eq!((self.modulus - 1) % n, 0, "n must divide p-1");
        self.mod_pow_unsigned(g, (self.modulus - 1) / n)
    }

    /// Twiddle table [w⁰, w¹, …, w^(n−1)].
    #[must_use]
    pub fn create_w_table(&self, w: u64, n: usize) -> Vec<u64> {
        let mut table = Vec::with_capacity(n);
        let mut cur = 1u64;
        for _ in 0..n {
            table.push(cur);
            cur = self.mod_multiply(cur, w);
        }
        table
    }
}
