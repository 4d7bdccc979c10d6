//! Two-pass FNT for transforms larger than the memory budget.
//!
//! Structurally the six-step decomposition, but the r×c matrix lives in
//! disk-backed storage and is touched in exactly two passes: a column pass
//! that gathers blocks of adjacent columns (with the w^(i·j) twiddles folded
//! in), and a sequential row pass. The output is left in transposed order —
//! element X[j·r + i] sits at position i·c + j — and the inverse transform
//! mirrors the passes exactly, so convolution (which runs forward, pointwise
//! multiply, then inverse with the same strategy instance) is unaffected.

use crate::modmath::ModMath;
use crate::table::fnt_in_place;
use apnum_core::storage::DISK_BLOCK_WORDS;
use apnum_core::{DataStorage, NttWord, Result};

/// Strategy for transforms that exceed the main-memory budget.
#[derive(Clone, Copy, Debug)]
pub struct TwoPassFnt {
    len: usize,
}

impl TwoPassFnt {
    /// A two-pass FNT of power-of-two length `len`.
    #[must_use]
    pub fn new(len: usize) -> Self {
        debug_assert!(len.is_power_of_two() || len <= 1);
        Self { len }
    }

    /// Transform length.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Forward transform of the whole storage (output transposed).
    pub fn transform<W: NttWord>(&self, storage: &mut DataStorage<W>, modulus: usize) -> Result<()> {
        self.transform_range(storage, 0, modulus)
    }

    /// Inverse transform including the 1/`total_len` normalization.
    pub fn inverse_transform<W: NttWord>(
        &self,
        storage: &mut DataStorage<W>,
        modulus: usize,
        total_len: u64,
    ) -> Result<()> {
        self.inverse_transform_range(storage, 0, modulus, total_len)
    }

    pub(crate) fn transform_range<W: NttWord>(
        &self,
        storage: &mut DataStorage<W>,
        offset: usize,
        modulus: usize,
    ) -> Result<()> {
        let n = self.len;
        if n < 4 {
            return crate::table::TableFnt::new(n).transform_range(storage, offset, modulus);
        }
        let mm = ModMath::for_modulus::<W>(modulus);
        let w = mm.forward_nth_root(W::PRIMITIVE_ROOTS[modulus], n as u64);
        let (r, c) = split(n);

        self.column_pass(storage, offset, &mm, w, r, c, true, None)?;
        self.row_pass(storage, offset, &mm, w, r, c, None)
    }

    pub(crate) fn inverse_transform_range<W: NttWord>(
        &self,
        storage: &mut DataStorage<W>,
        offset: usize,
        modulus: usize,
        total_len: u64,
    ) -> Result<()> {
        let n = self.len;
        if n < 4 {
            return crate::table::TableFnt::new(n)
                .inverse_transform_range(storage, offset, modulus, total_len);
        }
        let mm = ModMath::for_modulus::<W>(modulus);
        let w = mm.inverse_nth_root(W::PRIMITIVE_ROOTS[modulus], n as u64);
        let scale = mm.mod_inverse(total_len % mm.modulus());
        let (r, c) = split(n);

        self.row_pass(storage, offset, &mm, w, r, c, None)?;
        self.column_pass(storage, offset, &mm, w, r, c, false, Some(scale))
    }

    /// Gather blocks of adjacent columns, transform each length-r column,
    /// and apply the w^(i·j) twiddles: after the transform on the forward
    /// pass, before it on the inverse pass.
    #[allow(clippy::too_many_arguments)]
    fn column_pass<W: NttWord>(
        &self,
        storage: &mut DataStorage<W>,
        offset: usize,
        mm: &ModMath,
        w: u64,
        r: usize,
        c: usize,
        forward: bool,
        scale: Option<u64>,
    ) -> Result<()> {
        let group = (DISK_BLOCK_WORDS / r).clamp(1, c);
        let table = {
            let w_r = mm.mod_pow(w, c as i64);
            mm.create_w_table(w_r, (r / 2).max(1))
        };
        let mut buf = vec![W::default(); r * group];
        let mut col = vec![W::default(); r];

        let mut j0 = 0usize;
        while j0 < c {
            let g = group.min(c - j0);
            // Prefetch: r row segments of g adjacent columns.
            for i in 0..r {
                storage.read_block(offset + i * c + j0, &mut buf[i * g..i * g + g])?;
            }
            for jj in 0..g {
                let j = j0 + jj;
                let w_j = mm.mod_pow(w, j as i64);
                for i in 0..r {
                    col[i] = buf[i * g + jj];
                }
                if forward {
                    fnt_in_place(mm, &mut col, &table);
                    apply_twiddle(mm, &mut col, w_j, None);
                } else {
                    apply_twiddle(mm, &mut col, w_j, scale);
                    fnt_in_place(mm, &mut col, &table);
                }
                for i in 0..r {
                    buf[i * g + jj] = col[i];
                }
            }
            for i in 0..r {
                storage.write_block(offset + i * c + j0, &buf[i * g..i * g + g])?;
            }
            j0 += g;
        }
        Ok(())
    }

    /// Sequentially transform each length-c row.
    #[allow(clippy::too_many_arguments)]
    fn row_pass<W: NttWord>(
        &self,
        storage: &mut DataStorage<W>,
        offset: usize,
        mm: &ModMath,
        w: u64,
        r: usize,
        c: usize,
        scale: Option<u64>,
    ) -> Result<()> {
        let table = {
            let w_c = mm.mod_pow(w, r as i64);
            mm.create_w_table(w_c, (c / 2).max(1))
        };
        let mut row = vec![W::default(); c];
        for i in 0..r {
            storage.read_block(offset + i * c, &mut row)?;
            fnt_in_place(mm, &mut row, &table);
            if let Some(s) = scale {
                for x in row.iter_mut() {
                    *x = W::from_u64(mm.mod_multiply(x.to_u64(), s));
                }
            }
            storage.write_block(offset + i * c, &row)?;
        }
        Ok(())
    }
}

/// r·c = n with r the smaller power of two.
fn split(n: usize) -> (usize, usize) {
    let logn = n.trailing_zeros() as usize;
    let r = 1usize << (logn / 2);
    (r, n / r)
}

/// Multiply column element i by w_j^i (and optionally by a constant scale).
fn apply_twiddle<W: NttWord>(mm: &ModMath, col: &mut [W], w_j: u64, scale: Option<u64>) {
    let mut cur = match scale {
        Some(s) => s,
        None => 1,
    };
    // With a scale this walks s·w_j^i; the scale is constant per element, so
    // folding it into the running power is exact.
    for x in col.iter_mut() {
        *x = W::from_u64(mm.mod_multiply(x.to_u64(), cur));
        cur = mm.mod_multiply(cur, w_j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[inline]
    fn det_vec(n: usize, seed: u64, p: u64) -> Vec<u64> {
        let mut s = seed;
        (0..n)
            .map(|i| {
                s = s.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (s ^ (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)) % p
            })
            .collect()
    }

    #[test]
    fn round_trips_on_disk_storage() {
        for n in [16usize, 256, 1024] {
            let p = <u32 as NttWord>::MODULI[0];
            let a64 = det_vec(n, 21, p);
            let words: Vec<u32> = a64.iter().map(|&v| v as u32).collect();

            let mut s = DataStorage::disk(n).unwrap();
            s.write_block(0, &words).unwrap();

            let fnt = TwoPassFnt::new(n);
            fnt.transform(&mut s, 0).unwrap();
            fnt.inverse_transform(&mut s, 0, n as u64).unwrap();

            let mut got = vec![0u32; n];
            s.read_block(0, &mut got).unwrap();
            assert_eq!(got, words, "n = {n}");
        }
    }

    #[test]
    fn forward_is_a_transposed_dft() {
        // Compare against the six-step natural-order transform.
        use crate::six_step::SixStepFnt;
        let n = 64usize;
        let (r, c) = split(n);
        let p = <u32 as NttWord>::MODULI[1];
        let a64 = det_vec(n, 3, p);
        let words: Vec<u32> = a64.iter().map(|&v| v as u32).collect();

        let mut natural = DataStorage::from_words(words.clone());
        SixStepFnt::new(n, false).transform(&mut natural, 1).unwrap();
        let natural = natural.as_slice().unwrap().to_vec();

        let mut s = DataStorage::from_words(words);
        TwoPassFnt::new(n).transform(&mut s, 1).unwrap();
        let transposed = s.as_slice().unwrap();

        for i in 0..r {
            for j in 0..c {
                assert_eq!(transposed[i * c + j], natural[j * r + i]);
            }
        }
    }
}
