//! Six-step FNT: Bailey's matrix decomposition for transforms that fit in
//! main memory but not in cache.
//!
//! Length N = r·c is treated as an r×c row-major matrix. The six steps are
//! transpose, column transforms, twiddle multiplication by w^(i·j),
//! transpose, row transforms, and a final transpose, which yields a true
//! natural-order DFT. Between transposes every pass streams over
//! cache-resident rows.
//!
//! The row/column passes run on the rayon pool when the column count fits
//! a 32-bit index and the storage is cached; disk-backed or tiny transforms
//! run sequentially.

use crate::modmath::ModMath;
use crate::table::{fnt_in_place, with_cached_range};
use apnum_core::{DataStorage, NttWord, Result};
use rayon::prelude::*;

/// Strategy for power-of-two transforms held in main memory.
#[derive(Clone, Copy, Debug)]
pub struct SixStepFnt {
    len: usize,
    parallel: bool,
}

impl SixStepFnt {
    /// A six-step FNT of power-of-two length `len`; `parallel` enables the
    /// rayon row/column kernels when the runtime predicate also holds.
    #[must_use]
    pub fn new(len: usize, parallel: bool) -> Self {
        debug_assert!(len.is_power_of_two() || len <= 1);
        Self { len, parallel }
    }

    /// Transform length.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Forward transform of the whole storage.
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
        let mm = ModMath::for_modulus::<W>(modulus);
        let w = mm.forward_nth_root(W::PRIMITIVE_ROOTS[modulus], self.len as u64);
        let run_parallel = self.parallel && storage.is_cached();
        let len = self.len;
        with_cached_range(storage, offset, len, |a| {
            six_step_in_place(&mm, a, w, None, run_parallel);
            Ok(())
        })
    }

    pub(crate) fn inverse_transform_range<W: NttWord>(
        &self,
        storage: &mut DataStorage<W>,
        offset: usize,
        modulus: usize,
        total_len: u64,
    ) -> Result<()> {
        let mm = ModMath::for_modulus::<W>(modulus);
        let w = mm.inverse_nth_root(W::PRIMITIVE_ROOTS[modulus], self.len as u64);
        let scale = mm.mod_inverse(total_len % mm.modulus());
        let run_parallel = self.parallel && storage.is_cached();
        let len = self.len;
        with_cached_range(storage, offset, len, |a| {
            six_step_in_place(&mm, a, w, Some(scale), run_parallel);
            Ok(())
        })
    }
}

/// Shared six-step kernel; `scale` folds the inverse normalization into the
/// final transpose.
pub(crate) fn six_step_in_place<W: NttWord>(
    mm: &ModMath,
    a: &mut [W],
    w: u64,
    scale: Option<u64>,
    parallel: bool,
) {
    let n = a.len();
    if n < 4 {
        let table = mm.create_w_table(w, (n / 2).max(1));
        fnt_in_place(mm, a, &table);
        if let Some(s) = scale {
            for x in a.iter_mut() {
                *x = W::from_u64(mm.mod_multiply(x.to_u64(), s));
            }
        }
        return;
    }

    let logn = n.trailing_zeros() as usize;
    let r = 1usize << (logn / 2);
    let c = n / r;
    let parallel = parallel && u32::try_from(c).is_ok();

    // Step 1: transpose the r x c matrix into c x r.
    let mut b = vec![W::default(); n];
    for i in 0..r {
        for j in 0..c {
            b[j * r + i] = a[i * c + j];
        }
    }

    // Step 2: length-r transforms down the original columns, now rows.
    let w_r = mm.mod_pow(w, c as i64);
    run_rows(mm, &mut b, r, w_r, parallel);

    // Step 3: multiply element (i, j) by w^(i*j), row-incrementally.
    let twiddle_row = |(j, row): (usize, &mut [W])| {
        let mm = *mm;
        let w_j = mm.mod_pow(w, j as i64);
        let mut cur = 1u64;
        for x in row.iter_mut() {
            *x = W::from_u64(mm.mod_multiply(x.to_u64(), cur));
            cur = mm.mod_multiply(cur, w_j);
        }
    };
    if parallel {
        b.par_chunks_mut(r).enumerate().for_each(twiddle_row);
    } else {
        b.chunks_mut(r).enumerate().for_each(twiddle_row);
    }

    // Step 4: transpose back to r x c.
    for j in 0..c {
        for i in 0..r {
            a[i * c + j] = b[j * r + i];
        }
    }

    // Step 5: length-c transforms along the rows.
    let w_c = mm.mod_pow(w, r as i64);
    run_rows(mm, a, c, w_c, parallel);

    // Step 6: final transpose (with the inverse scaling folded in).
    for i in 0..r {
        for j in 0..c {
            b[j * r + i] = a[i * c + j];
        }
    }
    match scale {
        Some(s) => {
            for (x, &y) in a.iter_mut().zip(b.iter()) {
                *x = W::from_u64(mm.mod_multiply(y.to_u64(), s));
            }
        }
        None => a.copy_from_slice(&b),
    }
}

/// Transform every `row_len`-sized row of `data` with root `w_row`.
fn run_rows<W: NttWord>(mm: &ModMath, data: &mut [W], row_len: usize, w_row: u64, parallel: bool) {
    let table = mm.create_w_table(w_row, (row_len / 2).max(1));
    if parallel {
        data.par_chunks_mut(row_len).for_each(|row| {
            // Workers carry their own copy of the modulus register.
            let mm = *mm;
            fnt_in_place(&mm, row, &table);
        });
    } else {
        for row in data.chunks_mut(row_len) {
            fnt_in_place(mm, row, &table);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableFnt;

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
    fn agrees_with_table_fnt() {
        for n in [16usize, 64, 512, 1024] {
            let p = <u32 as NttWord>::MODULI[2];
            let a64 = det_vec(n, 42, p);
            let words: Vec<u32> = a64.iter().map(|&v| v as u32).collect();

            let mut expect = DataStorage::from_words(words.clone());
            TableFnt::new(n).transform(&mut expect, 2).unwrap();

            let mut got = DataStorage::from_words(words);
            SixStepFnt::new(n, false).transform(&mut got, 2).unwrap();

            assert_eq!(got.as_slice().unwrap(), expect.as_slice().unwrap(), "n = {n}");
        }
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let n = 4096usize;
        let p = <u64 as NttWord>::MODULI[0];
        let a64 = det_vec(n, 99, p);

        let mut seq = DataStorage::from_words(a64.clone());
        SixStepFnt::new(n, false).transform(&mut seq, 0).unwrap();
        let mut par = DataStorage::from_words(a64);
        SixStepFnt::new(n, true).transform(&mut par, 0).unwrap();

        assert_eq!(seq.as_slice().unwrap(), par.as_slice().unwrap());
    }

    #[test]
    fn inverse_round_trips() {
        let n = 256usize;
        let p = <u32 as NttWord>::MODULI[0];
        let a64 = det_vec(n, 5, p);
        let words: Vec<u32> = a64.iter().map(|&v| v as u32).collect();

        let mut s = DataStorage::from_words(words.clone());
        let fnt = SixStepFnt::new(n, false);
        fnt.transform(&mut s, 0).unwrap();
        fnt.inverse_transform(&mut s, 0, n as u64).unwrap();
        assert_eq!(s.as_slice().unwrap(), &words[..]);
    }
}
