//! Three-modulus NTT convolution: the multiplication hot path.
//!
//! `convolute` runs the same pipeline once per modulus: copy both operands
//! into zero-padded scratch storages, forward-transform, multiply pointwise,
//! inverse-transform, and finally lift the three residue streams through the
//! carry-CRT step into base-B digits. `auto_convolute` is the x = y
//! specialization with one forward transform per modulus.
//!
//! The shared-memory lock is taken before any scratch allocation when the
//! transform data size crosses the configured threshold, and the guard is
//! dropped on every exit path. The third residue stream stays cached for the
//! CRT pass; the first two may spill to disk under the memory budget.

use crate::carry_crt::CarryCrt;
use apnum_core::storage::DISK_BLOCK_WORDS;
use apnum_core::{ApError, Context, DataStorage, DataStorageBuilder, NttWord, Result};
use apnum_ntt::{ModMath, NttBuilder};

/// Convolution engine bound to one element type and base.
#[derive(Clone, Debug)]
pub struct ConvolutionEngine<W: NttWord> {
    ctx: Context,
    base: u64,
    builder: NttBuilder<W>,
    storage_builder: DataStorageBuilder,
    crt: CarryCrt<W>,
}

impl<W: NttWord> ConvolutionEngine<W> {
    /// Engine over the element type's default decimal base.
    #[must_use]
    pub fn new(ctx: Context) -> Self {
        Self::with_base(ctx, W::DEFAULT_BASE)
    }

    /// Engine over an explicit base.
    #[must_use]
    pub fn with_base(ctx: Context, base: u64) -> Self {
        Self {
            builder: NttBuilder::new(ctx.clone()),
            storage_builder: DataStorageBuilder::new(&ctx),
            crt: CarryCrt::new(base),
            ctx,
            base,
        }
    }

    /// The digit base this engine multiplies in.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Exact product of two little-endian digit sequences, emitted as
    /// `result_size` base-B digits.
    ///
    /// Passing the same storage for `x` and `y` switches to the squaring
    /// path automatically.
    pub fn convolute(
        &self,
        x: &DataStorage<W>,
        y: &DataStorage<W>,
        result_size: usize,
    ) -> Result<DataStorage<W>> {
        if std::ptr::eq(x, y) {
            return self.auto_convolute(x, result_size);
        }
        let n = self.transform_size(x.len() + y.len())?;
        let _guard = self.ctx.lock_shared_memory(n * W::BYTES);
        tracing::debug!(n, xlen = x.len(), ylen = y.len(), "convolute");

        let strategy = self.builder.build(n as u64)?;
        let mut residues = Vec::with_capacity(3);
        for modulus in 0..3 {
            let mut sx = self.scratch(n, modulus)?;
            self.load_operand(x, &mut sx, modulus)?;
            let mut sy = self.scratch(n, modulus)?;
            self.load_operand(y, &mut sy, modulus)?;

            strategy.transform(&mut sx, modulus)?;
            strategy.transform(&mut sy, modulus)?;
            pointwise_multiply::<W>(&mut sx, &sy, modulus)?;
            drop(sy);
            strategy.inverse_transform(&mut sx, modulus, n as u64)?;
            residues.push(sx);
        }

        self.recombine(&residues, result_size)
    }

    /// Squaring specialization: one forward transform per modulus.
    pub fn auto_convolute(&self, x: &DataStorage<W>, result_size: usize) -> Result<DataStorage<W>> {
        let n = self.transform_size(x.len() * 2)?;
        let _guard = self.ctx.lock_shared_memory(n * W::BYTES);
        tracing::debug!(n, xlen = x.len(), "auto-convolute");

        let strategy = self.builder.build(n as u64)?;
        let mut residues = Vec::with_capacity(3);
        for modulus in 0..3 {
            let mut sx = self.scratch(n, modulus)?;
            self.load_operand(x, &mut sx, modulus)?;
            strategy.transform(&mut sx, modulus)?;
            pointwise_square::<W>(&mut sx, modulus)?;
            strategy.inverse_transform(&mut sx, modulus, n as u64)?;
            residues.push(sx);
        }

        self.recombine(&residues, result_size)
    }

    fn recombine(&self, residues: &[DataStorage<W>], result_size: usize) -> Result<DataStorage<W>> {
        let mut result = self.storage_builder.create::<W>(result_size)?;
        self.crt.carry_crt(
            [&residues[0], &residues[1], &residues[2]],
            &mut result,
            result_size,
        )?;
        Ok(result)
    }

    fn transform_size(&self, product_len: usize) -> Result<usize> {
        let n = NttBuilder::<W>::transform_length(product_len as u64);
        if n > W::MAX_TRANSFORM_LENGTH {
            return Err(ApError::resource(format!(
                "product of {product_len} digits exceeds the element type's transform limit"
            )));
        }
        if !W::crt_bound_holds(n, self.base) {
            return Err(ApError::resource(format!(
                "base {} digits cannot be reconstructed at transform length {n}",
                self.base
            )));
        }
        Ok(n as usize)
    }

    /// Scratch storage for one residue stream. The last stream is kept
    /// cached for the CRT pass; earlier ones may spill to disk.
    fn scratch(&self, n: usize, modulus: usize) -> Result<DataStorage<W>> {
        if modulus == 2 {
            Ok(self.storage_builder.create_cached::<W>(n))
        } else {
            self.storage_builder.create::<W>(n)
        }
    }

    /// Copy the operand digits into the zero-padded scratch, reduced mod p.
    fn load_operand(
        &self,
        src: &DataStorage<W>,
        scratch: &mut DataStorage<W>,
        modulus: usize,
    ) -> Result<()> {
        let p = W::MODULI[modulus];
        let len = src.len();
        let mut reader = src.reader(0..len)?;
        let mut writer = scratch.writer(0..len)?;
        for _ in 0..len {
            let digit = reader.next_word()?.to_u64();
            writer.write_word(W::from_u64(digit % p))?;
        }
        writer.finish()
    }
}

/// x[i] <- x[i]·y[i] mod p, streamed block-wise.
fn pointwise_multiply<W: NttWord>(
    x: &mut DataStorage<W>,
    y: &DataStorage<W>,
    modulus: usize,
) -> Result<()> {
    let mm = ModMath::for_modulus::<W>(modulus);
    let n = x.len();
    let mut ybuf = vec![W::default(); DISK_BLOCK_WORDS.min(n)];
    let mut pos = 0usize;
    while pos < n {
        let chunk = ybuf.len().min(n - pos);
        y.read_block(pos, &mut ybuf[..chunk])?;
        let yb = &ybuf;
        x.modify_blocks(pos..pos + chunk, |off, block| {
            for (i, v) in block.iter_mut().enumerate() {
                let prod = mm.mod_multiply(v.to_u64(), yb[off - pos + i].to_u64());
                *v = W::from_u64(prod);
            }
        })?;
        pos += chunk;
    }
    Ok(())
}

/// x[i] <- x[i]² mod p, streamed block-wise.
fn pointwise_square<W: NttWord>(x: &mut DataStorage<W>, modulus: usize) -> Result<()> {
    let mm = ModMath::for_modulus::<W>(modulus);
    let n = x.len();
    x.modify_blocks(0..n, |_, block| {
        for v in block.iter_mut() {
            let w = v.to_u64();
            *v = W::from_u64(mm.mod_multiply(w, w));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Schoolbook product of little-endian digit sequences, as u128 carries.
    fn schoolbook(x: &[u64], y: &[u64], base: u64, size: usize) -> Vec<u64> {
        let mut acc = vec![0u128; size + 1];
        for (i, &a) in x.iter().enumerate() {
            for (j, &b) in y.iter().enumerate() {
                let mut k = i + j;
                let mut add = u128::from(a) * u128::from(b);
                while add > 0 && k < acc.len() {
                    let s = acc[k] + add % u128::from(base);
                    acc[k] = s % u128::from(base);
                    add = add / u128::from(base) + s / u128::from(base);
                    k += 1;
                }
            }
        }
        acc.truncate(size);
        acc.iter().map(|&v| v as u64).collect()
    }

    fn digits<W: NttWord>(v: &[u64]) -> DataStorage<W> {
        DataStorage::from_words(v.iter().map(|&d| W::from_u64(d)).collect())
    }

    fn check_product<W: NttWord>(x: &[u64], y: &[u64]) {
        let engine = ConvolutionEngine::<W>::new(Context::default());
        let size = x.len() + y.len();
        let expect = schoolbook(x, y, W::DEFAULT_BASE, size);

        let xs = digits::<W>(x);
        let ys = digits::<W>(y);
        let got = engine.convolute(&xs, &ys, size).unwrap();
        let got: Vec<u64> = got.as_slice().unwrap().iter().map(|&w| w.to_u64()).collect();
        assert_eq!(got, expect);
    }

    #[test]
    fn small_products_match_schoolbook() {
        check_product::<u32>(&[123_456_789], &[987_654_321]);
        check_product::<u32>(&[999_999_999, 999_999_999], &[999_999_999]);
        check_product::<u16>(&[9_999, 9_999, 42], &[1, 2, 3]);
        check_product::<u64>(
            &[999_999_999_999_999_999, 123_456_789_012_345_678],
            &[987_654_321_098_765_432, 1],
        );
    }

    #[test]
    fn longer_products_match_schoolbook() {
        let x: Vec<u64> = (0..40).map(|i| (i * 777_777_777 + 5) % 1_000_000_000).collect();
        let y: Vec<u64> = (0..33).map(|i| (i * 123_456_789 + 9) % 1_000_000_000).collect();
        check_product::<u32>(&x, &y);
    }

    #[test]
    fn auto_convolute_matches_convolute() {
        let engine = ConvolutionEngine::<u32>::new(Context::default());
        let x: Vec<u64> = (0..17).map(|i| (i * 999_999_937 + 3) % 1_000_000_000).collect();
        let xs = digits::<u32>(&x);
        let ys = digits::<u32>(&x);
        let size = 2 * x.len();

        let sq = engine.auto_convolute(&xs, size).unwrap();
        let prod = engine.convolute(&xs, &ys, size).unwrap();
        assert_eq!(sq.as_slice().unwrap(), prod.as_slice().unwrap());

        // Same-storage aliasing takes the squaring path.
        let aliased = engine.convolute(&xs, &xs, size).unwrap();
        assert_eq!(aliased.as_slice().unwrap(), sq.as_slice().unwrap());
    }

    #[test]
    fn truncation_and_padding_honor_result_size() {
        let engine = ConvolutionEngine::<u32>::new(Context::default());
        let xs = digits::<u32>(&[7]);
        let ys = digits::<u32>(&[6]);
        let got = engine.convolute(&xs, &ys, 4).unwrap();
        assert_eq!(
            got.as_slice().unwrap(),
            &[42, 0, 0, 0],
            "short products zero-pad to the requested size"
        );
    }
}
