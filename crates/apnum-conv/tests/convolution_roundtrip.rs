//! End-to-end convolution checks: squaring and multiplying digit sequences
//! for all three element types, bit-exactly against reference arithmetic.

use apnum_conv::ConvolutionEngine;
use apnum_core::{Context, DataStorage, NttWord};
use proptest::prelude::*;

fn digits<W: NttWord>(v: &[u64]) -> DataStorage<W> {
    DataStorage::from_words(v.iter().map(|&d| W::from_u64(d)).collect())
}

/// Schoolbook product of little-endian digit sequences.
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

/// 10^1000 + 1 squared comes back as 10^2000 + 2·10^1000 + 1 (base 10^9:
/// one thousand decimal digits span 112 words, with the leading digit 10).
#[test]
fn power_of_ten_square_round_trips() {
    let mut x = vec![0u64; 112];
    x[0] = 1;
    x[111] = 10;
    let engine = ConvolutionEngine::<u32>::new(Context::default());
    let got = engine.auto_convolute(&digits::<u32>(&x), 224).unwrap();
    let got: Vec<u64> = got.as_slice().unwrap().iter().map(|&w| u64::from(w)).collect();

    let mut expect = vec![0u64; 224];
    expect[0] = 1; // 1
    expect[111] = 20; // 2·10^1000
    expect[222] = 100; // 10^2000
    assert_eq!(got, expect);
}

#[test]
fn random_squares_round_trip_all_element_types() {
    fn check<W: NttWord>(seed: u64) {
        let base = W::DEFAULT_BASE;
        let len = 25usize;
        let mut s = seed;
        let x: Vec<u64> = (0..len)
            .map(|_| {
                s = s.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
                s % base
            })
            .collect();
        let engine = ConvolutionEngine::<W>::new(Context::default());
        let got = engine.auto_convolute(&digits::<W>(&x), 2 * len).unwrap();
        let got: Vec<u64> = got.as_slice().unwrap().iter().map(|&w| w.to_u64()).collect();
        assert_eq!(got, schoolbook(&x, &x, base, 2 * len));
    }
    check::<u16>(1);
    check::<u32>(2);
    check::<u64>(3);
}

#[test]
fn disk_backed_operands_convolve_exactly() {
    // A context with a tiny memory budget forces scratch storages (and the
    // two-pass strategy) onto disk.
    let ctx = Context {
        cache_l1_size: 256,
        max_memory_block_size: 2048,
        num_processors: 2,
        shared_memory_threshold: 1 << 30,
    };
    let len = 700usize;
    let x: Vec<u64> = (0..len as u64).map(|i| (i * 37 + 11) % 1_000_000_000).collect();
    let y: Vec<u64> = (0..len as u64).map(|i| (i * 101 + 7) % 1_000_000_000).collect();

    let small = ConvolutionEngine::<u32>::new(ctx);
    let large = ConvolutionEngine::<u32>::new(Context::default());
    let a = small.convolute(&digits::<u32>(&x), &digits::<u32>(&y), 2 * len).unwrap();
    let b = large.convolute(&digits::<u32>(&x), &digits::<u32>(&y), 2 * len).unwrap();

    let mut av = vec![0u32; 2 * len];
    a.read_block(0, &mut av).unwrap();
    assert_eq!(&av[..], b.as_slice().unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Invariant: NTT-convolve-split of x² equals x·x bit-exactly.
    #[test]
    fn convolution_matches_schoolbook_u32(
        x in prop::collection::vec(0u64..1_000_000_000, 1..60),
        y in prop::collection::vec(0u64..1_000_000_000, 1..60),
    ) {
        let engine = ConvolutionEngine::<u32>::new(Context::default());
        let size = x.len() + y.len();
        let got = engine.convolute(&digits::<u32>(&x), &digits::<u32>(&y), size).unwrap();
        let got: Vec<u64> = got.as_slice().unwrap().iter().map(|&w| u64::from(w)).collect();
        prop_assert_eq!(got, schoolbook(&x, &y, 1_000_000_000, size));
    }
}
