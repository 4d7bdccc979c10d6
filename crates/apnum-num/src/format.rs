//! Decimal parsing and formatting for power-of-ten word bases.
//!
//! A base B = 10^k stores k decimal digits per word, so conversion is digit
//! grouping rather than arithmetic: parsing groups the decimal string into
//! k-digit words from the right, formatting emits the most significant word
//! unpadded and every following word zero-padded to k digits. Bases that are
//! not powers of ten are rejected (the arithmetic itself is base-generic;
//! only string I/O is decimal-bound).

use crate::apfloat::ApFloat;
use crate::apint::ApInt;
use apnum_core::{ApError, NttWord, Result};
use std::fmt;

/// Decimal digits per word, or an error for non-power-of-ten bases.
fn decimal_digits_per_word(base: u64) -> Result<u32> {
    let k = base.ilog10();
    if 10u64.checked_pow(k) != Some(base) {
        return Err(ApError::domain(
            "format",
            format!("base {base} is not a power of ten"),
        ));
    }
    Ok(k)
}

/// Parse a decimal integer literal into an exact integer.
pub fn parse_int<W: NttWord>(s: &str, base: u64) -> Result<ApInt<W>> {
    let k = decimal_digits_per_word(base)? as usize;
    let (sign, digits) = split_sign(s)?;
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(ApInt::from_i64_in_base(0, base));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApError::domain("parse", format!("invalid integer literal {s:?}")));
    }
    let words = group_words(digits, k)?;
    Ok(ApInt::from_magnitude_words(sign, words, base))
}

/// Parse a decimal floating literal (`[+-]?ddd[.ddd][e[+-]ddd]`) at a
/// precision of `decimal_digits` significant decimal digits.
pub fn parse_float<W: NttWord>(s: &str, decimal_digits: u64, base: u64) -> Result<ApFloat<W>> {
    let k = decimal_digits_per_word(base)?;
    let (sign, body) = split_sign(s)?;

    let (body, exp10) = match body.split_once(['e', 'E']) {
        Some((m, e)) => {
            let exp: i64 = e
                .parse()
                .map_err(|_| ApError::domain("parse", format!("invalid exponent in {s:?}")))?;
            (m, exp)
        }
        None => (body, 0),
    };
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(ApError::domain("parse", format!("invalid float literal {s:?}")));
    }
    let mut digits = String::with_capacity(int_part.len() + frac_part.len());
    digits.push_str(int_part);
    digits.push_str(frac_part);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApError::domain("parse", format!("invalid float literal {s:?}")));
    }
    // value = digits · 10^(exp10 − |frac|)
    let mut e10 = exp10 - frac_part.len() as i64;
    let digits = digits.trim_start_matches('0').to_owned();
    if digits.is_empty() {
        return Ok(ApFloat::zero_in_base(base));
    }

    // Align the decimal exponent to a word boundary by padding zeros.
    let r = e10.rem_euclid(i64::from(k));
    let mut padded = digits;
    for _ in 0..r {
        padded.push('0');
    }
    e10 -= r;
    let word_lo = e10 / i64::from(k);

    let words = group_words(&padded, k as usize)?;
    let exponent = word_lo + words.len() as i64 - 1;
    let precision = decimal_digits.div_ceil(u64::from(k)) + 1;
    Ok(ApFloat::from_word_vec(sign, exponent, words, precision, base))
}

fn split_sign(s: &str) -> Result<(i8, &str)> {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix('-') {
        Ok((-1, rest))
    } else if let Some(rest) = s.strip_prefix('+') {
        Ok((1, rest))
    } else if s.is_empty() {
        Err(ApError::domain("parse", "empty numeric literal"))
    } else {
        Ok((1, s))
    }
}

/// Group a decimal digit string into little-endian k-digit words.
fn group_words(digits: &str, k: usize) -> Result<Vec<u64>> {
    let bytes = digits.as_bytes();
    let mut words = Vec::with_capacity(bytes.len() / k + 1);
    let mut end = bytes.len();
    while end > 0 {
        let start = end.saturating_sub(k);
        let chunk = std::str::from_utf8(&bytes[start..end]).map_err(|_| {
            ApError::domain("parse", "invalid digit grouping")
        })?;
        let w: u64 = chunk
            .parse()
            .map_err(|_| ApError::domain("parse", format!("invalid digits {chunk:?}")))?;
        words.push(w);
        end = start;
    }
    Ok(words)
}

/// Plain decimal rendering of the magnitude and sign.
fn format_decimal<W: NttWord>(x: &ApFloat<W>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if x.is_zero() {
        return f.write_str("0");
    }
    let Ok(k) = decimal_digits_per_word(x.base()) else {
        // Base-generic fallback: sign, word list, exponent.
        return write!(f, "{}[{:?}]e{}", if x.signum() < 0 { "-" } else { "" }, x.word_vec(), x.scale());
    };
    let k = k as usize;
    if x.signum() < 0 {
        f.write_str("-")?;
    }
    let words = x.word_vec();
    let exp = x.scale();
    let lo = exp - (words.len() as i64 - 1);

    // Integer part: word positions exp down to max(lo, 0).
    if exp < 0 {
        f.write_str("0")?;
    } else {
        for p in (0..=exp).rev() {
            let w = if p >= lo { words[usize::try_from(p - lo).unwrap_or(0)] } else { 0 };
            if p == exp {
                write!(f, "{w}")?;
            } else {
                write!(f, "{w:0width$}", width = k)?;
            }
        }
    }
    // Fractional part: positions −1 down to lo, trailing zeros trimmed.
    // Positions above the exponent render as zero words.
    if lo < 0 {
        let mut frac = String::new();
        for p in (lo..=-1).rev() {
            let w = if p <= exp { words[usize::try_from(p - lo).unwrap_or(0)] } else { 0 };
            frac.push_str(&format!("{w:0width$}", width = k));
        }
        let frac = frac.trim_end_matches('0');
        if !frac.is_empty() {
            write!(f, ".{frac}")?;
        }
    }
    Ok(())
}

impl<W: NttWord> fmt::Display for ApFloat<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_decimal(self, f)
    }
}

impl<W: NttWord> fmt::Display for ApInt<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_decimal(self.as_float(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn integer_literals_round_trip() {
        for s in ["0", "1", "42", "1000000000", "123456789012345678901234567890"] {
            let x: ApInt<u32> = parse_int(s, 1_000_000_000).unwrap();
            assert_eq!(x.to_string(), s, "round-trip {s}");
        }
        let neg: ApInt<u32> = parse_int("-987654321987654321", 1_000_000_000).unwrap();
        assert_eq!(neg.to_string(), "-987654321987654321");
        assert_eq!(neg.signum(), -1);
    }

    #[test]
    fn float_literals_round_trip() {
        for s in ["1.5", "0.125", "12345.6789", "1000000001.5"] {
            let x: ApFloat<u32> = parse_float(s, 50, 1_000_000_000).unwrap();
            assert_eq!(x.to_string(), s, "round-trip {s}");
        }
    }

    #[test]
    fn exponent_notation_shifts_words() {
        let x: ApFloat<u32> = parse_float("1.5e9", 30, 1_000_000_000).unwrap();
        assert_eq!(x.to_string(), "1500000000");
        let y: ApFloat<u32> = parse_float("25e-10", 30, 1_000_000_000).unwrap();
        assert_eq!(y.to_string(), "0.0000000025");
        // A value whose leading word sits below the first fractional word.
        let z: ApFloat<u32> = parse_float("2.5e-10", 30, 1_000_000_000).unwrap();
        assert_eq!(z.to_string(), "0.00000000025");
    }

    #[test]
    fn parse_assigns_word_precision_from_decimal_digits() {
        let x: ApFloat<u32> = parse_float("1.5", 50, 1_000_000_000).unwrap();
        // ceil(50/9) + 1 guard word.
        assert_eq!(x.precision(), 7);
    }

    #[test]
    fn u16_and_u64_bases_parse_consistently() {
        let a: ApInt<u16> = parse_int("123456789", 10_000).unwrap();
        assert_eq!(a.magnitude_words(), vec![6_789, 2_345, 1]);
        let b: ApInt<u64> = parse_int("123456789", 1_000_000_000_000_000_000).unwrap();
        assert_eq!(b.magnitude_words(), vec![123_456_789]);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn malformed_literals_are_domain_errors() {
        assert!(parse_int::<u32>("12x4", 1_000_000_000).is_err());
        assert!(parse_float::<u32>("1.2.3", 10, 1_000_000_000).is_err());
        assert!(parse_float::<u32>("", 10, 1_000_000_000).is_err());
        // Base 3·10^8 is not a power of ten.
        assert!(parse_int::<u32>("5", 300_000_000).is_err());
    }

    #[test]
    fn comparison_of_parsed_values_is_numeric() {
        let a: ApFloat<u32> = parse_float("2.5", 20, 1_000_000_000).unwrap();
        let b: ApFloat<u32> = parse_float("2.50000", 20, 1_000_000_000).unwrap();
        assert_eq!(a.compare(&b), Ordering::Equal);
        let c: ApFloat<u32> = parse_float("2.5000001", 20, 1_000_000_000).unwrap();
        assert_eq!(a.compare(&c), Ordering::Less);
    }
}
