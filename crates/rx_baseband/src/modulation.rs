use crate::{BasebandError, Result};
use num::complex::Complex32;
use std::f32::consts::FRAC_1_SQRT_2;

/// Maps bit pairs onto unit-energy QPSK symbols with Gray coding:
///
/// ```text
/// 00 -> +1+j    01 -> +1-j
/// 10 -> -1+j    11 -> -1-j
/// ```
///
/// all scaled by 1/sqrt(2). The bit count must be even.
pub fn modulate_qpsk(bits: &[u8]) -> Result<Vec<Complex32>> {
    if bits.len() % 2 != 0 {
        return Err(BasebandError::InvalidParameter(format!(
            "QPSK needs an even number of bits, got {}",
            bits.len()
        )));
    }
    Ok(bits
        .chunks_exact(2)
        .map(|pair| {
            let re = 1.0 - 2.0 * pair[0] as f32;
            let im = 1.0 - 2.0 * pair[1] as f32;
            Complex32::new(re * FRAC_1_SQRT_2, im * FRAC_1_SQRT_2)
        })
        .collect())
}

/// Hard-decision Gray demapping, the inverse of [`modulate_qpsk`] under the
/// optimum decision rule for AWGN.
pub fn demodulate_qpsk(symbols: &[Complex32]) -> Vec<u8> {
    symbols
        .iter()
        .flat_map(|s| [(s.re < 0.0) as u8, (s.im < 0.0) as u8])
        .collect()
}

/// Slices each symbol to the nearest QPSK constellation point (unscaled).
pub fn decide_qpsk(symbols: &[Complex32]) -> Vec<Complex32> {
    symbols
        .iter()
        .map(|s| Complex32::new(s.re.signum(), s.im.signum()))
        .collect()
}
