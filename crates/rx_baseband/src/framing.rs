use crate::{BasebandError, Result};
use num::complex::Complex32;
use std::f64::consts::PI;

/// Zadoff-Chu sequence of odd length `n_zc` and root index `q`:
/// `p[n] = e^{-j*pi*q*n*(n+1)/N}`.
///
/// Constant amplitude with ideal periodic autocorrelation, which keeps the
/// partial correlations a streaming detector sees far below its threshold.
pub fn zadoff_chu(n_zc: usize, q: usize) -> Result<Vec<Complex32>> {
    if n_zc % 2 == 0 {
        return Err(BasebandError::InvalidParameter(format!(
            "Zadoff-Chu length must be odd, got {n_zc}"
        )));
    }
    if q < 1 || q > n_zc - 1 {
        return Err(BasebandError::InvalidParameter(format!(
            "Zadoff-Chu root index must lie in 1..={}, got {q}",
            n_zc - 1
        )));
    }
    Ok((0..n_zc)
        .map(|n| {
            let phase = -PI * q as f64 * n as f64 * (n as f64 + 1.0) / n_zc as f64;
            Complex32::cis(phase as f32)
        })
        .collect())
}

/// Builds a Schmidl-Cox preamble by repeating one half twice.
pub fn schmidl_cox_preamble(half: &[Complex32]) -> Vec<Complex32> {
    let mut preamble = half.to_vec();
    preamble.extend_from_slice(half);
    preamble
}

/// Splits a payload into `chunk_length`-symbol pieces and prepends the
/// preamble to each, producing one frame per chunk.
pub fn to_frames(
    preamble: &[Complex32],
    payload: &[Complex32],
    chunk_length: usize,
) -> Result<Vec<Vec<Complex32>>> {
    if chunk_length == 0 || payload.len() % chunk_length != 0 {
        return Err(BasebandError::InvalidParameter(format!(
            "payload of {} symbols does not divide into chunks of {chunk_length}",
            payload.len()
        )));
    }
    Ok(payload
        .chunks_exact(chunk_length)
        .map(|chunk| {
            let mut frame = preamble.to_vec();
            frame.extend_from_slice(chunk);
            frame
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zadoff_chu_validates_its_parameters() {
        assert!(zadoff_chu(6, 1).is_err());
        assert!(zadoff_chu(5, 0).is_err());
        assert!(zadoff_chu(5, 5).is_err());
        assert!(zadoff_chu(5, 4).is_ok());
    }

    #[test]
    fn zadoff_chu_has_unit_magnitude_everywhere() {
        let sequence = zadoff_chu(11, 3).unwrap();
        assert_eq!(sequence.len(), 11);
        for p in &sequence {
            assert!((p.norm() - 1.0).abs() < 1e-6);
        }
        assert!((sequence[0] - Complex32::new(1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn zadoff_chu_periodic_autocorrelation_is_ideal() {
        let sequence = zadoff_chu(11, 1).unwrap();
        let n = sequence.len();
        for shift in 1..n {
            let mut acc = Complex32::default();
            for k in 0..n {
                acc += sequence[k] * sequence[(k + shift) % n].conj();
            }
            assert!(acc.norm() < 1e-4, "shift {shift} correlates to {}", acc.norm());
        }
    }

    #[test]
    fn schmidl_cox_preamble_repeats_the_half() {
        let half = [Complex32::new(1.0, 0.0), Complex32::new(0.0, -1.0)];
        let preamble = schmidl_cox_preamble(&half);
        assert_eq!(preamble.len(), 4);
        assert_eq!(&preamble[..2], &preamble[2..]);
    }

    #[test]
    fn frames_carry_preamble_plus_chunk() {
        let preamble = zadoff_chu(5, 1).unwrap();
        let payload: Vec<Complex32> = (0..10)
            .map(|i| Complex32::new(i as f32, -(i as f32)))
            .collect();
        let frames = to_frames(&preamble, &payload, 5).unwrap();
        assert_eq!(frames.len(), 2);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.len(), 10);
            assert_eq!(&frame[..5], preamble.as_slice());
            assert_eq!(&frame[5..], &payload[i * 5..(i + 1) * 5]);
        }
    }

    #[test]
    fn indivisible_payload_is_rejected() {
        let preamble = zadoff_chu(5, 1).unwrap();
        let payload = vec![Complex32::default(); 7];
        assert!(to_frames(&preamble, &payload, 5).is_err());
        assert!(to_frames(&preamble, &payload, 0).is_err());
    }
}
