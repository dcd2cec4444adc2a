use crate::{BasebandError, Result};
use num::complex::Complex32;
use rand::Rng;
use rand_distr::StandardNormal;
use rx_sync::FarrowInterpolator;
use std::f32::consts::TAU;

/// Adds white Gaussian noise at the requested SNR, measured against the
/// average power of the input.
pub fn apply_awgn<R: Rng>(signal: &[Complex32], snr_db: f32, rng: &mut R) -> Vec<Complex32> {
    if signal.is_empty() {
        return Vec::new();
    }
    let signal_power =
        signal.iter().map(|x| x.norm_sqr()).sum::<f32>() / signal.len() as f32;
    let noise_power = signal_power / 10.0f32.powf(snr_db / 10.0);
    let rail_scale = (noise_power / 2.0).sqrt();

    signal
        .iter()
        .map(|&x| {
            let re: f32 = rng.sample(StandardNormal);
            let im: f32 = rng.sample(StandardNormal);
            x + Complex32::new(re * rail_scale, im * rail_scale)
        })
        .collect()
}

/// Rotates the whole signal by a fixed carrier phase offset.
pub fn apply_cpo(signal: &[Complex32], phase_offset: f32) -> Vec<Complex32> {
    let rotation = Complex32::cis(phase_offset);
    signal.iter().map(|&x| x * rotation).collect()
}

/// Applies a carrier frequency offset of `w_offset` radians/sample:
/// `y[n] = x[n] * e^{j*w*n}`.
pub fn apply_cfo(signal: &[Complex32], w_offset: f32) -> Vec<Complex32> {
    signal
        .iter()
        .enumerate()
        .map(|(n, &x)| x * Complex32::cis(w_offset * n as f32))
        .collect()
}

/// Carrier frequency offset given as a fraction of the sample rate;
/// realistic impairments sit around 0.01 to 0.05, aggressive ones at 0.1.
pub fn apply_cfo_pct(signal: &[Complex32], pct_offset: f32) -> Vec<Complex32> {
    apply_cfo(signal, pct_offset * TAU)
}

/// Applies a symbol timing offset by resampling the signal at a fractional
/// delay through the cubic Farrow interpolator.
pub fn apply_sto(signal: &[Complex32], mu: f32, integer_offset: i32) -> Vec<Complex32> {
    let mut farrow = FarrowInterpolator::new();
    farrow.process_batch_with_tail_padding(signal, mu, integer_offset)
}

/// Simulates bursty transmission by inserting a random stretch of dead air
/// (1 to `max_delay - 1` zero samples) ahead of each frame.
pub fn apply_fto<R: Rng>(
    frames: &[Vec<Complex32>],
    max_delay: usize,
    rng: &mut R,
) -> Result<Vec<Complex32>> {
    if max_delay < 2 {
        return Err(BasebandError::InvalidParameter(format!(
            "frame timing offset needs max_delay >= 2, got {max_delay}"
        )));
    }
    let mut out = Vec::new();
    for frame in frames {
        let gap = rng.random_range(1..max_delay);
        out.resize(out.len() + gap, Complex32::default());
        out.extend_from_slice(frame);
    }
    Ok(out)
}
