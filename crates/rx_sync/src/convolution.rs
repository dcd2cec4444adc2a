use itertools::izip;
use num::complex::Complex32;
use rustfft::{Fft, FftPlanner};

/// Valid-mode convolution of a complex signal with a complex kernel.
///
/// Output length is `signal.len() - kernel.len() + 1`; an empty vector is
/// returned when the signal is shorter than the kernel. With a time-reversed
/// conjugated kernel this is the matched-filter cross-correlation
/// `y[n] = sum_k conj(p[k]) * signal[n + k]`.
pub fn convolve_valid(kernel: &[Complex32], signal: &[Complex32]) -> Vec<Complex32> {
    if kernel.is_empty() || signal.len() < kernel.len() {
        return Vec::new();
    }

    let total_out = signal.len() - kernel.len() + 1;
    let mut out = Vec::with_capacity(total_out);
    for n in 0..total_out {
        let window = &signal[n..n + kernel.len()];
        let mut acc = Complex32::default();
        for (h, x) in izip!(kernel.iter().rev(), window.iter()) {
            acc += *h * *x;
        }
        out.push(acc);
    }
    out
}

/// Valid-mode convolution computed in the frequency domain.
///
/// Same contract as [`convolve_valid`] up to floating point rounding.
/// Worth it once the kernel is long enough that the O(N*K) direct form
/// dominates, e.g. the acquisition detector's hypothesis bank.
pub fn convolve_valid_fft(kernel: &[Complex32], signal: &[Complex32]) -> Vec<Complex32> {
    if kernel.is_empty() || signal.len() < kernel.len() {
        return Vec::new();
    }

    let total_full = signal.len() + kernel.len() - 1;
    let size_fft = total_full.next_power_of_two();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(size_fft);
    let ifft = planner.plan_fft_inverse(size_fft);

    let mut kernel_fft = vec![Complex32::default(); size_fft];
    kernel_fft[..kernel.len()].copy_from_slice(kernel);
    fft.process(&mut kernel_fft);

    let mut signal_fft = vec![Complex32::default(); size_fft];
    signal_fft[..signal.len()].copy_from_slice(signal);
    fft.process(&mut signal_fft);

    // Convolution in time is multiplication in frequency.
    for (y, h) in izip!(signal_fft.iter_mut(), kernel_fft.iter()) {
        *y *= *h;
    }
    ifft.process(&mut signal_fft);

    let scale = 1.0 / size_fft as f32;
    signal_fft[kernel.len() - 1..signal.len()]
        .iter()
        .map(|&x| x * scale)
        .collect()
}

/// Sliding-window signal energy `E[n] = sum_k |signal[n + k]|^2` over a
/// boxcar of `window` samples.
///
/// Each window is summed independently so a window's value depends only on
/// its own samples. This keeps detector metrics identical no matter how the
/// input stream was sliced across calls.
pub fn window_energy(signal: &[Complex32], window: usize) -> Vec<f32> {
    if window == 0 || signal.len() < window {
        return Vec::new();
    }

    let total_out = signal.len() - window + 1;
    let mut out = Vec::with_capacity(total_out);
    for n in 0..total_out {
        let energy: f32 = signal[n..n + window].iter().map(|x| x.norm_sqr()).sum();
        out.push(energy);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cplx(re: f32, im: f32) -> Complex32 {
        Complex32::new(re, im)
    }

    #[test]
    fn valid_convolution_against_hand_result() {
        let kernel = [cplx(1.0, 0.0), cplx(0.0, 1.0)];
        let signal = [cplx(1.0, 0.0), cplx(2.0, 0.0), cplx(3.0, 0.0)];
        // y[n] = kernel[1]*signal[n] + kernel[0]*signal[n+1]
        let out = convolve_valid(&kernel, &signal);
        assert_eq!(out.len(), 2);
        assert!((out[0] - cplx(2.0, 1.0)).norm() < 1e-6);
        assert!((out[1] - cplx(3.0, 2.0)).norm() < 1e-6);
    }

    #[test]
    fn short_signal_yields_empty_output() {
        let kernel = [cplx(1.0, 0.0); 4];
        let signal = [cplx(1.0, 0.0); 3];
        assert!(convolve_valid(&kernel, &signal).is_empty());
        assert!(convolve_valid_fft(&kernel, &signal).is_empty());
        assert!(window_energy(&signal, 4).is_empty());
    }

    #[test]
    fn fft_path_matches_direct_path() {
        let kernel: Vec<Complex32> = (0..9)
            .map(|i| cplx((i as f32 * 0.7).sin(), (i as f32 * 1.3).cos()))
            .collect();
        let signal: Vec<Complex32> = (0..40)
            .map(|i| cplx((i as f32 * 0.31).cos(), (i as f32 * 0.17).sin()))
            .collect();

        let direct = convolve_valid(&kernel, &signal);
        let fft = convolve_valid_fft(&kernel, &signal);
        assert_eq!(direct.len(), fft.len());
        for (a, b) in izip!(direct.iter(), fft.iter()) {
            assert!((a - b).norm() < 1e-3);
        }
    }

    #[test]
    fn window_energy_matches_boxcar_convolution() {
        let signal = [cplx(1.0, 1.0), cplx(0.0, 2.0), cplx(3.0, 0.0), cplx(1.0, 0.0)];
        let out = window_energy(&signal, 2);
        assert_eq!(out, vec![6.0, 13.0, 10.0]);
    }
}
