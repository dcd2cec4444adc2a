use num::complex::Complex32;
use std::f64::consts::PI;

/// Root-raised-cosine filter taps.
///
/// Piecewise impulse response with the removable singularities at `t = 0`
/// and `|t| = Ts/(4*beta)` evaluated in closed form. `ts` is the symbol
/// period in samples, so `ts = 2` shapes a 2 samples/symbol stream. Taps
/// are centred on `(n_taps - 1) / 2`.
pub fn rrc_taps(n_taps: usize, beta: f32, ts: f32) -> Vec<f32> {
    let beta = beta as f64;
    let ts = ts as f64;
    let center = ((n_taps - 1) / 2) as f64;

    (0..n_taps)
        .map(|i| {
            let t = i as f64 - center;
            let h = if t == 0.0 {
                (1.0 + beta * (4.0 / PI - 1.0)) / ts
            } else if t.abs() == ts / (4.0 * beta) {
                let inner = (1.0 + 2.0 / PI) * (PI / (4.0 * beta)).sin()
                    + (1.0 - 2.0 / PI) * (PI / (4.0 * beta)).cos();
                beta / (ts * 2.0f64.sqrt()) * inner
            } else {
                let tn = t / ts;
                let numerator =
                    (PI * tn * (1.0 - beta)).sin() + 4.0 * beta * tn * (PI * tn * (1.0 + beta)).cos();
                let denominator = PI * tn * (1.0 - (4.0 * beta * tn) * (4.0 * beta * tn));
                numerator / denominator / ts
            };
            h as f32
        })
        .collect()
}

/// Zero-stuffing upsampler: the input samples land on every `factor`-th
/// output slot.
pub fn upsample(signal: &[Complex32], factor: usize) -> Vec<Complex32> {
    if factor == 0 {
        return Vec::new();
    }
    let mut out = vec![Complex32::default(); signal.len() * factor];
    for (i, &x) in signal.iter().enumerate() {
        out[i * factor] = x;
    }
    out
}

/// Full convolution of a complex signal with real taps; output length is
/// `signal.len() + taps.len() - 1`.
pub fn convolve_real_full(signal: &[Complex32], taps: &[f32]) -> Vec<Complex32> {
    if signal.is_empty() || taps.is_empty() {
        return Vec::new();
    }
    let total_out = signal.len() + taps.len() - 1;
    let mut out = vec![Complex32::default(); total_out];
    for (i, &x) in signal.iter().enumerate() {
        for (j, &h) in taps.iter().enumerate() {
            out[i + j] += x * h;
        }
    }
    out
}

/// Convolution trimmed to the input length and centred on the full result,
/// the usual choice for applying a symmetric pulse-shaping filter in place.
pub fn convolve_real_same(signal: &[Complex32], taps: &[f32]) -> Vec<Complex32> {
    let full = convolve_real_full(signal, taps);
    if full.is_empty() {
        return full;
    }
    let length = signal.len().max(taps.len());
    let start = (signal.len().min(taps.len()) - 1) / 2;
    full[start..start + length].to_vec()
}
