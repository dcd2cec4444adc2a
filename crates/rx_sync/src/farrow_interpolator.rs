use num::complex::Complex32;

/// Number of taps in the cubic interpolator.
const NUM_TAPS: usize = 4;

/// Flipped cubic-Lagrange basis. Maps the shift buffer in oldest-to-newest
/// order onto polynomial coefficients c_0..c_3 so that
/// `y(mu) = sum(c_k * mu^k)`. Row k produces c_k.
const LAGRANGE_COEFFS: [[f32; NUM_TAPS]; NUM_TAPS] = [
    [0.0, 0.0, 1.0, 0.0],
    [-1.0 / 3.0, -1.0 / 2.0, 1.0, -1.0 / 6.0],
    [1.0 / 2.0, -1.0, 1.0 / 2.0, 0.0],
    [-1.0 / 6.0, 1.0 / 2.0, -1.0 / 2.0, 1.0 / 6.0],
];

/// Cubic-Lagrange fractional-delay interpolator realised as a Farrow
/// structure over a four sample shift buffer.
///
/// Loading a sample pushes the oldest one out. `interpolate(0.0)`
/// reproduces the second newest sample in the buffer; increasing `mu`
/// moves the interpolation point towards the newest sample.
#[derive(Debug, Clone)]
pub struct FarrowInterpolator {
    /// Shift buffer, oldest sample first.
    buffer: [Complex32; NUM_TAPS],
}

impl Default for FarrowInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl FarrowInterpolator {
    pub fn new() -> Self {
        Self {
            buffer: [Complex32::default(); NUM_TAPS],
        }
    }

    /// Clears the shift buffer back to zeros.
    pub fn reset(&mut self) {
        self.buffer = [Complex32::default(); NUM_TAPS];
    }

    /// Shifts a single sample into the buffer, discarding the oldest.
    pub fn load(&mut self, x: Complex32) {
        self.buffer.rotate_left(1);
        self.buffer[NUM_TAPS - 1] = x;
    }

    /// Shifts a run of samples into the buffer in order.
    pub fn load_slice(&mut self, xs: &[Complex32]) {
        for &x in xs {
            self.load(x);
        }
    }

    /// Interpolates at a fractional delay of `mu` samples.
    pub fn interpolate(&self, mu: f32) -> Complex32 {
        self.interpolate_at(mu, 0)
    }

    /// Interpolates at an effective position of `integer_offset + mu`
    /// samples, evaluating the fitted polynomial at `mu - integer_offset`.
    pub fn interpolate_at(&self, mu: f32, integer_offset: i32) -> Complex32 {
        let t = mu - integer_offset as f32;

        // c = C * buffer, then Horner evaluation of the cubic in t.
        let mut c = [Complex32::default(); NUM_TAPS];
        for (c_k, row) in c.iter_mut().zip(LAGRANGE_COEFFS.iter()) {
            for (coeff, sample) in row.iter().zip(self.buffer.iter()) {
                *c_k += *sample * *coeff;
            }
        }
        ((c[3] * t + c[2]) * t + c[1]) * t + c[0]
    }

    /// Streams samples through load-then-interpolate with a fixed delay.
    pub fn process_batch(
        &mut self,
        samples: &[Complex32],
        mu: f32,
        integer_offset: i32,
    ) -> Vec<Complex32> {
        samples
            .iter()
            .map(|&x| {
                self.load(x);
                self.interpolate_at(mu, integer_offset)
            })
            .collect()
    }

    /// Batch interpolation whose output length equals the input length.
    ///
    /// Two copies of the final sample are appended before processing and the
    /// first two outputs (produced while the buffer is still filling) are
    /// discarded.
    pub fn process_batch_with_tail_padding(
        &mut self,
        samples: &[Complex32],
        mu: f32,
        integer_offset: i32,
    ) -> Vec<Complex32> {
        let last = samples.last().copied().unwrap_or_default();
        let mut out = self.process_batch(samples, mu, integer_offset);
        for _ in 0..2 {
            self.load(last);
            out.push(self.interpolate_at(mu, integer_offset));
        }
        out.drain(..2);
        out
    }
}
