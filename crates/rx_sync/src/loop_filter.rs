/// A proportional-integral-derivative feedback filter.
///
/// This is the scalar control law shared by the Gardner timing loop and the
/// Costas carrier loop. The output of `update` is the control contribution
/// for the current error sample:
///
/// ```text
/// u = k_p*e + k_i*sum(e) + k_d*(e - e_prev)
/// ```
///
/// No saturation is applied; callers own the wrap or clamp of whatever the
/// integrated output drives.
#[derive(Debug, Clone)]
pub struct LoopFilter {
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,
    sum_e: f64,
    prev_e: f64,
}

/// Damping factor used when deriving gains from a loop bandwidth.
const DAMPING_FACTOR: f64 = 0.707;

impl LoopFilter {
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            sum_e: 0.0,
            prev_e: 0.0,
        }
    }

    /// A pure proportional controller.
    pub fn proportional(k_p: f64) -> Self {
        Self::new(k_p, 0.0, 0.0)
    }

    /// Derives PI gains from a normalised loop bandwidth in cycles per
    /// sample, assuming a damping factor of 0.707.
    ///
    /// The recommended range for a carrier loop is R/200 to R/20 where R is
    /// the sample rate.
    pub fn from_loop_bandwidth(loop_bw: f64) -> Self {
        let alpha = 1.0 - 2.0 * DAMPING_FACTOR * DAMPING_FACTOR;
        let scaled_bw = loop_bw / (alpha + (alpha * alpha + 1.0).sqrt()).sqrt();
        let k_p = 2.0 * DAMPING_FACTOR * scaled_bw;
        let k_i = scaled_bw * scaled_bw;
        Self::new(k_p, k_i, 0.0)
    }

    /// Accumulates one error sample and returns the control contribution.
    pub fn update(&mut self, e: f64) -> f64 {
        self.sum_e += e;
        let d = e - self.prev_e;
        let u = self.k_p * e + self.k_i * self.sum_e + self.k_d * d;
        self.prev_e = e;
        u
    }

    /// Clears the accumulator state. Gains are left untouched.
    pub fn reset(&mut self) {
        self.sum_e = 0.0;
        self.prev_e = 0.0;
    }
}
