use crate::error::{Result, SyncError};
use crate::farrow_interpolator::FarrowInterpolator;
use crate::loop_filter::LoopFilter;
use log::warn;
use num::complex::Complex32;

/// Lower bound of the fractional-delay working range.
const MU_LOWER: f64 = 0.2;
/// Upper bound of the fractional-delay working range.
const MU_UPPER: f64 = 1.0;
/// Hysteresis applied to the rewrap thresholds so mu does not bounce
/// between the bounds on small loop corrections.
const MU_HYSTERESIS: f64 = 0.1;

/// Gardner symbol-timing corrector for 2 samples/symbol input.
///
/// Consumes a stream at two samples per symbol and emits the on-symbol
/// interpolated value, one output per input pair. Alternate samples drive
/// the Gardner timing error detector, which steers the fractional delay of
/// a [`FarrowInterpolator`] through a [`LoopFilter`]; the other samples
/// produce the output.
///
/// When the fractional delay drifts out of `[0.2, 1.0]` (with 0.1 of
/// hysteresis) it is rewrapped to the opposite bound and the sample parity
/// flips, exchanging the roles of the two samples in a pair. A pair in
/// which both roles land on the output sample overwrites the first value;
/// a pair in which neither does emits a defensive interpolation at the
/// current delay, which is an ordinary output rather than an error.
#[derive(Debug)]
pub struct GardnerTimingCorrector {
    farrow: FarrowInterpolator,
    loop_filter: LoopFilter,
    /// Fractional delay steered by the timing loop.
    mu: f64,
    /// Count of samples shifted into the interpolator.
    sample_index: u64,
    /// Which sample of a pair updates the timing error, 0 or 1.
    parity_offset: u64,
    /// Unconsumed input samples carried between calls.
    tail: Vec<Complex32>,
    mu_log: Vec<f64>,
    error_log: Vec<f64>,
}

impl Default for GardnerTimingCorrector {
    fn default() -> Self {
        Self::new()
    }
}

impl GardnerTimingCorrector {
    /// A corrector with the stock proportional timing loop (k_p = 0.1).
    pub fn new() -> Self {
        Self::with_loop_filter(LoopFilter::proportional(0.1))
    }

    pub fn with_loop_filter(loop_filter: LoopFilter) -> Self {
        Self {
            farrow: FarrowInterpolator::new(),
            loop_filter,
            mu: 0.5,
            sample_index: 0,
            parity_offset: 0,
            tail: Vec::new(),
            mu_log: Vec::new(),
            error_log: Vec::new(),
        }
    }

    /// Current fractional delay.
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Fractional delay trace, one entry per emitted symbol.
    pub fn mu_log(&self) -> &[f64] {
        &self.mu_log
    }

    /// Timing-error trace, one entry per emitted symbol.
    pub fn error_log(&self) -> &[f64] {
        &self.error_log
    }

    /// Restores the initial state. Loop gains are kept.
    pub fn reset(&mut self) {
        self.farrow.reset();
        self.loop_filter.reset();
        self.mu = 0.5;
        self.sample_index = 0;
        self.parity_offset = 0;
        self.tail.clear();
        self.mu_log.clear();
        self.error_log.clear();
    }

    /// Gardner timing error around the current symbol instant:
    /// `e = Re{(x(mu - 1) - x(mu + 1)) * conj(x(mu))}`.
    fn timing_error(&self) -> f64 {
        let mu = self.mu as f32;
        let prev = self.farrow.interpolate(mu - 1.0);
        let curr = self.farrow.interpolate(mu);
        let next = self.farrow.interpolate(mu + 1.0);
        ((prev - next) * curr.conj()).re as f64
    }

    /// Consumes the next two buffered samples and emits one output symbol.
    pub fn emit_symbol(&mut self) -> Result<Complex32> {
        if self.tail.len() < 2 {
            return Err(SyncError::InsufficientData(format!(
                "a symbol needs two unprocessed samples, {} available",
                self.tail.len()
            )));
        }
        let pair = [self.tail[0], self.tail[1]];
        self.tail.drain(..2);
        Ok(self.step_pair(pair))
    }

    fn step_pair(&mut self, pair: [Complex32; 2]) -> Complex32 {
        let mut sample_out = None;
        let mut error = 0.0;
        for &sample in &pair {
            // Rewrap mu towards the opposite bound once it leaves the
            // working range, swapping which sample of the pair is on-symbol.
            if self.mu > MU_UPPER + MU_HYSTERESIS {
                self.mu = MU_LOWER;
                self.parity_offset ^= 1;
            } else if self.mu < MU_LOWER - MU_HYSTERESIS {
                self.mu = MU_UPPER;
                self.parity_offset ^= 1;
            }

            self.farrow.load(sample);
            self.sample_index += 1;

            if self.sample_index % 2 == self.parity_offset {
                error = self.timing_error();
                self.mu += self.loop_filter.update(error);
            } else {
                // May be overwritten by the second half of the pair if the
                // parity flipped above.
                sample_out = Some(self.farrow.interpolate(self.mu as f32));
            }
        }

        // One log entry per emitted symbol.
        self.mu_log.push(self.mu);
        self.error_log.push(error);

        sample_out.unwrap_or_else(|| {
            warn!("timing parity flipped twice in one pair, emitting fallback interpolation");
            self.farrow.interpolate(self.mu as f32)
        })
    }

    /// Resamples a 2 samples/symbol stream down to 1 sample/symbol.
    ///
    /// Odd-length input is right-padded with a repeat of its final sample
    /// before consumption, so each call drains the internal buffer
    /// completely and emits `ceil(len / 2)` symbols for the samples it
    /// received.
    pub fn process(&mut self, signal: &[Complex32]) -> Vec<Complex32> {
        self.tail.extend_from_slice(signal);
        if self.tail.len() % 2 != 0 {
            if let Some(&last) = self.tail.last() {
                self.tail.push(last);
            }
        }

        let pending = std::mem::take(&mut self.tail);
        let mut out = Vec::with_capacity(pending.len() / 2);
        for pair in pending.chunks_exact(2) {
            out.push(self.step_pair([pair[0], pair[1]]));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(length: usize, w: f32) -> Vec<Complex32> {
        (0..length).map(|n| Complex32::cis(w * n as f32)).collect()
    }

    #[test]
    fn emits_one_symbol_per_input_pair() {
        let mut corrector = GardnerTimingCorrector::new();
        let out = corrector.process(&tone(64, 0.3));
        assert_eq!(out.len(), 32);
        assert_eq!(corrector.mu_log().len(), 32);
        assert_eq!(corrector.error_log().len(), 32);
    }

    #[test]
    fn odd_input_is_padded_to_a_full_pair() {
        let mut corrector = GardnerTimingCorrector::new();
        let out = corrector.process(&tone(9, 0.3));
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn residual_free_streaming_matches_total_rate() {
        let signal = tone(40, 0.2);
        let mut corrector = GardnerTimingCorrector::new();
        let mut total = 0;
        for chunk in signal.chunks(8) {
            total += corrector.process(chunk).len();
        }
        assert_eq!(total, 20);
    }

    #[test]
    fn emit_symbol_without_samples_is_insufficient_data() {
        let mut corrector = GardnerTimingCorrector::new();
        match corrector.emit_symbol() {
            Err(SyncError::InsufficientData(_)) => {}
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn mu_stays_within_the_rewrap_range() {
        // A gentle loop so a single update cannot jump past the rewrap
        // band by more than its own step size.
        let mut corrector =
            GardnerTimingCorrector::with_loop_filter(LoopFilter::proportional(0.01));
        // Alternating-sign input produces strong timing error activity.
        let signal: Vec<Complex32> = (0..400)
            .map(|n| Complex32::new(if n % 4 < 2 { 1.0 } else { -1.0 }, 0.0))
            .collect();
        corrector.process(&signal);
        for &mu in corrector.mu_log() {
            assert!(mu <= MU_UPPER + MU_HYSTERESIS + 0.3, "mu = {mu}");
            assert!(mu >= MU_LOWER - MU_HYSTERESIS - 0.3, "mu = {mu}");
        }
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut corrector = GardnerTimingCorrector::new();
        corrector.process(&tone(32, 0.4));
        corrector.reset();
        assert_eq!(corrector.mu(), 0.5);
        assert!(corrector.mu_log().is_empty());
        assert!(corrector.error_log().is_empty());
        let out = corrector.process(&tone(10, 0.4));
        assert_eq!(out.len(), 5);
    }
}
