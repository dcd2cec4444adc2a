use crate::loop_filter::LoopFilter;
use crate::phase_lock_detector::PhaseLockDetector;
use num::complex::Complex32;

/// Decision-directed Costas loop for QPSK carrier-phase recovery.
///
/// Each symbol is derotated by the accumulated VCO phase, sliced against
/// the nearest QPSK point, and the residual angle between the symbol and
/// its decision drives a PI loop filter back into the VCO. Run after
/// timing recovery and coarse CFO correction; the loop absorbs the carrier
/// phase offset and whatever small frequency residue the coarse stage left
/// behind.
#[derive(Debug)]
pub struct CostasLoop {
    loop_filter: LoopFilter,
    loop_bandwidth: f64,
    /// Accumulated VCO phase in radians.
    theta: f64,
    lock_detector: Option<PhaseLockDetector>,
    /// Phase error per symbol of the most recent `process` call.
    error_history: Vec<f32>,
}

impl CostasLoop {
    /// Builds the loop from a normalised loop bandwidth (cycles/symbol).
    pub fn new(loop_bandwidth: f64) -> Self {
        Self {
            loop_filter: LoopFilter::from_loop_bandwidth(loop_bandwidth),
            loop_bandwidth,
            theta: 0.0,
            lock_detector: None,
            error_history: Vec::new(),
        }
    }

    /// Attaches a hysteretic lock detector fed with every phase error.
    pub fn with_lock_detector(loop_bandwidth: f64, lock_detector: PhaseLockDetector) -> Self {
        let mut costas = Self::new(loop_bandwidth);
        costas.lock_detector = Some(lock_detector);
        costas
    }

    /// Current VCO phase in radians.
    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn loop_bandwidth(&self) -> f64 {
        self.loop_bandwidth
    }

    /// Lock flag, when a lock detector is attached.
    pub fn is_locked(&self) -> Option<bool> {
        self.lock_detector.as_ref().map(PhaseLockDetector::is_locked)
    }

    /// Phase errors recorded during the most recent `process` call.
    pub fn error_history(&self) -> &[f32] {
        &self.error_history
    }

    /// Rebuilds the loop gains for a new bandwidth. Like any gain change
    /// mid-flight this restarts the filter accumulators; the VCO phase is
    /// kept so the constellation does not jump.
    pub fn set_loop_bandwidth(&mut self, loop_bandwidth: f64) {
        self.loop_bandwidth = loop_bandwidth;
        self.loop_filter = LoopFilter::from_loop_bandwidth(loop_bandwidth);
    }

    /// Zeroes the VCO phase, filter state, lock state, and error history.
    pub fn reset(&mut self) {
        self.theta = 0.0;
        self.loop_filter.reset();
        self.error_history.clear();
        if let Some(lock_detector) = &mut self.lock_detector {
            lock_detector.reset();
        }
    }

    /// Tracks a block of symbols and returns the derotated stream.
    pub fn process(&mut self, symbols: &[Complex32]) -> Vec<Complex32> {
        self.error_history.clear();
        self.error_history.reserve(symbols.len());

        let mut out = Vec::with_capacity(symbols.len());
        for &symbol in symbols {
            // Rotate by the current VCO phase.
            let rotated = symbol * Complex32::cis(-self.theta as f32);

            // Decision-directed error: residual angle against the slicer.
            let reference = Complex32::new(rotated.re.signum(), rotated.im.signum());
            let residual = rotated * reference.conj();
            let error = (residual.im as f64).atan2(residual.re as f64);

            self.theta += self.loop_filter.update(error);
            self.error_history.push(error as f32);
            if let Some(lock_detector) = &mut self.lock_detector {
                lock_detector.update(error);
            }
            out.push(rotated);
        }
        out
    }
}
