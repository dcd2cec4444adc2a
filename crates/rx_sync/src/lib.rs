//! Receiver-side synchronization core for a narrow-band QPSK link.
//!
//! Takes a complex baseband stream impaired by symbol-timing, carrier
//! frequency, and carrier phase offsets and produces aligned, derotated,
//! decision-ready symbols plus frame boundaries:
//!
//! ```text
//! 2 SPS samples -> GardnerTimingCorrector -> CorrelationFrameDetector
//!               -> CoarseCfoEstimator (estimate + correct) -> CostasLoop
//! ```
//!
//! The [`AcquisitionFrameDetector`] variant can instead run ahead of timing
//! recovery, searching a bank of frequency-offset hypotheses.
//!
//! Everything is single-threaded and pull-based: each component consumes a
//! finite slice per call, returns a finite slice, and carries its residual
//! state to the next call as if the inputs had been concatenated.

pub mod cfo_estimator;
pub mod convolution;
pub mod costas_loop;
pub mod error;
pub mod farrow_interpolator;
pub mod frame_detector;
pub mod loop_filter;
pub mod phase_lock_detector;
pub mod timing_corrector;

pub use cfo_estimator::{CfoDetectorKind, CoarseCfoEstimator};
pub use costas_loop::CostasLoop;
pub use error::{Result, SyncError};
pub use farrow_interpolator::FarrowInterpolator;
pub use frame_detector::{
    AcquisitionFrameDetector, CorrelationFrameDetector, DetectionMode, DetectionResult,
    DifferentialCorrelationFrameDetector, PreambleDetector,
};
pub use loop_filter::LoopFilter;
pub use phase_lock_detector::PhaseLockDetector;
pub use timing_corrector::GardnerTimingCorrector;
