use crate::error::{Result, SyncError};
use crate::frame_detector::{
    CorrelationFrameDetector, DifferentialCorrelationFrameDetector, PreambleDetector,
};
use itertools::izip;
use log::debug;
use num::complex::Complex32;

/// Scale on the median absolute deviation beyond which a per-pair estimate
/// is treated as an outlier.
const MAD_OUTLIER_SCALE: f64 = 2.5;
/// Substitute for a zero median absolute deviation, as a fraction of the
/// median itself.
const MAD_ZERO_RATIO: f64 = 0.03;

/// Which detector watches the stream for preambles on behalf of the
/// estimator.
///
/// The differential detector keeps its correlation peak under the very
/// frequency offsets being estimated, but is blind to preambles whose first
/// difference vanishes (e.g. a Schmidl-Cox preamble of identical samples),
/// for which the plain correlation detector is the right choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfoDetectorKind {
    Correlation,
    Differential,
}

#[derive(Debug)]
enum EstimatorMethod {
    /// Correlate the two identical preamble halves against each other.
    SchmidlCox { half_length: usize },
    /// Average the sample-to-sample drift of the received phase against the
    /// known preamble.
    PhaseDrift,
}

/// Coarse carrier-frequency-offset estimator fed by detected preambles.
///
/// `process` forwards samples to the internal frame detector (configured so
/// each "frame" is exactly one preamble); once a preamble is found the
/// estimate is refreshed from it. The phase-drift method is valid only
/// while the total drift across the preamble stays under pi, i.e.
/// `|w| * N_p < pi`; Schmidl-Cox extends that to `|w| <= pi / T`.
#[derive(Debug)]
pub struct CoarseCfoEstimator {
    method: EstimatorMethod,
    preamble: Vec<Complex32>,
    detector: PreambleDetector,
    w_est: Option<f64>,
}

impl CoarseCfoEstimator {
    /// Schmidl-Cox estimator. The preamble must be even in length with two
    /// sample-for-sample identical halves.
    pub fn schmidl_cox(
        preamble: &[Complex32],
        detection_threshold: f32,
        detector_kind: CfoDetectorKind,
    ) -> Result<Self> {
        let half_length = validate_schmidl_cox(preamble)?;
        Ok(Self {
            method: EstimatorMethod::SchmidlCox { half_length },
            preamble: preamble.to_vec(),
            detector: build_detector(preamble, detection_threshold, detector_kind)?,
            w_est: None,
        })
    }

    /// Phase-drift estimator over an arbitrary preamble.
    pub fn phase_drift(
        preamble: &[Complex32],
        detection_threshold: f32,
        detector_kind: CfoDetectorKind,
    ) -> Result<Self> {
        Ok(Self {
            method: EstimatorMethod::PhaseDrift,
            preamble: preamble.to_vec(),
            detector: build_detector(preamble, detection_threshold, detector_kind)?,
            w_est: None,
        })
    }

    /// Feeds samples to the preamble detector; refreshes and reports an
    /// estimate when at least one preamble was found.
    pub fn process(&mut self, new_samples: &[Complex32]) -> bool {
        let mut detections = self.detector.process(new_samples);
        let frame = detections
            .drain(..)
            .next()
            .and_then(|detection| detection.frame);
        match frame {
            Some(frame) => {
                let estimate = self.estimate_from(&frame);
                debug!("coarse CFO estimate {estimate:.6} rad/sample");
                self.w_est = Some(estimate);
                true
            }
            None => false,
        }
    }

    /// The most recent estimate in radians/sample.
    pub fn estimate(&self) -> Option<f64> {
        self.w_est
    }

    /// Estimates directly from an already-aligned received preamble.
    pub fn estimate_cfo(&mut self, rx_preamble: &[Complex32]) -> Result<f64> {
        if rx_preamble.len() != self.preamble.len() {
            return Err(SyncError::InvalidConfig(format!(
                "received preamble has {} samples, expected {}",
                rx_preamble.len(),
                self.preamble.len()
            )));
        }
        let estimate = self.estimate_from(rx_preamble);
        self.w_est = Some(estimate);
        Ok(estimate)
    }

    /// Derotates a signal by the current estimate: `y[n] = x[n]*e^{-j*w*n}`.
    pub fn correct(&self, signal: &[Complex32]) -> Result<Vec<Complex32>> {
        let w_est = self.w_est.ok_or_else(|| {
            SyncError::Usage("CFO must be estimated before it can be corrected".to_string())
        })?;
        Ok(signal
            .iter()
            .enumerate()
            .map(|(n, &x)| x * Complex32::cis(-(w_est * n as f64) as f32))
            .collect())
    }

    /// Replaces the preamble on the estimator and its detector, revalidating
    /// method invariants and rebuilding the matched filter. Buffered samples
    /// and the current estimate are kept.
    pub fn set_preamble(&mut self, preamble: &[Complex32]) -> Result<()> {
        if let EstimatorMethod::SchmidlCox { half_length } = &mut self.method {
            *half_length = validate_schmidl_cox(preamble)?;
        }

        // Each "frame" is one preamble, so the detector's frame length moves
        // with it. Order the two updates so the detector never observes a
        // frame shorter than its preamble.
        if preamble.len() >= self.preamble.len() {
            self.detector.set_expected_frame_length(preamble.len())?;
            self.detector.set_preamble(preamble)?;
        } else {
            self.detector.set_preamble(preamble)?;
            self.detector.set_expected_frame_length(preamble.len())?;
        }
        self.preamble = preamble.to_vec();
        Ok(())
    }

    pub fn set_detection_threshold(&mut self, detection_threshold: f32) -> Result<()> {
        self.detector.set_detection_threshold(detection_threshold)
    }

    /// Forgets the estimate and drops any buffered detector state.
    pub fn reset(&mut self) {
        self.w_est = None;
        self.detector.reset();
    }

    fn estimate_from(&self, rx_preamble: &[Complex32]) -> f64 {
        match self.method {
            EstimatorMethod::SchmidlCox { half_length } => {
                estimate_schmidl_cox(rx_preamble, half_length)
            }
            EstimatorMethod::PhaseDrift => estimate_phase_drift(rx_preamble, &self.preamble),
        }
    }
}

fn build_detector(
    preamble: &[Complex32],
    detection_threshold: f32,
    detector_kind: CfoDetectorKind,
) -> Result<PreambleDetector> {
    let expected_frame_length = preamble.len();
    Ok(match detector_kind {
        CfoDetectorKind::Correlation => PreambleDetector::Correlation(
            CorrelationFrameDetector::new(preamble, expected_frame_length, detection_threshold)?,
        ),
        CfoDetectorKind::Differential => {
            PreambleDetector::Differential(DifferentialCorrelationFrameDetector::new(
                preamble,
                expected_frame_length,
                detection_threshold,
            )?)
        }
    })
}

fn validate_schmidl_cox(preamble: &[Complex32]) -> Result<usize> {
    if preamble.len() % 2 != 0 {
        return Err(SyncError::InvalidConfig(format!(
            "Schmidl-Cox preamble must be even in length, got {}",
            preamble.len()
        )));
    }
    let half_length = preamble.len() / 2;
    let (first, second) = preamble.split_at(half_length);
    if first != second {
        return Err(SyncError::InvalidConfig(
            "Schmidl-Cox preamble must be two identical halves".to_string(),
        ));
    }
    Ok(half_length)
}

/// Per-pair Schmidl-Cox estimates with a median-absolute-deviation outlier
/// filter, which keeps the estimate usable under small frame-sync errors.
fn estimate_schmidl_cox(rx_preamble: &[Complex32], half_length: usize) -> f64 {
    let (first, second) = rx_preamble.split_at(half_length);
    let w_i: Vec<f64> = izip!(first.iter(), second.iter())
        .map(|(a, b)| {
            let pair = a.conj() * b;
            (pair.im as f64).atan2(pair.re as f64) / half_length as f64
        })
        .collect();

    let med = median(&w_i);
    let deviations: Vec<f64> = w_i.iter().map(|w| (w - med).abs()).collect();
    let mut mad = median(&deviations);
    if mad == 0.0 {
        mad = MAD_ZERO_RATIO * med;
    }

    let (sum, total) = izip!(w_i.iter(), deviations.iter())
        .filter(|&(_, &d)| d < MAD_OUTLIER_SCALE * mad)
        .fold((0.0f64, 0usize), |(sum, total), (&w, _)| (sum + w, total + 1));
    match total {
        0 => med,
        _ => sum / total as f64,
    }
}

/// Mean first difference of the phase offset between the received and the
/// reference preamble. No unwrapping is applied.
fn estimate_phase_drift(rx_preamble: &[Complex32], preamble: &[Complex32]) -> f64 {
    let phase_offsets: Vec<f64> = izip!(rx_preamble.iter(), preamble.iter())
        .map(|(r, p)| {
            let rotated = r * p.conj();
            (rotated.im as f64).atan2(rotated.re as f64)
        })
        .collect();

    let total = phase_offsets.len() - 1;
    let drift_sum: f64 = phase_offsets
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .sum();
    drift_sum / total as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        0.5 * (sorted[mid - 1] + sorted[mid])
    }
}
