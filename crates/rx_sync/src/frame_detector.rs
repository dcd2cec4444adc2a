use crate::convolution::{convolve_valid, convolve_valid_fft, window_energy};
use crate::error::{Result, SyncError};
use itertools::izip;
use log::debug;
use num::complex::Complex32;
use std::cmp::Ordering;
use std::f32::consts::TAU;

/// Floor applied to the correlation-metric denominator so silent stretches
/// of the input cannot divide by zero.
const MIN_NORMALIZATION: f32 = 1e-12;

/// How a detector picks a candidate out of the correlation metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    /// First metric sample above the detection threshold, or a miss.
    First,
    /// Position of the metric maximum, always a candidate.
    Max,
}

/// One detected frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    /// Start of the frame in the coordinates of the concatenated input
    /// stream. Monotone across `process` calls.
    pub sample_offset: usize,
    /// Normalised correlation metric at the detection point, in [0, 1].
    pub metric: f32,
    /// The frequency-offset hypothesis (radians/sample) whose matched
    /// filter won, for detectors that run a hypothesis bank.
    pub cfo_hypothesis: Option<f32>,
    /// The aligned frame samples. Populated when the frame is emitted.
    pub frame: Option<Vec<Complex32>>,
}

/// A candidate produced by a variant's preamble scan.
struct PreambleHit {
    offset: usize,
    metric: f32,
    cfo_hypothesis: Option<f32>,
}

#[derive(Debug)]
enum SearchPhase {
    /// Scanning the buffer for a preamble.
    Search,
    /// A preamble was found; waiting for a full frame to slice out.
    Acquire(DetectionResult),
}

/// The two-state streaming machine shared by every detector variant.
///
/// Owns the growable sample buffer, the SEARCH/ACQUIRE transitions, and the
/// running stream position used to report frame starts globally. The
/// per-variant correlation scan is passed in as a hook.
#[derive(Debug)]
struct FrameStateMachine {
    phase: SearchPhase,
    buffer: Vec<Complex32>,
    stream_position: usize,
    expected_frame_length: usize,
    preamble_length: usize,
}

impl FrameStateMachine {
    fn new(expected_frame_length: usize, preamble_length: usize) -> Self {
        Self {
            phase: SearchPhase::Search,
            buffer: Vec::new(),
            stream_position: 0,
            expected_frame_length,
            preamble_length,
        }
    }

    fn reset(&mut self) {
        self.phase = SearchPhase::Search;
        self.buffer.clear();
        self.stream_position = 0;
    }

    fn discard(&mut self, total: usize) {
        self.buffer.drain(..total);
        self.stream_position += total;
    }

    fn process(
        &mut self,
        new_samples: &[Complex32],
        mut detect: impl FnMut(&[Complex32]) -> Option<PreambleHit>,
    ) -> Vec<DetectionResult> {
        self.buffer.extend_from_slice(new_samples);

        let mut results = Vec::new();
        loop {
            // Pause the machine until the buffer can hold a whole frame.
            if self.buffer.len() < self.expected_frame_length {
                break;
            }

            match std::mem::replace(&mut self.phase, SearchPhase::Search) {
                SearchPhase::Search => match detect(&self.buffer) {
                    Some(hit) => {
                        self.discard(hit.offset);
                        debug!(
                            "preamble found at sample {} (metric {:.3})",
                            self.stream_position, hit.metric
                        );
                        self.phase = SearchPhase::Acquire(DetectionResult {
                            sample_offset: self.stream_position,
                            metric: hit.metric,
                            cfo_hypothesis: hit.cfo_hypothesis,
                            frame: None,
                        });
                    }
                    None => {
                        // Keep a preamble's worth of tail so a preamble
                        // straddling the boundary survives into the next call.
                        let keep = self.preamble_length.min(self.buffer.len());
                        self.discard(self.buffer.len() - keep);
                        break;
                    }
                },
                SearchPhase::Acquire(mut pending) => {
                    pending.frame = Some(self.buffer[..self.expected_frame_length].to_vec());
                    self.discard(self.expected_frame_length);
                    results.push(pending);
                }
            }
        }
        results
    }
}

/// Matched filter for one reference sequence plus the constants of the
/// normalised detection metric.
#[derive(Debug, Clone)]
struct MatchedFilterScanner {
    /// Time-reversed conjugate of the reference sequence.
    kernel: Vec<Complex32>,
    /// Energy of the reference sequence.
    reference_energy: f32,
    use_fft: bool,
}

impl MatchedFilterScanner {
    fn new(reference: &[Complex32], use_fft: bool) -> Self {
        let kernel: Vec<Complex32> = reference.iter().rev().map(|x| x.conj()).collect();
        let reference_energy: f32 = reference.iter().map(|x| x.norm_sqr()).sum();
        Self {
            kernel,
            reference_energy,
            use_fft,
        }
    }

    /// Normalised correlation metric over the valid region of the buffer:
    /// `m[n] = |y[n]|^2 / (E_ref * E[n])`, bounded to [0, 1] by
    /// Cauchy-Schwarz.
    fn metrics(&self, buffer: &[Complex32]) -> Vec<f32> {
        let correlation = match self.use_fft {
            true => convolve_valid_fft(&self.kernel, buffer),
            false => convolve_valid(&self.kernel, buffer),
        };
        let energies = window_energy(buffer, self.kernel.len());
        izip!(correlation.iter(), energies.iter())
            .map(|(y, energy)| {
                let normalization = (self.reference_energy * energy).max(MIN_NORMALIZATION);
                y.norm_sqr() / normalization
            })
            .collect()
    }

    fn scan(&self, buffer: &[Complex32], mode: DetectionMode, threshold: f32) -> Option<(usize, f32)> {
        let metrics = self.metrics(buffer);
        match mode {
            DetectionMode::First => metrics
                .iter()
                .position(|&m| m > threshold)
                .map(|n| (n, metrics[n])),
            DetectionMode::Max => metrics
                .iter()
                .copied()
                .enumerate()
                .max_by(|(_, x), (_, y)| {
                    if x > y {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    }
                }),
        }
    }
}

fn validate_config(preamble_length: usize, expected_frame_length: usize, threshold: f32) -> Result<()> {
    if preamble_length < 2 {
        return Err(SyncError::InvalidConfig(format!(
            "preamble must contain at least 2 samples, got {preamble_length}"
        )));
    }
    if expected_frame_length < preamble_length {
        return Err(SyncError::InvalidConfig(format!(
            "expected frame length {expected_frame_length} is shorter than the preamble ({preamble_length})"
        )));
    }
    validate_threshold(threshold)
}

fn validate_threshold(threshold: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(SyncError::InvalidConfig(format!(
            "detection threshold must be within [0, 1], got {threshold}"
        )));
    }
    Ok(())
}

fn first_difference(x: &[Complex32]) -> Vec<Complex32> {
    x.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Streaming preamble detector based on a normalised matched filter.
#[derive(Debug)]
pub struct CorrelationFrameDetector {
    machine: FrameStateMachine,
    preamble: Vec<Complex32>,
    scanner: MatchedFilterScanner,
    detection_threshold: f32,
    mode: DetectionMode,
    use_fft: bool,
}

impl CorrelationFrameDetector {
    pub fn new(
        preamble: &[Complex32],
        expected_frame_length: usize,
        detection_threshold: f32,
    ) -> Result<Self> {
        Self::with_mode(preamble, expected_frame_length, detection_threshold, DetectionMode::First)
    }

    pub fn with_mode(
        preamble: &[Complex32],
        expected_frame_length: usize,
        detection_threshold: f32,
        mode: DetectionMode,
    ) -> Result<Self> {
        validate_config(preamble.len(), expected_frame_length, detection_threshold)?;
        Ok(Self {
            machine: FrameStateMachine::new(expected_frame_length, preamble.len()),
            preamble: preamble.to_vec(),
            scanner: MatchedFilterScanner::new(preamble, false),
            detection_threshold,
            mode,
            use_fft: false,
        })
    }

    /// Switches the correlation between the direct form and the FFT-based
    /// acceleration. Both produce the same metric up to rounding.
    pub fn enable_fft_correlation(&mut self, enabled: bool) {
        self.use_fft = enabled;
        self.scanner = MatchedFilterScanner::new(&self.preamble, enabled);
    }

    /// Appends samples and returns one result per frame completed by them.
    pub fn process(&mut self, new_samples: &[Complex32]) -> Vec<DetectionResult> {
        let scanner = &self.scanner;
        let mode = self.mode;
        let threshold = self.detection_threshold;
        self.machine.process(new_samples, |buffer| {
            scanner
                .scan(buffer, mode, threshold)
                .map(|(offset, metric)| PreambleHit {
                    offset,
                    metric,
                    cfo_hypothesis: None,
                })
        })
    }

    /// Replaces the preamble, rebuilding the matched filter and its
    /// normalisation constant. Buffered samples are kept.
    pub fn set_preamble(&mut self, preamble: &[Complex32]) -> Result<()> {
        validate_config(preamble.len(), self.machine.expected_frame_length, self.detection_threshold)?;
        self.preamble = preamble.to_vec();
        self.scanner = MatchedFilterScanner::new(preamble, self.use_fft);
        self.machine.preamble_length = preamble.len();
        Ok(())
    }

    pub fn set_expected_frame_length(&mut self, expected_frame_length: usize) -> Result<()> {
        validate_config(self.preamble.len(), expected_frame_length, self.detection_threshold)?;
        self.machine.expected_frame_length = expected_frame_length;
        Ok(())
    }

    pub fn set_detection_threshold(&mut self, detection_threshold: f32) -> Result<()> {
        validate_threshold(detection_threshold)?;
        self.detection_threshold = detection_threshold;
        Ok(())
    }

    pub fn detection_threshold(&self) -> f32 {
        self.detection_threshold
    }

    /// Number of samples currently buffered by the streaming machine.
    pub fn buffered_len(&self) -> usize {
        self.machine.buffer.len()
    }

    /// Drops buffered samples and returns the machine to SEARCH.
    pub fn reset(&mut self) {
        self.machine.reset();
    }
}

/// Correlation detector that operates on the first differences of both the
/// preamble and the received stream, trading a little processing gain for a
/// correlation peak that tolerates carrier frequency offset.
#[derive(Debug)]
pub struct DifferentialCorrelationFrameDetector {
    machine: FrameStateMachine,
    preamble: Vec<Complex32>,
    scanner: MatchedFilterScanner,
    detection_threshold: f32,
    mode: DetectionMode,
    use_fft: bool,
}

impl DifferentialCorrelationFrameDetector {
    pub fn new(
        preamble: &[Complex32],
        expected_frame_length: usize,
        detection_threshold: f32,
    ) -> Result<Self> {
        Self::with_mode(preamble, expected_frame_length, detection_threshold, DetectionMode::First)
    }

    pub fn with_mode(
        preamble: &[Complex32],
        expected_frame_length: usize,
        detection_threshold: f32,
        mode: DetectionMode,
    ) -> Result<Self> {
        validate_config(preamble.len(), expected_frame_length, detection_threshold)?;
        Ok(Self {
            machine: FrameStateMachine::new(expected_frame_length, preamble.len()),
            preamble: preamble.to_vec(),
            scanner: MatchedFilterScanner::new(&first_difference(preamble), false),
            detection_threshold,
            mode,
            use_fft: false,
        })
    }

    pub fn enable_fft_correlation(&mut self, enabled: bool) {
        self.use_fft = enabled;
        self.scanner = MatchedFilterScanner::new(&first_difference(&self.preamble), enabled);
    }

    pub fn process(&mut self, new_samples: &[Complex32]) -> Vec<DetectionResult> {
        let scanner = &self.scanner;
        let mode = self.mode;
        let threshold = self.detection_threshold;
        self.machine.process(new_samples, |buffer| {
            // A difference window starting at n spans buffer[n..n + N_p], so
            // hit offsets map one-to-one onto the undifferenced buffer.
            let differenced = first_difference(buffer);
            scanner
                .scan(&differenced, mode, threshold)
                .map(|(offset, metric)| PreambleHit {
                    offset,
                    metric,
                    cfo_hypothesis: None,
                })
        })
    }

    pub fn set_preamble(&mut self, preamble: &[Complex32]) -> Result<()> {
        validate_config(preamble.len(), self.machine.expected_frame_length, self.detection_threshold)?;
        self.preamble = preamble.to_vec();
        self.scanner = MatchedFilterScanner::new(&first_difference(preamble), self.use_fft);
        self.machine.preamble_length = preamble.len();
        Ok(())
    }

    pub fn set_expected_frame_length(&mut self, expected_frame_length: usize) -> Result<()> {
        validate_config(self.preamble.len(), expected_frame_length, self.detection_threshold)?;
        self.machine.expected_frame_length = expected_frame_length;
        Ok(())
    }

    pub fn set_detection_threshold(&mut self, detection_threshold: f32) -> Result<()> {
        validate_threshold(detection_threshold)?;
        self.detection_threshold = detection_threshold;
        Ok(())
    }

    pub fn detection_threshold(&self) -> f32 {
        self.detection_threshold
    }

    pub fn buffered_len(&self) -> usize {
        self.machine.buffer.len()
    }

    pub fn reset(&mut self) {
        self.machine.reset();
    }
}

/// Acquisition-stage detector that searches over a bank of carrier
/// frequency offset hypotheses.
///
/// Each hypothesis contributes a matched filter built from the preamble
/// remodulated by `exp(j*omega*n)`. Every scan runs the whole bank in max
/// mode; the winning metric is compared against the detection threshold and
/// its hypothesis is reported on the result.
#[derive(Debug)]
pub struct AcquisitionFrameDetector {
    machine: FrameStateMachine,
    preamble: Vec<Complex32>,
    cfo_offsets: Vec<f32>,
    bank: Vec<(f32, MatchedFilterScanner)>,
    detection_threshold: f32,
    use_fft: bool,
}

/// Default hypothesis grid: six offsets linearly spaced across a 0.05%
/// carrier offset range.
fn default_cfo_offsets() -> Vec<f32> {
    let max_offset = 0.05 * TAU / 100.0;
    let total = 6;
    (0..total)
        .map(|i| max_offset * i as f32 / (total - 1) as f32)
        .collect()
}

fn build_bank(
    preamble: &[Complex32],
    cfo_offsets: &[f32],
    use_fft: bool,
) -> Vec<(f32, MatchedFilterScanner)> {
    cfo_offsets
        .iter()
        .map(|&omega| {
            let rotated: Vec<Complex32> = preamble
                .iter()
                .enumerate()
                .map(|(n, &p)| p * Complex32::cis(omega * n as f32))
                .collect();
            (omega, MatchedFilterScanner::new(&rotated, use_fft))
        })
        .collect()
}

impl AcquisitionFrameDetector {
    pub fn new(
        preamble: &[Complex32],
        expected_frame_length: usize,
        detection_threshold: f32,
    ) -> Result<Self> {
        Self::with_cfo_offsets(
            preamble,
            expected_frame_length,
            detection_threshold,
            default_cfo_offsets(),
        )
    }

    pub fn with_cfo_offsets(
        preamble: &[Complex32],
        expected_frame_length: usize,
        detection_threshold: f32,
        cfo_offsets: Vec<f32>,
    ) -> Result<Self> {
        validate_config(preamble.len(), expected_frame_length, detection_threshold)?;
        if cfo_offsets.is_empty() {
            return Err(SyncError::InvalidConfig(
                "acquisition detector needs at least one CFO hypothesis".to_string(),
            ));
        }
        let bank = build_bank(preamble, &cfo_offsets, false);
        Ok(Self {
            machine: FrameStateMachine::new(expected_frame_length, preamble.len()),
            preamble: preamble.to_vec(),
            cfo_offsets,
            bank,
            detection_threshold,
            use_fft: false,
        })
    }

    pub fn enable_fft_correlation(&mut self, enabled: bool) {
        self.use_fft = enabled;
        self.bank = build_bank(&self.preamble, &self.cfo_offsets, enabled);
    }

    pub fn process(&mut self, new_samples: &[Complex32]) -> Vec<DetectionResult> {
        let bank = &self.bank;
        let threshold = self.detection_threshold;
        self.machine.process(new_samples, |buffer| {
            let best = bank
                .iter()
                .filter_map(|(omega, scanner)| {
                    scanner
                        .scan(buffer, DetectionMode::Max, threshold)
                        .map(|(offset, metric)| (offset, metric, *omega))
                })
                .max_by(|(_, x, _), (_, y, _)| {
                    if x > y {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    }
                });

            best.filter(|&(_, metric, _)| metric > threshold)
                .map(|(offset, metric, omega)| PreambleHit {
                    offset,
                    metric,
                    cfo_hypothesis: Some(omega),
                })
        })
    }

    pub fn set_preamble(&mut self, preamble: &[Complex32]) -> Result<()> {
        validate_config(preamble.len(), self.machine.expected_frame_length, self.detection_threshold)?;
        self.preamble = preamble.to_vec();
        self.bank = build_bank(preamble, &self.cfo_offsets, self.use_fft);
        self.machine.preamble_length = preamble.len();
        Ok(())
    }

    pub fn set_expected_frame_length(&mut self, expected_frame_length: usize) -> Result<()> {
        validate_config(self.preamble.len(), expected_frame_length, self.detection_threshold)?;
        self.machine.expected_frame_length = expected_frame_length;
        Ok(())
    }

    /// Replaces the hypothesis grid and rebuilds the filter bank.
    pub fn set_cfo_offsets(&mut self, cfo_offsets: Vec<f32>) -> Result<()> {
        if cfo_offsets.is_empty() {
            return Err(SyncError::InvalidConfig(
                "acquisition detector needs at least one CFO hypothesis".to_string(),
            ));
        }
        self.bank = build_bank(&self.preamble, &cfo_offsets, self.use_fft);
        self.cfo_offsets = cfo_offsets;
        Ok(())
    }

    pub fn cfo_offsets(&self) -> &[f32] {
        &self.cfo_offsets
    }

    pub fn set_detection_threshold(&mut self, detection_threshold: f32) -> Result<()> {
        validate_threshold(detection_threshold)?;
        self.detection_threshold = detection_threshold;
        Ok(())
    }

    pub fn buffered_len(&self) -> usize {
        self.machine.buffer.len()
    }

    pub fn reset(&mut self) {
        self.machine.reset();
    }
}

/// Detector variants behind one dispatching surface, for components that
/// hold "some preamble detector" chosen at configuration time.
#[derive(Debug)]
pub enum PreambleDetector {
    Correlation(CorrelationFrameDetector),
    Differential(DifferentialCorrelationFrameDetector),
    Acquisition(AcquisitionFrameDetector),
}

impl PreambleDetector {
    pub fn process(&mut self, new_samples: &[Complex32]) -> Vec<DetectionResult> {
        match self {
            Self::Correlation(detector) => detector.process(new_samples),
            Self::Differential(detector) => detector.process(new_samples),
            Self::Acquisition(detector) => detector.process(new_samples),
        }
    }

    pub fn set_preamble(&mut self, preamble: &[Complex32]) -> Result<()> {
        match self {
            Self::Correlation(detector) => detector.set_preamble(preamble),
            Self::Differential(detector) => detector.set_preamble(preamble),
            Self::Acquisition(detector) => detector.set_preamble(preamble),
        }
    }

    pub fn set_expected_frame_length(&mut self, expected_frame_length: usize) -> Result<()> {
        match self {
            Self::Correlation(detector) => detector.set_expected_frame_length(expected_frame_length),
            Self::Differential(detector) => detector.set_expected_frame_length(expected_frame_length),
            Self::Acquisition(detector) => detector.set_expected_frame_length(expected_frame_length),
        }
    }

    pub fn set_detection_threshold(&mut self, threshold: f32) -> Result<()> {
        match self {
            Self::Correlation(detector) => detector.set_detection_threshold(threshold),
            Self::Differential(detector) => detector.set_detection_threshold(threshold),
            Self::Acquisition(detector) => detector.set_detection_threshold(threshold),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Correlation(detector) => detector.reset(),
            Self::Differential(detector) => detector.reset(),
            Self::Acquisition(detector) => detector.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn re(x: f32) -> Complex32 {
        Complex32::new(x, 0.0)
    }

    /// Barker-like preamble whose partial self-correlations stay well below
    /// the thresholds used here.
    fn preamble() -> Vec<Complex32> {
        vec![re(1.0), re(1.0), re(-1.0), re(1.0)]
    }

    fn payload() -> Vec<Complex32> {
        vec![
            Complex32::new(0.0, 1.0),
            Complex32::new(0.0, -1.0),
            re(-1.0),
            re(1.0),
        ]
    }

    /// 3 zero samples, frame at 3..11, 2 zero samples, frame at 13..21.
    fn two_frame_stream() -> Vec<Complex32> {
        let mut stream = vec![Complex32::default(); 3];
        stream.extend(preamble());
        stream.extend(payload());
        stream.extend(vec![Complex32::default(); 2]);
        stream.extend(preamble());
        stream.extend(payload());
        stream
    }

    #[test]
    fn rejects_invalid_configuration() {
        let p = preamble();
        assert!(CorrelationFrameDetector::new(&p, 8, 1.5).is_err());
        assert!(CorrelationFrameDetector::new(&p, 8, -0.1).is_err());
        assert!(CorrelationFrameDetector::new(&p, 3, 0.5).is_err());
        assert!(CorrelationFrameDetector::new(&p[..1], 8, 0.5).is_err());
        assert!(AcquisitionFrameDetector::with_cfo_offsets(&p, 8, 0.5, vec![]).is_err());
    }

    #[test]
    fn zero_signal_never_detects() {
        let mut detector = CorrelationFrameDetector::new(&preamble(), 8, 0.5).unwrap();
        for _ in 0..4 {
            let results = detector.process(&vec![Complex32::default(); 11]);
            assert!(results.is_empty());
        }
    }

    #[test]
    fn detects_frames_at_their_true_starts() {
        let mut detector = CorrelationFrameDetector::new(&preamble(), 8, 0.5).unwrap();
        let results = detector.process(&two_frame_stream());

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].sample_offset, 3);
        assert_eq!(results[1].sample_offset, 13);
        for result in &results {
            assert!(result.metric > 0.99);
            let frame = result.frame.as_ref().unwrap();
            assert_eq!(frame.len(), 8);
            assert_eq!(&frame[..4], preamble().as_slice());
        }
    }

    #[test]
    fn search_miss_keeps_only_a_preamble_tail() {
        let mut detector = CorrelationFrameDetector::new(&preamble(), 8, 0.5).unwrap();
        detector.process(&vec![Complex32::default(); 30]);
        assert_eq!(detector.buffered_len(), 4);
    }

    #[test]
    fn short_input_is_buffered_without_scanning() {
        let mut detector = CorrelationFrameDetector::new(&preamble(), 8, 0.5).unwrap();
        detector.process(&vec![Complex32::default(); 5]);
        assert_eq!(detector.buffered_len(), 5);
    }

    #[test]
    fn streaming_is_equivalent_to_batch() {
        let stream = two_frame_stream();
        let batch = {
            let mut detector = CorrelationFrameDetector::new(&preamble(), 8, 0.5).unwrap();
            detector.process(&stream)
        };

        for split in [1, 5, 10, 12, 16, 20] {
            let mut detector = CorrelationFrameDetector::new(&preamble(), 8, 0.5).unwrap();
            let mut streamed = detector.process(&stream[..split]);
            streamed.extend(detector.process(&stream[split..]));
            assert_eq!(streamed, batch, "split at {split}");
        }
    }

    #[test]
    fn frame_straddling_a_call_boundary_is_still_found() {
        let stream = two_frame_stream();
        let mut detector = CorrelationFrameDetector::new(&preamble(), 8, 0.5).unwrap();
        let mut results = Vec::new();
        for sample in &stream {
            results.extend(detector.process(std::slice::from_ref(sample)));
        }
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].sample_offset, 3);
        assert_eq!(results[1].sample_offset, 13);
    }

    #[test]
    fn fft_correlation_finds_the_same_frames() {
        let mut detector = CorrelationFrameDetector::new(&preamble(), 8, 0.5).unwrap();
        detector.enable_fft_correlation(true);
        let results = detector.process(&two_frame_stream());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].sample_offset, 3);
        assert_eq!(results[1].sample_offset, 13);
    }

    #[test]
    fn max_mode_always_produces_a_candidate() {
        let mut detector =
            CorrelationFrameDetector::with_mode(&preamble(), 8, 0.99, DetectionMode::Max).unwrap();
        // Pure payload with no preamble in it: max mode still slices frames.
        let junk: Vec<Complex32> = (0..16)
            .map(|i| Complex32::cis(i as f32 * 1.9))
            .collect();
        let mut results = detector.process(&junk);
        results.extend(detector.process(&junk));
        assert!(!results.is_empty());
    }

    #[test]
    fn differential_detector_finds_clean_frames() {
        let mut detector =
            DifferentialCorrelationFrameDetector::new(&preamble(), 8, 0.6).unwrap();
        let results = detector.process(&two_frame_stream());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].sample_offset, 3);
        assert_eq!(results[1].sample_offset, 13);
    }

    #[test]
    fn differential_detector_survives_carrier_offset() {
        // A rotation rate this fast wrecks the plain correlation metric.
        let omega = 1.5f32;
        let stream: Vec<Complex32> = two_frame_stream()
            .iter()
            .enumerate()
            .map(|(n, &x)| x * Complex32::cis(omega * n as f32))
            .collect();

        let mut differential =
            DifferentialCorrelationFrameDetector::new(&preamble(), 8, 0.3).unwrap();
        let results = differential.process(&stream);
        assert_eq!(results.len(), 2);

        let mut plain = CorrelationFrameDetector::new(&preamble(), 8, 0.3).unwrap();
        let plain_results = plain.process(&stream);
        let aligned = plain_results
            .iter()
            .filter(|r| r.sample_offset == 3 || r.sample_offset == 13)
            .count();
        assert!(aligned < 2, "plain correlation should degrade under this CFO");
    }

    #[test]
    fn acquisition_detector_tags_the_winning_hypothesis() {
        let preamble: Vec<Complex32> = (0..16).map(|n| Complex32::cis(0.5 * n as f32)).collect();
        let mut payload: Vec<Complex32> = (0..8).map(|n| Complex32::cis(2.1 * n as f32)).collect();

        let omega = 0.2f32;
        let mut stream = vec![Complex32::default(); 5];
        stream.extend(preamble.iter().copied());
        stream.append(&mut payload);
        let stream: Vec<Complex32> = stream
            .iter()
            .enumerate()
            .map(|(n, &x)| x * Complex32::cis(omega * n as f32))
            .collect();

        let mut detector = AcquisitionFrameDetector::with_cfo_offsets(
            &preamble,
            24,
            0.5,
            vec![0.0, 0.2, 0.4],
        )
        .unwrap();
        let results = detector.process(&stream);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].sample_offset, 5);
        assert_eq!(results[0].cfo_hypothesis, Some(0.2));
        assert!(results[0].metric > 0.9);
    }

    #[test]
    fn acquisition_default_grid_spans_the_documented_range() {
        let detector = AcquisitionFrameDetector::new(&preamble(), 8, 0.5).unwrap();
        let offsets = detector.cfo_offsets();
        assert_eq!(offsets.len(), 6);
        assert_eq!(offsets[0], 0.0);
        assert!((offsets[5] - 0.05 * TAU / 100.0).abs() < 1e-9);
    }

    #[test]
    fn replacing_the_preamble_rebuilds_the_matched_filter() {
        let mut detector = CorrelationFrameDetector::new(&preamble(), 8, 0.5).unwrap();
        let replacement = vec![re(1.0), re(-1.0), re(1.0), re(1.0)];
        detector.set_preamble(&replacement).unwrap();

        let mut stream = vec![Complex32::default(); 3];
        stream.extend(replacement.iter().copied());
        stream.extend(payload());
        let results = detector.process(&stream);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].sample_offset, 3);
    }
}
