//! Observation geometry: beams, dispersion trials, samples, and padding.
//!
//! All flat-index arithmetic for both data layouts lives here so that the
//! workload generator, the host references, and the generated device code
//! agree on addressing. Every buffer element handled by this crate is four
//! bytes wide (f32 values, u32 indices), so padded lengths are computed in
//! four-byte elements.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory ordering of the input matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataLayout {
    /// Trials are the slow dimension: one padded row of samples per
    /// reduction group.
    TrialsSamples,
    /// Samples are the slow dimension: one padded row of trials per
    /// subband of every (beam, sample) pair.
    SamplesTrials,
}

impl DataLayout {
    /// Name used in reports and profile exports.
    pub fn label(self) -> &'static str {
        match self {
            DataLayout::TrialsSamples => "trials-samples",
            DataLayout::SamplesTrials => "samples-trials",
        }
    }
}

/// Shape errors caught before any device interaction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("beam, trial, subband-trial, and sample counts must all be non-zero")]
    EmptyDimension,
    #[error("padding must be a non-zero multiple of 4 bytes, got {0}")]
    BadPadding(usize),
    #[error("median step {step} does not divide {samples} samples")]
    MedianStep { step: usize, samples: usize },
    #[error("thread bounds {min}..={max} are empty or start at zero")]
    BadThreadBounds { min: usize, max: usize },
    #[error("iteration count must be non-zero")]
    NoIterations,
}

/// Immutable description of one observation batch.
///
/// `subband_trials` is 1 when subbanding is disabled; the number of
/// reduction groups is always `beams * subband_trials * trials`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    beams: usize,
    trials: usize,
    subband_trials: usize,
    samples: usize,
    padding: usize,
    layout: DataLayout,
}

impl Observation {
    pub fn new(
        beams: usize,
        trials: usize,
        subband_trials: usize,
        samples: usize,
        padding: usize,
        layout: DataLayout,
    ) -> Result<Self, ShapeError> {
        if beams == 0 || trials == 0 || subband_trials == 0 || samples == 0 {
            return Err(ShapeError::EmptyDimension);
        }
        if padding == 0 || padding % 4 != 0 {
            return Err(ShapeError::BadPadding(padding));
        }
        Ok(Self {
            beams,
            trials,
            subband_trials,
            samples,
            padding,
            layout,
        })
    }

    pub fn beams(&self) -> usize {
        self.beams
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    pub fn subband_trials(&self) -> usize {
        self.subband_trials
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn layout(&self) -> DataLayout {
        self.layout
    }

    pub fn subbanding(&self) -> bool {
        self.subband_trials > 1
    }

    /// Trials across all subbands; the trial dimension of launch grids.
    pub fn trials_total(&self) -> usize {
        self.subband_trials * self.trials
    }

    /// Number of reduction groups: one per (beam, subband-trial, trial).
    pub fn reduction_groups(&self) -> usize {
        self.beams * self.trials_total()
    }

    /// Round a count of four-byte elements up to the padding unit.
    pub fn padded(&self, count: usize) -> usize {
        let unit = self.padding / 4;
        count.div_ceil(unit) * unit
    }

    pub fn padded_samples(&self) -> usize {
        self.padded(self.samples)
    }

    /// Per-subband padded trial row, used by the samples-major layout.
    pub fn padded_trials(&self) -> usize {
        self.padded(self.trials)
    }

    pub fn padded_trials_total(&self) -> usize {
        self.padded(self.trials_total())
    }

    /// Total elements of the input matrix, padding included.
    pub fn input_len(&self) -> usize {
        match self.layout {
            DataLayout::TrialsSamples => self.beams * self.trials_total() * self.padded_samples(),
            DataLayout::SamplesTrials => {
                self.beams * self.samples * self.subband_trials * self.padded_trials()
            }
        }
    }

    /// Flat index of one sample in the input matrix.
    pub fn input_index(&self, beam: usize, subband: usize, trial: usize, sample: usize) -> usize {
        match self.layout {
            DataLayout::TrialsSamples => {
                (((beam * self.subband_trials + subband) * self.trials + trial)
                    * self.padded_samples())
                    + sample
            }
            DataLayout::SamplesTrials => {
                (((beam * self.samples + sample) * self.subband_trials + subband)
                    * self.padded_trials())
                    + trial
            }
        }
    }

    /// Index of a reduction group in per-group output buffers, which are
    /// padded per beam.
    pub fn group_index(&self, beam: usize, subband: usize, trial: usize) -> usize {
        beam * self.padded_trials_total() + subband * self.trials + trial
    }

    /// Elements of a per-group output buffer.
    pub fn group_output_len(&self) -> usize {
        self.beams * self.padded_trials_total()
    }

    /// Index of a reduction group in unpadded host-side tables such as the
    /// planted-answer map.
    pub fn logical_group_index(&self, beam: usize, subband: usize, trial: usize) -> usize {
        (beam * self.subband_trials + subband) * self.trials + trial
    }

    /// Index into a per-chunk output buffer holding `chunks` values per
    /// reduction group, padded per beam.
    pub fn chunked_index(
        &self,
        chunks: usize,
        beam: usize,
        subband: usize,
        trial: usize,
        chunk: usize,
    ) -> usize {
        beam * self.padded(self.trials_total() * chunks)
            + (subband * self.trials + trial) * chunks
            + chunk
    }

    /// Elements of a per-chunk output buffer.
    pub fn chunked_output_len(&self, chunks: usize) -> usize {
        self.beams * self.padded(self.trials_total() * chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(layout: DataLayout) -> Observation {
        Observation::new(2, 3, 2, 16, 32, layout).unwrap()
    }

    // ── Construction ────────────────────────────────────────────────────

    #[test]
    fn rejects_zero_dimensions() {
        assert_eq!(
            Observation::new(0, 3, 1, 16, 32, DataLayout::TrialsSamples),
            Err(ShapeError::EmptyDimension)
        );
        assert_eq!(
            Observation::new(1, 0, 1, 16, 32, DataLayout::TrialsSamples),
            Err(ShapeError::EmptyDimension)
        );
        assert_eq!(
            Observation::new(1, 3, 0, 16, 32, DataLayout::TrialsSamples),
            Err(ShapeError::EmptyDimension)
        );
        assert_eq!(
            Observation::new(1, 3, 1, 0, 32, DataLayout::TrialsSamples),
            Err(ShapeError::EmptyDimension)
        );
    }

    #[test]
    fn rejects_bad_padding() {
        assert_eq!(
            Observation::new(1, 1, 1, 16, 0, DataLayout::TrialsSamples),
            Err(ShapeError::BadPadding(0))
        );
        assert_eq!(
            Observation::new(1, 1, 1, 16, 6, DataLayout::TrialsSamples),
            Err(ShapeError::BadPadding(6))
        );
    }

    // ── Padding arithmetic ──────────────────────────────────────────────

    #[test]
    fn padded_rounds_up_to_unit() {
        let o = obs(DataLayout::TrialsSamples);
        // 32-byte padding over 4-byte elements: unit of 8.
        assert_eq!(o.padded(1), 8);
        assert_eq!(o.padded(8), 8);
        assert_eq!(o.padded(9), 16);
    }

    #[test]
    fn padded_sizes_cover_logical_sizes() {
        let o = obs(DataLayout::TrialsSamples);
        assert!(o.padded_samples() >= o.samples());
        assert!(o.padded_trials() >= o.trials());
        assert!(o.padded_trials_total() >= o.trials_total());
    }

    #[test]
    fn trial_products() {
        let o = obs(DataLayout::TrialsSamples);
        assert_eq!(o.trials_total(), 6);
        assert_eq!(o.reduction_groups(), 12);
        assert!(o.subbanding());
    }

    // ── Index formulas ──────────────────────────────────────────────────

    #[test]
    fn trials_samples_input_index() {
        let o = obs(DataLayout::TrialsSamples);
        // padded_samples = 16; row for (beam 1, subband 1, trial 2) is
        // ((1 * 2 + 1) * 3 + 2) = 11 rows in.
        assert_eq!(o.input_index(1, 1, 2, 5), 11 * 16 + 5);
        assert_eq!(o.input_index(0, 0, 0, 0), 0);
    }

    #[test]
    fn samples_trials_input_index() {
        let o = obs(DataLayout::SamplesTrials);
        // padded_trials = 8; row for (beam 1, sample 5, subband 1) is
        // ((1 * 16 + 5) * 2 + 1) = 43 rows in.
        assert_eq!(o.input_index(1, 1, 2, 5), 43 * 8 + 2);
    }

    #[test]
    fn group_index_is_padded_per_beam() {
        let o = obs(DataLayout::TrialsSamples);
        // trials_total = 6 padded to 8.
        assert_eq!(o.padded_trials_total(), 8);
        assert_eq!(o.group_index(0, 1, 2), 5);
        assert_eq!(o.group_index(1, 0, 0), 8);
        assert_eq!(o.group_output_len(), 16);
    }

    #[test]
    fn logical_group_index_is_dense() {
        let o = obs(DataLayout::TrialsSamples);
        assert_eq!(o.logical_group_index(0, 0, 0), 0);
        assert_eq!(o.logical_group_index(0, 1, 2), 5);
        assert_eq!(o.logical_group_index(1, 0, 0), 6);
    }

    #[test]
    fn chunked_indexing() {
        let o = obs(DataLayout::TrialsSamples);
        // 4 chunks per group: 24 values per beam, padded to 24 (unit 8).
        assert_eq!(o.chunked_output_len(4), 2 * 24);
        assert_eq!(o.chunked_index(4, 0, 1, 2, 3), 5 * 4 + 3);
        assert_eq!(o.chunked_index(4, 1, 0, 0, 0), 24);
    }

    #[test]
    fn input_len_by_layout() {
        assert_eq!(obs(DataLayout::TrialsSamples).input_len(), 2 * 6 * 16);
        assert_eq!(obs(DataLayout::SamplesTrials).input_len(), 2 * 16 * 2 * 8);
    }
}
