//! Host-side references and device-output comparison.
//!
//! For every reduction group the oracle recomputes the kernel's statistic
//! in f64 from the immutable workload and compares the device output
//! against it. Value mismatches and index mismatches are counted
//! separately; both counters are always computed, and the summary gives
//! value mismatches priority.

use crate::config::KernelConfig;
use crate::observation::Observation;
use crate::stats::Statistics;
use crate::variant::{descriptor, KernelVariant, OutputShape};
use crate::workload::Workload;

/// Absolute comparison tolerance for device values.
pub const TOLERANCE: f32 = 1e-2;

/// Absolute-tolerance comparison, strict on the boundary.
///
/// The tolerance does not scale with magnitude: a large reference can hide
/// a proportionally large relative error, and a tiny one can flag noise.
/// Kept absolute deliberately, matching the pipeline this feeds.
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < TOLERANCE
}

/// Everything read back from the device after a validation launch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceOutput {
    pub values: Vec<f32>,
    pub indices: Option<Vec<u32>>,
    pub secondary: Option<Vec<f32>>,
}

/// Mismatch counters for one validation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComparisonCounts {
    pub wrong_values: u64,
    pub wrong_positions: u64,
    /// Number of compared elements; the percentage denominator.
    pub compared: u64,
}

impl ComparisonCounts {
    pub fn verdict(&self) -> Verdict {
        if self.wrong_values > 0 {
            Verdict::WrongValues
        } else if self.wrong_positions > 0 {
            Verdict::WrongPositions
        } else {
            Verdict::Passed
        }
    }

    pub fn wrong_value_percent(&self) -> f64 {
        percent(self.wrong_values, self.compared)
    }

    pub fn wrong_position_percent(&self) -> f64 {
        percent(self.wrong_positions, self.compared)
    }
}

fn percent(wrong: u64, compared: u64) -> f64 {
    if compared == 0 {
        0.0
    } else {
        wrong as f64 * 100.0 / compared as f64
    }
}

/// Outcome of a validation run. Value mismatches outrank index mismatches
/// in the summary even when both occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    WrongValues,
    WrongPositions,
}

/// Host references laid out like the device output buffers.
///
/// Values land at the same padded offsets the kernels write to, so one
/// flat index addresses both sides of a comparison. The index buffer
/// holds the planted indices of an index-reporting variant when the
/// workload has planted answers; the secondary buffer holds the kept
/// standard deviations. Padding slots stay zeroed.
pub fn references(
    variant: KernelVariant,
    obs: &Observation,
    cfg: &KernelConfig,
    workload: &Workload,
) -> DeviceOutput {
    let desc = descriptor(variant);
    let mut refs = DeviceOutput {
        values: vec![0.0; desc.value_output_len(obs, cfg)],
        indices: workload
            .planted
            .as_ref()
            .and_then(|_| desc.index_output_len(obs))
            .map(|len| vec![0u32; len]),
        secondary: desc.secondary_output_len(obs).map(|len| vec![0.0f32; len]),
    };
    match desc.output_shape {
        OutputShape::PerGroup => fill_group_references(variant, obs, cfg, workload, &mut refs),
        OutputShape::PerChunk => fill_chunk_references(variant, obs, cfg, workload, &mut refs),
        OutputShape::PerSample => fill_sample_references(obs, workload, &mut refs),
    }
    refs
}

fn fill_group_references(
    variant: KernelVariant,
    obs: &Observation,
    cfg: &KernelConfig,
    workload: &Workload,
    refs: &mut DeviceOutput,
) {
    let needs_cut = matches!(
        variant,
        KernelVariant::SnrSigmaCut | KernelVariant::MaxStdSigmaCut
    );
    for beam in 0..obs.beams() {
        for subband in 0..obs.subband_trials() {
            for trial in 0..obs.trials() {
                let group = obs.logical_group_index(beam, subband, trial);
                let out = obs.group_index(beam, subband, trial);
                let full = group_stats(obs, workload, beam, subband, trial);
                let kept = needs_cut
                    .then(|| sigma_cut_stats(obs, workload, beam, subband, trial, &full, cfg.sigma));

                let planted_max = workload
                    .planted
                    .as_ref()
                    .map(|p| p.value[group] as f64)
                    .unwrap_or_else(|| full.max());
                let reference = match variant {
                    KernelVariant::Snr => (full.max() - full.mean()) / full.std_dev(),
                    KernelVariant::SnrSigmaCut => {
                        let kept = kept.as_ref().unwrap_or(&full);
                        (full.max() - kept.mean()) / kept.std_dev()
                    }
                    _ => planted_max,
                };
                refs.values[out] = reference as f32;

                if let Some(secondary) = refs.secondary.as_mut() {
                    let kept = kept.as_ref().unwrap_or(&full);
                    secondary[out] = kept.std_dev() as f32;
                }
                if let (Some(indices), Some(planted)) =
                    (refs.indices.as_mut(), workload.planted.as_ref())
                {
                    indices[out] = planted.index[group] as u32;
                }
            }
        }
    }
}

fn fill_chunk_references(
    variant: KernelVariant,
    obs: &Observation,
    cfg: &KernelConfig,
    workload: &Workload,
    refs: &mut DeviceOutput,
) {
    let step = cfg.median_step;
    let chunks = obs.samples() / step;
    let deviations = variant == KernelVariant::MedianOfMediansAbsoluteDeviation;
    let mut scratch = vec![0.0f64; step];
    for beam in 0..obs.beams() {
        for subband in 0..obs.subband_trials() {
            for trial in 0..obs.trials() {
                let group = obs.logical_group_index(beam, subband, trial);
                let base = baseline_for(workload, group);
                for chunk in 0..chunks {
                    for (slot, sample) in (chunk * step..(chunk + 1) * step).enumerate() {
                        let x =
                            workload.input[obs.input_index(beam, subband, trial, sample)] as f64;
                        scratch[slot] = if deviations { (x - base).abs() } else { x };
                    }
                    let out = obs.chunked_index(chunks, beam, subband, trial, chunk);
                    refs.values[out] = median(&mut scratch) as f32;
                }
            }
        }
    }
}

fn fill_sample_references(obs: &Observation, workload: &Workload, refs: &mut DeviceOutput) {
    for beam in 0..obs.beams() {
        for subband in 0..obs.subband_trials() {
            for trial in 0..obs.trials() {
                let group = obs.logical_group_index(beam, subband, trial);
                let base = baseline_for(workload, group);
                for sample in 0..obs.samples() {
                    let idx = obs.input_index(beam, subband, trial, sample);
                    refs.values[idx] = (workload.input[idx] as f64 - base).abs() as f32;
                }
            }
        }
    }
}

/// Compare device output against host references for one variant.
pub fn compare(
    variant: KernelVariant,
    obs: &Observation,
    cfg: &KernelConfig,
    workload: &Workload,
    output: &DeviceOutput,
) -> ComparisonCounts {
    let desc = descriptor(variant);
    let refs = references(variant, obs, cfg, workload);
    let mut counts = ComparisonCounts::default();
    match desc.output_shape {
        OutputShape::PerGroup => {
            for beam in 0..obs.beams() {
                for subband in 0..obs.subband_trials() {
                    for trial in 0..obs.trials() {
                        let out = obs.group_index(beam, subband, trial);
                        counts.compared += 1;
                        let mut ok =
                            approx_eq(read(&output.values, out), read(&refs.values, out));
                        if let (Some(device), Some(reference)) =
                            (output.secondary.as_ref(), refs.secondary.as_ref())
                        {
                            ok &= approx_eq(read(device, out), read(reference, out));
                        }
                        if !ok {
                            counts.wrong_values += 1;
                        }

                        if let (Some(device), Some(planted)) =
                            (output.indices.as_ref(), refs.indices.as_ref())
                        {
                            if device.get(out).copied().unwrap_or(u32::MAX) != planted[out] {
                                counts.wrong_positions += 1;
                            }
                        }
                    }
                }
            }
        }
        OutputShape::PerChunk => {
            let chunks = obs.samples() / cfg.median_step;
            for beam in 0..obs.beams() {
                for subband in 0..obs.subband_trials() {
                    for trial in 0..obs.trials() {
                        for chunk in 0..chunks {
                            let out = obs.chunked_index(chunks, beam, subband, trial, chunk);
                            counts.compared += 1;
                            if !approx_eq(read(&output.values, out), read(&refs.values, out)) {
                                counts.wrong_values += 1;
                            }
                        }
                    }
                }
            }
        }
        OutputShape::PerSample => {
            for beam in 0..obs.beams() {
                for subband in 0..obs.subband_trials() {
                    for trial in 0..obs.trials() {
                        for sample in 0..obs.samples() {
                            let idx = obs.input_index(beam, subband, trial, sample);
                            counts.compared += 1;
                            if !approx_eq(read(&output.values, idx), read(&refs.values, idx)) {
                                counts.wrong_values += 1;
                            }
                        }
                    }
                }
            }
        }
    }
    counts
}

/// Full-precision statistics over all samples of one reduction group.
fn group_stats(
    obs: &Observation,
    workload: &Workload,
    beam: usize,
    subband: usize,
    trial: usize,
) -> Statistics {
    let mut stats = Statistics::new();
    for sample in 0..obs.samples() {
        stats.push(workload.input[obs.input_index(beam, subband, trial, sample)] as f64);
    }
    stats
}

/// Second-pass statistics over the samples surviving the sigma cut.
///
/// A non-positive sigma keeps at most the samples equal to the mean, so
/// the kept stddev can be zero and the SNR reference non-finite; the CLI
/// rejects such thresholds before a run starts.
fn sigma_cut_stats(
    obs: &Observation,
    workload: &Workload,
    beam: usize,
    subband: usize,
    trial: usize,
    full: &Statistics,
    sigma: f32,
) -> Statistics {
    let cutoff = sigma as f64 * full.std_dev();
    let mut kept = Statistics::new();
    for sample in 0..obs.samples() {
        let x = workload.input[obs.input_index(beam, subband, trial, sample)] as f64;
        if (x - full.mean()).abs() <= cutoff {
            kept.push(x);
        }
    }
    kept
}

fn baseline_for(workload: &Workload, group: usize) -> f64 {
    workload
        .baseline
        .as_ref()
        .and_then(|b| b.get(group))
        .copied()
        .unwrap_or(0.0) as f64
}

/// Median as the upper-middle element of the sorted chunk; device kernels
/// use the same convention.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    values[values.len() / 2]
}

fn read(buffer: &[f32], index: usize) -> f32 {
    buffer.get(index).copied().unwrap_or(f32::NAN)
}
