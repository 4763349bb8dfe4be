//! Kernel variants and the per-variant descriptor table.
//!
//! Everything variant-specific the host needs is collected in one
//! [`VariantDescriptor`] record per kernel: the items-per-thread cost bound,
//! the validity constraint, the byte-traffic formula behind the reported
//! GB/s, the buffer binding order, and the output shape. Call sites look a
//! descriptor up once per attempt instead of switching on the variant.

use serde::{Deserialize, Serialize};

use crate::config::KernelConfig;
use crate::observation::{DataLayout, Observation};

/// The seven reduction kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelVariant {
    Snr,
    SnrSigmaCut,
    Max,
    MaxStdSigmaCut,
    MedianOfMedians,
    MedianOfMediansAbsoluteDeviation,
    AbsoluteDeviation,
}

impl KernelVariant {
    pub const ALL: [KernelVariant; 7] = [
        KernelVariant::Snr,
        KernelVariant::SnrSigmaCut,
        KernelVariant::Max,
        KernelVariant::MaxStdSigmaCut,
        KernelVariant::MedianOfMedians,
        KernelVariant::MedianOfMediansAbsoluteDeviation,
        KernelVariant::AbsoluteDeviation,
    ];

    pub fn label(self) -> &'static str {
        descriptor(self).name
    }
}

/// Device buffers of one kernel, in argument binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    /// Read-only input matrix.
    Input,
    /// Read-only per-group baseline vector.
    Baseline,
    /// Value output buffer.
    Values,
    /// Per-group index output buffer.
    Indices,
    /// Second per-group value output (standard deviation).
    Secondary,
}

/// Shape of the value output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// One scalar per reduction group, padded per beam.
    PerGroup,
    /// `samples / median_step` scalars per group, padded per beam.
    PerChunk,
    /// One scalar per input sample, mirroring the input layout.
    PerSample,
}

/// Global and local work sizes handed to the ND-range launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchGeometry {
    pub global: Vec<usize>,
    pub local: Vec<usize>,
}

/// Per-variant behavior record.
pub struct VariantDescriptor {
    pub variant: KernelVariant,
    /// CLI and report name; also the stem of generated kernel names.
    pub name: &'static str,
    /// Closed-form register-pressure bound on items-per-thread. The sweep
    /// stops its inner loop as soon as this exceeds the item budget.
    pub items_cost: fn(items: usize, layout: DataLayout) -> usize,
    pub needs_baseline: bool,
    pub reports_index: bool,
    pub output_shape: OutputShape,
    /// Logical bytes read and written by one launch; defines the reported
    /// throughput and must not depend on measured timing.
    pub bytes_moved: fn(&Observation, &KernelConfig) -> u64,
    pub buffers: &'static [BufferRole],
}

impl VariantDescriptor {
    /// True when the configuration may be compiled and launched at all.
    ///
    /// Checks the shared resource cap (threads x items within the sample
    /// count), the partition-dimension divisibility of the layout, and
    /// that the resulting launch grid is well formed.
    pub fn admits(&self, obs: &Observation, cfg: &KernelConfig) -> bool {
        if cfg.threads == 0 || cfg.items == 0 {
            return false;
        }
        if cfg.threads * cfg.items > obs.samples() {
            return false;
        }
        if self.output_shape == OutputShape::PerChunk
            && (cfg.median_step == 0 || obs.samples() % cfg.median_step != 0)
        {
            return false;
        }
        match obs.layout() {
            DataLayout::TrialsSamples => {
                if self.output_shape == OutputShape::PerChunk {
                    // Threads and items partition whole chunks here.
                    obs.samples() % (cfg.median_step * cfg.items) == 0
                } else {
                    obs.samples() % cfg.items == 0
                }
            }
            DataLayout::SamplesTrials => {
                let total = obs.trials_total();
                total % cfg.items == 0 && (total / cfg.items) % cfg.threads == 0
            }
        }
    }

    /// Launch grid for this observation and configuration.
    pub fn launch_geometry(&self, obs: &Observation, cfg: &KernelConfig) -> LaunchGeometry {
        match obs.layout() {
            DataLayout::TrialsSamples => LaunchGeometry {
                global: vec![cfg.threads, obs.trials_total(), obs.beams()],
                local: vec![cfg.threads, 1, 1],
            },
            DataLayout::SamplesTrials => LaunchGeometry {
                global: vec![obs.trials_total() / cfg.items, obs.beams()],
                local: vec![cfg.threads, 1],
            },
        }
    }

    /// Elements of the value output buffer.
    pub fn value_output_len(&self, obs: &Observation, cfg: &KernelConfig) -> usize {
        match self.output_shape {
            OutputShape::PerGroup => obs.group_output_len(),
            OutputShape::PerChunk => obs.chunked_output_len(obs.samples() / cfg.median_step),
            OutputShape::PerSample => obs.input_len(),
        }
    }

    /// Elements of the index output buffer, for variants that report one.
    pub fn index_output_len(&self, obs: &Observation) -> Option<usize> {
        self.reports_index.then(|| obs.group_output_len())
    }

    /// Elements of the secondary value output, when the kernel writes one.
    pub fn secondary_output_len(&self, obs: &Observation) -> Option<usize> {
        self.buffers
            .contains(&BufferRole::Secondary)
            .then(|| obs.group_output_len())
    }
}

// ---------------------------------------------------------------------------
// Cost bounds and byte-traffic formulas
// ---------------------------------------------------------------------------

fn snr_cost(items: usize, layout: DataLayout) -> usize {
    match layout {
        DataLayout::TrialsSamples => items * 5 + 7,
        DataLayout::SamplesTrials => items * 5 + 3,
    }
}

fn sigma_cut_cost(items: usize, _layout: DataLayout) -> usize {
    items * 5 + 9
}

fn max_cost(items: usize, _layout: DataLayout) -> usize {
    items * 2 + 2
}

fn median_cost(items: usize, _layout: DataLayout) -> usize {
    items * 3 + 8
}

fn median_deviation_cost(items: usize, _layout: DataLayout) -> usize {
    items * 3 + 7
}

fn deviation_cost(items: usize, _layout: DataLayout) -> usize {
    items * 2 + 4
}

const F32: u64 = 4;
const U32: u64 = 4;

/// One input pass, one value per group, one index per group.
fn bytes_single_pass_indexed(obs: &Observation, _cfg: &KernelConfig) -> u64 {
    let groups = obs.reduction_groups() as u64;
    let samples = obs.samples() as u64;
    groups * samples * F32 + groups * F32 + groups * U32
}

/// Two input passes, two four-byte outputs per group. Covers both the
/// value-plus-index and the max-plus-stddev kernels.
fn bytes_two_pass_two_outputs(obs: &Observation, _cfg: &KernelConfig) -> u64 {
    let groups = obs.reduction_groups() as u64;
    let samples = obs.samples() as u64;
    2 * groups * samples * F32 + 2 * groups * F32
}

/// One input pass, one median per chunk.
fn bytes_chunk_medians(obs: &Observation, cfg: &KernelConfig) -> u64 {
    let groups = obs.reduction_groups() as u64;
    let samples = obs.samples() as u64;
    let chunks = samples / cfg.median_step as u64;
    groups * samples * F32 + groups * chunks * F32
}

/// One input pass, one baseline read per group, one median per chunk.
fn bytes_chunk_medians_baseline(obs: &Observation, cfg: &KernelConfig) -> u64 {
    let groups = obs.reduction_groups() as u64;
    bytes_chunk_medians(obs, cfg) + groups * F32
}

/// One input pass, one baseline read per group, one output per sample.
fn bytes_per_sample_deviation(obs: &Observation, _cfg: &KernelConfig) -> u64 {
    let groups = obs.reduction_groups() as u64;
    let samples = obs.samples() as u64;
    2 * groups * samples * F32 + groups * F32
}

// ---------------------------------------------------------------------------
// Descriptor table
// ---------------------------------------------------------------------------

static DESCRIPTORS: [VariantDescriptor; 7] = [
    VariantDescriptor {
        variant: KernelVariant::Snr,
        name: "snr",
        items_cost: snr_cost,
        needs_baseline: false,
        reports_index: true,
        output_shape: OutputShape::PerGroup,
        bytes_moved: bytes_single_pass_indexed,
        buffers: &[BufferRole::Input, BufferRole::Values, BufferRole::Indices],
    },
    VariantDescriptor {
        variant: KernelVariant::SnrSigmaCut,
        name: "snr-sigma-cut",
        items_cost: sigma_cut_cost,
        needs_baseline: false,
        reports_index: true,
        output_shape: OutputShape::PerGroup,
        bytes_moved: bytes_two_pass_two_outputs,
        buffers: &[BufferRole::Input, BufferRole::Values, BufferRole::Indices],
    },
    VariantDescriptor {
        variant: KernelVariant::Max,
        name: "max",
        items_cost: max_cost,
        needs_baseline: false,
        reports_index: true,
        output_shape: OutputShape::PerGroup,
        bytes_moved: bytes_single_pass_indexed,
        buffers: &[BufferRole::Input, BufferRole::Values, BufferRole::Indices],
    },
    VariantDescriptor {
        variant: KernelVariant::MaxStdSigmaCut,
        name: "max-std-sigma-cut",
        items_cost: sigma_cut_cost,
        needs_baseline: false,
        reports_index: false,
        output_shape: OutputShape::PerGroup,
        bytes_moved: bytes_two_pass_two_outputs,
        buffers: &[BufferRole::Input, BufferRole::Values, BufferRole::Secondary],
    },
    VariantDescriptor {
        variant: KernelVariant::MedianOfMedians,
        name: "median-of-medians",
        items_cost: median_cost,
        needs_baseline: false,
        reports_index: false,
        output_shape: OutputShape::PerChunk,
        bytes_moved: bytes_chunk_medians,
        buffers: &[BufferRole::Input, BufferRole::Values],
    },
    VariantDescriptor {
        variant: KernelVariant::MedianOfMediansAbsoluteDeviation,
        name: "median-of-medians-absolute-deviation",
        items_cost: median_deviation_cost,
        needs_baseline: true,
        reports_index: false,
        output_shape: OutputShape::PerChunk,
        bytes_moved: bytes_chunk_medians_baseline,
        buffers: &[BufferRole::Input, BufferRole::Baseline, BufferRole::Values],
    },
    VariantDescriptor {
        variant: KernelVariant::AbsoluteDeviation,
        name: "absolute-deviation",
        items_cost: deviation_cost,
        needs_baseline: true,
        reports_index: false,
        output_shape: OutputShape::PerSample,
        bytes_moved: bytes_per_sample_deviation,
        buffers: &[BufferRole::Input, BufferRole::Baseline, BufferRole::Values],
    },
];

/// Look up the descriptor for one variant.
pub fn descriptor(variant: KernelVariant) -> &'static VariantDescriptor {
    &DESCRIPTORS[variant as usize]
}
