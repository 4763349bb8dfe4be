//! Synthetic workload generation.
//!
//! Benchmark workloads are background noise only. Validation workloads
//! additionally plant one elevated sample per reduction group at a
//! recorded index, so the oracle knows the expected maximum and where it
//! is. All randomness comes from one caller-seeded generator; a run is
//! reproducible from its seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::observation::Observation;

/// Background values are drawn from [0, 10), planted values from
/// [10, 20), so a planted sample is always the strict maximum of its
/// group.
const NOISE_BAND: u64 = 10;

/// What the generator fills the matrix with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadMode {
    /// Background noise only.
    Benchmark,
    /// Background noise plus one planted sample per reduction group.
    Validation,
}

/// Known-correct answers for a validation workload, one entry per
/// reduction group in logical group order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantedMap {
    pub index: Vec<usize>,
    pub value: Vec<f32>,
}

/// Input matrix, optional baseline vector, and planted answers.
#[derive(Debug, Clone, PartialEq)]
pub struct Workload {
    pub input: Vec<f32>,
    pub baseline: Option<Vec<f32>>,
    pub planted: Option<PlantedMap>,
}

/// Generate a workload for `obs`.
///
/// `with_baseline` matches the variant descriptor's `needs_baseline`;
/// baseline values are non-zero so deviation kernels never divide or
/// compare against zero. Padding elements stay zeroed.
pub fn generate(
    obs: &Observation,
    with_baseline: bool,
    mode: WorkloadMode,
    seed: u64,
) -> Workload {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let groups = obs.reduction_groups();

    let planted_index = (mode == WorkloadMode::Validation)
        .then(|| (0..groups).map(|_| rng.gen_range(0..obs.samples())).collect::<Vec<_>>());
    let mut planted_value = vec![0.0f32; if planted_index.is_some() { groups } else { 0 }];

    let mut input = vec![0.0f32; obs.input_len()];
    for beam in 0..obs.beams() {
        for subband in 0..obs.subband_trials() {
            for trial in 0..obs.trials() {
                let group = obs.logical_group_index(beam, subband, trial);
                for sample in 0..obs.samples() {
                    let value = match &planted_index {
                        Some(map) if map[group] == sample => {
                            let v = (NOISE_BAND + rng.gen_range(0..NOISE_BAND)) as f32;
                            planted_value[group] = v;
                            v
                        }
                        _ => rng.gen_range(0..NOISE_BAND) as f32,
                    };
                    input[obs.input_index(beam, subband, trial, sample)] = value;
                }
            }
        }
    }

    let baseline = with_baseline
        .then(|| (0..groups).map(|_| (1 + rng.gen_range(0..NOISE_BAND - 1)) as f32).collect());

    Workload {
        input,
        baseline,
        planted: planted_index.map(|index| PlantedMap {
            index,
            value: planted_value,
        }),
    }
}
