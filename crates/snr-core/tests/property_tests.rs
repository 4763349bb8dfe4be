//! Property-based tests for the host-side core.
//!
//! Covers the invariants the device crates lean on:
//! - padding arithmetic covers and aligns every logical length
//! - flat indices are unique and in bounds for both layouts
//! - the sweep yields only admitted, in-budget configurations
//! - streaming statistics agree with the naive two-pass formulas
//! - workload generation is a pure function of the seed
//! - the oracle accepts output assembled from its own references

use proptest::prelude::*;

use snr_core::{
    descriptor, oracle, workload, ConfigSweep, DataLayout, DeviceOutput, KernelConfig,
    KernelVariant, Observation, Statistics, SweepBounds, Verdict, WorkloadMode,
};

fn layouts() -> impl Strategy<Value = DataLayout> {
    prop_oneof![
        Just(DataLayout::TrialsSamples),
        Just(DataLayout::SamplesTrials),
    ]
}

fn variants() -> impl Strategy<Value = KernelVariant> {
    (0usize..KernelVariant::ALL.len()).prop_map(|i| KernelVariant::ALL[i])
}

/// Cache-line style paddings: 4, 8, 16, ... 128 bytes.
fn paddings() -> impl Strategy<Value = usize> {
    (0u32..6).prop_map(|k| 4usize << k)
}

// ── Padding arithmetic ───────────────────────────────────────────────────────

proptest! {
    /// Padded lengths cover the logical length, align to the padding unit,
    /// and never overshoot by a whole unit.
    #[test]
    fn prop_padded_lengths_cover_and_align(
        beams in 1usize..4,
        trials in 1usize..16,
        subbands in 1usize..4,
        samples in 1usize..256,
        padding in paddings(),
        layout in layouts(),
    ) {
        let obs = Observation::new(beams, trials, subbands, samples, padding, layout).unwrap();
        let unit = padding / 4;
        for count in [samples, trials, obs.trials_total()] {
            let padded = obs.padded(count);
            prop_assert!(padded >= count);
            prop_assert_eq!(padded % unit, 0);
            prop_assert!(padded - count < unit, "padded {} overshoots {}", padded, count);
        }
    }

    /// Every (beam, subband, trial, sample) coordinate maps to a unique
    /// in-bounds slot of the input matrix, in either layout.
    #[test]
    fn prop_input_indices_unique_and_in_bounds(
        beams in 1usize..3,
        trials in 1usize..6,
        subbands in 1usize..3,
        samples in 1usize..48,
        padding in paddings(),
        layout in layouts(),
    ) {
        let obs = Observation::new(beams, trials, subbands, samples, padding, layout).unwrap();
        let mut seen = std::collections::HashSet::new();
        for beam in 0..beams {
            for subband in 0..subbands {
                for trial in 0..trials {
                    for sample in 0..samples {
                        let idx = obs.input_index(beam, subband, trial, sample);
                        prop_assert!(idx < obs.input_len());
                        prop_assert!(seen.insert(idx), "index {} assigned twice", idx);
                    }
                }
            }
        }
    }

    /// Group output slots are unique and in bounds.
    #[test]
    fn prop_group_indices_unique_and_in_bounds(
        beams in 1usize..4,
        trials in 1usize..12,
        subbands in 1usize..4,
        padding in paddings(),
        layout in layouts(),
    ) {
        let obs = Observation::new(beams, trials, subbands, 16, padding, layout).unwrap();
        let mut seen = std::collections::HashSet::new();
        for beam in 0..beams {
            for subband in 0..subbands {
                for trial in 0..trials {
                    let idx = obs.group_index(beam, subband, trial);
                    prop_assert!(idx < obs.group_output_len());
                    prop_assert!(seen.insert(idx));
                    let logical = obs.logical_group_index(beam, subband, trial);
                    prop_assert!(logical < obs.reduction_groups());
                }
            }
        }
    }
}

// ── Configuration sweep ──────────────────────────────────────────────────────

proptest! {
    /// Every configuration the sweep yields satisfies the variant's
    /// constraint, the shared resource cap, the cost budget, and the
    /// thread bounds.
    #[test]
    fn prop_sweep_yields_only_valid_configs(
        variant in variants(),
        layout in layouts(),
        trials in 1usize..16,
        samples in 1usize..512,
        budget in 0usize..64,
        max_threads_pow in 0u32..9,
    ) {
        let obs = Observation::new(1, trials, 1, samples, 128, layout).unwrap();
        let desc = descriptor(variant);
        let bounds = SweepBounds::new(1, 1 << max_threads_pow, budget).unwrap();
        for cfg in ConfigSweep::new(desc, &obs, bounds, 5, 3.0) {
            prop_assert!(desc.admits(&obs, &cfg));
            prop_assert!(cfg.threads * cfg.items <= obs.samples());
            prop_assert!((desc.items_cost)(cfg.items, layout) <= budget);
            prop_assert!(cfg.threads >= bounds.min_threads);
            prop_assert!(cfg.threads <= bounds.max_threads);
        }
    }

    /// Admitted configurations always produce a launch grid whose global
    /// sizes are multiples of the local sizes.
    #[test]
    fn prop_admitted_configs_launch_grid_aligned(
        variant in variants(),
        layout in layouts(),
        trials in 1usize..16,
        samples in 1usize..512,
        max_threads_pow in 0u32..9,
    ) {
        let obs = Observation::new(2, trials, 1, samples, 128, layout).unwrap();
        let desc = descriptor(variant);
        let bounds = SweepBounds::new(1, 1 << max_threads_pow, 64).unwrap();
        for cfg in ConfigSweep::new(desc, &obs, bounds, 5, 3.0) {
            let g = desc.launch_geometry(&obs, &cfg);
            prop_assert_eq!(g.global.len(), g.local.len());
            for (global, local) in g.global.iter().zip(&g.local) {
                prop_assert!(*local > 0);
                prop_assert_eq!(global % local, 0);
            }
        }
    }
}

// ── Streaming statistics ─────────────────────────────────────────────────────

proptest! {
    /// Streaming mean, variance, and extrema agree with the naive
    /// formulas computed after the fact.
    #[test]
    fn prop_statistics_match_naive_formulas(
        values in proptest::collection::vec(-1e3f64..1e3, 1..200),
    ) {
        let mut stats = Statistics::new();
        for &v in &values {
            stats.push(v);
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        prop_assert!((stats.mean() - mean).abs() < 1e-6);
        if values.len() > 1 {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            let scale = var.abs().max(1.0);
            prop_assert!((stats.variance() - var).abs() < 1e-6 * scale);
        } else {
            prop_assert_eq!(stats.variance(), 0.0);
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(stats.min(), min);
        prop_assert_eq!(stats.max(), max);
        prop_assert!(stats.mean() >= min - 1e-9 && stats.mean() <= max + 1e-9);
    }
}

// ── Workload generation ──────────────────────────────────────────────────────

proptest! {
    /// The same seed reproduces the whole workload, baseline and planted
    /// answers included.
    #[test]
    fn prop_workload_is_a_function_of_the_seed(
        seed in any::<u64>(),
        layout in layouts(),
        with_baseline in any::<bool>(),
    ) {
        let obs = Observation::new(2, 3, 1, 32, 32, layout).unwrap();
        let a = workload::generate(&obs, with_baseline, WorkloadMode::Validation, seed);
        let b = workload::generate(&obs, with_baseline, WorkloadMode::Validation, seed);
        prop_assert_eq!(a, b);
    }

    /// Every planted sample is the strict maximum of its reduction group
    /// and sits where the planted map says it does.
    #[test]
    fn prop_planted_samples_dominate_their_groups(
        seed in any::<u64>(),
        layout in layouts(),
        trials in 1usize..6,
        samples in 1usize..48,
    ) {
        let obs = Observation::new(1, trials, 1, samples, 32, layout).unwrap();
        let w = workload::generate(&obs, false, WorkloadMode::Validation, seed);
        let planted = w.planted.as_ref().unwrap();
        for trial in 0..trials {
            let group = obs.logical_group_index(0, 0, trial);
            for sample in 0..samples {
                let x = w.input[obs.input_index(0, 0, trial, sample)];
                if sample == planted.index[group] {
                    prop_assert_eq!(x, planted.value[group]);
                } else {
                    prop_assert!(x < planted.value[group]);
                }
            }
        }
    }
}

// ── Oracle self-consistency ──────────────────────────────────────────────────

proptest! {
    /// A device output assembled from the planted answers passes the max
    /// comparison with zero mismatches; corrupting one slot fails it.
    #[test]
    fn prop_oracle_accepts_assembled_references(
        seed in any::<u64>(),
        layout in layouts(),
        trials in 1usize..6,
    ) {
        let obs = Observation::new(1, trials, 1, 16, 32, layout).unwrap();
        let cfg = KernelConfig::new(1, 1, 4, 3.0);
        let w = workload::generate(&obs, false, WorkloadMode::Validation, seed);
        let planted = w.planted.as_ref().unwrap();

        let mut values = vec![0.0f32; obs.group_output_len()];
        let mut indices = vec![0u32; obs.group_output_len()];
        for trial in 0..trials {
            let group = obs.logical_group_index(0, 0, trial);
            let out = obs.group_index(0, 0, trial);
            values[out] = planted.value[group];
            indices[out] = planted.index[group] as u32;
        }

        let good = DeviceOutput {
            values: values.clone(),
            indices: Some(indices.clone()),
            secondary: None,
        };
        let counts = oracle::compare(KernelVariant::Max, &obs, &cfg, &w, &good);
        prop_assert_eq!(counts.verdict(), Verdict::Passed);
        prop_assert_eq!(counts.compared, trials as u64);

        values[obs.group_index(0, 0, 0)] += 1.0;
        let bad = DeviceOutput {
            values,
            indices: Some(indices),
            secondary: None,
        };
        let counts = oracle::compare(KernelVariant::Max, &obs, &cfg, &w, &bad);
        prop_assert_eq!(counts.wrong_values, 1);
    }
}
