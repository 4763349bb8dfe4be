//! The single-configuration validation driver.
//!
//! Runs one kernel build against a workload with planted answers, reads
//! the device output back, and compares it to the host references. There
//! is no next configuration to fall back to, so every device error aborts
//! the run; a failed comparison is a reported outcome, not an error.

use tracing::info;

use snr_core::{
    descriptor, oracle, ComparisonCounts, DeviceOutput, KernelConfig, KernelVariant, Observation,
    Verdict, Workload,
};

use crate::error::{Result, SnrError};
use crate::harness::KernelHarness;

/// One validation run's inputs.
#[derive(Debug, Clone, Copy)]
pub struct ValidateRequest<'a> {
    pub variant: KernelVariant,
    pub obs: &'a Observation,
    pub config: KernelConfig,
}

/// Device output and its comparison against the host references.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRun {
    pub output: DeviceOutput,
    pub counts: ComparisonCounts,
}

impl ValidationRun {
    /// The one-line result summary. Value mismatches take priority over
    /// position mismatches even when both occurred.
    pub fn summary(&self) -> String {
        match self.counts.verdict() {
            Verdict::Passed => "TEST PASSED.".to_string(),
            Verdict::WrongValues => format!(
                "Wrong samples: {} ({:.2}%).",
                self.counts.wrong_values,
                self.counts.wrong_value_percent()
            ),
            Verdict::WrongPositions => format!(
                "Wrong positions: {} ({:.2}%).",
                self.counts.wrong_positions,
                self.counts.wrong_position_percent()
            ),
        }
    }
}

/// Build, launch, and compare one configuration.
pub fn run_validation<H: KernelHarness>(
    harness: &mut H,
    req: &ValidateRequest<'_>,
    workload: &Workload,
) -> Result<ValidationRun> {
    let desc = descriptor(req.variant);
    if !desc.admits(req.obs, &req.config) {
        return Err(SnrError::InvalidConfig {
            threads: req.config.threads,
            items: req.config.items,
        });
    }

    harness.rebuild()?;
    let source = snr_kernels::source(req.variant, &req.config, req.obs);
    let geometry = desc.launch_geometry(req.obs, &req.config);
    harness.prepare(&source, &geometry)?;
    harness.launch()?;
    let output = harness.read_back()?;

    let counts = oracle::compare(req.variant, req.obs, &req.config, workload, &output);
    info!(
        compared = counts.compared,
        wrong_values = counts.wrong_values,
        wrong_positions = counts.wrong_positions,
        "validation complete"
    );
    Ok(ValidationRun { output, counts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use snr_core::{workload, DataLayout, WorkloadMode};

    use crate::testing::ScriptedHarness;

    fn obs() -> Observation {
        Observation::new(1, 4, 1, 16, 32, DataLayout::TrialsSamples).unwrap()
    }

    fn request(obs: &Observation) -> ValidateRequest<'_> {
        ValidateRequest {
            variant: KernelVariant::Max,
            obs,
            config: KernelConfig::new(8, 2, 4, 3.0),
        }
    }

    /// Device output assembled from the planted answers, so the oracle
    /// must accept it.
    fn correct_output(obs: &Observation, w: &Workload) -> DeviceOutput {
        let planted = w.planted.as_ref().unwrap();
        let mut values = vec![0.0f32; obs.group_output_len()];
        let mut indices = vec![0u32; obs.group_output_len()];
        for trial in 0..obs.trials() {
            let group = obs.logical_group_index(0, 0, trial);
            let out = obs.group_index(0, 0, trial);
            values[out] = planted.value[group];
            indices[out] = planted.index[group] as u32;
        }
        DeviceOutput {
            values,
            indices: Some(indices),
            secondary: None,
        }
    }

    #[test]
    fn correct_device_output_passes() {
        let obs = obs();
        let w = workload::generate(&obs, false, WorkloadMode::Validation, 42);
        let mut harness = ScriptedHarness::new().with_output(correct_output(&obs, &w));
        let run = run_validation(&mut harness, &request(&obs), &w).unwrap();
        assert_eq!(run.counts.verdict(), Verdict::Passed);
        assert_eq!(run.summary(), "TEST PASSED.");
        // One build, one compile, one launch.
        assert_eq!(harness.rebuilds, 1);
        assert_eq!(harness.prepares, 1);
        assert_eq!(harness.launches, 1);
    }

    #[test]
    fn corrupted_value_is_reported_not_an_error() {
        let obs = obs();
        let w = workload::generate(&obs, false, WorkloadMode::Validation, 42);
        let mut output = correct_output(&obs, &w);
        output.values[obs.group_index(0, 0, 1)] += 1.0;
        let mut harness = ScriptedHarness::new().with_output(output);
        let run = run_validation(&mut harness, &request(&obs), &w).unwrap();
        assert_eq!(run.counts.wrong_values, 1);
        assert_eq!(run.summary(), "Wrong samples: 1 (25.00%).");
    }

    #[test]
    fn wrong_position_summary_when_values_pass() {
        let obs = obs();
        let w = workload::generate(&obs, false, WorkloadMode::Validation, 42);
        let planted = w.planted.as_ref().unwrap();
        let mut output = correct_output(&obs, &w);
        let wrong = (planted.index[0] as u32 + 1) % obs.samples() as u32;
        output.indices.as_mut().unwrap()[obs.group_index(0, 0, 0)] = wrong;
        let mut harness = ScriptedHarness::new().with_output(output);
        let run = run_validation(&mut harness, &request(&obs), &w).unwrap();
        assert_eq!(run.counts.wrong_values, 0);
        assert_eq!(run.counts.wrong_positions, 1);
        assert_eq!(run.summary(), "Wrong positions: 1 (25.00%).");
    }

    #[test]
    fn inadmissible_config_is_rejected_before_any_device_work() {
        let obs = obs();
        let mut req = request(&obs);
        // threads * items exceeds the 16-sample groups.
        req.config = KernelConfig::new(16, 2, 4, 3.0);
        let mut harness = ScriptedHarness::new();
        let err = run_validation(&mut harness, &req, &Workload {
            input: Vec::new(),
            baseline: None,
            planted: None,
        })
        .unwrap_err();
        assert!(matches!(err, SnrError::InvalidConfig { .. }));
        assert_eq!(harness.rebuilds, 0);
    }

    #[test]
    fn any_launch_error_aborts_validation() {
        let obs = obs();
        let w = workload::generate(&obs, false, WorkloadMode::Validation, 42);
        let mut harness = ScriptedHarness::new().fail_launch_at(0, -5);
        let err = run_validation(&mut harness, &request(&obs), &w).unwrap_err();
        assert!(matches!(err, SnrError::Device { code: -5, .. }));
    }

    #[test]
    fn compile_rejection_propagates() {
        let obs = obs();
        let w = workload::generate(&obs, false, WorkloadMode::Validation, 42);
        let mut harness = ScriptedHarness::new().fail_compile_at(0, "bad kernel");
        let err = run_validation(&mut harness, &request(&obs), &w).unwrap_err();
        assert!(matches!(err, SnrError::Compile { .. }));
    }
}
