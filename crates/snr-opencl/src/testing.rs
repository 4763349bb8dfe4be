//! Scripted harness for exercising the drivers without a device.
//!
//! Failures are injected by attempt index, the same way the control flow
//! meets them in production: compile failures by prepare index, device
//! errors by launch or rebuild index. Counters expose how often each
//! phase ran so tests can assert on rebuild laziness and warm-up
//! discards.

use std::collections::HashMap;
use std::time::Duration;

use snr_core::{DeviceOutput, LaunchGeometry};
use snr_kernels::KernelSource;

use crate::error::{Result, SnrError};
use crate::harness::KernelHarness;

/// A [`KernelHarness`] driven by a script instead of a GPU.
#[derive(Debug, Default)]
pub struct ScriptedHarness {
    /// Launch durations per prepared configuration, in microseconds; the
    /// last entry sticks once the list is exhausted.
    durations_us: Vec<u64>,
    compile_failures: HashMap<usize, String>,
    launch_failures: HashMap<usize, i32>,
    rebuild_failures: HashMap<usize, i32>,
    output: DeviceOutput,

    /// Number of completed `rebuild` calls (failed ones count too).
    pub rebuilds: usize,
    /// Number of `prepare` calls.
    pub prepares: usize,
    /// Number of `launch` calls.
    pub launches: usize,
    /// Kernel names in the order they were prepared.
    pub prepared_names: Vec<String>,
}

impl ScriptedHarness {
    pub fn new() -> Self {
        Self {
            durations_us: vec![1000],
            ..Self::default()
        }
    }

    /// Launch duration per prepared configuration, in order.
    pub fn with_durations_us(mut self, durations: impl Into<Vec<u64>>) -> Self {
        self.durations_us = durations.into();
        self
    }

    /// Fail the `index`-th `prepare` call with a compile rejection.
    pub fn fail_compile_at(mut self, index: usize, log: &str) -> Self {
        self.compile_failures.insert(index, log.to_string());
        self
    }

    /// Fail the `index`-th `launch` call with a raw device code.
    pub fn fail_launch_at(mut self, index: usize, code: i32) -> Self {
        self.launch_failures.insert(index, code);
        self
    }

    /// Fail the `index`-th `rebuild` call with a raw device code.
    pub fn fail_rebuild_at(mut self, index: usize, code: i32) -> Self {
        self.rebuild_failures.insert(index, code);
        self
    }

    /// Output returned by `read_back`.
    pub fn with_output(mut self, output: DeviceOutput) -> Self {
        self.output = output;
        self
    }

    fn current_duration(&self) -> Duration {
        if self.durations_us.is_empty() {
            return Duration::from_micros(1000);
        }
        let idx = self.prepares.saturating_sub(1).min(self.durations_us.len() - 1);
        Duration::from_micros(self.durations_us[idx])
    }
}

impl KernelHarness for ScriptedHarness {
    fn rebuild(&mut self) -> Result<()> {
        let index = self.rebuilds;
        self.rebuilds += 1;
        match self.rebuild_failures.get(&index) {
            Some(&code) => Err(SnrError::device(code, "scripted rebuild")),
            None => Ok(()),
        }
    }

    fn prepare(&mut self, source: &KernelSource, _geometry: &LaunchGeometry) -> Result<()> {
        let index = self.prepares;
        self.prepares += 1;
        self.prepared_names.push(source.name.clone());
        match self.compile_failures.get(&index) {
            Some(log) => Err(SnrError::Compile {
                name: source.name.clone(),
                log: log.clone(),
            }),
            None => Ok(()),
        }
    }

    fn launch(&mut self) -> Result<Duration> {
        let index = self.launches;
        self.launches += 1;
        match self.launch_failures.get(&index) {
            Some(&code) => Err(SnrError::device(code, "scripted launch")),
            None => Ok(self.current_duration()),
        }
    }

    fn read_back(&mut self) -> Result<DeviceOutput> {
        Ok(self.output.clone())
    }

    fn device_name(&self) -> String {
        "Scripted Device".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snr_core::{
        descriptor, DataLayout, KernelConfig, KernelVariant, Observation,
    };

    fn geometry() -> LaunchGeometry {
        let obs = Observation::new(1, 4, 1, 1024, 128, DataLayout::TrialsSamples).unwrap();
        descriptor(KernelVariant::Max).launch_geometry(&obs, &KernelConfig::new(32, 1, 5, 3.0))
    }

    fn source() -> KernelSource {
        let obs = Observation::new(1, 4, 1, 1024, 128, DataLayout::TrialsSamples).unwrap();
        snr_kernels::source(KernelVariant::Max, &KernelConfig::new(32, 1, 5, 3.0), &obs)
    }

    #[test]
    fn durations_follow_the_prepare_order() {
        let mut h = ScriptedHarness::new().with_durations_us([100, 200]);
        h.prepare(&source(), &geometry()).unwrap();
        assert_eq!(h.launch().unwrap(), Duration::from_micros(100));
        h.prepare(&source(), &geometry()).unwrap();
        assert_eq!(h.launch().unwrap(), Duration::from_micros(200));
        // Past the end of the script the last duration sticks.
        h.prepare(&source(), &geometry()).unwrap();
        assert_eq!(h.launch().unwrap(), Duration::from_micros(200));
    }

    #[test]
    fn scripted_failures_fire_by_index() {
        let mut h = ScriptedHarness::new()
            .fail_launch_at(1, -5)
            .fail_rebuild_at(1, -4);
        h.prepare(&source(), &geometry()).unwrap();
        assert!(h.launch().is_ok());
        assert!(h.launch().is_err());
        assert!(h.rebuild().is_ok());
        let err = h.rebuild().unwrap_err();
        assert!(err.is_fatal_device());
        assert_eq!(h.rebuilds, 2);
        assert_eq!(h.launches, 2);
    }
}
