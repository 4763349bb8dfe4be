//! The configuration-space sweep driver.
//!
//! Walks the enumerator, builds the session lazily, and per configuration
//! compiles, warms up once, times `iterations` blocking launches, and
//! offers the resulting throughput to the best selector. Failures run
//! through the lifecycle controller: transient device errors discard the
//! configuration and flag a rebuild; fatal codes and compile rejections
//! end the sweep.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use snr_core::{
    descriptor, BestResult, BestSelector, ConfigSweep, KernelConfig, KernelVariant, Observation,
    Statistics, SweepBounds,
};
use snr_kernels::KernelSource;

use crate::error::{Result, SnrError};
use crate::harness::KernelHarness;
use crate::lifecycle::{Disposition, LifecycleController};

/// Everything one sweep needs besides the harness.
#[derive(Debug, Clone, Copy)]
pub struct TuneRequest<'a> {
    pub variant: KernelVariant,
    pub obs: &'a Observation,
    pub bounds: SweepBounds,
    pub median_step: usize,
    pub sigma: f32,
    /// Timed launches per configuration, after one discarded warm-up.
    pub iterations: usize,
}

/// One evaluated configuration's aggregated measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub config: KernelConfig,
    pub throughput_gbs: f64,
    pub mean_s: f64,
    pub stddev_s: f64,
    pub cov: f64,
}

/// Hooks the caller can use to stream sweep progress; every method has an
/// empty default so observers implement only what they report.
pub trait SweepObserver {
    /// Called with the generated source before each compile.
    fn on_source(&mut self, _config: &KernelConfig, _source: &KernelSource) {}

    /// Called once per evaluated configuration, as it completes.
    fn on_record(&mut self, _record: &ConfigRecord) {}
}

/// Observer that reports nothing; best-only mode.
pub struct NullObserver;

impl SweepObserver for NullObserver {}

/// Records and final best of one completed sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub records: Vec<ConfigRecord>,
    pub best: Option<BestResult>,
}

/// Run one sweep to completion.
///
/// Returns `Err` only when the run cannot continue: a rebuild failure, a
/// fatal device code, or a compile rejection. Discarded configurations
/// are absent from the outcome.
pub fn run_sweep<H: KernelHarness, O: SweepObserver>(
    harness: &mut H,
    req: &TuneRequest<'_>,
    observer: &mut O,
) -> Result<SweepOutcome> {
    if req.iterations == 0 {
        return Err(snr_core::ShapeError::NoIterations.into());
    }
    let desc = descriptor(req.variant);
    let mut lifecycle = LifecycleController::new();
    let mut selector = BestSelector::new();
    let mut records = Vec::new();

    info!(
        variant = desc.name,
        layout = req.obs.layout().label(),
        "starting configuration sweep"
    );

    'sweep: for config in ConfigSweep::new(desc, req.obs, req.bounds, req.median_step, req.sigma) {
        if lifecycle.needs_rebuild() {
            // A rebuild failure leaves no session to continue on.
            harness.rebuild()?;
            lifecycle.mark_ready();
        }

        let source = snr_kernels::source(req.variant, &config, req.obs);
        observer.on_source(&config, &source);
        let geometry = desc.launch_geometry(req.obs, &config);
        if let Err(err) = harness.prepare(&source, &geometry) {
            match lifecycle.on_failure(&err) {
                Disposition::Abort => return Err(err),
                Disposition::DiscardAndRebuild => continue 'sweep,
            }
        }

        // One discarded launch absorbs first-launch driver overhead.
        if let Err(err) = harness.launch() {
            match lifecycle.on_failure(&err) {
                Disposition::Abort => return Err(err),
                Disposition::DiscardAndRebuild => continue 'sweep,
            }
        }

        let mut timing = Statistics::new();
        for _ in 0..req.iterations {
            match harness.launch() {
                Ok(duration) => timing.push(duration.as_secs_f64()),
                Err(err) => match lifecycle.on_failure(&err) {
                    Disposition::Abort => return Err(err),
                    Disposition::DiscardAndRebuild => continue 'sweep,
                },
            }
        }

        let mean_s = timing.mean();
        let record = ConfigRecord {
            config,
            throughput_gbs: (desc.bytes_moved)(req.obs, &config) as f64 / mean_s / 1e9,
            mean_s,
            stddev_s: timing.std_dev(),
            cov: timing.coefficient_of_variation(),
        };
        debug!(
            threads = config.threads,
            items = config.items,
            gbs = record.throughput_gbs,
            "configuration measured"
        );
        selector.offer(record.throughput_gbs, config);
        observer.on_record(&record);
        records.push(record);
    }

    Ok(SweepOutcome {
        records,
        best: selector.into_best(),
    })
}

/// Exportable description of one finished sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepProfile {
    pub device_name: String,
    pub variant: KernelVariant,
    pub observation: Observation,
    pub records: Vec<ConfigRecord>,
    pub best: Option<BestResult>,
}

impl SweepProfile {
    pub fn new(
        device_name: String,
        variant: KernelVariant,
        observation: Observation,
        outcome: SweepOutcome,
    ) -> Self {
        Self {
            device_name,
            variant,
            observation,
            records: outcome.records,
            best: outcome.best,
        }
    }

    /// Pretty-printed JSON export.
    pub fn save(&self, path: &Path) -> Result<()> {
        let io_err = |source| SnrError::ProfileIo {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io_err(std::io::Error::other(e)))?;
        std::fs::write(path, json).map_err(io_err)?;
        info!(path = %path.display(), "sweep profile saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let io_err = |source| SnrError::ProfileIo {
            path: path.to_path_buf(),
            source,
        };
        let json = std::fs::read_to_string(path).map_err(io_err)?;
        serde_json::from_str(&json).map_err(|e| io_err(std::io::Error::other(e)))
    }
}
