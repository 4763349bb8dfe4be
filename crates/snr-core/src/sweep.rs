//! Configuration-space sweep and best-result tracking.

use serde::{Deserialize, Serialize};

use crate::config::{KernelConfig, SweepBounds};
use crate::observation::{DataLayout, Observation};
use crate::variant::VariantDescriptor;

/// Lazy iterator over the valid configurations of one sweep.
///
/// The outer dimension walks threads-per-group from the lower bound to the
/// upper bound, doubling for the trials-major layout and incrementing for
/// the samples-major one. The inner dimension walks items-per-thread from 1
/// and stops for the current thread count as soon as the variant's cost
/// bound exceeds the item budget; configurations that merely fail the
/// validity constraint are skipped without being yielded. Recreating the
/// sweep restarts it.
pub struct ConfigSweep<'a> {
    desc: &'a VariantDescriptor,
    obs: &'a Observation,
    bounds: SweepBounds,
    median_step: usize,
    sigma: f32,
    threads: usize,
    items: usize,
}

impl<'a> ConfigSweep<'a> {
    pub fn new(
        desc: &'a VariantDescriptor,
        obs: &'a Observation,
        bounds: SweepBounds,
        median_step: usize,
        sigma: f32,
    ) -> Self {
        Self {
            desc,
            obs,
            bounds,
            median_step,
            sigma,
            threads: bounds.min_threads,
            items: 1,
        }
    }

    fn advance_threads(&mut self) {
        self.threads = match self.obs.layout() {
            DataLayout::TrialsSamples => self.threads.saturating_mul(2),
            DataLayout::SamplesTrials => self.threads + 1,
        };
        self.items = 1;
    }
}

impl Iterator for ConfigSweep<'_> {
    type Item = KernelConfig;

    fn next(&mut self) -> Option<KernelConfig> {
        while self.threads <= self.bounds.max_threads {
            while (self.desc.items_cost)(self.items, self.obs.layout()) <= self.bounds.max_items {
                let cfg =
                    KernelConfig::new(self.threads, self.items, self.median_step, self.sigma);
                self.items += 1;
                if self.desc.admits(self.obs, &cfg) {
                    return Some(cfg);
                }
            }
            self.advance_threads();
        }
        None
    }
}

/// Highest-throughput configuration seen so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestResult {
    pub throughput_gbs: f64,
    pub config: KernelConfig,
}

/// Tracks the best configuration of a sweep.
///
/// A candidate replaces the current best only on strictly greater
/// throughput, so ties keep the earliest configuration.
#[derive(Debug, Default)]
pub struct BestSelector {
    best: Option<BestResult>,
}

impl BestSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&mut self, throughput_gbs: f64, config: KernelConfig) {
        let better = self
            .best
            .as_ref()
            .map_or(true, |b| throughput_gbs > b.throughput_gbs);
        if better {
            self.best = Some(BestResult {
                throughput_gbs,
                config,
            });
        }
    }

    pub fn best(&self) -> Option<&BestResult> {
        self.best.as_ref()
    }

    pub fn into_best(self) -> Option<BestResult> {
        self.best
    }
}
