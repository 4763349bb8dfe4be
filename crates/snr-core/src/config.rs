//! Per-attempt kernel configuration and sweep bounds.

use serde::{Deserialize, Serialize};

use crate::observation::ShapeError;

/// One candidate configuration.
///
/// Produced fresh by the sweep for every attempt and consumed by value;
/// nothing mutates a configuration after it has been yielded. The median
/// step and sigma threshold are fixed for a whole run but travel with the
/// configuration so one record describes a kernel build completely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    pub threads: usize,
    pub items: usize,
    /// Chunk length for the median-of-medians variants.
    pub median_step: usize,
    /// Exclusion threshold for the sigma-cut variants, in standard
    /// deviations.
    pub sigma: f32,
}

impl KernelConfig {
    pub fn new(threads: usize, items: usize, median_step: usize, sigma: f32) -> Self {
        Self {
            threads,
            items,
            median_step,
            sigma,
        }
    }

    /// Two-column descriptor used in report lines.
    pub fn label(&self) -> String {
        format!("{} {}", self.threads, self.items)
    }
}

/// Bounds of the configuration-space search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepBounds {
    pub min_threads: usize,
    pub max_threads: usize,
    /// Budget for the per-variant items-per-thread cost bound.
    pub max_items: usize,
}

impl SweepBounds {
    pub fn new(min_threads: usize, max_threads: usize, max_items: usize) -> Result<Self, ShapeError> {
        if min_threads == 0 || max_threads < min_threads {
            return Err(ShapeError::BadThreadBounds {
                min: min_threads,
                max: max_threads,
            });
        }
        Ok(Self {
            min_threads,
            max_threads,
            max_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_threads_then_items() {
        let cfg = KernelConfig::new(32, 4, 5, 3.0);
        assert_eq!(cfg.label(), "32 4");
    }

    #[test]
    fn bounds_reject_zero_min() {
        assert!(SweepBounds::new(0, 8, 10).is_err());
    }

    #[test]
    fn bounds_reject_inverted_range() {
        assert!(SweepBounds::new(16, 8, 10).is_err());
    }

    #[test]
    fn bounds_accept_single_point() {
        let b = SweepBounds::new(32, 32, 10).unwrap();
        assert_eq!(b.min_threads, 32);
        assert_eq!(b.max_threads, 32);
    }
}
