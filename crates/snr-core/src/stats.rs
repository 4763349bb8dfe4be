//! Streaming statistics accumulator.
//!
//! Welford's online algorithm: one pass, no stored samples, numerically
//! stable for the magnitudes this crate handles. Used for both timing
//! aggregation and the host-side reduction references.

/// Running count, mean, variance, and extrema over a stream of values.
///
/// Variance is the sample estimate (n - 1) and is reported as zero until
/// two values have been pushed.
#[derive(Debug, Clone)]
pub struct Statistics {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of the values pushed so far; zero for an empty accumulator.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Standard deviation over mean; zero when the mean is zero.
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            self.std_dev() / self.mean
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(values: &[f64]) -> Statistics {
        let mut s = Statistics::new();
        for &v in values {
            s.push(v);
        }
        s
    }

    #[test]
    fn mean_of_reference_group() {
        let s = filled(&[3.0, 7.0, 2.0, 19.0, 5.0]);
        assert!((s.mean() - 7.2).abs() < 1e-12);
        assert_eq!(s.count(), 5);
    }

    #[test]
    fn sample_standard_deviation() {
        // Squared deviations sum to 188.8; sample variance is 47.2.
        let s = filled(&[3.0, 7.0, 2.0, 19.0, 5.0]);
        assert!((s.variance() - 47.2).abs() < 1e-9);
        assert!((s.std_dev() - 47.2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn extrema_track_the_stream() {
        let s = filled(&[3.0, 7.0, 2.0, 19.0, 5.0]);
        assert_eq!(s.min(), 2.0);
        assert_eq!(s.max(), 19.0);
    }

    #[test]
    fn single_value_has_zero_spread() {
        let s = filled(&[4.2]);
        assert_eq!(s.variance(), 0.0);
        assert_eq!(s.std_dev(), 0.0);
        assert_eq!(s.coefficient_of_variation(), 0.0);
    }

    #[test]
    fn empty_accumulator_is_inert() {
        let s = Statistics::new();
        assert_eq!(s.count(), 0);
        assert_eq!(s.mean(), 0.0);
        assert_eq!(s.variance(), 0.0);
        assert_eq!(s.coefficient_of_variation(), 0.0);
    }

    #[test]
    fn coefficient_of_variation_matches_definition() {
        let s = filled(&[1.0, 2.0, 3.0]);
        assert!((s.coefficient_of_variation() - s.std_dev() / 2.0).abs() < 1e-12);
    }

    #[test]
    fn constant_stream_has_zero_variance() {
        let s = filled(&[5.0; 64]);
        assert_eq!(s.variance(), 0.0);
        assert_eq!(s.mean(), 5.0);
    }
}
