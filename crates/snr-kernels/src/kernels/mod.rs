//! OpenCL kernel bodies for the reduction variants.
//!
//! Each file holds both layout renditions of one variant and is embedded
//! at compile time via `include_str!`. The bodies are parameterized
//! entirely through `#define` constants prepended by [`crate::source`], so
//! every configuration compiles to fully specialized code.

/// Signal-to-noise ratio with peak location.
pub const SNR_SRC: &str = include_str!("snr.cl");

/// Signal-to-noise ratio with a sigma-cut noise estimate.
pub const SNR_SIGMA_CUT_SRC: &str = include_str!("snr_sigma_cut.cl");

/// Group maximum with peak location.
pub const MAX_SRC: &str = include_str!("max.cl");

/// Group maximum plus sigma-cut standard deviation.
pub const MAX_STD_SIGMA_CUT_SRC: &str = include_str!("max_std_sigma_cut.cl");

/// Per-chunk medians.
pub const MEDIAN_OF_MEDIANS_SRC: &str = include_str!("median_of_medians.cl");

/// Per-chunk medians of absolute deviations from a baseline.
pub const MEDIAN_OF_MEDIANS_ABSOLUTE_DEVIATION_SRC: &str =
    include_str!("median_of_medians_absolute_deviation.cl");

/// Per-sample absolute deviations from a baseline.
pub const ABSOLUTE_DEVIATION_SRC: &str = include_str!("absolute_deviation.cl");
