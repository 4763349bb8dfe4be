//! OpenCL source generation for the reduction kernels.
//!
//! A kernel build is a pure function of the variant, the observation
//! shape, and one [`KernelConfig`]: [`source`] prepends a `#define` block
//! carrying every shape and tuning constant to the variant's embedded
//! body, so the device compiler sees fully specialized code with constant
//! loop bounds and array sizes. Nothing here talks to a device.

use std::fmt::Write as _;

use snr_core::variant::OutputShape;
use snr_core::{descriptor, DataLayout, KernelConfig, KernelVariant, Observation};

pub mod kernels;

/// A compilable OpenCL program and the kernel to create from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSource {
    /// Entry point name, `<variant>_<layout>` with underscores.
    pub name: String,
    /// Complete program text: defines header plus kernel body.
    pub text: String,
}

/// Entry point name for one variant and layout.
pub fn kernel_name(variant: KernelVariant, layout: DataLayout) -> String {
    format!(
        "{}_{}",
        descriptor(variant).name.replace('-', "_"),
        layout.label().replace('-', "_")
    )
}

/// Build the program source for one attempt.
pub fn source(variant: KernelVariant, cfg: &KernelConfig, obs: &Observation) -> KernelSource {
    let desc = descriptor(variant);
    let mut text = String::with_capacity(4096);

    let mut define = |name: &str, value: usize| {
        let _ = writeln!(text, "#define {name} {value}");
    };
    define("THREADS", cfg.threads);
    define("ITEMS", cfg.items);
    define("SAMPLES", obs.samples());
    define("PADDED_SAMPLES", obs.padded_samples());
    define("TRIALS", obs.trials());
    define("PADDED_TRIALS", obs.padded_trials());
    define("SBAND_TRIALS", obs.subband_trials());
    define("TRIALS_TOTAL", obs.trials_total());
    define("PADDED_TRIALS_TOTAL", obs.padded_trials_total());

    if desc.output_shape == OutputShape::PerChunk {
        let chunks = obs.samples() / cfg.median_step;
        define("MEDIAN_STEP", cfg.median_step);
        define("CHUNKS", chunks);
        define(
            "PADDED_CHUNKS_TOTAL",
            obs.padded(obs.trials_total() * chunks),
        );
    }
    if matches!(
        variant,
        KernelVariant::SnrSigmaCut | KernelVariant::MaxStdSigmaCut
    ) {
        let _ = writeln!(text, "#define SIGMA ({:?}f)", cfg.sigma);
    }

    text.push('\n');
    text.push_str(body(variant));

    KernelSource {
        name: kernel_name(variant, obs.layout()),
        text,
    }
}

fn body(variant: KernelVariant) -> &'static str {
    match variant {
        KernelVariant::Snr => kernels::SNR_SRC,
        KernelVariant::SnrSigmaCut => kernels::SNR_SIGMA_CUT_SRC,
        KernelVariant::Max => kernels::MAX_SRC,
        KernelVariant::MaxStdSigmaCut => kernels::MAX_STD_SIGMA_CUT_SRC,
        KernelVariant::MedianOfMedians => kernels::MEDIAN_OF_MEDIANS_SRC,
        KernelVariant::MedianOfMediansAbsoluteDeviation => {
            kernels::MEDIAN_OF_MEDIANS_ABSOLUTE_DEVIATION_SRC
        }
        KernelVariant::AbsoluteDeviation => kernels::ABSOLUTE_DEVIATION_SRC,
    }
}
