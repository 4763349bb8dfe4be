//! `snr`: configuration-space tuning and correctness validation for the
//! reduction kernels, from the command line.
//!
//! Stdout carries only the report lines, so runs can be piped into the
//! plotting scripts; diagnostics go to stderr through tracing. Exit codes:
//! 0 for a completed run (a failed validation included), 1 for usage and
//! compile errors, -1 for a fatal device error.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

use snr_core::{
    descriptor, DataLayout, KernelVariant, Observation, OutputShape, ShapeError, SweepBounds,
};
use snr_opencl::SnrError;

#[cfg(feature = "opencl")]
use snr_core::{oracle, workload, KernelConfig, VariantDescriptor, Workload, WorkloadMode};
#[cfg(feature = "opencl")]
use snr_kernels::KernelSource;
#[cfg(feature = "opencl")]
use snr_opencl::{
    run_sweep, run_validation, ClHarness, ConfigRecord, SweepObserver, SweepProfile, TuneRequest,
    ValidateRequest, ValidationRun,
};

#[derive(Parser, Debug)]
#[command(name = "snr", version, about = "Tune and validate GPU reduction kernels")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep the configuration space and report the best kernel build.
    Tune(TuneArgs),
    /// Run one configuration against a workload with planted answers.
    Validate(ValidateArgs),
    /// List OpenCL platforms and devices.
    Devices,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Snr,
    SnrSigmaCut,
    Max,
    MaxStdSigmaCut,
    MedianOfMedians,
    MedianOfMediansAbsoluteDeviation,
    AbsoluteDeviation,
}

impl From<VariantArg> for KernelVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Snr => KernelVariant::Snr,
            VariantArg::SnrSigmaCut => KernelVariant::SnrSigmaCut,
            VariantArg::Max => KernelVariant::Max,
            VariantArg::MaxStdSigmaCut => KernelVariant::MaxStdSigmaCut,
            VariantArg::MedianOfMedians => KernelVariant::MedianOfMedians,
            VariantArg::MedianOfMediansAbsoluteDeviation => {
                KernelVariant::MedianOfMediansAbsoluteDeviation
            }
            VariantArg::AbsoluteDeviation => KernelVariant::AbsoluteDeviation,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    TrialsSamples,
    SamplesTrials,
}

impl From<LayoutArg> for DataLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::TrialsSamples => DataLayout::TrialsSamples,
            LayoutArg::SamplesTrials => DataLayout::SamplesTrials,
        }
    }
}

/// Observation shape and run parameters shared by tune and validate.
#[derive(Args, Debug)]
struct ShapeArgs {
    /// Kernel variant to run.
    #[arg(long, value_enum)]
    variant: VariantArg,

    /// Memory layout of the input matrix.
    #[arg(long, value_enum, default_value = "trials-samples")]
    layout: LayoutArg,

    /// Dispersion trials per subband.
    #[arg(long)]
    trials: usize,

    /// Samples per reduction group.
    #[arg(long)]
    samples: usize,

    #[arg(long, default_value_t = 1)]
    beams: usize,

    /// Subbanding trials; enables subbanding when given.
    #[arg(long)]
    subbanding_trials: Option<usize>,

    /// Row padding in bytes.
    #[arg(long, default_value_t = 128)]
    padding: usize,

    /// Chunk length for the median-of-medians variants.
    #[arg(long, default_value_t = 5)]
    median_step: usize,

    /// Exclusion threshold for the sigma-cut variants.
    #[arg(long, default_value_t = 3.0)]
    sigma: f32,

    /// Seed for the workload generator.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Args, Debug)]
struct DeviceArgs {
    /// OpenCL platform index.
    #[arg(long, default_value_t = 0)]
    platform: usize,

    /// Device index within the platform.
    #[arg(long, default_value_t = 0)]
    device: usize,
}

#[derive(Args, Debug)]
struct TuneArgs {
    #[command(flatten)]
    shape: ShapeArgs,

    #[command(flatten)]
    device: DeviceArgs,

    /// Timed launches per configuration, after one discarded warm-up.
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    #[arg(long, default_value_t = 1)]
    min_threads: usize,

    #[arg(long, default_value_t = 1024)]
    max_threads: usize,

    /// Budget for the per-variant items-per-thread cost bound.
    #[arg(long, default_value_t = 255)]
    max_items: usize,

    /// Suppress per-configuration lines; print only the best.
    #[arg(long)]
    best_only: bool,

    /// Print each generated kernel source before compiling it.
    #[arg(long)]
    print_code: bool,

    /// Write the full sweep as JSON.
    #[arg(long, value_name = "PATH")]
    profile_out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    #[command(flatten)]
    shape: ShapeArgs,

    #[command(flatten)]
    device: DeviceArgs,

    /// Threads per work-group.
    #[arg(long)]
    threads: usize,

    /// Items per thread.
    #[arg(long)]
    items: usize,

    /// Print the device output before the summary line.
    #[arg(long)]
    print_results: bool,

    /// Print the generated kernel source.
    #[arg(long)]
    print_code: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    let result = match cli.command {
        Command::Tune(args) => cmd_tune(args),
        Command::Validate(args) => cmd_validate(args),
        Command::Devices => cmd_devices(),
    };
    if let Err(err) = result {
        error!("{err:#}");
        let code = match err.downcast_ref::<SnrError>() {
            Some(e) if e.is_fatal_device() => -1,
            _ => 1,
        };
        std::process::exit(code);
    }
}

fn observation(shape: &ShapeArgs) -> Result<Observation, ShapeError> {
    Observation::new(
        shape.beams,
        shape.trials,
        shape.subbanding_trials.unwrap_or(1),
        shape.samples,
        shape.padding,
        shape.layout.into(),
    )
}

/// Median variants require the step to divide the sample count; everyone
/// else ignores it.
fn check_median_step(
    variant: KernelVariant,
    obs: &Observation,
    step: usize,
) -> Result<(), ShapeError> {
    if descriptor(variant).output_shape == OutputShape::PerChunk
        && (step == 0 || obs.samples() % step != 0)
    {
        return Err(ShapeError::MedianStep {
            step,
            samples: obs.samples(),
        });
    }
    Ok(())
}

/// The sigma-cut second pass divides by the kept stddev; a non-positive
/// threshold cuts everything away from it and yields a non-finite
/// reference, so it is rejected up front.
fn check_sigma(variant: KernelVariant, sigma: f32) -> anyhow::Result<()> {
    if matches!(
        variant,
        KernelVariant::SnrSigmaCut | KernelVariant::MaxStdSigmaCut
    ) && !(sigma > 0.0)
    {
        anyhow::bail!(
            "sigma must be positive for {}, got {sigma}",
            descriptor(variant).name
        );
    }
    Ok(())
}

// Argument validation runs before any device work, so usage errors exit 1
// even when the OpenCL backend is compiled out.

fn cmd_tune(args: TuneArgs) -> anyhow::Result<()> {
    let variant: KernelVariant = args.shape.variant.into();
    let obs = observation(&args.shape)?;
    check_median_step(variant, &obs, args.shape.median_step)?;
    check_sigma(variant, args.shape.sigma)?;
    if args.iterations == 0 {
        return Err(ShapeError::NoIterations.into());
    }
    let bounds = SweepBounds::new(args.min_threads, args.max_threads, args.max_items)?;
    run_tune(args, variant, obs, bounds)
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let variant: KernelVariant = args.shape.variant.into();
    let obs = observation(&args.shape)?;
    check_median_step(variant, &obs, args.shape.median_step)?;
    check_sigma(variant, args.shape.sigma)?;
    run_validate(args, variant, obs)
}

#[cfg(feature = "opencl")]
struct Reporter<'a> {
    obs: &'a Observation,
    verbose: bool,
    print_code: bool,
}

#[cfg(feature = "opencl")]
impl SweepObserver for Reporter<'_> {
    fn on_source(&mut self, _config: &KernelConfig, source: &KernelSource) {
        if self.print_code {
            println!("{}", source.text);
        }
    }

    fn on_record(&mut self, record: &ConfigRecord) {
        if self.verbose {
            println!(
                "{} {} {} {} {:.3} {:.6} {:.6} {:.6}",
                self.obs.beams(),
                self.obs.trials_total(),
                self.obs.samples(),
                record.config.label(),
                record.throughput_gbs,
                record.mean_s,
                record.stddev_s,
                record.cov
            );
        }
    }
}

#[cfg(feature = "opencl")]
fn run_tune(
    args: TuneArgs,
    variant: KernelVariant,
    obs: Observation,
    bounds: SweepBounds,
) -> anyhow::Result<()> {
    let desc = descriptor(variant);
    let workload = workload::generate(
        &obs,
        desc.needs_baseline,
        WorkloadMode::Benchmark,
        args.shape.seed,
    );
    let mut harness = ClHarness::new(
        args.device.platform,
        args.device.device,
        variant,
        obs,
        args.shape.median_step,
        workload,
    )?;
    let req = TuneRequest {
        variant,
        obs: &obs,
        bounds,
        median_step: args.shape.median_step,
        sigma: args.shape.sigma,
        iterations: args.iterations,
    };
    let mut reporter = Reporter {
        obs: &obs,
        verbose: !args.best_only,
        print_code: args.print_code,
    };
    let outcome = run_sweep(&mut harness, &req, &mut reporter)?;

    if args.best_only {
        if let Some(best) = &outcome.best {
            println!(
                "{} {} {}",
                obs.trials_total(),
                obs.samples(),
                best.config.label()
            );
        }
    } else {
        println!();
    }
    if let Some(path) = &args.profile_out {
        SweepProfile::new(harness.device_name(), variant, obs, outcome).save(path)?;
    }
    Ok(())
}

#[cfg(feature = "opencl")]
fn run_validate(args: ValidateArgs, variant: KernelVariant, obs: Observation) -> anyhow::Result<()> {
    let desc = descriptor(variant);
    let config = KernelConfig::new(
        args.threads,
        args.items,
        args.shape.median_step,
        args.shape.sigma,
    );
    let workload = workload::generate(
        &obs,
        desc.needs_baseline,
        WorkloadMode::Validation,
        args.shape.seed,
    );
    let mut harness = ClHarness::new(
        args.device.platform,
        args.device.device,
        variant,
        obs,
        args.shape.median_step,
        workload.clone(),
    )?;
    if args.print_code {
        println!("{}", snr_kernels::source(variant, &config, &obs).text);
    }
    let run = run_validation(
        &mut harness,
        &ValidateRequest {
            variant,
            obs: &obs,
            config,
        },
        &workload,
    )?;
    if args.print_results {
        print_results(&obs, desc, &config, &workload, &run);
    }
    println!("{}", run.summary());
    Ok(())
}

#[cfg(feature = "opencl")]
fn cmd_devices() -> anyhow::Result<()> {
    let devices = snr_opencl::device::enumerate()?;
    if devices.is_empty() {
        println!("no OpenCL devices found");
    }
    for d in devices {
        println!(
            "platform {} device {}: {} ({}, {})",
            d.platform_index, d.device_index, d.name, d.vendor, d.platform_name
        );
    }
    Ok(())
}

/// Dump device output next to the host references, one line per reduction
/// group (or per chunk or sample row for the wider shapes). Each cell is
/// `device,reference`; index-reporting variants add a
/// `deviceIndex,plantedIndex` pair.
#[cfg(feature = "opencl")]
fn print_results(
    obs: &Observation,
    desc: &VariantDescriptor,
    cfg: &KernelConfig,
    workload: &Workload,
    run: &ValidationRun,
) {
    let refs = oracle::references(desc.variant, obs, cfg, workload);
    for beam in 0..obs.beams() {
        for subband in 0..obs.subband_trials() {
            for trial in 0..obs.trials() {
                match desc.output_shape {
                    OutputShape::PerGroup => {
                        let i = obs.group_index(beam, subband, trial);
                        let mut line = format!(
                            "{beam} {subband} {trial} {},{}",
                            run.output.values[i], refs.values[i]
                        );
                        if let Some(indices) = &run.output.indices {
                            match &refs.indices {
                                Some(planted) => {
                                    line.push_str(&format!(" {},{}", indices[i], planted[i]))
                                }
                                None => line.push_str(&format!(" {}", indices[i])),
                            }
                        }
                        if let (Some(secondary), Some(reference)) =
                            (&run.output.secondary, &refs.secondary)
                        {
                            line.push_str(&format!(" {},{}", secondary[i], reference[i]));
                        }
                        println!("{line}");
                    }
                    OutputShape::PerChunk => {
                        let chunks = obs.samples() / cfg.median_step;
                        let row: Vec<String> = (0..chunks)
                            .map(|chunk| {
                                let i = obs.chunked_index(chunks, beam, subband, trial, chunk);
                                format!("{},{}", run.output.values[i], refs.values[i])
                            })
                            .collect();
                        println!("{beam} {subband} {trial} {}", row.join(" "));
                    }
                    OutputShape::PerSample => {
                        let row: Vec<String> = (0..obs.samples())
                            .map(|sample| {
                                let i = obs.input_index(beam, subband, trial, sample);
                                format!("{},{}", run.output.values[i], refs.values[i])
                            })
                            .collect();
                        println!("{beam} {subband} {trial} {}", row.join(" "));
                    }
                }
            }
        }
    }
}

#[cfg(not(feature = "opencl"))]
fn run_tune(
    _args: TuneArgs,
    _variant: KernelVariant,
    _obs: Observation,
    _bounds: SweepBounds,
) -> anyhow::Result<()> {
    Err(SnrError::BackendUnavailable.into())
}

#[cfg(not(feature = "opencl"))]
fn run_validate(
    _args: ValidateArgs,
    _variant: KernelVariant,
    _obs: Observation,
) -> anyhow::Result<()> {
    Err(SnrError::BackendUnavailable.into())
}

#[cfg(not(feature = "opencl"))]
fn cmd_devices() -> anyhow::Result<()> {
    Err(SnrError::BackendUnavailable.into())
}
