//! Host-side core for GPU reduction-kernel tuning and validation.
//!
//! This crate holds everything that does not touch a device: observation
//! geometry and padding arithmetic, the per-variant descriptor table, the
//! configuration-space sweep, streaming statistics, synthetic workload
//! generation, and the host-side correctness oracle. The device-facing
//! crates build on these types; all of them are deterministic and fully
//! testable on a machine without GPU hardware.

pub mod config;
pub mod observation;
pub mod oracle;
pub mod stats;
pub mod sweep;
pub mod variant;
pub mod workload;

pub use config::{KernelConfig, SweepBounds};
pub use observation::{DataLayout, Observation, ShapeError};
pub use oracle::{ComparisonCounts, DeviceOutput, Verdict};
pub use stats::Statistics;
pub use sweep::{BestResult, BestSelector, ConfigSweep};
pub use variant::{
    descriptor, BufferRole, KernelVariant, LaunchGeometry, OutputShape, VariantDescriptor,
};
pub use workload::{PlantedMap, Workload, WorkloadMode};
