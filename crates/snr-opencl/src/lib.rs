//! Device orchestration for reduction-kernel tuning and validation.
//!
//! The drivers ([`tuner`], [`validate`]) are generic over the
//! [`KernelHarness`] seam, so every control-flow property — pruning,
//! warm-up discards, failure classification, lazy session rebuilds — is
//! testable without GPU hardware. The opencl3-backed harness behind the
//! `opencl` feature is the production implementation.

pub mod error;
pub mod harness;
pub mod lifecycle;
pub mod testing;
pub mod tuner;
pub mod validate;

#[cfg(feature = "opencl")]
pub mod device;
#[cfg(feature = "opencl")]
pub mod engine;
#[cfg(feature = "opencl")]
pub mod session;

pub use error::{Result, SnrError, FATAL_DEVICE_CODES};
pub use harness::KernelHarness;
pub use lifecycle::{classify, Disposition, LifecycleController};
pub use tuner::{
    run_sweep, ConfigRecord, NullObserver, SweepObserver, SweepOutcome, SweepProfile, TuneRequest,
};
pub use validate::{run_validation, ValidateRequest, ValidationRun};

#[cfg(feature = "opencl")]
pub use engine::ClHarness;
