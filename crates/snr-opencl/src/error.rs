//! Error taxonomy for the device-facing crates.
//!
//! Every device call surfaces as an [`SnrError`]; the lifecycle controller
//! decides from the error alone whether a sweep aborts or merely discards
//! the current configuration. Only two raw codes are fatal to the whole
//! run; everything else the device reports during measurement is treated
//! as transient.

use std::path::PathBuf;

use thiserror::Error;

use snr_core::ShapeError;

/// Raw device codes that mean the device or queue is unusable: memory
/// object allocation failure (-4) and invalid buffer size (-61).
pub const FATAL_DEVICE_CODES: [i32; 2] = [-4, -61];

/// Errors produced by the tuning and validation drivers.
#[derive(Debug, Error)]
pub enum SnrError {
    /// Raw device error together with the call that produced it.
    #[error("device error {code} during {context}")]
    Device { code: i32, context: String },

    /// The device compiler rejected generated source, or the kernel could
    /// not be created from a built program. Structural for the whole run.
    #[error("kernel '{name}' failed to compile: {log}")]
    Compile { name: String, log: String },

    #[error("platform index {index} out of range ({available} available)")]
    NoPlatform { index: usize, available: usize },

    #[error("device index {index} out of range ({available} on platform)")]
    NoDevice { index: usize, available: usize },

    #[error("configuration {threads}x{items} is not valid for this shape")]
    InvalidConfig { threads: usize, items: usize },

    /// A driver was asked to compile before any session existed.
    #[error("no device session; the session must be built before compiling")]
    NoSession,

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("failed to write sweep profile to {path}")]
    ProfileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("OpenCL support was not compiled in; rebuild with the `opencl` feature")]
    BackendUnavailable,
}

impl SnrError {
    pub fn device(code: i32, context: impl Into<String>) -> Self {
        Self::Device {
            code,
            context: context.into(),
        }
    }

    /// True for the reserved codes that abort the whole run with exit -1.
    pub fn is_fatal_device(&self) -> bool {
        matches!(self, Self::Device { code, .. } if FATAL_DEVICE_CODES.contains(code))
    }
}

pub type Result<T> = std::result::Result<T, SnrError>;
