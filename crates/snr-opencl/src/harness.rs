//! The device seam the drivers run against.
//!
//! [`KernelHarness`] is the narrow surface between the sweep/validation
//! control flow and a GPU runtime: rebuild the session, compile and bind
//! one configuration, launch it blocking, read the outputs back. The
//! opencl3-backed implementation lives behind the `opencl` feature; the
//! scripted harness in [`crate::testing`] exercises the same control flow
//! without hardware.

use std::time::Duration;

use snr_core::{DeviceOutput, LaunchGeometry};
use snr_kernels::KernelSource;

use crate::error::Result;

/// One configuration attempt's view of the device.
///
/// The drivers call these strictly in sequence: `rebuild` (when the
/// lifecycle controller demands it), `prepare`, `launch` one or more
/// times, `read_back`. Nothing overlaps; every call blocks until the
/// device is done.
pub trait KernelHarness {
    /// Destroy the current session and rebuild it, buffers included, from
    /// the immutable workload. Replaces everything wholesale.
    fn rebuild(&mut self) -> Result<()>;

    /// Compile `source`, create its kernel, and remember the launch
    /// geometry. Compile rejection surfaces as [`crate::SnrError::Compile`].
    fn prepare(&mut self, source: &KernelSource, geometry: &LaunchGeometry) -> Result<()>;

    /// Enqueue one launch and block until the device completes it.
    /// Returns the wall-clock duration of enqueue plus wait.
    fn launch(&mut self) -> Result<Duration>;

    /// Blocking read of every output buffer of the prepared kernel.
    fn read_back(&mut self) -> Result<DeviceOutput>;

    /// Device name for reports and profiles.
    fn device_name(&self) -> String;
}
