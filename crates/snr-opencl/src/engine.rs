//! The opencl3-backed [`KernelHarness`].
//!
//! Owns the selected device, the immutable workload, and the current
//! session/kernel pair. Launches are timed wall-clock around enqueue plus
//! blocking wait, matching the serial, non-overlapping measurement
//! protocol of the drivers.

use std::time::{Duration, Instant};

use opencl3::device::Device;
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::ClMem;
use opencl3::program::Program;
use tracing::debug;

use snr_core::{descriptor, BufferRole, DeviceOutput, KernelVariant, LaunchGeometry, Observation, Workload};
use snr_kernels::KernelSource;

use crate::device;
use crate::error::{Result, SnrError};
use crate::harness::KernelHarness;
use crate::session::DeviceSession;

pub struct ClHarness {
    device: Device,
    device_name: String,
    variant: KernelVariant,
    obs: Observation,
    median_step: usize,
    workload: Workload,
    session: Option<DeviceSession>,
    kernel: Option<Kernel>,
    geometry: Option<LaunchGeometry>,
}

impl ClHarness {
    /// Select a device and wrap the run's immutable inputs. No session is
    /// built yet; the drivers do that lazily.
    pub fn new(
        platform_index: usize,
        device_index: usize,
        variant: KernelVariant,
        obs: Observation,
        median_step: usize,
        workload: Workload,
    ) -> Result<Self> {
        let device = device::select(platform_index, device_index)?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        Ok(Self {
            device,
            device_name,
            variant,
            obs,
            median_step,
            workload,
            session: None,
            kernel: None,
            geometry: None,
        })
    }
}

impl KernelHarness for ClHarness {
    fn rebuild(&mut self) -> Result<()> {
        // Release the old handles before the replacements exist.
        self.kernel = None;
        self.geometry = None;
        self.session = None;
        self.session = Some(DeviceSession::build(
            &self.device,
            self.variant,
            &self.obs,
            self.median_step,
            &self.workload,
        )?);
        Ok(())
    }

    fn prepare(&mut self, source: &KernelSource, geometry: &LaunchGeometry) -> Result<()> {
        let session = self.session.as_ref().ok_or(SnrError::NoSession)?;
        self.kernel = None;

        let program = Program::create_and_build_from_source(
            &session.context,
            &source.text,
            "-cl-mad-enable -Werror",
        )
        .map_err(|log| SnrError::Compile {
            name: source.name.clone(),
            log,
        })?;
        // A create failure after a clean build is still structural for
        // this generated source.
        let kernel = Kernel::create(&program, &source.name).map_err(|e| SnrError::Compile {
            name: source.name.clone(),
            log: format!("kernel create failed with code {}", e.0),
        })?;
        debug!(kernel = %source.name, "kernel compiled");

        self.kernel = Some(kernel);
        self.geometry = Some(geometry.clone());
        Ok(())
    }

    fn launch(&mut self) -> Result<Duration> {
        let session = self.session.as_ref().ok_or(SnrError::NoSession)?;
        let kernel = self.kernel.as_ref().ok_or(SnrError::NoSession)?;
        let geometry = self.geometry.as_ref().ok_or(SnrError::NoSession)?;
        let desc = descriptor(self.variant);

        let start = Instant::now();
        let event = unsafe {
            let mut exec = ExecuteKernel::new(kernel);
            for role in desc.buffers {
                match role {
                    BufferRole::Input => exec.set_arg(&session.input.get()),
                    BufferRole::Baseline => exec.set_arg(
                        &session
                            .baseline
                            .as_ref()
                            .ok_or(SnrError::NoSession)?
                            .get(),
                    ),
                    BufferRole::Values => exec.set_arg(&session.values.get()),
                    BufferRole::Indices => exec.set_arg(
                        &session.indices.as_ref().ok_or(SnrError::NoSession)?.get(),
                    ),
                    BufferRole::Secondary => exec.set_arg(
                        &session
                            .secondary
                            .as_ref()
                            .ok_or(SnrError::NoSession)?
                            .get(),
                    ),
                };
            }
            exec.set_global_work_sizes(&geometry.global)
                .set_local_work_sizes(&geometry.local)
                .enqueue_nd_range(&session.queue)
                .map_err(|e| SnrError::device(e.0, "nd-range launch"))?
        };
        event
            .wait()
            .map_err(|e| SnrError::device(e.0, "launch wait"))?;
        Ok(start.elapsed())
    }

    fn read_back(&mut self) -> Result<DeviceOutput> {
        let session = self.session.as_ref().ok_or(SnrError::NoSession)?;
        session.read_outputs()
    }

    fn device_name(&self) -> String {
        self.device_name.clone()
    }
}
