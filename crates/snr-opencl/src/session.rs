//! Device session: context, queue, and the buffers of one run.
//!
//! A session is built in one shot from the immutable workload and
//! replaced wholesale when the lifecycle controller demands a rebuild;
//! nothing in it is ever mutated in place. Buffer sizes are fixed for a
//! whole run because the observation and the median step never change
//! between configurations.

use std::ptr;

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::Device;
use opencl3::memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_WRITE_ONLY};
use opencl3::types::CL_BLOCKING;
use tracing::debug;

use snr_core::{descriptor, DeviceOutput, KernelConfig, KernelVariant, Observation, Workload};

use crate::error::{Result, SnrError};

pub struct DeviceSession {
    pub context: Context,
    pub queue: CommandQueue,
    pub input: Buffer<f32>,
    pub baseline: Option<Buffer<f32>>,
    pub values: Buffer<f32>,
    pub indices: Option<Buffer<u32>>,
    pub secondary: Option<Buffer<f32>>,
    value_len: usize,
    index_len: Option<usize>,
    secondary_len: Option<usize>,
}

fn cl(context: &'static str) -> impl Fn(opencl3::error_codes::ClError) -> SnrError {
    move |e| SnrError::device(e.0, context)
}

impl DeviceSession {
    /// Build the session and upload the workload.
    pub fn build(
        device: &Device,
        variant: KernelVariant,
        obs: &Observation,
        median_step: usize,
        workload: &Workload,
    ) -> Result<Self> {
        let desc = descriptor(variant);
        // Output sizes depend on the configuration only through the
        // median step, which is fixed for the whole run.
        let sizing = KernelConfig::new(1, 1, median_step, 0.0);
        let value_len = desc.value_output_len(obs, &sizing);
        let index_len = desc.index_output_len(obs);
        let secondary_len = desc.secondary_output_len(obs);

        let context = Context::from_device(device).map_err(cl("context create"))?;
        let queue =
            CommandQueue::create_default(&context, 0).map_err(cl("queue create"))?;

        let mut input = unsafe {
            Buffer::<f32>::create(
                &context,
                CL_MEM_READ_ONLY,
                workload.input.len(),
                ptr::null_mut(),
            )
            .map_err(cl("input buffer create"))?
        };
        unsafe {
            queue
                .enqueue_write_buffer(&mut input, CL_BLOCKING, 0, &workload.input, &[])
                .map_err(cl("input buffer write"))?;
        }

        let baseline = match (desc.needs_baseline, workload.baseline.as_ref()) {
            (true, Some(values)) => {
                let mut buffer = unsafe {
                    Buffer::<f32>::create(
                        &context,
                        CL_MEM_READ_ONLY,
                        values.len(),
                        ptr::null_mut(),
                    )
                    .map_err(cl("baseline buffer create"))?
                };
                unsafe {
                    queue
                        .enqueue_write_buffer(&mut buffer, CL_BLOCKING, 0, values, &[])
                        .map_err(cl("baseline buffer write"))?;
                }
                Some(buffer)
            }
            _ => None,
        };

        let values = unsafe {
            Buffer::<f32>::create(&context, CL_MEM_WRITE_ONLY, value_len, ptr::null_mut())
                .map_err(cl("value buffer create"))?
        };
        let indices = match index_len {
            Some(len) => Some(unsafe {
                Buffer::<u32>::create(&context, CL_MEM_WRITE_ONLY, len, ptr::null_mut())
                    .map_err(cl("index buffer create"))?
            }),
            None => None,
        };
        let secondary = match secondary_len {
            Some(len) => Some(unsafe {
                Buffer::<f32>::create(&context, CL_MEM_WRITE_ONLY, len, ptr::null_mut())
                    .map_err(cl("secondary buffer create"))?
            }),
            None => None,
        };

        debug!(
            input_len = workload.input.len(),
            value_len, "device session built"
        );
        Ok(Self {
            context,
            queue,
            input,
            baseline,
            values,
            indices,
            secondary,
            value_len,
            index_len,
            secondary_len,
        })
    }

    /// Blocking read of every output buffer.
    pub fn read_outputs(&self) -> Result<DeviceOutput> {
        let mut values = vec![0.0f32; self.value_len];
        unsafe {
            self.queue
                .enqueue_read_buffer(&self.values, CL_BLOCKING, 0, &mut values, &[])
                .map_err(cl("value buffer read"))?;
        }

        let indices = match (self.indices.as_ref(), self.index_len) {
            (Some(buffer), Some(len)) => {
                let mut out = vec![0u32; len];
                unsafe {
                    self.queue
                        .enqueue_read_buffer(buffer, CL_BLOCKING, 0, &mut out, &[])
                        .map_err(cl("index buffer read"))?;
                }
                Some(out)
            }
            _ => None,
        };

        let secondary = match (self.secondary.as_ref(), self.secondary_len) {
            (Some(buffer), Some(len)) => {
                let mut out = vec![0.0f32; len];
                unsafe {
                    self.queue
                        .enqueue_read_buffer(buffer, CL_BLOCKING, 0, &mut out, &[])
                        .map_err(cl("secondary buffer read"))?;
                }
                Some(out)
            }
            _ => None,
        };

        Ok(DeviceOutput {
            values,
            indices,
            secondary,
        })
    }
}
