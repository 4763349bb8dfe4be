//! Platform and device selection by index.

use opencl3::device::{Device, CL_DEVICE_TYPE_ALL};
use opencl3::platform::get_platforms;
use tracing::{debug, info};

use crate::error::{Result, SnrError};

/// One enumerated device, addressed by (platform, device) indices.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub platform_index: usize,
    pub device_index: usize,
    pub platform_name: String,
    pub name: String,
    pub vendor: String,
}

/// Every device of every platform, in index order.
pub fn enumerate() -> Result<Vec<DeviceInfo>> {
    let platforms =
        get_platforms().map_err(|e| SnrError::device(e.0, "platform enumeration"))?;
    let mut devices = Vec::new();
    for (platform_index, platform) in platforms.iter().enumerate() {
        let platform_name = platform.name().unwrap_or_default();
        debug!(platform = %platform_name, "enumerating OpenCL platform");
        let ids = platform
            .get_devices(CL_DEVICE_TYPE_ALL)
            .map_err(|e| SnrError::device(e.0, "device enumeration"))?;
        for (device_index, id) in ids.into_iter().enumerate() {
            let device = Device::new(id);
            devices.push(DeviceInfo {
                platform_index,
                device_index,
                platform_name: platform_name.clone(),
                name: device.name().unwrap_or_default(),
                vendor: device.vendor().unwrap_or_default(),
            });
        }
    }
    Ok(devices)
}

/// Select one device by platform and device index.
pub fn select(platform_index: usize, device_index: usize) -> Result<Device> {
    let platforms =
        get_platforms().map_err(|e| SnrError::device(e.0, "platform enumeration"))?;
    let platform = platforms.get(platform_index).ok_or(SnrError::NoPlatform {
        index: platform_index,
        available: platforms.len(),
    })?;
    let ids = platform
        .get_devices(CL_DEVICE_TYPE_ALL)
        .map_err(|e| SnrError::device(e.0, "device enumeration"))?;
    let id = ids.get(device_index).copied().ok_or(SnrError::NoDevice {
        index: device_index,
        available: ids.len(),
    })?;
    let device = Device::new(id);
    info!(
        platform = platform_index,
        device = device_index,
        name = %device.name().unwrap_or_default(),
        "device selected"
    );
    Ok(device)
}
