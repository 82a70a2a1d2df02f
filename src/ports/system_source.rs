use crate::domain::DeviceInfo;

use super::ProbeResult;

/// Port for fetching information about the machine running the measurement
pub trait SystemSource {
    /// CPU count and available physical memory
    fn device_info(&self) -> ProbeResult<DeviceInfo>;
}
