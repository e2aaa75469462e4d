//! Linux backend: sysfs and udev for identity, SG_IO and the NVMe admin
//! ioctl for health data.

pub mod diskstats;
pub mod ioctl;
pub mod sysfs;

use crate::enumerate::DeviceProvider;
use crate::error::Result;
use crate::models::disk::{Backend, DeviceRecord, DiskInfo, PartitionInfo};
use crate::smart::{AtaChannel, NvmeChannel, SatChannel};
use ioctl::{NvmeDevice, SgDevice};
use std::time::Duration;
use sysfs::Roots;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct LinuxProvider {
    roots: Roots,
}

impl LinuxProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roots(roots: Roots) -> Self {
        Self { roots }
    }

    pub fn partitions(&self, disk: &DiskInfo) -> Vec<PartitionInfo> {
        sysfs::partitions(&self.roots, &disk.name)
    }
}

impl DeviceProvider for LinuxProvider {
    fn backend(&self) -> Backend {
        Backend::Linux
    }

    fn discover(&self) -> Vec<DeviceRecord> {
        let stats = diskstats::read_diskstats(&self.roots.proc);

        sysfs::block_devices(&self.roots)
            .into_iter()
            .filter_map(|name| {
                let record = sysfs::read_record(&self.roots, &name);
                if record.is_none() {
                    debug!(device = %name, "no sysfs record, skipping");
                }
                record
            })
            .map(|mut record| {
                record.io_stats = stats.get(&record.name).cloned();
                record
            })
            .collect()
    }

    fn open_ata(&self, record: &DeviceRecord, timeout: Duration) -> Result<Box<dyn AtaChannel>> {
        let device = SgDevice::open(&record.device_path)?;
        Ok(Box::new(SatChannel::new(device, timeout)))
    }

    fn open_usb_ata(&self, record: &DeviceRecord, timeout: Duration) -> Result<Box<dyn AtaChannel>> {
        self.open_ata(record, timeout)
    }

    fn open_nvme(&self, record: &DeviceRecord, timeout: Duration) -> Result<Box<dyn NvmeChannel>> {
        Ok(Box::new(NvmeDevice::open(&record.device_path, timeout)?))
    }
}
