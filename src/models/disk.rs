use crate::bus::{BusType, SmartType};
use crate::smart::Smart;
use serde::Serialize;

/// Which native backend produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Backend {
    Linux,
    IoKit,
    Windows,
    /// Records supplied by a caller-provided [`crate::enumerate::DeviceProvider`].
    Mock,
}

/// Cumulative I/O counters since boot (or since the driver attached).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiskIoStats {
    pub reads:         u64,
    pub read_bytes:    u64,
    pub read_time_ms:  u64,
    pub writes:        u64,
    pub write_bytes:   u64,
    pub write_time_ms: u64,
    /// Time the device had I/O in flight; not every platform reports it.
    pub io_time_ms:    u64,
}

/// Identity of one physical disk as reported by the OS, before a SMART
/// session is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Short OS name: `sda`, `nvme0n1`, `disk0`, `PhysicalDrive0`.
    pub name:                String,
    pub device_path:         String,
    pub model:               String,
    pub vendor:              String,
    pub serial:              String,
    pub firmware:            String,
    pub logical_block_size:  u32,
    /// Zero when the OS does not report it.
    pub physical_block_size: u32,
    pub size:                u64,
    pub removable:           bool,
    pub ejectable:           bool,
    pub bus_type:            BusType,
    pub bus_location:        String,
    pub content_type:        String,
    pub io_stats:            Option<DiskIoStats>,
}

/// One physical disk and its SMART session.
#[derive(Debug)]
pub struct DiskInfo {
    pub index:               usize,
    pub name:                String,
    pub device_path:         String,
    pub model:               String,
    pub vendor:              String,
    pub serial:              String,
    pub firmware:            String,
    pub logical_block_size:  u32,
    pub physical_block_size: u32,
    pub size:                u64,
    pub removable:           bool,
    pub ejectable:           bool,
    pub bus_type:            BusType,
    pub bus_location:        String,
    pub content_type:        String,
    pub io_stats:            Option<DiskIoStats>,
    pub backend:             Backend,
    pub smart:               Smart,
}

impl DiskInfo {
    pub fn from_record(index: usize, record: DeviceRecord, backend: Backend, smart: Smart) -> Self {
        let physical_block_size = if record.physical_block_size == 0 {
            record.logical_block_size
        } else {
            record.physical_block_size
        };

        Self {
            index,
            name: record.name,
            device_path: record.device_path,
            model: record.model,
            vendor: record.vendor,
            serial: record.serial,
            firmware: record.firmware,
            logical_block_size: record.logical_block_size,
            physical_block_size,
            size: record.size,
            removable: record.removable,
            ejectable: record.ejectable,
            bus_type: record.bus_type,
            bus_location: record.bus_location,
            content_type: record.content_type,
            io_stats: record.io_stats,
            backend,
            smart,
        }
    }

    pub fn smart_type(&self) -> SmartType {
        self.smart.smart_type()
    }

    /// Partitions on this disk, read from the OS on each call.
    pub fn partitions(&self) -> Vec<PartitionInfo> {
        crate::platform::partitions(self)
    }
}

/// One partition of a [`DiskInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartitionInfo {
    pub index:       u32,
    pub name:        String,
    pub device_path: String,
    pub offset:      u64,
    pub size:        u64,
    pub mount_point: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_block_size_falls_back_to_logical() {
        let record = DeviceRecord {
            name: "sda".into(),
            logical_block_size: 512,
            physical_block_size: 0,
            ..DeviceRecord::default()
        };
        let disk = DiskInfo::from_record(0, record, Backend::Mock, Smart::unsupported());
        assert_eq!(disk.physical_block_size, 512);
        assert_eq!(disk.smart_type(), SmartType::Unsupported);
    }

    #[test]
    fn reported_physical_block_size_is_kept() {
        let record = DeviceRecord {
            logical_block_size: 512,
            physical_block_size: 4096,
            ..DeviceRecord::default()
        };
        let disk = DiskInfo::from_record(3, record, Backend::Mock, Smart::unsupported());
        assert_eq!(disk.index, 3);
        assert_eq!(disk.physical_block_size, 4096);
    }
}
