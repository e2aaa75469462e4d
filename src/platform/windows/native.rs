use super::handle::{self, Access, DeviceHandle};
use super::layout;
use crate::bus::classify_windows;
use crate::codec::ata::SMART_DATA_LEN;
use crate::codec::nvme::HEALTH_LOG_LEN;
use crate::enumerate::DeviceProvider;
use crate::error::{Result, SmartError};
use crate::guard::NativeGuard;
use crate::models::disk::{Backend, DeviceRecord, DiskInfo, PartitionInfo};
use crate::smart::{AtaChannel, NvmeChannel, SatChannel, ScsiDevice};
use std::time::Duration;
use tracing::debug;

/// Highest `PhysicalDriveN` probed.
const MAX_PHYSICAL_DRIVES: u32 = 32;
const DESCRIPTOR_LEN: usize = 1024;

fn drive_path(n: u32) -> String {
    format!("\\\\.\\PhysicalDrive{}", n)
}

fn drive_number(record: &DeviceRecord) -> u8 {
    record
        .name
        .strip_prefix("PhysicalDrive")
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct WindowsProvider {
    max_drives: u32,
}

impl Default for WindowsProvider {
    fn default() -> Self {
        Self { max_drives: MAX_PHYSICAL_DRIVES }
    }
}

impl WindowsProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read_record(n: u32) -> Result<DeviceRecord> {
    let path = drive_path(n);
    let dev = handle::open(&path, Access::Query)?;

    let mut buf = vec![0u8; DESCRIPTOR_LEN];
    handle::control_bytes(&dev, "IOCTL_STORAGE_QUERY_PROPERTY", layout::IOCTL_STORAGE_QUERY_PROPERTY, &layout::device_descriptor_query(), &mut buf)?;
    let desc = layout::parse_device_descriptor(&buf);
    let bus_type = classify_windows(desc.bus_type);

    let mut geometry = [0u8; 32];
    let (bytes_per_sector, size) = handle::control_bytes(&dev, "IOCTL_DISK_GET_DRIVE_GEOMETRY_EX", layout::IOCTL_DISK_GET_DRIVE_GEOMETRY_EX, &[], &mut geometry)
        .map(|_| layout::parse_geometry(&geometry))
        .unwrap_or((0, 0));

    let mut alignment = [0u8; 28];
    let (logical, physical) = handle::control_bytes(&dev, "IOCTL_STORAGE_QUERY_PROPERTY", layout::IOCTL_STORAGE_QUERY_PROPERTY, &layout::access_alignment_query(), &mut alignment)
        .map(|_| layout::parse_access_alignment(&alignment))
        .unwrap_or((bytes_per_sector, 0));

    let mut perf = [0u8; layout::DISK_PERFORMANCE_LEN];
    let io_stats = handle::control_bytes(&dev, "IOCTL_DISK_PERFORMANCE", layout::IOCTL_DISK_PERFORMANCE, &[], &mut perf)
        .ok()
        .map(|_| layout::parse_performance(&perf));

    let mut address = [0u8; layout::SCSI_ADDRESS_LEN];
    let bus_location = handle::control_bytes(&dev, "IOCTL_SCSI_GET_ADDRESS", layout::IOCTL_SCSI_GET_ADDRESS, &[], &mut address)
        .map(|_| layout::parse_scsi_address(&address))
        .unwrap_or_default();

    let content_type = drive_layout(&dev)
        .map(|l| layout::partition_style(&l).to_string())
        .unwrap_or_default();

    let model = if desc.vendor.is_empty() {
        desc.product.clone()
    } else {
        format!("{} {}", desc.vendor, desc.product)
    };

    Ok(DeviceRecord {
        name:                format!("PhysicalDrive{}", n),
        device_path:         path,
        model,
        vendor:              desc.vendor,
        serial:              desc.serial,
        firmware:            desc.revision,
        logical_block_size:  if logical == 0 { bytes_per_sector } else { logical },
        physical_block_size: physical,
        size,
        removable:           desc.removable,
        ejectable:           desc.removable,
        bus_type,
        bus_location,
        content_type,
        io_stats,
    })
}

fn drive_layout(dev: &NativeGuard<DeviceHandle>) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; layout::DRIVE_LAYOUT_LEN];
    handle::control_bytes(dev, "IOCTL_DISK_GET_DRIVE_LAYOUT_EX", layout::IOCTL_DISK_GET_DRIVE_LAYOUT_EX, &[], &mut buf)?;
    Ok(buf)
}

impl DeviceProvider for WindowsProvider {
    fn backend(&self) -> Backend {
        Backend::Windows
    }

    fn discover(&self) -> Vec<DeviceRecord> {
        (0..self.max_drives)
            .filter_map(|n| match read_record(n) {
                Ok(r)  => Some(r),
                Err(e) => {
                    debug!(drive = n, error = %e, "skipping physical drive");
                    None
                }
            })
            .collect()
    }

    fn open_ata(&self, record: &DeviceRecord, _timeout: Duration) -> Result<Box<dyn AtaChannel>> {
        Ok(Box::new(LegacySmartChannel::open(record)?))
    }

    fn open_usb_ata(&self, record: &DeviceRecord, timeout: Duration) -> Result<Box<dyn AtaChannel>> {
        let dev = ScsiPassThroughDevice { handle: handle::open(&record.device_path, Access::ReadWrite)? };
        Ok(Box::new(SatChannel::new(dev, timeout)))
    }

    fn open_nvme(&self, record: &DeviceRecord, _timeout: Duration) -> Result<Box<dyn NvmeChannel>> {
        let handle = handle::open(&record.device_path, Access::ReadWrite)?;
        Ok(Box::new(NvmeQueryChannel { handle }))
    }
}

// ── ATA: SMART_SEND_DRIVE_COMMAND / SMART_RCV_DRIVE_DATA ─────────────────────

struct LegacySmartChannel {
    handle: NativeGuard<DeviceHandle>,
    drive:  u8,
}

impl LegacySmartChannel {
    fn open(record: &DeviceRecord) -> Result<Self> {
        let channel = Self {
            handle: handle::open(&record.device_path, Access::ReadWrite)?,
            drive:  drive_number(record),
        };

        let mut out = [0u8; layout::SEND_CMD_OUT_LEN];
        handle::control_bytes(&channel.handle, "SMART_SEND_DRIVE_COMMAND", layout::SMART_SEND_DRIVE_COMMAND, &layout::smart_enable_params(channel.drive), &mut out)?;
        Ok(channel)
    }
}

impl AtaChannel for LegacySmartChannel {
    fn read_smart_data(&mut self, buf: &mut [u8; SMART_DATA_LEN]) -> Result<()> {
        let mut out = [0u8; layout::READ_DATA_OUT_LEN];
        handle::control_bytes(&self.handle, "SMART_RCV_DRIVE_DATA", layout::SMART_RCV_DRIVE_DATA, &layout::smart_read_params(self.drive), &mut out)?;
        buf.copy_from_slice(layout::smart_read_response(&out)?);
        Ok(())
    }

    fn close(&mut self) {
        self.handle.release();
    }
}

// ── NVMe: protocol-specific property query ───────────────────────────────────

struct NvmeQueryChannel {
    handle: NativeGuard<DeviceHandle>,
}

impl NvmeChannel for NvmeQueryChannel {
    fn read_health_log(&mut self, buf: &mut [u8; HEALTH_LOG_LEN]) -> Result<()> {
        let mut io = layout::nvme_health_query();
        let ptr = io.as_mut_ptr();
        let len = io.len();
        // Same buffer in and out, as the storage stack expects.
        handle::control(&self.handle, "IOCTL_STORAGE_QUERY_PROPERTY", layout::IOCTL_STORAGE_QUERY_PROPERTY, ptr.cast_const().cast(), len, ptr.cast(), len)?;
        buf.copy_from_slice(layout::nvme_health_response(&io)?);
        Ok(())
    }

    fn close(&mut self) {
        self.handle.release();
    }
}

// ── USB: SCSI pass-through ───────────────────────────────────────────────────

struct ScsiPassThroughDevice {
    handle: NativeGuard<DeviceHandle>,
}

impl ScsiDevice for ScsiPassThroughDevice {
    fn execute_in(&mut self, cdb: &[u8], data: &mut [u8], timeout: Duration) -> Result<()> {
        let secs = u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX).max(1);
        let mut req = layout::ScsiPassThroughWithBuffers::data_in(cdb, data.len(), secs);
        let size = std::mem::size_of::<layout::ScsiPassThroughWithBuffers>();
        let ptr: *mut layout::ScsiPassThroughWithBuffers = &mut req;

        handle::control(&self.handle, "IOCTL_SCSI_PASS_THROUGH", layout::IOCTL_SCSI_PASS_THROUGH, ptr.cast_const().cast(), size, ptr.cast(), size)?;

        if !req.succeeded() {
            return Err(SmartError::CommandRejected { op: "IOCTL_SCSI_PASS_THROUGH", status: u32::from(req.spt.scsi_status) });
        }
        let n = data.len().min(req.data.len());
        data[..n].copy_from_slice(&req.data[..n]);
        Ok(())
    }

    fn close(&mut self) {
        self.handle.release();
    }
}

// ── Partitions ───────────────────────────────────────────────────────────────

pub fn partitions(disk: &DiskInfo) -> Vec<PartitionInfo> {
    let buf = match handle::open(&disk.device_path, Access::Query).and_then(|dev| drive_layout(&dev)) {
        Ok(b)  => b,
        Err(e) => {
            debug!(device = %disk.name, error = %e, "drive layout unavailable");
            return Vec::new();
        }
    };

    let disk_number = disk.name.strip_prefix("PhysicalDrive").unwrap_or("0");
    layout::parse_drive_layout(&buf)
        .into_iter()
        .map(|e| PartitionInfo {
            index:       e.number,
            name:        format!("Disk{}Partition{}", disk_number, e.number),
            device_path: format!("\\\\?\\GLOBALROOT\\Device\\Harddisk{}\\Partition{}", disk_number, e.number),
            offset:      e.offset,
            size:        e.length,
            mount_point: None,
        })
        .collect()
}
