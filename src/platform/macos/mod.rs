//! macOS backend: I/O Registry for identity, the ATA and NVMe SMART user
//! client plugins for health data.

pub mod ffi;
pub mod plugin;
pub mod registry;

use crate::bus::{classify_macos, BusType};
use crate::codec::ata::SMART_DATA_LEN;
use crate::codec::nvme::HEALTH_LOG_LEN;
use crate::enumerate::DeviceProvider;
use crate::error::{Result, SmartError};
use crate::guard::NativeGuard;
use crate::models::disk::{Backend, DeviceRecord, DiskInfo, DiskIoStats, PartitionInfo};
use crate::smart::{AtaChannel, NvmeChannel};
use ffi::{io_registry_entry_t, IOATASMARTInterface, IONVMeSMARTInterface, KERN_SUCCESS};
use plugin::{open_interface, raw, Interface, IoObject, PlugIn};
use registry::Dict;
use std::time::Duration;
use tracing::debug;

const NS_PER_MS: u64 = 1_000_000;

#[derive(Debug, Clone, Default)]
pub struct IoKitProvider;

impl IoKitProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Whole-disk `IOMedia` objects that are not carved out of another medium
/// (APFS volumes, disk images mounted from a partition).
fn physical_media() -> Vec<NativeGuard<IoObject>> {
    registry::matching_services("IOMedia")
        .into_iter()
        .filter(|m| registry::bool_property(raw(m), "Whole").unwrap_or(false))
        .filter(|m| registry::ancestor(raw(m), "IOMedia").is_none())
        .collect()
}

fn read_record(media: io_registry_entry_t) -> Option<DeviceRecord> {
    let name = registry::string_property(media, "BSD Name")?;

    let device_chars = registry::search_parents(media, "Device Characteristics");
    let protocol_chars = registry::search_parents(media, "Protocol Characteristics");
    let statistics = registry::search_parents(media, "Statistics");
    let device = Dict::of(&device_chars);
    let protocol = Dict::of(&protocol_chars);

    let interconnect = protocol.as_ref().and_then(|p| p.string("Physical Interconnect")).unwrap_or_default();
    let dev_str = |key: &str| device.as_ref().and_then(|d| d.string(key)).unwrap_or_default();
    let dev_u64 = |key: &str| device.as_ref().and_then(|d| d.u64(key));

    let logical_block_size = dev_u64("Logical Block Size")
        .or_else(|| registry::u64_property(media, "Preferred Block Size"))
        .unwrap_or(0) as u32;

    Some(DeviceRecord {
        device_path:         format!("/dev/{}", name),
        name,
        model:               dev_str("Product Name"),
        vendor:              dev_str("Vendor Name"),
        serial:              dev_str("Serial Number"),
        firmware:            dev_str("Product Revision Level"),
        logical_block_size,
        physical_block_size: dev_u64("Physical Block Size").unwrap_or(0) as u32,
        size:                registry::u64_property(media, "Size").unwrap_or(0),
        removable:           registry::bool_property(media, "Removable").unwrap_or(false),
        ejectable:           registry::bool_property(media, "Ejectable").unwrap_or(false),
        bus_type:            classify_macos(&interconnect),
        bus_location:        protocol.as_ref().and_then(|p| p.string("Physical Interconnect Location")).unwrap_or_default(),
        content_type:        registry::string_property(media, "Content").unwrap_or_default(),
        io_stats:            Dict::of(&statistics).map(|s| io_stats(&s)),
    })
}

fn io_stats(stats: &Dict<'_>) -> DiskIoStats {
    let get = |key: &str| stats.u64(key).unwrap_or(0);
    DiskIoStats {
        reads:         get("Operations (Read)"),
        read_bytes:    get("Bytes (Read)"),
        read_time_ms:  get("Total Time (Read)") / NS_PER_MS,
        writes:        get("Operations (Write)"),
        write_bytes:   get("Bytes (Write)"),
        write_time_ms: get("Total Time (Write)") / NS_PER_MS,
        io_time_ms:    0,
    }
}

/// The block storage device nub above a disk's `IOMedia`, which is where the
/// SMART user clients attach.
fn storage_device(record: &DeviceRecord) -> Result<NativeGuard<IoObject>> {
    let media = registry::media_for_bsd_name(&record.name)
        .ok_or(SmartError::InterfaceUnavailable("IOMedia"))?;
    registry::ancestor(raw(&media), "IOBlockStorageDevice")
        .ok_or(SmartError::InterfaceUnavailable("IOBlockStorageDevice"))
}

impl DeviceProvider for IoKitProvider {
    fn backend(&self) -> Backend {
        Backend::IoKit
    }

    fn discover(&self) -> Vec<DeviceRecord> {
        physical_media()
            .iter()
            .filter_map(|m| {
                let record = read_record(raw(m));
                if record.is_none() {
                    debug!("IOMedia without a BSD name, skipping");
                }
                record
            })
            .collect()
    }

    fn open_ata(&self, record: &DeviceRecord, _timeout: Duration) -> Result<Box<dyn AtaChannel>> {
        let device = storage_device(record)?;
        if !registry::bool_property(raw(&device), "SMART Capable").unwrap_or(false) {
            return Err(SmartError::InterfaceUnavailable("IOATASMARTInterface"));
        }
        Ok(Box::new(AtaSmartChannel::open(raw(&device))?))
    }

    fn open_usb_ata(&self, _record: &DeviceRecord, _timeout: Duration) -> Result<Box<dyn AtaChannel>> {
        Err(SmartError::Unsupported(BusType::Usb))
    }

    fn open_nvme(&self, record: &DeviceRecord, _timeout: Duration) -> Result<Box<dyn NvmeChannel>> {
        let device = storage_device(record)?;
        if !registry::bool_property(raw(&device), "NVMe SMART Capable").unwrap_or(false) {
            return Err(SmartError::InterfaceUnavailable("IONVMeSMARTInterface"));
        }
        Ok(Box::new(NvmeSmartChannel::open(raw(&device))?))
    }
}

// ── SMART channels ───────────────────────────────────────────────────────────

/// Field order matters: the inner interface is released before the plugin.
pub struct AtaSmartChannel {
    smart:  NativeGuard<Interface<IOATASMARTInterface>>,
    plugin: NativeGuard<PlugIn>,
}

impl AtaSmartChannel {
    fn open(device: ffi::io_service_t) -> Result<Self> {
        let (smart, plugin) = open_interface::<IOATASMARTInterface>(
            device,
            &ffi::ATA_SMART_USER_CLIENT_TYPE_ID,
            &ffi::ATA_SMART_INTERFACE_ID,
            "IOATASMARTInterface",
        )?;

        let channel = Self { smart, plugin };
        channel.enable_operations()?;
        Ok(channel)
    }

    fn enable_operations(&self) -> Result<()> {
        let iface = self.smart.get().ok_or(SmartError::InterfaceUnavailable("IOATASMARTInterface"))?;
        // SAFETY: `smart` holds a live reference for the duration of the call.
        let kr = unsafe { (iface.vtable().smart_enable_disable_operations)(iface.this(), 1) };
        if kr != KERN_SUCCESS {
            return Err(SmartError::IoKit { op: "SMARTEnableDisableOperations", code: kr });
        }
        Ok(())
    }
}

impl AtaChannel for AtaSmartChannel {
    fn read_smart_data(&mut self, buf: &mut [u8; SMART_DATA_LEN]) -> Result<()> {
        let iface = self.smart.get().ok_or(SmartError::InterfaceUnavailable("IOATASMARTInterface"))?;
        // SAFETY: ATASMARTData is exactly SMART_DATA_LEN bytes.
        let kr = unsafe { (iface.vtable().smart_read_data)(iface.this(), buf.as_mut_ptr()) };
        if kr != KERN_SUCCESS {
            return Err(SmartError::IoKit { op: "SMARTReadData", code: kr });
        }
        Ok(())
    }

    fn close(&mut self) {
        self.smart.release();
        self.plugin.release();
    }
}

pub struct NvmeSmartChannel {
    smart:  NativeGuard<Interface<IONVMeSMARTInterface>>,
    plugin: NativeGuard<PlugIn>,
}

impl NvmeSmartChannel {
    fn open(device: ffi::io_service_t) -> Result<Self> {
        let (smart, plugin) = open_interface::<IONVMeSMARTInterface>(
            device,
            &ffi::NVME_SMART_USER_CLIENT_TYPE_ID,
            &ffi::NVME_SMART_INTERFACE_ID,
            "IONVMeSMARTInterface",
        )?;
        Ok(Self { smart, plugin })
    }
}

impl NvmeChannel for NvmeSmartChannel {
    fn read_health_log(&mut self, buf: &mut [u8; HEALTH_LOG_LEN]) -> Result<()> {
        let iface = self.smart.get().ok_or(SmartError::InterfaceUnavailable("IONVMeSMARTInterface"))?;
        // SAFETY: NVMeSMARTData is the 512-byte health log page.
        let kr = unsafe { (iface.vtable().smart_read_data)(iface.this(), buf.as_mut_ptr()) };
        if kr != KERN_SUCCESS {
            return Err(SmartError::IoKit { op: "SMARTReadData", code: kr });
        }
        Ok(())
    }

    fn close(&mut self) {
        self.smart.release();
        self.plugin.release();
    }
}

// ── Partitions ───────────────────────────────────────────────────────────────

pub fn partitions(disk: &DiskInfo) -> Vec<PartitionInfo> {
    let prefix = format!("{}s", disk.name);
    let mounts = mount_points();

    let mut parts: Vec<PartitionInfo> = registry::matching_services("IOMedia")
        .iter()
        .map(|m| raw(m))
        .filter(|&m| !registry::bool_property(m, "Whole").unwrap_or(true))
        .filter_map(|m| {
            let name = registry::string_property(m, "BSD Name")?;
            let index: u32 = name.strip_prefix(&prefix)?.parse().ok()?;
            let device_path = format!("/dev/{}", name);
            Some(PartitionInfo {
                index: registry::u64_property(m, "Partition ID").map(|i| i as u32).unwrap_or(index),
                mount_point: mounts.iter().find(|(src, _)| *src == device_path).map(|(_, dst)| dst.clone()),
                offset: registry::u64_property(m, "Base").unwrap_or(0),
                size: registry::u64_property(m, "Size").unwrap_or(0),
                name,
                device_path,
            })
        })
        .collect();
    parts.sort_by_key(|p| p.index);
    parts
}

/// (device, mount point) pairs from the kernel mount table.
fn mount_points() -> Vec<(String, String)> {
    let mut buf: *mut libc::statfs = std::ptr::null_mut();
    // SAFETY: getmntinfo points `buf` at a static array of `n` entries.
    let n = unsafe { libc::getmntinfo(&mut buf, libc::MNT_NOWAIT) };
    if n <= 0 || buf.is_null() {
        return Vec::new();
    }
    // SAFETY: see above.
    let entries = unsafe { std::slice::from_raw_parts(buf, n as usize) };
    entries
        .iter()
        .map(|e| (c_chars(&e.f_mntfromname), c_chars(&e.f_mntonname)))
        .collect()
}

fn c_chars(raw: &[libc::c_char]) -> String {
    let bytes: Vec<u8> = raw.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
