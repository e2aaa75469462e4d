//! Byte layouts of the storage IOCTL buffers the Windows backend exchanges.
//!
//! Requests are built and responses parsed here as plain bytes, so none of
//! this needs the Win32 headers and all of it is testable off Windows.

use crate::codec::ata::SMART_DATA_LEN;
use crate::codec::cdb;
use crate::codec::nvme::{HEALTH_LOG_LEN, LOG_PAGE_HEALTH};
use crate::error::{Result, SmartError};
use crate::models::disk::DiskIoStats;

// ── Control codes ────────────────────────────────────────────────────────────

pub const SMART_SEND_DRIVE_COMMAND: u32         = 0x0007_C084;
pub const SMART_RCV_DRIVE_DATA: u32             = 0x0007_C088;
pub const IOCTL_STORAGE_QUERY_PROPERTY: u32     = 0x002D_1400;
pub const IOCTL_DISK_GET_DRIVE_GEOMETRY_EX: u32 = 0x0007_00A0;
pub const IOCTL_DISK_GET_DRIVE_LAYOUT_EX: u32   = 0x0007_0050;
pub const IOCTL_DISK_PERFORMANCE: u32           = 0x0007_0020;
pub const IOCTL_SCSI_PASS_THROUGH: u32          = 0x0004_D004;
pub const IOCTL_SCSI_GET_ADDRESS: u32           = 0x0004_1018;

// ── STORAGE_PROPERTY_QUERY ───────────────────────────────────────────────────

const STORAGE_DEVICE_PROPERTY: u32 = 0;
const STORAGE_ACCESS_ALIGNMENT_PROPERTY: u32 = 6;
const STORAGE_DEVICE_PROTOCOL_SPECIFIC_PROPERTY: u32 = 50;
const PROPERTY_STANDARD_QUERY: u32 = 0;

/// `FIELD_OFFSET(STORAGE_PROPERTY_QUERY, AdditionalParameters)`
const PROPERTY_QUERY_HEADER_LEN: usize = 8;
/// `sizeof(STORAGE_PROPERTY_QUERY)` including its one-byte tail and padding.
const PROPERTY_QUERY_LEN: usize = 12;
/// `sizeof(STORAGE_PROTOCOL_SPECIFIC_DATA)`
const PROTOCOL_SPECIFIC_DATA_LEN: usize = 40;

const PROTOCOL_TYPE_NVME: u32 = 3;
const NVME_DATA_TYPE_LOG_PAGE: u32 = 2;

fn property_query(property_id: u32) -> [u8; PROPERTY_QUERY_LEN] {
    let mut q = [0u8; PROPERTY_QUERY_LEN];
    put_u32(&mut q, 0, property_id);
    put_u32(&mut q, 4, PROPERTY_STANDARD_QUERY);
    q
}

pub fn device_descriptor_query() -> [u8; PROPERTY_QUERY_LEN] {
    property_query(STORAGE_DEVICE_PROPERTY)
}

pub fn access_alignment_query() -> [u8; PROPERTY_QUERY_LEN] {
    property_query(STORAGE_ACCESS_ALIGNMENT_PROPERTY)
}

/// Total size of the NVMe log page query; the same buffer receives the answer.
pub const NVME_QUERY_LEN: usize = PROPERTY_QUERY_HEADER_LEN + PROTOCOL_SPECIFIC_DATA_LEN + HEALTH_LOG_LEN;

/// Protocol-specific property query for the SMART / Health Information log page.
pub fn nvme_health_query() -> Vec<u8> {
    let mut q = vec![0u8; NVME_QUERY_LEN];
    put_u32(&mut q, 0, STORAGE_DEVICE_PROTOCOL_SPECIFIC_PROPERTY);
    put_u32(&mut q, 4, PROPERTY_STANDARD_QUERY);

    let p = PROPERTY_QUERY_HEADER_LEN;
    put_u32(&mut q, p,      PROTOCOL_TYPE_NVME);
    put_u32(&mut q, p + 4,  NVME_DATA_TYPE_LOG_PAGE);
    put_u32(&mut q, p + 8,  u32::from(LOG_PAGE_HEALTH));
    put_u32(&mut q, p + 12, 0);
    put_u32(&mut q, p + 16, PROTOCOL_SPECIFIC_DATA_LEN as u32);
    put_u32(&mut q, p + 20, HEALTH_LOG_LEN as u32);
    q
}

/// The log page inside a `STORAGE_PROTOCOL_DATA_DESCRIPTOR` response.
pub fn nvme_health_response(buf: &[u8]) -> Result<&[u8]> {
    // Version, Size, then STORAGE_PROTOCOL_SPECIFIC_DATA.
    let specific = 8;
    let offset = le_u32(buf, specific + 16) as usize;
    let length = le_u32(buf, specific + 20) as usize;
    let start = specific + offset;

    if offset == 0 || length < HEALTH_LOG_LEN || start + HEALTH_LOG_LEN > buf.len() {
        return Err(SmartError::ShortBuffer { expected: HEALTH_LOG_LEN, got: length });
    }
    Ok(&buf[start..start + HEALTH_LOG_LEN])
}

// ── Descriptors ──────────────────────────────────────────────────────────────

/// Parsed `STORAGE_DEVICE_DESCRIPTOR`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub removable: bool,
    pub bus_type:  u32,
    pub vendor:    String,
    pub product:   String,
    pub revision:  String,
    pub serial:    String,
}

pub fn parse_device_descriptor(buf: &[u8]) -> DeviceDescriptor {
    DeviceDescriptor {
        removable: buf.get(10).map(|&b| b != 0).unwrap_or(false),
        vendor:    c_string_at(buf, le_u32(buf, 12) as usize),
        product:   c_string_at(buf, le_u32(buf, 16) as usize),
        revision:  c_string_at(buf, le_u32(buf, 20) as usize),
        serial:    c_string_at(buf, le_u32(buf, 24) as usize),
        bus_type:  le_u32(buf, 28),
    }
}

/// `(BytesPerLogicalSector, BytesPerPhysicalSector)` of a
/// `STORAGE_ACCESS_ALIGNMENT_DESCRIPTOR`.
pub fn parse_access_alignment(buf: &[u8]) -> (u32, u32) {
    (le_u32(buf, 16), le_u32(buf, 20))
}

/// `(BytesPerSector, DiskSize)` of a `DISK_GEOMETRY_EX`.
pub fn parse_geometry(buf: &[u8]) -> (u32, u64) {
    (le_u32(buf, 20), le_u64(buf, 24))
}

pub const DISK_PERFORMANCE_LEN: usize = 88;

/// `DISK_PERFORMANCE`; times are in 100 ns units.
pub fn parse_performance(buf: &[u8]) -> DiskIoStats {
    DiskIoStats {
        read_bytes:    le_u64(buf, 0),
        write_bytes:   le_u64(buf, 8),
        read_time_ms:  le_u64(buf, 16) / 10_000,
        write_time_ms: le_u64(buf, 24) / 10_000,
        reads:         u64::from(le_u32(buf, 40)),
        writes:        u64::from(le_u32(buf, 44)),
        io_time_ms:    0,
    }
}

pub const SCSI_ADDRESS_LEN: usize = 8;

pub fn parse_scsi_address(buf: &[u8]) -> String {
    if buf.len() < SCSI_ADDRESS_LEN {
        return String::new();
    }
    format!("Port {} Path {} Target {} Lun {}", buf[4], buf[5], buf[6], buf[7])
}

// ── Drive layout ─────────────────────────────────────────────────────────────

const LAYOUT_HEADER_LEN: usize = 48;
const PARTITION_ENTRY_LEN: usize = 144;
pub const DRIVE_LAYOUT_LEN: usize = LAYOUT_HEADER_LEN + 128 * PARTITION_ENTRY_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    pub number: u32,
    pub offset: u64,
    pub length: u64,
}

pub fn partition_style(buf: &[u8]) -> &'static str {
    if buf.len() < 4 {
        return "";
    }
    match le_u32(buf, 0) {
        0 => "MBR",
        1 => "GPT",
        2 => "RAW",
        _ => "",
    }
}

/// Numbered entries of a `DRIVE_LAYOUT_INFORMATION_EX`. Unused MBR slots
/// carry partition number 0 and are skipped.
pub fn parse_drive_layout(buf: &[u8]) -> Vec<LayoutEntry> {
    let count = le_u32(buf, 4) as usize;
    (0..count)
        .map(|i| LAYOUT_HEADER_LEN + i * PARTITION_ENTRY_LEN)
        .take_while(|&at| at + PARTITION_ENTRY_LEN <= buf.len())
        .map(|at| LayoutEntry {
            offset: le_u64(buf, at + 8),
            length: le_u64(buf, at + 16),
            number: le_u32(buf, at + 24),
        })
        .filter(|e| e.number != 0)
        .collect()
}

// ── Legacy SMART IOCTLs ──────────────────────────────────────────────────────

/// `sizeof(SENDCMDINPARAMS) - 1`
pub const SEND_CMD_IN_LEN: usize = 32;
/// `sizeof(SENDCMDOUTPARAMS) - 1`
pub const SEND_CMD_OUT_LEN: usize = 16;
pub const READ_DATA_OUT_LEN: usize = SEND_CMD_OUT_LEN + SMART_DATA_LEN;

/// Packed `SENDCMDINPARAMS` for a SMART sub-command.
fn smart_in_params(features: u8, buffer_size: u32, drive: u8) -> [u8; SEND_CMD_IN_LEN] {
    let mut p = [0u8; SEND_CMD_IN_LEN];
    put_u32(&mut p, 0, buffer_size);
    // IDEREGS
    p[4] = features;
    p[5] = 1; // sector count
    p[6] = 1; // sector number
    p[7] = cdb::SMART_LBA_MID;
    p[8] = cdb::SMART_LBA_HIGH;
    p[9] = 0xA0 | ((drive & 1) << 4);
    p[10] = cdb::ATA_SMART;
    p[12] = drive;
    p
}

pub fn smart_enable_params(drive: u8) -> [u8; SEND_CMD_IN_LEN] {
    smart_in_params(cdb::SMART_ENABLE_OPERATIONS, 0, drive)
}

pub fn smart_read_params(drive: u8) -> [u8; SEND_CMD_IN_LEN] {
    smart_in_params(cdb::SMART_READ_DATA, SMART_DATA_LEN as u32, drive)
}

/// Data of a `SENDCMDOUTPARAMS`, rejected when the driver reports an error.
pub fn smart_read_response(buf: &[u8]) -> Result<&[u8]> {
    let driver_error = buf.get(4).copied().unwrap_or(0);
    if driver_error != 0 {
        return Err(SmartError::CommandRejected { op: "SMART_RCV_DRIVE_DATA", status: u32::from(driver_error) });
    }
    buf.get(SEND_CMD_OUT_LEN..SEND_CMD_OUT_LEN + SMART_DATA_LEN)
        .ok_or(SmartError::ShortBuffer { expected: READ_DATA_OUT_LEN, got: buf.len() })
}

// ── SCSI pass-through ────────────────────────────────────────────────────────

pub const SCSI_IOCTL_DATA_IN: u8 = 1;
pub const SENSE_LEN: usize = 32;

/// `SCSI_PASS_THROUGH`. `DataBufferOffset` is pointer sized, so the layout
/// follows the target's word size like the C definition does.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ScsiPassThrough {
    pub length:               u16,
    pub scsi_status:          u8,
    pub path_id:              u8,
    pub target_id:            u8,
    pub lun:                  u8,
    pub cdb_length:           u8,
    pub sense_info_length:    u8,
    pub data_in:              u8,
    pub data_transfer_length: u32,
    pub timeout_value:        u32,
    pub data_buffer_offset:   usize,
    pub sense_info_offset:    u32,
    pub cdb:                  [u8; 16],
}

/// Request header followed by its sense and data buffers in one allocation.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ScsiPassThroughWithBuffers {
    pub spt:   ScsiPassThrough,
    pub sense: [u8; SENSE_LEN],
    pub data:  [u8; SMART_DATA_LEN],
}

impl ScsiPassThroughWithBuffers {
    pub fn data_in(cdb_bytes: &[u8], transfer_len: usize, timeout_secs: u32) -> Self {
        let mut cdb_field = [0u8; 16];
        let n = cdb_bytes.len().min(16);
        cdb_field[..n].copy_from_slice(&cdb_bytes[..n]);

        Self {
            spt: ScsiPassThrough {
                length:               std::mem::size_of::<ScsiPassThrough>() as u16,
                cdb_length:           n as u8,
                sense_info_length:    SENSE_LEN as u8,
                data_in:              SCSI_IOCTL_DATA_IN,
                data_transfer_length: transfer_len.min(SMART_DATA_LEN) as u32,
                timeout_value:        timeout_secs,
                data_buffer_offset:   std::mem::offset_of!(Self, data),
                sense_info_offset:    std::mem::offset_of!(Self, sense) as u32,
                cdb:                  cdb_field,
                ..ScsiPassThrough::default()
            },
            sense: [0; SENSE_LEN],
            data:  [0; SMART_DATA_LEN],
        }
    }

    pub fn succeeded(&self) -> bool {
        let sense_len = (self.spt.sense_info_length as usize).min(SENSE_LEN);
        cdb::command_succeeded(self.spt.scsi_status, &self.sense[..sense_len])
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn put_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    buf.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .unwrap_or(0)
}

fn le_u64(buf: &[u8], at: usize) -> u64 {
    buf.get(at..at + 8)
        .map(|b| u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .unwrap_or(0)
}

/// NUL-terminated ASCII at `offset`; offset 0 means the field is absent.
fn c_string_at(buf: &[u8], offset: usize) -> String {
    if offset == 0 || offset >= buf.len() {
        return String::new();
    }
    let tail = &buf[offset..];
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    String::from_utf8_lossy(&tail[..end]).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> Vec<u8> {
        let mut buf = vec![0u8; 128];
        put_u32(&mut buf, 0, 1);
        put_u32(&mut buf, 4, 128);
        buf[10] = 1;
        put_u32(&mut buf, 12, 0);  // no vendor
        put_u32(&mut buf, 16, 64);
        put_u32(&mut buf, 20, 80);
        put_u32(&mut buf, 24, 96);
        put_u32(&mut buf, 28, 0x11);
        buf[64..64 + 14].copy_from_slice(b"Samsung SSD 98");
        buf[80..84].copy_from_slice(b"3B2Q");
        buf[96..96 + 12].copy_from_slice(b"  S6B0NL0W1 ");
        buf
    }

    #[test]
    fn device_descriptor_strings_and_bus() {
        let d = parse_device_descriptor(&descriptor());
        assert!(d.removable);
        assert_eq!(d.bus_type, 0x11);
        assert_eq!(d.vendor, "");
        assert_eq!(d.product, "Samsung SSD 98");
        assert_eq!(d.revision, "3B2Q");
        assert_eq!(d.serial, "S6B0NL0W1");
    }

    #[test]
    fn nvme_query_layout() {
        let q = nvme_health_query();
        assert_eq!(q.len(), 560);
        assert_eq!(le_u32(&q, 0), 50);
        assert_eq!(le_u32(&q, 8), PROTOCOL_TYPE_NVME);
        assert_eq!(le_u32(&q, 12), NVME_DATA_TYPE_LOG_PAGE);
        assert_eq!(le_u32(&q, 16), 0x02);
        assert_eq!(le_u32(&q, 24), 40);
        assert_eq!(le_u32(&q, 28), 512);
    }

    #[test]
    fn nvme_response_points_past_protocol_data() {
        let mut resp = vec![0u8; NVME_QUERY_LEN];
        put_u32(&mut resp, 8 + 16, 40);
        put_u32(&mut resp, 8 + 20, 512);
        resp[48] = 0x04;
        let page = nvme_health_response(&resp).unwrap();
        assert_eq!(page.len(), 512);
        assert_eq!(page[0], 0x04);

        assert!(nvme_health_response(&resp[..100]).is_err());
        assert!(nvme_health_response(&[0u8; 8]).is_err());
    }

    #[test]
    fn smart_read_registers() {
        let p = smart_read_params(1);
        assert_eq!(le_u32(&p, 0), 512);
        assert_eq!(&p[4..11], &[0xD0, 1, 1, 0x4F, 0xC2, 0xB0, 0xB0]);
        assert_eq!(p[12], 1);

        let e = smart_enable_params(0);
        assert_eq!(e[4], 0xD8);
        assert_eq!(e[9], 0xA0);
        assert_eq!(le_u32(&e, 0), 0);
    }

    #[test]
    fn smart_response_checks_driver_error() {
        let mut out = vec![0u8; READ_DATA_OUT_LEN];
        out[SEND_CMD_OUT_LEN] = 0x10;
        assert_eq!(smart_read_response(&out).unwrap()[0], 0x10);

        out[4] = 1;
        assert!(smart_read_response(&out).is_err());
        assert!(smart_read_response(&[0u8; 20]).is_err());
    }

    #[test]
    fn drive_layout_skips_unused_slots() {
        let mut buf = vec![0u8; LAYOUT_HEADER_LEN + 3 * PARTITION_ENTRY_LEN];
        put_u32(&mut buf, 0, 0);
        put_u32(&mut buf, 4, 3);
        for (i, (num, off)) in [(1u32, 1_048_576u64), (0, 0), (2, 500_000_000)].iter().enumerate() {
            let at = LAYOUT_HEADER_LEN + i * PARTITION_ENTRY_LEN;
            buf[at + 8..at + 16].copy_from_slice(&off.to_le_bytes());
            buf[at + 16..at + 24].copy_from_slice(&4096u64.to_le_bytes());
            put_u32(&mut buf, at + 24, *num);
        }
        assert_eq!(partition_style(&buf), "MBR");
        let entries = parse_drive_layout(&buf);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], LayoutEntry { number: 2, offset: 500_000_000, length: 4096 });
    }

    #[test]
    fn performance_times_are_milliseconds() {
        let mut buf = vec![0u8; DISK_PERFORMANCE_LEN];
        buf[0..8].copy_from_slice(&4096u64.to_le_bytes());
        buf[16..24].copy_from_slice(&25_000_000u64.to_le_bytes());
        put_u32(&mut buf, 40, 7);
        let stats = parse_performance(&buf);
        assert_eq!(stats.read_bytes, 4096);
        assert_eq!(stats.read_time_ms, 2500);
        assert_eq!(stats.reads, 7);
    }

    #[test]
    fn pass_through_offsets() {
        let req = ScsiPassThroughWithBuffers::data_in(&cdb::smart_read_data_12(), 512, 5);
        assert_eq!(req.spt.cdb_length, 12);
        assert_eq!(req.spt.cdb[0], 0xA1);
        assert_eq!(req.spt.data_buffer_offset, std::mem::size_of::<ScsiPassThrough>() + SENSE_LEN);
        assert_eq!(req.spt.sense_info_offset as usize, std::mem::size_of::<ScsiPassThrough>());
        #[cfg(target_pointer_width = "64")]
        assert_eq!(std::mem::size_of::<ScsiPassThrough>(), 56);
        assert!(req.succeeded());
    }
}
