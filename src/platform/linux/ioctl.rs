//! SG_IO and NVMe admin pass-through on a block device node.

use crate::codec::cdb;
use crate::codec::nvme::{HEALTH_LOG_LEN, LOG_PAGE_HEALTH};
use crate::error::{Result, SmartError};
use crate::guard::{NativeGuard, NativeHandle};
use crate::smart::{NvmeChannel, ScsiDevice};
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use std::os::unix::io::RawFd;
use std::time::Duration;
use tracing::debug;

/// An open device node.
#[derive(Debug)]
pub struct DeviceFd(RawFd);

impl NativeHandle for DeviceFd {
    fn release(self) {
        if let Err(e) = nix::unistd::close(self.0) {
            debug!(fd = self.0, error = %e, "close failed");
        }
    }
}

pub fn open_device(path: &str) -> Result<NativeGuard<DeviceFd>> {
    let flags = OFlag::O_RDONLY | OFlag::O_NONBLOCK | OFlag::O_CLOEXEC;
    let fd = open(path, flags, Mode::empty())
        .map_err(|e| SmartError::Open { path: path.to_string(), source: e.into() })?;
    Ok(NativeGuard::new(DeviceFd(fd)))
}

fn raw_fd(guard: &NativeGuard<DeviceFd>) -> Result<RawFd> {
    guard
        .get()
        .map(|fd| fd.0)
        .ok_or_else(|| SmartError::Io(std::io::Error::from_raw_os_error(libc::EBADF)))
}

fn timeout_ms(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

// ── SG_IO ────────────────────────────────────────────────────────────────────

const SG_INTERFACE_ID: i32 = b'S' as i32;
const SG_DXFER_FROM_DEV: i32 = -3;
const SENSE_LEN: usize = 32;

/// `struct sg_io_hdr` from `<scsi/sg.h>`.
#[repr(C)]
#[derive(Debug)]
pub struct SgIoHdr {
    pub interface_id:    i32,
    pub dxfer_direction: i32,
    pub cmd_len:         u8,
    pub mx_sb_len:       u8,
    pub iovec_count:     u16,
    pub dxfer_len:       u32,
    pub dxferp:          *mut libc::c_void,
    pub cmdp:            *const u8,
    pub sbp:             *mut u8,
    pub timeout:         u32,
    pub flags:           u32,
    pub pack_id:         i32,
    pub usr_ptr:         *mut libc::c_void,
    pub status:          u8,
    pub masked_status:   u8,
    pub msg_status:      u8,
    pub sb_len_wr:       u8,
    pub host_status:     u16,
    pub driver_status:   u16,
    pub resid:           i32,
    pub duration:        u32,
    pub info:            u32,
}

impl Default for SgIoHdr {
    fn default() -> Self {
        Self {
            interface_id:    SG_INTERFACE_ID,
            dxfer_direction: SG_DXFER_FROM_DEV,
            cmd_len:         0,
            mx_sb_len:       0,
            iovec_count:     0,
            dxfer_len:       0,
            dxferp:          std::ptr::null_mut(),
            cmdp:            std::ptr::null(),
            sbp:             std::ptr::null_mut(),
            timeout:         0,
            flags:           0,
            pack_id:         0,
            usr_ptr:         std::ptr::null_mut(),
            status:          0,
            masked_status:   0,
            msg_status:      0,
            sb_len_wr:       0,
            host_status:     0,
            driver_status:   0,
            resid:           0,
            duration:        0,
            info:            0,
        }
    }
}

/// Driver byte values other than DRIVER_SENSE mean the command did not run.
const DRIVER_STATUS_MASK: u16 = 0x07;

impl SgIoHdr {
    /// Outcome of a completed data-in command that asked for `expected` bytes.
    pub fn completion(&self, sense: &[u8], expected: usize) -> Result<()> {
        if self.host_status != 0
            || self.driver_status & DRIVER_STATUS_MASK != 0
            || !cdb::command_succeeded(self.status, sense)
        {
            return Err(SmartError::CommandRejected {
                op:     "SG_IO",
                status: u32::from(self.status)
                    | (u32::from(self.host_status) << 8)
                    | (u32::from(self.driver_status) << 16),
            });
        }
        if self.resid != 0 {
            let missing = usize::try_from(self.resid).unwrap_or(expected);
            return Err(SmartError::ShortBuffer { expected, got: expected.saturating_sub(missing) });
        }
        Ok(())
    }
}

nix::ioctl_readwrite_bad!(sg_io, 0x2285, SgIoHdr);

/// SCSI generic access to a disk node. Used for ATA pass-through on SATA
/// disks behind libata and on USB bridges.
pub struct SgDevice {
    fd: NativeGuard<DeviceFd>,
}

impl SgDevice {
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self { fd: open_device(path)? })
    }
}

impl ScsiDevice for SgDevice {
    fn execute_in(&mut self, cdb_bytes: &[u8], data: &mut [u8], timeout: Duration) -> Result<()> {
        let fd = raw_fd(&self.fd)?;
        let mut sense = [0u8; SENSE_LEN];

        let mut hdr = SgIoHdr {
            cmd_len:   cdb_bytes.len() as u8,
            mx_sb_len: SENSE_LEN as u8,
            dxfer_len: data.len() as u32,
            dxferp:    data.as_mut_ptr().cast(),
            cmdp:      cdb_bytes.as_ptr(),
            sbp:       sense.as_mut_ptr(),
            timeout:   timeout_ms(timeout),
            ..SgIoHdr::default()
        };

        // SAFETY: every pointer in `hdr` refers to a buffer that outlives the call,
        // and the lengths passed match those buffers.
        unsafe { sg_io(fd, &mut hdr) }
            .map_err(|e| SmartError::Ioctl { op: "SG_IO", source: e.into() })?;

        let written = (hdr.sb_len_wr as usize).min(SENSE_LEN);
        hdr.completion(&sense[..written], data.len())
    }

    fn close(&mut self) {
        self.fd.release();
    }
}

// ── NVMe admin ───────────────────────────────────────────────────────────────

const NVME_ADMIN_GET_LOG_PAGE: u8 = 0x02;
const NVME_NSID_ALL: u32 = 0xFFFF_FFFF;

/// `struct nvme_admin_cmd` from `<linux/nvme_ioctl.h>`.
#[repr(C)]
#[derive(Debug, Default)]
pub struct NvmeAdminCmd {
    pub opcode:       u8,
    pub flags:        u8,
    pub rsvd1:        u16,
    pub nsid:         u32,
    pub cdw2:         u32,
    pub cdw3:         u32,
    pub metadata:     u64,
    pub addr:         u64,
    pub metadata_len: u32,
    pub data_len:     u32,
    pub cdw10:        u32,
    pub cdw11:        u32,
    pub cdw12:        u32,
    pub cdw13:        u32,
    pub cdw14:        u32,
    pub cdw15:        u32,
    pub timeout_ms:   u32,
    pub result:       u32,
}

nix::ioctl_readwrite!(nvme_admin_cmd, b'N', 0x41, NvmeAdminCmd);

pub struct NvmeDevice {
    fd:      NativeGuard<DeviceFd>,
    timeout: Duration,
}

impl NvmeDevice {
    pub fn open(path: &str, timeout: Duration) -> Result<Self> {
        Ok(Self { fd: open_device(path)?, timeout })
    }
}

impl NvmeChannel for NvmeDevice {
    fn read_health_log(&mut self, buf: &mut [u8; HEALTH_LOG_LEN]) -> Result<()> {
        let fd = raw_fd(&self.fd)?;
        let dwords = (HEALTH_LOG_LEN / 4 - 1) as u32;

        let mut cmd = NvmeAdminCmd {
            opcode:     NVME_ADMIN_GET_LOG_PAGE,
            nsid:       NVME_NSID_ALL,
            addr:       buf.as_mut_ptr() as u64,
            data_len:   HEALTH_LOG_LEN as u32,
            cdw10:      u32::from(LOG_PAGE_HEALTH) | (dwords << 16),
            timeout_ms: timeout_ms(self.timeout),
            ..NvmeAdminCmd::default()
        };

        // SAFETY: `addr` points at `buf`, which is `data_len` bytes and lives
        // across the call.
        let status = unsafe { nvme_admin_cmd(fd, &mut cmd) }
            .map_err(|e| SmartError::Ioctl { op: "NVME_IOCTL_ADMIN_CMD", source: e.into() })?;

        if status != 0 {
            return Err(SmartError::CommandRejected { op: "Get Log Page", status: status as u32 });
        }
        Ok(())
    }

    fn close(&mut self) {
        self.fd.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_command_matches_kernel_layout() {
        assert_eq!(std::mem::size_of::<NvmeAdminCmd>(), 72);
    }

    #[test]
    fn short_transfer_is_rejected() {
        let hdr = SgIoHdr { resid: 212, ..SgIoHdr::default() };
        let err = hdr.completion(&[], 512).unwrap_err();
        assert!(matches!(err, SmartError::ShortBuffer { expected: 512, got: 300 }));

        assert!(SgIoHdr::default().completion(&[], 512).is_ok());
    }

    #[test]
    fn driver_and_host_errors_are_rejected() {
        let timed_out = SgIoHdr { driver_status: 0x06, ..SgIoHdr::default() };
        assert!(timed_out.completion(&[], 512).is_err());

        let no_connect = SgIoHdr { host_status: 0x01, ..SgIoHdr::default() };
        assert!(no_connect.completion(&[], 512).is_err());

        // DRIVER_SENSE alone accompanies a recovered CHECK CONDITION.
        let recovered = SgIoHdr { status: 0x02, driver_status: 0x08, ..SgIoHdr::default() };
        assert!(recovered.completion(&[0x70, 0, 0x01, 0, 0, 0, 0, 10], 512).is_ok());
    }

    #[test]
    fn missing_node_is_an_open_error() {
        let err = open_device("/nonexistent/diskinfo-test").unwrap_err();
        assert!(matches!(err, SmartError::Open { .. }));
    }

    #[test]
    fn closed_device_refuses_commands() {
        let mut dev = SgDevice::open("/dev/null").unwrap();
        dev.close();
        dev.close();
        let mut data = [0u8; 512];
        let err = dev.execute_in(&cdb::smart_read_data_12(), &mut data, Duration::from_secs(1));
        assert!(err.is_err());
    }
}
