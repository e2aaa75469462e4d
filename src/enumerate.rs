//! Platform-independent enumeration: discovery, bus classification, session
//! selection and the first `update()`.

use crate::bus::SessionKind;
use crate::error::Result;
use crate::models::disk::{Backend, DeviceRecord, DiskInfo};
use crate::smart::{AtaChannel, GenericSmart, NvmeChannel, NvmeSmart, Smart, SmartSession};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct EnumerateOptions {
    /// Device name patterns to skip. A trailing `*` matches by prefix.
    pub exclude:         Vec<String>,
    /// When false every disk gets the no-op session.
    pub smart:           bool,
    /// Handed to the OS as the per-command timeout.
    pub command_timeout: Duration,
}

impl Default for EnumerateOptions {
    fn default() -> Self {
        Self {
            exclude:         default_exclude(),
            smart:           true,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

pub fn default_exclude() -> Vec<String> {
    vec!["loop*".into(), "sr*".into(), "ram*".into(), "zram*".into(), "fd*".into()]
}

impl EnumerateOptions {
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|pat| {
            if let Some(p) = pat.strip_suffix('*') { name.starts_with(p) }
            else { pat == name }
        })
    }
}

/// The native side of enumeration: what devices exist and how to reach them.
pub trait DeviceProvider {
    fn backend(&self) -> Backend;

    /// Physical (whole-disk) devices in discovery order. Devices whose
    /// properties cannot be read are left out; that never fails the pass.
    fn discover(&self) -> Vec<DeviceRecord>;

    fn open_ata(&self, record: &DeviceRecord, timeout: Duration) -> Result<Box<dyn AtaChannel>>;

    fn open_usb_ata(&self, record: &DeviceRecord, timeout: Duration) -> Result<Box<dyn AtaChannel>>;

    fn open_nvme(&self, record: &DeviceRecord, timeout: Duration) -> Result<Box<dyn NvmeChannel>>;
}

pub fn enumerate_with<P: DeviceProvider + ?Sized>(provider: &P, options: &EnumerateOptions) -> Vec<DiskInfo> {
    let backend = provider.backend();
    let disks: Vec<DiskInfo> = provider
        .discover()
        .into_iter()
        .filter(|r| {
            let skip = options.is_excluded(&r.name);
            if skip {
                debug!(device = %r.name, "excluded by pattern");
            }
            !skip
        })
        .enumerate()
        .map(|(index, record)| {
            let smart = if options.smart {
                open_session(provider, &record, options.command_timeout)
            } else {
                Smart::unsupported()
            };
            DiskInfo::from_record(index, record, backend, smart)
        })
        .collect();

    info!(count = disks.len(), ?backend, "enumerated physical disks");
    disks
}

fn open_session<P: DeviceProvider + ?Sized>(provider: &P, record: &DeviceRecord, timeout: Duration) -> Smart {
    let kind = record.bus_type.session_kind();
    debug!(device = %record.name, bus = ?record.bus_type, ?kind, "selecting SMART session");

    match kind {
        SessionKind::None => Smart::unsupported(),

        SessionKind::Nvme => match provider.open_nvme(record, timeout) {
            Ok(channel) => {
                let mut session = NvmeSmart::new(channel);
                if !session.update() {
                    warn!(device = %record.name, "initial NVMe health log read failed");
                }
                Smart::Nvme(session)
            }
            Err(e) => degraded(record, e),
        },

        SessionKind::Ata => match provider.open_ata(record, timeout) {
            Ok(channel) => {
                let mut session = GenericSmart::new(channel);
                if !session.update() {
                    warn!(device = %record.name, "initial SMART READ DATA failed");
                }
                Smart::Generic(session)
            }
            Err(e) => degraded(record, e),
        },

        SessionKind::UsbAta => match provider.open_usb_ata(record, timeout) {
            Ok(channel) => {
                let mut session = GenericSmart::new(channel);
                if session.update() {
                    Smart::Generic(session)
                } else {
                    debug!(device = %record.name, "USB bridge does not pass SMART through");
                    session.close();
                    Smart::unsupported()
                }
            }
            Err(e) => degraded(record, e),
        },
    }
}

fn degraded(record: &DeviceRecord, e: crate::error::SmartError) -> Smart {
    warn!(device = %record.name, error = %e, "SMART session unavailable");
    Smart::unsupported()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_patterns() {
        let opts = EnumerateOptions::default();
        assert!(opts.is_excluded("loop0"));
        assert!(opts.is_excluded("zram1"));
        assert!(!opts.is_excluded("sda"));
        assert!(!opts.is_excluded("nvme0n1"));

        let exact = EnumerateOptions { exclude: vec!["sdb".into()], ..EnumerateOptions::default() };
        assert!(exact.is_excluded("sdb"));
        assert!(!exact.is_excluded("sdb1"));
    }
}
