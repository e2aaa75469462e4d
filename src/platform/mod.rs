//! Native backends. Exactly one is compiled in per target OS.

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(any(windows, test))]
pub mod windows;

use crate::enumerate::EnumerateOptions;
use crate::models::disk::{DiskInfo, PartitionInfo};

/// Enumerate physical disks through the native backend of this OS.
pub fn enumerate(options: &EnumerateOptions) -> Vec<DiskInfo> {
    #[cfg(target_os = "linux")]
    {
        crate::enumerate::enumerate_with(&linux::LinuxProvider::new(), options)
    }
    #[cfg(target_os = "macos")]
    {
        crate::enumerate::enumerate_with(&macos::IoKitProvider::new(), options)
    }
    #[cfg(windows)]
    {
        crate::enumerate::enumerate_with(&windows::WindowsProvider::new(), options)
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
    {
        let _ = options;
        tracing::warn!("no disk backend for this operating system");
        Vec::new()
    }
}

pub fn partitions(disk: &DiskInfo) -> Vec<PartitionInfo> {
    use crate::models::disk::Backend;

    match disk.backend {
        #[cfg(target_os = "linux")]
        Backend::Linux => linux::LinuxProvider::new().partitions(disk),
        #[cfg(target_os = "macos")]
        Backend::IoKit => macos::partitions(disk),
        #[cfg(windows)]
        Backend::Windows => windows::partitions(disk),
        _ => Vec::new(),
    }
}
