//! Windows backend: storage property queries for identity, the legacy SMART
//! IOCTLs, protocol-specific queries for NVMe and SCSI pass-through for USB.

pub mod layout;

#[cfg(windows)]
mod handle;
#[cfg(windows)]
mod native;

#[cfg(windows)]
pub use native::{partitions, WindowsProvider};
