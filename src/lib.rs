//! Physical disk discovery and S.M.A.R.T. / NVMe health telemetry.
//!
//! ```no_run
//! use diskinfo::{SmartSession, SmartType};
//!
//! for mut disk in diskinfo::enumerate_disks() {
//!     println!("{} {} {:?}", disk.index, disk.model, disk.smart_type());
//!     if disk.smart_type() != SmartType::Unsupported {
//!         disk.smart.update();
//!     }
//! }
//! ```

pub mod bus;
pub mod codec;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod guard;
pub mod health;
pub mod models;
pub mod platform;
pub mod smart;
pub mod util;

pub use bus::{BusType, SmartType};
pub use enumerate::{enumerate_with, DeviceProvider, EnumerateOptions};
pub use error::{Result, SmartError};
pub use health::HealthStatus;
pub use models::disk::{Backend, DeviceRecord, DiskInfo, DiskIoStats, PartitionInfo};
pub use models::smart::{NvmeHealthLog, SmartAttribute, SmartId};
pub use smart::{SessionState, Smart, SmartGeneric, SmartSession};

/// Every physical disk on this host, with a SMART session opened and read once.
pub fn enumerate_disks() -> Vec<DiskInfo> {
    enumerate_disks_with(&EnumerateOptions::default())
}

pub fn enumerate_disks_with(options: &EnumerateOptions) -> Vec<DiskInfo> {
    platform::enumerate(options)
}
