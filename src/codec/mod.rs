//! Pure decoders for device responses. No I/O happens here.

pub mod ata;
pub mod cdb;
pub mod fixed;
pub mod nvme;

pub use nvme::{kelvin_to_celsius, TEMPERATURE_UNKNOWN};
