//! ATA SMART over SCSI pass-through (SAT).
//!
//! Not every bridge or HBA accepts both CDB sizes, so the first read probes
//! ATA PASS-THROUGH(12) and falls back to (16). The winning size is kept for
//! the life of the session; a failure after that is reported, not re-probed.

use super::generic::AtaChannel;
use crate::codec::ata::SMART_DATA_LEN;
use crate::codec::cdb;
use crate::error::Result;
use std::time::Duration;
use tracing::debug;

/// Something that can run a data-in SCSI command.
pub trait ScsiDevice: Send {
    fn execute_in(&mut self, cdb: &[u8], data: &mut [u8], timeout: Duration) -> Result<()>;

    /// Release the native resources. Must tolerate repeated calls.
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtaPassthroughMode {
    Probing,
    Pt12,
    Pt16,
}

pub struct SatChannel<D: ScsiDevice> {
    device:  D,
    mode:    AtaPassthroughMode,
    timeout: Duration,
}

impl<D: ScsiDevice> SatChannel<D> {
    pub fn new(device: D, timeout: Duration) -> Self {
        Self { device, mode: AtaPassthroughMode::Probing, timeout }
    }

    pub fn mode(&self) -> AtaPassthroughMode {
        self.mode
    }

    pub fn use16(&self) -> bool {
        self.mode == AtaPassthroughMode::Pt16
    }

    fn run12(&mut self, buf: &mut [u8; SMART_DATA_LEN]) -> Result<()> {
        self.device.execute_in(&cdb::smart_read_data_12(), buf, self.timeout)
    }

    fn run16(&mut self, buf: &mut [u8; SMART_DATA_LEN]) -> Result<()> {
        self.device.execute_in(&cdb::smart_read_data_16(), buf, self.timeout)
    }
}

impl<D: ScsiDevice> AtaChannel for SatChannel<D> {
    fn read_smart_data(&mut self, buf: &mut [u8; SMART_DATA_LEN]) -> Result<()> {
        match self.mode {
            AtaPassthroughMode::Pt12 => self.run12(buf),
            AtaPassthroughMode::Pt16 => self.run16(buf),
            AtaPassthroughMode::Probing => {
                if let Err(e) = self.run12(buf) {
                    debug!(error = %e, "ATA PASS-THROUGH(12) refused, trying (16)");
                    self.run16(buf)?;
                    self.mode = AtaPassthroughMode::Pt16;
                } else {
                    self.mode = AtaPassthroughMode::Pt12;
                }
                Ok(())
            }
        }
    }

    fn close(&mut self) {
        self.device.close();
    }
}
