use super::{Lifecycle, SessionState, SmartSession};
use crate::codec::nvme::{decode_health_log, HEALTH_LOG_LEN};
use crate::error::Result;
use crate::models::smart::NvmeHealthLog;
use tracing::debug;

/// Backend transport able to fetch the SMART / Health Information log page.
pub trait NvmeChannel: Send {
    fn read_health_log(&mut self, buf: &mut [u8; HEALTH_LOG_LEN]) -> Result<()>;

    /// Release the native resources. Must tolerate repeated calls.
    fn close(&mut self);
}

/// NVMe session; the decoded log is replaced as a whole on each successful update.
pub struct NvmeSmart {
    channel:   Box<dyn NvmeChannel>,
    log:       NvmeHealthLog,
    lifecycle: Lifecycle,
}

impl NvmeSmart {
    pub fn new(channel: Box<dyn NvmeChannel>) -> Self {
        Self { channel, log: NvmeHealthLog::default(), lifecycle: Lifecycle::opened() }
    }

    pub fn health(&self) -> &NvmeHealthLog {
        self.lifecycle.assert_open("health");
        &self.log
    }

    pub fn critical_warning(&self) -> u8          { self.health().critical_warning }
    pub fn temperature(&self) -> i32              { self.health().temperature }
    pub fn available_spare(&self) -> u8           { self.health().available_spare }
    pub fn available_spare_threshold(&self) -> u8 { self.health().available_spare_threshold }
    pub fn percentage_used(&self) -> u8           { self.health().percentage_used }
    pub fn data_units_read(&self) -> u64          { self.health().data_units_read }
    pub fn data_units_written(&self) -> u64       { self.health().data_units_written }
    pub fn host_read_commands(&self) -> u64       { self.health().host_read_commands }
    pub fn host_write_commands(&self) -> u64      { self.health().host_write_commands }
    pub fn controller_busy_time(&self) -> u64     { self.health().controller_busy_time }
    pub fn power_cycles(&self) -> u64             { self.health().power_cycles }
    pub fn power_on_hours(&self) -> u64           { self.health().power_on_hours }
    pub fn unsafe_shutdowns(&self) -> u64         { self.health().unsafe_shutdowns }
    pub fn media_errors(&self) -> u64             { self.health().media_errors }
    pub fn error_log_entries(&self) -> u64        { self.health().error_log_entries }
    pub fn warning_temp_time(&self) -> u32        { self.health().warning_temp_time }
    pub fn critical_temp_time(&self) -> u32       { self.health().critical_temp_time }
    pub fn temperature_sensors(&self) -> [i32; 8] { self.health().temperature_sensors }
    pub fn bytes_read(&self) -> u64               { self.health().bytes_read() }
    pub fn bytes_written(&self) -> u64            { self.health().bytes_written() }
}

impl SmartSession for NvmeSmart {
    fn update(&mut self) -> bool {
        self.lifecycle.assert_open("update");

        let mut page = [0u8; HEALTH_LOG_LEN];
        match self.channel.read_health_log(&mut page) {
            Ok(()) => {
                self.log = decode_health_log(&page);
                self.lifecycle.record(true)
            }
            Err(e) => {
                debug!(error = %e, "NVMe health log read failed");
                self.lifecycle.record(false)
            }
        }
    }

    fn last_update(&self) -> bool {
        self.lifecycle.last_update()
    }

    fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    fn close(&mut self) {
        if self.lifecycle.close() {
            self.channel.close();
        }
    }
}

impl Drop for NvmeSmart {
    fn drop(&mut self) {
        self.close();
    }
}
