//! NVMe SMART / Health Information log page (log identifier 0x02).

use crate::models::smart::NvmeHealthLog;

pub const HEALTH_LOG_LEN: usize = 512;
pub const LOG_PAGE_HEALTH: u8 = 0x02;

/// Celsius value reported for a sensor that returned 0 K.
pub const TEMPERATURE_UNKNOWN: i32 = i32::MIN;

const CRITICAL_WARNING: usize = 0;
const COMPOSITE_TEMPERATURE: usize = 1;
const AVAILABLE_SPARE: usize = 3;
const SPARE_THRESHOLD: usize = 4;
const PERCENTAGE_USED: usize = 5;
const COUNTERS: usize = 32;
const COUNTER_LEN: usize = 16;
const WARNING_TEMP_TIME: usize = 192;
const CRITICAL_TEMP_TIME: usize = 196;
const TEMPERATURE_SENSORS: usize = 200;

pub fn kelvin_to_celsius(kelvin: u16) -> i32 {
    if kelvin > 0 {
        i32::from(kelvin) - 273
    } else {
        TEMPERATURE_UNKNOWN
    }
}

fn byte(buf: &[u8], at: usize) -> u8 {
    buf.get(at).copied().unwrap_or(0)
}

fn le_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([byte(buf, at), byte(buf, at + 1)])
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([byte(buf, at), byte(buf, at + 1), byte(buf, at + 2), byte(buf, at + 3)])
}

/// Low 64 bits of the little-endian 128-bit counter at `at`.
fn counter(buf: &[u8], at: usize) -> u64 {
    let mut low = [0u8; 8];
    for (i, b) in low.iter_mut().enumerate() {
        *b = byte(buf, at + i);
    }
    u64::from_le_bytes(low)
}

/// Decode a health log page. Short buffers read as zero past their end.
pub fn decode_health_log(buf: &[u8]) -> NvmeHealthLog {
    let c = |n: usize| counter(buf, COUNTERS + n * COUNTER_LEN);

    let mut temperature_sensors = [0i32; 8];
    for (i, t) in temperature_sensors.iter_mut().enumerate() {
        *t = kelvin_to_celsius(le_u16(buf, TEMPERATURE_SENSORS + i * 2));
    }

    NvmeHealthLog {
        critical_warning:          byte(buf, CRITICAL_WARNING),
        temperature:               kelvin_to_celsius(le_u16(buf, COMPOSITE_TEMPERATURE)),
        available_spare:           byte(buf, AVAILABLE_SPARE),
        available_spare_threshold: byte(buf, SPARE_THRESHOLD),
        percentage_used:           byte(buf, PERCENTAGE_USED),
        data_units_read:           c(0),
        data_units_written:        c(1),
        host_read_commands:        c(2),
        host_write_commands:       c(3),
        controller_busy_time:      c(4),
        power_cycles:              c(5),
        power_on_hours:            c(6),
        unsafe_shutdowns:          c(7),
        media_errors:              c(8),
        error_log_entries:         c(9),
        warning_temp_time:         le_u32(buf, WARNING_TEMP_TIME),
        critical_temp_time:        le_u32(buf, CRITICAL_TEMP_TIME),
        temperature_sensors,
    }
}
