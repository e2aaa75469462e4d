use serde::Serialize;
use std::fmt;

/// ATA SMART attribute identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SmartId(pub u8);

impl SmartId {
    pub const READ_ERROR_RATE:           SmartId = SmartId(1);
    pub const THROUGHPUT_PERFORMANCE:    SmartId = SmartId(2);
    pub const SPIN_UP_TIME:              SmartId = SmartId(3);
    pub const START_STOP_COUNT:          SmartId = SmartId(4);
    pub const REALLOCATED_SECTOR_COUNT:  SmartId = SmartId(5);
    pub const SEEK_ERROR_RATE:           SmartId = SmartId(7);
    pub const POWER_ON_HOURS:            SmartId = SmartId(9);
    pub const SPIN_RETRY_COUNT:          SmartId = SmartId(10);
    pub const POWER_CYCLE_COUNT:         SmartId = SmartId(12);
    pub const WEAR_LEVELING_COUNT:       SmartId = SmartId(177);
    pub const PROGRAM_FAIL_COUNT:        SmartId = SmartId(181);
    pub const ERASE_FAIL_COUNT:          SmartId = SmartId(182);
    pub const REPORTED_UNCORRECTABLE:    SmartId = SmartId(187);
    pub const COMMAND_TIMEOUT:           SmartId = SmartId(188);
    pub const AIRFLOW_TEMPERATURE:       SmartId = SmartId(190);
    pub const POWER_OFF_RETRACT_COUNT:   SmartId = SmartId(192);
    pub const LOAD_CYCLE_COUNT:          SmartId = SmartId(193);
    pub const TEMPERATURE:               SmartId = SmartId(194);
    pub const REALLOCATION_EVENT_COUNT:  SmartId = SmartId(196);
    pub const CURRENT_PENDING_SECTOR:    SmartId = SmartId(197);
    pub const OFFLINE_UNCORRECTABLE:     SmartId = SmartId(198);
    pub const UDMA_CRC_ERROR_COUNT:      SmartId = SmartId(199);
    pub const MEDIA_WEAROUT_INDICATOR:   SmartId = SmartId(233);
    pub const TOTAL_LBAS_WRITTEN:        SmartId = SmartId(241);
    pub const TOTAL_LBAS_READ:           SmartId = SmartId(242);

    /// Conventional name of the attribute; vendors are free to reuse ids.
    pub fn name(&self) -> Option<&'static str> {
        let name = match self.0 {
            1   => "Raw_Read_Error_Rate",
            2   => "Throughput_Performance",
            3   => "Spin_Up_Time",
            4   => "Start_Stop_Count",
            5   => "Reallocated_Sector_Ct",
            7   => "Seek_Error_Rate",
            8   => "Seek_Time_Performance",
            9   => "Power_On_Hours",
            10  => "Spin_Retry_Count",
            11  => "Calibration_Retry_Count",
            12  => "Power_Cycle_Count",
            170 => "Available_Reservd_Space",
            171 => "Program_Fail_Count",
            172 => "Erase_Fail_Count",
            173 => "Wear_Leveling_Count",
            174 => "Unexpect_Power_Loss_Ct",
            177 => "Wear_Leveling_Count",
            179 => "Used_Rsvd_Blk_Cnt_Tot",
            181 => "Program_Fail_Cnt_Total",
            182 => "Erase_Fail_Count_Total",
            183 => "Runtime_Bad_Block",
            184 => "End-to-End_Error",
            187 => "Reported_Uncorrect",
            188 => "Command_Timeout",
            189 => "High_Fly_Writes",
            190 => "Airflow_Temperature_Cel",
            191 => "G-Sense_Error_Rate",
            192 => "Power-Off_Retract_Count",
            193 => "Load_Cycle_Count",
            194 => "Temperature_Celsius",
            195 => "Hardware_ECC_Recovered",
            196 => "Reallocated_Event_Count",
            197 => "Current_Pending_Sector",
            198 => "Offline_Uncorrectable",
            199 => "UDMA_CRC_Error_Count",
            200 => "Multi_Zone_Error_Rate",
            231 => "SSD_Life_Left",
            232 => "Available_Reservd_Space",
            233 => "Media_Wearout_Indicator",
            235 => "POR_Recovery_Count",
            240 => "Head_Flying_Hours",
            241 => "Total_LBAs_Written",
            242 => "Total_LBAs_Read",
            _   => return None,
        };
        Some(name)
    }
}

impl fmt::Display for SmartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the ATA SMART attribute table, decoded fresh on every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SmartAttribute {
    pub id:        SmartId,
    pub flags:     u16,
    pub current:   u8,
    pub worst:     u8,
    /// 48-bit raw counter.
    pub raw_value: u64,
}

impl SmartAttribute {
    /// Bit 0 of the flags word: failure of this attribute predicts drive failure.
    pub fn is_prefail(&self) -> bool {
        self.flags & 0x0001 != 0
    }

    pub fn name(&self) -> &'static str {
        self.id.name().unwrap_or("Unknown_Attribute")
    }
}

/// Decoded NVMe SMART / Health Information log page.
///
/// Temperatures are Celsius; [`crate::codec::nvme::TEMPERATURE_UNKNOWN`] marks
/// a sensor that reported zero Kelvin. The 128-bit counters keep only their
/// low 64 bits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NvmeHealthLog {
    pub critical_warning:          u8,
    pub temperature:               i32,
    pub available_spare:           u8,
    pub available_spare_threshold: u8,
    pub percentage_used:           u8,
    pub data_units_read:           u64,   // units of 1000 * 512 bytes
    pub data_units_written:        u64,
    pub host_read_commands:        u64,
    pub host_write_commands:       u64,
    pub controller_busy_time:      u64,   // minutes
    pub power_cycles:              u64,
    pub power_on_hours:            u64,
    pub unsafe_shutdowns:          u64,
    pub media_errors:              u64,
    pub error_log_entries:         u64,
    pub warning_temp_time:         u32,   // minutes
    pub critical_temp_time:        u32,
    pub temperature_sensors:       [i32; 8],
}

impl NvmeHealthLog {
    /// Approximate bytes read (1 unit = 512 000 bytes).
    pub fn bytes_read(&self) -> u64    { self.data_units_read.saturating_mul(512_000) }
    pub fn bytes_written(&self) -> u64 { self.data_units_written.saturating_mul(512_000) }
}
