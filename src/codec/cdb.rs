//! SCSI/ATA Translation (SAT) pass-through CDBs for SMART READ DATA.

pub const ATA_PASS_THROUGH_12: u8 = 0xA1;
pub const ATA_PASS_THROUGH_16: u8 = 0x85;

pub const ATA_SMART: u8 = 0xB0;
pub const SMART_READ_DATA: u8 = 0xD0;
pub const SMART_ENABLE_OPERATIONS: u8 = 0xD8;
pub const SMART_LBA_MID: u8 = 0x4F;
pub const SMART_LBA_HIGH: u8 = 0xC2;

/// PIO data-in, shifted into bits 1..=4 of byte 1.
const PROTOCOL_PIO_IN: u8 = 4 << 1;
/// t_dir = from device, byte_block = 1, t_length = sector count field.
const TRANSFER_FLAGS: u8 = 0x0E;

pub fn smart_read_data_12() -> [u8; 12] {
    [
        ATA_PASS_THROUGH_12,
        PROTOCOL_PIO_IN,
        TRANSFER_FLAGS,
        SMART_READ_DATA, // features
        1,               // sector count
        0,               // lba low
        SMART_LBA_MID,
        SMART_LBA_HIGH,
        0,               // device
        ATA_SMART,
        0,
        0,
    ]
}

pub fn smart_read_data_16() -> [u8; 16] {
    [
        ATA_PASS_THROUGH_16,
        PROTOCOL_PIO_IN,
        TRANSFER_FLAGS,
        0,
        SMART_READ_DATA,
        0,
        1,
        0,
        0,
        0,
        SMART_LBA_MID,
        0,
        SMART_LBA_HIGH,
        0,
        ATA_SMART,
        0,
    ]
}

pub const STATUS_GOOD: u8 = 0x00;
pub const STATUS_CHECK_CONDITION: u8 = 0x02;

const SENSE_NO_SENSE: u8 = 0x00;
const SENSE_RECOVERED_ERROR: u8 = 0x01;

/// Sense key of a fixed (0x70/0x71) or descriptor (0x72/0x73) format sense buffer.
pub fn sense_key(sense: &[u8]) -> Option<u8> {
    match sense.first().map(|b| b & 0x7F)? {
        0x70 | 0x71 => sense.get(2).map(|b| b & 0x0F),
        0x72 | 0x73 => sense.get(1).map(|b| b & 0x0F),
        _           => None,
    }
}

/// Whether a completed command actually transferred its data. Some bridges
/// answer a good pass-through with CHECK CONDITION and a recovered-error sense.
pub fn command_succeeded(status: u8, sense: &[u8]) -> bool {
    match status {
        STATUS_GOOD            => true,
        STATUS_CHECK_CONDITION => matches!(sense_key(sense), Some(SENSE_NO_SENSE | SENSE_RECOVERED_ERROR)),
        _                      => false,
    }
}
