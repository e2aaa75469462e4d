//! ATA SMART READ DATA response layout.
//!
//! ```text
//! 0..2     revision
//! 2..362   30 attribute slots, 12 bytes each
//!            +0 id, +1..3 flags (LE), +3 current, +4 worst, +5..11 raw, +11 reserved
//! 362..    offline collection status, self-test data, checksum
//! ```

use crate::models::smart::{SmartAttribute, SmartId};

pub const SMART_DATA_LEN: usize = 512;
pub const ATTRIBUTE_TABLE_OFFSET: usize = 2;
pub const ATTRIBUTE_LEN: usize = 12;
pub const ATTRIBUTE_SLOTS: usize = 30;

const RAW_OFFSET: usize = 5;
const RAW_LEN: usize = 6;

/// The bytes of slot `index`, or `None` when the buffer is too short to hold it.
fn slot(buf: &[u8], index: usize) -> Option<&[u8]> {
    let start = ATTRIBUTE_TABLE_OFFSET + index * ATTRIBUTE_LEN;
    buf.get(start..start + ATTRIBUTE_LEN)
}

fn is_present(id: u8) -> bool {
    id != 0x00 && id != 0xFF
}

/// Ids of every populated slot, in table order.
pub fn supported_ids(buf: &[u8]) -> Vec<SmartId> {
    (0..ATTRIBUTE_SLOTS)
        .map_while(|i| slot(buf, i))
        .filter(|s| is_present(s[0]))
        .map(|s| SmartId(s[0]))
        .collect()
}

/// Decode the first slot carrying `id`.
pub fn attribute(buf: &[u8], id: SmartId) -> Option<SmartAttribute> {
    if !is_present(id.0) {
        return None;
    }
    (0..ATTRIBUTE_SLOTS)
        .map_while(|i| slot(buf, i))
        .find(|s| s[0] == id.0)
        .map(decode_slot)
}

/// Every populated slot, decoded.
pub fn attributes(buf: &[u8]) -> Vec<SmartAttribute> {
    (0..ATTRIBUTE_SLOTS)
        .map_while(|i| slot(buf, i))
        .filter(|s| is_present(s[0]))
        .map(decode_slot)
        .collect()
}

fn decode_slot(s: &[u8]) -> SmartAttribute {
    SmartAttribute {
        id:        SmartId(s[0]),
        flags:     u16::from_le_bytes([s[1], s[2]]),
        current:   s[3],
        worst:     s[4],
        raw_value: raw_value(&s[RAW_OFFSET..RAW_OFFSET + RAW_LEN]),
    }
}

/// Accumulate the raw field from its last byte down to its first.
pub fn raw_value(raw: &[u8]) -> u64 {
    raw.iter()
        .take(RAW_LEN)
        .rev()
        .fold(0u64, |v, b| (v << 8) | u64::from(*b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(buf: &mut [u8], index: usize, id: u8, flags: u16, cur: u8, worst: u8, raw: [u8; 6]) {
        let o = ATTRIBUTE_TABLE_OFFSET + index * ATTRIBUTE_LEN;
        buf[o] = id;
        buf[o + 1..o + 3].copy_from_slice(&flags.to_le_bytes());
        buf[o + 3] = cur;
        buf[o + 4] = worst;
        buf[o + 5..o + 11].copy_from_slice(&raw);
    }

    #[test]
    fn supported_ids_skips_empty_and_ff_slots() {
        let mut buf = [0u8; SMART_DATA_LEN];
        put(&mut buf, 0, 1, 0x000F, 100, 100, [0; 6]);
        put(&mut buf, 1, 0xFF, 0, 0, 0, [0; 6]);
        put(&mut buf, 3, 194, 0x0022, 36, 50, [36, 0, 0, 0, 0, 0]);
        put(&mut buf, 29, 9, 0x0032, 99, 99, [0x10, 0x27, 0, 0, 0, 0]);

        assert_eq!(supported_ids(&buf), vec![SmartId(1), SmartId(194), SmartId(9)]);
    }

    #[test]
    fn raw_value_uses_last_byte_as_most_significant() {
        let mut buf = [0u8; SMART_DATA_LEN];
        put(&mut buf, 2, 9, 0x0032, 97, 97, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);

        let attr = attribute(&buf, SmartId::POWER_ON_HOURS).expect("slot 2");
        assert_eq!(attr.raw_value, 0x0605_0403_0201);
        assert_eq!(attr.flags, 0x0032);
        assert_eq!(attr.current, 97);
        assert_eq!(attr.worst, 97);
        assert!(!attr.is_prefail());
    }

    #[test]
    fn missing_and_reserved_ids_are_absent() {
        let buf = [0u8; SMART_DATA_LEN];
        assert!(attribute(&buf, SmartId(5)).is_none());
        assert!(attribute(&buf, SmartId(0)).is_none());
        assert!(attribute(&buf, SmartId(0xFF)).is_none());
    }

    #[test]
    fn truncated_buffers_decode_what_fits() {
        let mut buf = [0u8; SMART_DATA_LEN];
        put(&mut buf, 0, 5, 0x0033, 100, 100, [8, 0, 0, 0, 0, 0]);
        put(&mut buf, 1, 9, 0x0032, 100, 100, [1, 0, 0, 0, 0, 0]);

        let short = &buf[..ATTRIBUTE_TABLE_OFFSET + ATTRIBUTE_LEN + 4];
        assert_eq!(supported_ids(short), vec![SmartId(5)]);
        assert!(attribute(short, SmartId(9)).is_none());
        assert!(supported_ids(&[]).is_empty());
    }
}
