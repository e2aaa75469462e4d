//! Summary verdicts derived from the last successful SMART read.

use crate::models::smart::{SmartAttribute, SmartId};
use crate::smart::{GenericSmart, NvmeSmart, SessionState, Smart, SmartSession};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// No session, or no successful read yet.
    Unknown,
    Passed,
    Warning,
}

impl HealthStatus {
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "UNKNOWN",
            HealthStatus::Passed  => "PASSED",
            HealthStatus::Warning => "WARNING",
        }
    }
}

/// ATA attributes whose raw count should stay at zero on a healthy disk.
const ATA_ZERO_COUNTERS: [SmartId; 3] = [
    SmartId::REALLOCATED_SECTOR_COUNT,
    SmartId::CURRENT_PENDING_SECTOR,
    SmartId::OFFLINE_UNCORRECTABLE,
];

fn readable(smart: &Smart) -> bool {
    smart.state() != SessionState::Closed && smart.last_update()
}

pub fn assess(smart: &Smart) -> HealthStatus {
    if !readable(smart) {
        return HealthStatus::Unknown;
    }
    let warn = match smart {
        Smart::Generic(s)     => ata_warning(&s.attributes()),
        Smart::Nvme(s)        => nvme_warning(s),
        Smart::Unsupported(_) => return HealthStatus::Unknown,
    };
    if warn { HealthStatus::Warning } else { HealthStatus::Passed }
}

fn ata_warning(attrs: &[SmartAttribute]) -> bool {
    attrs
        .iter()
        .any(|a| ATA_ZERO_COUNTERS.contains(&a.id) && a.raw_value > 0)
}

fn nvme_warning(s: &NvmeSmart) -> bool {
    s.critical_warning() != 0
        || s.media_errors() > 0
        || s.available_spare() < s.available_spare_threshold()
}

/// A 0-100 score: 100 is pristine, deductions for bad counters, heat and wear.
/// `None` when there is nothing to score.
pub fn score(smart: &Smart) -> Option<u8> {
    if !readable(smart) {
        return None;
    }
    let mut score: i32 = 100;

    match smart {
        Smart::Generic(s) => {
            for attr in s.attributes() {
                match attr.id {
                    SmartId::REALLOCATED_SECTOR_COUNT => {
                        if attr.raw_value > 100 { score -= 30; }
                        else if attr.raw_value > 0 { score -= 15; }
                    }
                    SmartId::CURRENT_PENDING_SECTOR => {
                        if attr.raw_value > 0 { score -= 25; }
                    }
                    SmartId::OFFLINE_UNCORRECTABLE => {
                        if attr.raw_value > 0 { score -= 40; }
                    }
                    _ => {}
                }
            }
            if let Some(t) = ata_temperature(s) {
                if t >= 60      { score -= 20; }
                else if t >= 50 { score -= 10; }
            }
        }
        Smart::Nvme(s) => {
            match s.percentage_used() {
                90..=u8::MAX => { score -= 30; }
                70..=89      => { score -= 15; }
                50..=69      => { score -=  5; }
                _            => {}
            }
            if s.critical_warning() != 0 { score -= 40; }
            if s.media_errors() > 0 { score -= 25; }
            if s.available_spare() < s.available_spare_threshold() { score -= 20; }
            if let Some(t) = valid_temperature(s.temperature()) {
                if t >= 70      { score -= 20; }
                else if t >= 55 { score -= 10; }
            }
        }
        Smart::Unsupported(_) => return None,
    }

    Some(score.clamp(0, 100) as u8)
}

/// Current drive temperature in °C, if the session reports one.
pub fn temperature(smart: &Smart) -> Option<i32> {
    if !readable(smart) {
        return None;
    }
    match smart {
        Smart::Generic(s)     => ata_temperature(s),
        Smart::Nvme(s)        => valid_temperature(s.temperature()),
        Smart::Unsupported(_) => None,
    }
}

/// Attribute 194 (or 190) keeps the current value in its lowest raw byte.
fn ata_temperature(s: &GenericSmart) -> Option<i32> {
    use crate::smart::SmartGeneric;
    s.attribute(SmartId::TEMPERATURE)
        .or_else(|| s.attribute(SmartId::AIRFLOW_TEMPERATURE))
        .map(|a| (a.raw_value & 0xFF) as i32)
        .filter(|&t| t > 0)
}

fn valid_temperature(t: i32) -> Option<i32> {
    if t == crate::codec::TEMPERATURE_UNKNOWN { None } else { Some(t) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ata::{ATTRIBUTE_LEN, ATTRIBUTE_TABLE_OFFSET, SMART_DATA_LEN};
    use crate::codec::nvme::HEALTH_LOG_LEN;
    use crate::error::Result;
    use crate::smart::{AtaChannel, NvmeChannel};

    struct FixedAta([u8; SMART_DATA_LEN]);

    impl AtaChannel for FixedAta {
        fn read_smart_data(&mut self, buf: &mut [u8; SMART_DATA_LEN]) -> Result<()> {
            buf.copy_from_slice(&self.0);
            Ok(())
        }
        fn close(&mut self) {}
    }

    struct FixedNvme([u8; HEALTH_LOG_LEN]);

    impl NvmeChannel for FixedNvme {
        fn read_health_log(&mut self, buf: &mut [u8; HEALTH_LOG_LEN]) -> Result<()> {
            buf.copy_from_slice(&self.0);
            Ok(())
        }
        fn close(&mut self) {}
    }

    /// A read ATA session whose table holds `(id, raw)` pairs.
    fn ata(slots: &[(u8, u64)]) -> Smart {
        let mut buf = [0u8; SMART_DATA_LEN];
        for (i, (id, raw)) in slots.iter().enumerate() {
            let at = ATTRIBUTE_TABLE_OFFSET + i * ATTRIBUTE_LEN;
            buf[at] = *id;
            buf[at + 3] = 100;
            buf[at + 5..at + 11].copy_from_slice(&raw.to_le_bytes()[..6]);
        }
        let mut smart = Smart::Generic(GenericSmart::new(Box::new(FixedAta(buf))));
        assert!(smart.update());
        smart
    }

    struct Page {
        kelvin:       u16,
        warning:      u8,
        spare:        u8,
        used:         u8,
        media_errors: u64,
    }

    impl Default for Page {
        fn default() -> Self {
            Self { kelvin: 310, warning: 0, spare: 100, used: 0, media_errors: 0 }
        }
    }

    fn nvme(p: Page) -> Smart {
        let mut buf = [0u8; HEALTH_LOG_LEN];
        buf[0] = p.warning;
        buf[1..3].copy_from_slice(&p.kelvin.to_le_bytes());
        buf[3] = p.spare;
        buf[4] = 10;
        buf[5] = p.used;
        buf[160..168].copy_from_slice(&p.media_errors.to_le_bytes());
        let mut smart = Smart::Nvme(NvmeSmart::new(Box::new(FixedNvme(buf))));
        assert!(smart.update());
        smart
    }

    fn attr(id: SmartId, raw_value: u64) -> SmartAttribute {
        SmartAttribute { id, flags: 0, current: 100, worst: 100, raw_value }
    }

    #[test]
    fn zero_counters_pass() {
        assert!(!ata_warning(&[
            attr(SmartId::REALLOCATED_SECTOR_COUNT, 0),
            attr(SmartId::POWER_ON_HOURS, 40_000),
        ]));
    }

    #[test]
    fn pending_sectors_warn() {
        assert!(ata_warning(&[attr(SmartId::CURRENT_PENDING_SECTOR, 8)]));
    }

    #[test]
    fn unsupported_is_unknown() {
        let smart = Smart::unsupported();
        assert_eq!(assess(&smart), HealthStatus::Unknown);
        assert_eq!(score(&smart), None);
        assert_eq!(temperature(&smart), None);
    }

    #[test]
    fn ata_temperature_reads_the_low_raw_byte() {
        // 194 packs min/max in the upper bytes.
        let smart = ata(&[(194, 0x0000_2D00_1234)]);
        assert_eq!(temperature(&smart), Some(0x34));

        let airflow_only = ata(&[(9, 1000), (190, 45)]);
        assert_eq!(temperature(&airflow_only), Some(45));

        let both = ata(&[(190, 30), (194, 41)]);
        assert_eq!(temperature(&both), Some(41));

        assert_eq!(temperature(&ata(&[(194, 0)])), None);
        assert_eq!(temperature(&ata(&[(9, 1000)])), None);
    }

    #[test]
    fn ata_score_deductions() {
        assert_eq!(score(&ata(&[(9, 40_000), (194, 35)])), Some(100));
        // Few reallocations, warm.
        assert_eq!(score(&ata(&[(5, 3), (194, 52)])), Some(75));
        // Many reallocations, offline uncorrectable, hot.
        assert_eq!(score(&ata(&[(5, 150), (198, 1), (194, 61)])), Some(10));
        // Everything wrong at once bottoms out at zero.
        assert_eq!(score(&ata(&[(5, 200), (197, 1), (198, 1), (194, 65)])), Some(0));
        assert_eq!(assess(&ata(&[(197, 1)])), HealthStatus::Warning);
    }

    #[test]
    fn nvme_temperature_and_score() {
        let warm = nvme(Page { kelvin: 333, used: 75, ..Page::default() });
        assert_eq!(temperature(&warm), Some(60));
        assert_eq!(score(&warm), Some(75));
        assert_eq!(assess(&warm), HealthStatus::Passed);

        let light = nvme(Page { used: 55, ..Page::default() });
        assert_eq!(score(&light), Some(95));

        let failing = nvme(Page { kelvin: 345, warning: 1, spare: 5, used: 95, media_errors: 2 });
        assert_eq!(temperature(&failing), Some(72));
        assert_eq!(score(&failing), Some(0));
        assert_eq!(assess(&failing), HealthStatus::Warning);
    }

    #[test]
    fn nvme_without_a_sensor_reading() {
        let smart = nvme(Page { kelvin: 0, ..Page::default() });
        assert_eq!(temperature(&smart), None);
        assert_eq!(score(&smart), Some(100));
    }

    #[test]
    fn closed_session_has_no_score() {
        let mut smart = nvme(Page::default());
        assert_eq!(score(&smart), Some(100));
        smart.close();
        assert_eq!(score(&smart), None);
        assert_eq!(temperature(&smart), None);
        assert_eq!(assess(&smart), HealthStatus::Unknown);
    }
}
