mod common;

use common::ScriptedScsi;
use diskinfo::codec::ata::SMART_DATA_LEN;
use diskinfo::codec::cdb::{ATA_PASS_THROUGH_12, ATA_PASS_THROUGH_16};
use diskinfo::smart::{AtaChannel, AtaPassthroughMode, GenericSmart, SatChannel};
use diskinfo::{SmartGeneric, SmartId, SmartSession};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn pt12_success_is_kept() {
    let dev = ScriptedScsi::accepting(&[ATA_PASS_THROUGH_12, ATA_PASS_THROUGH_16]);
    let seen = dev.seen.clone();
    let mut chan = SatChannel::new(dev, TIMEOUT);
    let mut buf = [0u8; SMART_DATA_LEN];

    assert_eq!(chan.mode(), AtaPassthroughMode::Probing);
    chan.read_smart_data(&mut buf).unwrap();
    assert_eq!(chan.mode(), AtaPassthroughMode::Pt12);
    assert!(!chan.use16());

    chan.read_smart_data(&mut buf).unwrap();
    assert!(!chan.use16());
    assert_eq!(*seen.lock().unwrap(), vec![ATA_PASS_THROUGH_12, ATA_PASS_THROUGH_12]);
}

#[test]
fn pt12_refusal_falls_back_to_pt16_once() {
    let dev = ScriptedScsi::accepting(&[ATA_PASS_THROUGH_16]);
    let seen = dev.seen.clone();
    let mut smart = GenericSmart::new(Box::new(SatChannel::new(dev, TIMEOUT)));

    assert!(smart.update());
    assert!(smart.update());
    assert!(smart.last_update());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![ATA_PASS_THROUGH_12, ATA_PASS_THROUGH_16, ATA_PASS_THROUGH_16]
    );
}

#[test]
fn chosen_mode_is_not_reprobed_after_a_failure() {
    let dev = ScriptedScsi::accepting(&[ATA_PASS_THROUGH_16]);
    let seen = dev.seen.clone();
    let accept = dev.accept.clone();
    let mut chan = SatChannel::new(dev, TIMEOUT);
    let mut buf = [0u8; SMART_DATA_LEN];

    chan.read_smart_data(&mut buf).unwrap();
    assert!(chan.use16());

    accept.lock().unwrap().clear();
    assert!(chan.read_smart_data(&mut buf).is_err());
    assert!(chan.use16());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![ATA_PASS_THROUGH_12, ATA_PASS_THROUGH_16, ATA_PASS_THROUGH_16]
    );
}

#[test]
fn total_refusal_leaves_mode_undecided() {
    let dev = ScriptedScsi::accepting(&[]);
    let seen = dev.seen.clone();
    let accept = dev.accept.clone();
    let mut chan = SatChannel::new(dev, TIMEOUT);
    let mut buf = [0u8; SMART_DATA_LEN];

    assert!(chan.read_smart_data(&mut buf).is_err());
    assert_eq!(chan.mode(), AtaPassthroughMode::Probing);

    accept.lock().unwrap().insert(ATA_PASS_THROUGH_16);
    chan.read_smart_data(&mut buf).unwrap();
    assert_eq!(chan.mode(), AtaPassthroughMode::Pt16);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![ATA_PASS_THROUGH_12, ATA_PASS_THROUGH_16, ATA_PASS_THROUGH_12, ATA_PASS_THROUGH_16]
    );
}

#[test]
fn refused_first_read_fails_the_update() {
    let dev = ScriptedScsi::accepting(&[]);
    let mut smart = GenericSmart::new(Box::new(SatChannel::new(dev, TIMEOUT)));

    assert!(!smart.update());
    assert!(!smart.last_update());
    assert!(smart.supported_ids().is_empty());
}

#[test]
fn response_flows_into_attribute_lookup() {
    let dev = ScriptedScsi::accepting(&[ATA_PASS_THROUGH_12]);
    let mut smart = GenericSmart::new(Box::new(SatChannel::new(dev, TIMEOUT)));
    assert!(smart.update());

    assert_eq!(
        smart.supported_ids(),
        vec![SmartId::REALLOCATED_SECTOR_COUNT, SmartId::POWER_ON_HOURS, SmartId::TEMPERATURE]
    );
    let poh = smart.attribute(SmartId::POWER_ON_HOURS).unwrap();
    assert_eq!(poh.raw_value, 0x5210);
    assert_eq!(poh.current, 71);
    assert!(smart.attribute(SmartId::OFFLINE_UNCORRECTABLE).is_none());
}

#[test]
fn closing_releases_the_device_once() {
    let dev = ScriptedScsi::accepting(&[ATA_PASS_THROUGH_12]);
    let released = dev.released.clone();
    let mut smart = GenericSmart::new(Box::new(SatChannel::new(dev, TIMEOUT)));

    smart.close();
    smart.close();
    drop(smart);
    assert_eq!(released.count(), 1);
}
