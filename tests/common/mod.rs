// Shared test helpers: scripted devices and an in-memory provider.
#![allow(dead_code)]

use diskinfo::codec::ata::{ATTRIBUTE_LEN, ATTRIBUTE_TABLE_OFFSET, SMART_DATA_LEN};
use diskinfo::codec::nvme::HEALTH_LOG_LEN;
use diskinfo::smart::{AtaChannel, NvmeChannel, ScsiDevice};
use diskinfo::{Backend, BusType, DeviceProvider, DeviceRecord, Result, SmartError};
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One attribute slot: id, flags, current, worst, six raw bytes (low first).
pub type Slot = (u8, u16, u8, u8, [u8; 6]);

pub fn smart_buffer(slots: &[Slot]) -> [u8; SMART_DATA_LEN] {
    let mut buf = [0u8; SMART_DATA_LEN];
    for (i, (id, flags, cur, worst, raw)) in slots.iter().enumerate() {
        let at = ATTRIBUTE_TABLE_OFFSET + i * ATTRIBUTE_LEN;
        buf[at] = *id;
        buf[at + 1..at + 3].copy_from_slice(&flags.to_le_bytes());
        buf[at + 3] = *cur;
        buf[at + 4] = *worst;
        buf[at + 5..at + 11].copy_from_slice(raw);
    }
    buf
}

pub fn sample_smart_data() -> [u8; SMART_DATA_LEN] {
    smart_buffer(&[
        (5,   0x0033, 200, 200, [0, 0, 0, 0, 0, 0]),
        (9,   0x0032, 71,  71,  [0x10, 0x52, 0, 0, 0, 0]),
        (194, 0x0022, 113, 98,  [37, 0, 18, 0, 45, 0]),
    ])
}

pub fn nvme_page(temperature_kelvin: u16, percentage_used: u8, media_errors: u64) -> [u8; HEALTH_LOG_LEN] {
    let mut page = [0u8; HEALTH_LOG_LEN];
    page[1..3].copy_from_slice(&temperature_kelvin.to_le_bytes());
    page[3] = 100;
    page[4] = 10;
    page[5] = percentage_used;
    page[160..168].copy_from_slice(&media_errors.to_le_bytes());
    page
}

// ── SCSI ─────────────────────────────────────────────────────────────────────

/// Counts every `close()` call that actually releases something.
#[derive(Clone, Default)]
pub struct Releases(Arc<AtomicU32>);

impl Releases {
    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A shared on/off switch the test flips while a session owns the channel.
#[derive(Clone, Default)]
pub struct Switch(Arc<AtomicBool>);

impl Switch {
    pub fn set(&self, on: bool) {
        self.0.store(on, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A SCSI target that accepts only the CDB opcodes it is told to, and
/// records every opcode it sees.
pub struct ScriptedScsi {
    pub accept:   Arc<Mutex<HashSet<u8>>>,
    pub seen:     Arc<Mutex<Vec<u8>>>,
    pub response: [u8; SMART_DATA_LEN],
    pub released: Releases,
    open:         bool,
}

impl ScriptedScsi {
    pub fn accepting(opcodes: &[u8]) -> Self {
        Self {
            accept:   Arc::new(Mutex::new(opcodes.iter().copied().collect())),
            seen:     Arc::default(),
            response: sample_smart_data(),
            released: Releases::default(),
            open:     true,
        }
    }
}

impl ScsiDevice for ScriptedScsi {
    fn execute_in(&mut self, cdb: &[u8], data: &mut [u8], _timeout: Duration) -> Result<()> {
        self.seen.lock().unwrap().push(cdb[0]);
        if !self.accept.lock().unwrap().contains(&cdb[0]) {
            return Err(SmartError::CommandRejected { op: "scripted", status: 0x02 });
        }
        data.copy_from_slice(&self.response[..data.len()]);
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.released.bump();
        }
    }
}

// ── ATA / NVMe channels ──────────────────────────────────────────────────────

pub struct MockAta {
    pub data:     Arc<Mutex<[u8; SMART_DATA_LEN]>>,
    pub fail:     Switch,
    pub released: Releases,
    open:         bool,
}

impl MockAta {
    pub fn new(data: [u8; SMART_DATA_LEN]) -> Self {
        Self {
            data:     Arc::new(Mutex::new(data)),
            fail:     Switch::default(),
            released: Releases::default(),
            open:     true,
        }
    }
}

impl AtaChannel for MockAta {
    fn read_smart_data(&mut self, buf: &mut [u8; SMART_DATA_LEN]) -> Result<()> {
        if self.fail.get() {
            return Err(SmartError::CommandRejected { op: "mock ata", status: 1 });
        }
        buf.copy_from_slice(&*self.data.lock().unwrap());
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.released.bump();
        }
    }
}

pub struct MockNvme {
    pub page:     Arc<Mutex<[u8; HEALTH_LOG_LEN]>>,
    pub fail:     Switch,
    pub released: Releases,
    open:         bool,
}

impl MockNvme {
    pub fn new(page: [u8; HEALTH_LOG_LEN]) -> Self {
        Self {
            page:     Arc::new(Mutex::new(page)),
            fail:     Switch::default(),
            released: Releases::default(),
            open:     true,
        }
    }
}

impl NvmeChannel for MockNvme {
    fn read_health_log(&mut self, buf: &mut [u8; HEALTH_LOG_LEN]) -> Result<()> {
        if self.fail.get() {
            return Err(SmartError::CommandRejected { op: "mock nvme", status: 1 });
        }
        buf.copy_from_slice(&*self.page.lock().unwrap());
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.released.bump();
        }
    }
}

// ── Provider ─────────────────────────────────────────────────────────────────

pub fn record(name: &str, bus_type: BusType) -> DeviceRecord {
    DeviceRecord {
        name:               name.to_string(),
        device_path:        format!("/dev/{}", name),
        model:              format!("Mock {}", name),
        logical_block_size: 512,
        size:               1 << 30,
        bus_type,
        ..DeviceRecord::default()
    }
}

/// In-memory devices. Every channel it hands out shares `released`, and every
/// open attempt is counted in `opens`.
#[derive(Default)]
pub struct MockProvider {
    pub records:    Vec<DeviceRecord>,
    /// Names whose open call fails outright.
    pub open_fails: HashSet<String>,
    /// USB bridges that do not pass SMART through.
    pub dead_usb:   HashSet<String>,
    /// ATA devices whose first read fails.
    pub ata_fails:  HashSet<String>,
    pub released:   Releases,
    pub opens:      Rc<Cell<u32>>,
}

impl MockProvider {
    pub fn with(records: Vec<DeviceRecord>) -> Self {
        Self { records, ..Self::default() }
    }

    fn check_open(&self, record: &DeviceRecord) -> Result<()> {
        self.opens.set(self.opens.get() + 1);
        if self.open_fails.contains(&record.name) {
            return Err(SmartError::Open {
                path:   record.device_path.clone(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        Ok(())
    }

    fn ata(&self, fail: bool) -> MockAta {
        let mut ata = MockAta::new(sample_smart_data());
        ata.released = self.released.clone();
        ata.fail.set(fail);
        ata
    }
}

impl DeviceProvider for MockProvider {
    fn backend(&self) -> Backend {
        Backend::Mock
    }

    fn discover(&self) -> Vec<DeviceRecord> {
        self.records.clone()
    }

    fn open_ata(&self, record: &DeviceRecord, _timeout: Duration) -> Result<Box<dyn AtaChannel>> {
        self.check_open(record)?;
        Ok(Box::new(self.ata(self.ata_fails.contains(&record.name))))
    }

    fn open_usb_ata(&self, record: &DeviceRecord, _timeout: Duration) -> Result<Box<dyn AtaChannel>> {
        self.check_open(record)?;
        Ok(Box::new(self.ata(self.dead_usb.contains(&record.name))))
    }

    fn open_nvme(&self, record: &DeviceRecord, _timeout: Duration) -> Result<Box<dyn NvmeChannel>> {
        self.check_open(record)?;
        let mut nvme = MockNvme::new(nvme_page(310, 3, 0));
        nvme.released = self.released.clone();
        Ok(Box::new(nvme))
    }
}
