//! Disk identity from sysfs and the udev database.

use crate::bus::{classify_linux, BusType};
use crate::models::disk::{DeviceRecord, PartitionInfo};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Where the kernel and udev publish device state. Tests point these at a
/// temporary tree.
#[derive(Debug, Clone)]
pub struct Roots {
    pub sys:  PathBuf,
    pub dev:  PathBuf,
    pub proc: PathBuf,
    pub udev: PathBuf,
}

impl Default for Roots {
    fn default() -> Self {
        Self {
            sys:  PathBuf::from("/sys"),
            dev:  PathBuf::from("/dev"),
            proc: PathBuf::from("/proc"),
            udev: PathBuf::from("/run/udev/data"),
        }
    }
}

impl Roots {
    fn block(&self, name: &str) -> PathBuf {
        self.sys.join("block").join(name)
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_u64(path: &Path) -> u64 {
    read_trimmed(path).and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Names under `/sys/block` backed by real hardware, sorted so discovery
/// order is stable across runs.
pub fn block_devices(roots: &Roots) -> Vec<String> {
    let entries = match fs::read_dir(roots.sys.join("block")) {
        Ok(e)  => e,
        Err(_) => return Vec::new(),
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| roots.block(name).join("device").exists())
        .collect();
    names.sort();
    names
}

/// Identity and geometry for one whole disk. `None` when sysfs has nothing for it.
pub fn read_record(roots: &Roots, name: &str) -> Option<DeviceRecord> {
    let block = roots.block(name);
    let device = block.join("device");
    if !device.exists() {
        return None;
    }

    let transport = transport(roots, name);
    let bus_type = classify_linux(&transport);
    let udev = udev_properties(roots, name);

    let model = read_trimmed(&device.join("model"))
        .or_else(|| udev.get("ID_MODEL").map(|m| m.replace('_', " ")))
        .unwrap_or_default();
    let vendor = read_trimmed(&device.join("vendor"))
        .or_else(|| udev.get("ID_VENDOR").cloned())
        .unwrap_or_default();
    let firmware = read_trimmed(&device.join("firmware_rev"))
        .or_else(|| read_trimmed(&device.join("rev")))
        .or_else(|| udev.get("ID_REVISION").cloned())
        .unwrap_or_default();
    let serial = read_trimmed(&device.join("serial"))
        .or_else(|| fs::read(device.join("vpd_pg80")).ok().and_then(|b| unit_serial(&b)))
        .or_else(|| udev.get("ID_SERIAL_SHORT").cloned())
        .unwrap_or_default();

    let removable = read_trimmed(&block.join("removable")).as_deref() == Some("1");
    let ejectable = removable || matches!(bus_type, BusType::Usb | BusType::Ieee1394 | BusType::Mmc | BusType::Sd);

    Some(DeviceRecord {
        name:                name.to_string(),
        device_path:         roots.dev.join(name).to_string_lossy().into_owned(),
        model,
        vendor,
        serial,
        firmware,
        logical_block_size:  read_u64(&block.join("queue/logical_block_size")) as u32,
        physical_block_size: read_u64(&block.join("queue/physical_block_size")) as u32,
        size:                read_u64(&block.join("size")).saturating_mul(512),
        removable,
        ejectable,
        bus_type,
        bus_location:        bus_location(roots, &device),
        content_type:        udev.get("ID_PART_TABLE_TYPE").cloned().unwrap_or_default(),
        io_stats:            None,
    })
}

/// Serial number from a SCSI Unit Serial Number VPD page (0x80).
pub fn unit_serial(page: &[u8]) -> Option<String> {
    if page.len() < 4 || page[1] != 0x80 {
        return None;
    }
    let len = page[3] as usize;
    let raw = page.get(4..4 + len).unwrap_or(&page[4..]);
    let s = String::from_utf8_lossy(raw).trim_matches(|c: char| c.is_whitespace() || c == '\0').to_string();
    if s.is_empty() { None } else { Some(s) }
}

fn bus_location(roots: &Roots, device: &Path) -> String {
    let resolved = match fs::canonicalize(device) {
        Ok(p)  => p,
        Err(_) => return String::new(),
    };
    let devices = roots.sys.join("devices");
    let devices = fs::canonicalize(&devices).unwrap_or(devices);
    resolved
        .strip_prefix(&devices)
        .unwrap_or(&resolved)
        .to_string_lossy()
        .into_owned()
}

/// Transport name in `lsblk -o TRAN` vocabulary, inferred from where the disk
/// hangs in the device tree and which SCSI host driver owns it.
pub fn transport(roots: &Roots, name: &str) -> String {
    let path = match fs::canonicalize(roots.block(name)) {
        Ok(p)  => p,
        Err(_) => return String::new(),
    };

    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _                    => None,
        })
        .collect();

    if name.starts_with("nvme") || any_part(&parts, |p| p.starts_with("nvme")) {
        return "nvme".into();
    }
    if any_part(&parts, |p| p.starts_with("usb")) {
        return "usb".into();
    }
    if any_part(&parts, |p| p.starts_with("virtio")) {
        return "virtio".into();
    }
    if any_part(&parts, |p| p == "mmc_host") || name.starts_with("mmcblk") {
        return "mmc".into();
    }

    if let Some(proc_name) = scsi_host_driver(&path, &parts) {
        let t = match proc_name.as_str() {
            "ahci"                                   => "sata",
            p if p.starts_with("sata")               => "sata",
            p if p.starts_with("pata") || p.starts_with("ata_") => "ata",
            "usb-storage" | "uas"                    => "usb",
            "mpt2sas" | "mpt3sas" | "hisi_sas" | "pm80xx" | "isci" | "mvsas" => "sas",
            "iscsi_tcp"                              => "iscsi",
            "qla2xxx" | "lpfc"                       => "fc",
            "ufshcd"                                 => "ufs",
            _                                        => "",
        };
        if !t.is_empty() {
            return t.into();
        }
    }

    if any_part(&parts, |p| is_numbered(p, "ata")) {
        return "sata".into();
    }
    if any_part(&parts, |p| is_numbered(p, "host")) {
        return "scsi".into();
    }
    String::new()
}

fn any_part(parts: &[String], pred: impl Fn(&str) -> bool) -> bool {
    parts.iter().any(|p| pred(p.as_str()))
}

fn is_numbered(part: &str, prefix: &str) -> bool {
    part.strip_prefix(prefix)
        .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// `proc_name` of the SCSI host above the disk, if there is one.
fn scsi_host_driver(path: &Path, parts: &[String]) -> Option<String> {
    let host = parts.iter().find(|p| is_numbered(p, "host"))?;
    let mut host_dir = PathBuf::from("/");
    for p in path.components().skip(1) {
        host_dir.push(p);
        if host_dir.file_name().map(|f| f == host.as_str()).unwrap_or(false) {
            break;
        }
    }
    read_trimmed(&host_dir.join("scsi_host").join(host).join("proc_name"))
}

/// `E:KEY=VALUE` lines of the udev database entry for the disk.
pub fn udev_properties(roots: &Roots, name: &str) -> HashMap<String, String> {
    let dev = match read_trimmed(&roots.block(name).join("dev")) {
        Some(d) => d,
        None    => return HashMap::new(),
    };
    let content = match fs::read_to_string(roots.udev.join(format!("b{}", dev))) {
        Ok(c)  => c,
        Err(_) => return HashMap::new(),
    };
    parse_udev(&content)
}

pub fn parse_udev(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.strip_prefix("E:"))
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Partitions of `disk`, with mount points from `/proc/mounts`.
pub fn partitions(roots: &Roots, disk: &str) -> Vec<PartitionInfo> {
    let entries = match fs::read_dir(roots.block(disk)) {
        Ok(e)  => e,
        Err(_) => return Vec::new(),
    };
    let mounts = parse_mounts(roots);

    let mut parts: Vec<PartitionInfo> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let dir = e.path();
            let index = read_trimmed(&dir.join("partition"))?.parse().ok()?;
            let name = e.file_name().to_string_lossy().into_owned();
            let device_path = roots.dev.join(&name).to_string_lossy().into_owned();
            Some(PartitionInfo {
                index,
                mount_point: mounts.get(&device_path).cloned(),
                offset: read_u64(&dir.join("start")).saturating_mul(512),
                size:   read_u64(&dir.join("size")).saturating_mul(512),
                name,
                device_path,
            })
        })
        .collect();
    parts.sort_by_key(|p| p.index);
    parts
}

/// Mount source → first mount point.
fn parse_mounts(roots: &Roots) -> HashMap<String, String> {
    let content = fs::read_to_string(roots.proc.join("mounts")).unwrap_or_default();
    let mut map = HashMap::new();
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 { continue; }
        map.entry(fields[0].to_string()).or_insert_with(|| fields[1].replace("\\040", " "));
    }
    map
}
