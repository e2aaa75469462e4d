use crate::config::Config;
use crate::health::{self, HealthStatus};
use crate::models::disk::DiskInfo;
use crate::smart::{Smart, SmartGeneric, SmartSession};
use crate::util::human::{fmt_bytes, fmt_temp, or_dash};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub attributes: bool,
    pub partitions: bool,
}

/// Generate a human-readable disk report to a String.
pub fn generate(disks: &[DiskInfo], cfg: &Config, opts: ReportOptions) -> String {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let mut out = String::new();

    out.push_str("═══════════════════════════════════════════════\n");
    out.push_str(&format!("  Disk Report — {}\n", now));
    out.push_str("═══════════════════════════════════════════════\n\n");

    out.push_str(&format!("── Physical Disks ({}) ─────────────────────────\n", disks.len()));
    if disks.is_empty() {
        out.push_str("  (none found)\n\n");
    }

    for disk in disks {
        let status = health::assess(&disk.smart);
        out.push_str(&format!(
            "  #{:<2} {:10}  {:6}  SMART:{:4} {:8}  Temp:{:6}  Cap:{:10}  {}\n",
            disk.index,
            cfg.display_name(&disk.name),
            disk.bus_type.label(),
            disk.smart_type().label(),
            status.label(),
            fmt_temp(health::temperature(&disk.smart)),
            fmt_bytes(disk.size),
            or_dash(&disk.model),
        ));
        out.push_str(&format!(
            "      Path: {}  Serial: {}  Firmware: {}\n",
            disk.device_path, or_dash(&disk.serial), or_dash(&disk.firmware),
        ));
        out.push_str(&format!(
            "      Sectors: {}/{} B  Removable: {}  Content: {}  Location: {}\n",
            disk.logical_block_size,
            disk.physical_block_size,
            if disk.removable { "yes" } else { "no" },
            or_dash(&disk.content_type),
            or_dash(&disk.bus_location),
        ));

        if let Some(nvme) = disk.smart.as_nvme().filter(|_| status != HealthStatus::Unknown) {
            out.push_str(&format!(
                "      Endurance: {}% used  |  Spare: {}%  |  Written: {}  |  POH: {} h  |  Media errors: {}\n",
                nvme.percentage_used(),
                nvme.available_spare(),
                fmt_bytes(nvme.bytes_written()),
                nvme.power_on_hours(),
                nvme.media_errors(),
            ));
        }

        if opts.attributes {
            if let Some(ata) = disk.smart.as_generic().filter(|_| disk.smart.last_update()) {
                out.push_str(&format!(
                    "      {:>3} {:<28} {:>4} {:>5} {:>4} {:>14}\n",
                    "ID", "Attribute", "Flag", "Value", "Wrst", "Raw",
                ));
                for a in ata.attributes() {
                    out.push_str(&format!(
                        "      {:>3} {:<28} {:>4} {:>5} {:>4} {:>14}\n",
                        a.id.0, a.name(), if a.is_prefail() { "P" } else { "-" }, a.current, a.worst, a.raw_value,
                    ));
                }
            }
        }

        if opts.partitions {
            for p in disk.partitions() {
                out.push_str(&format!(
                    "      └ {:<14} {:>10}  @{:<14} {}\n",
                    p.name,
                    fmt_bytes(p.size),
                    p.offset,
                    p.mount_point.as_deref().unwrap_or(""),
                ));
            }
        }
        out.push('\n');
    }

    out.push_str("═══════════════════════════════════════════════\n");
    out
}

/// One-shot machine-readable snapshot.
pub fn json_snapshot(disks: &[DiskInfo], cfg: &Config) -> Value {
    let disks: Vec<Value> = disks.iter().map(|d| {
        json!({
            "index":               d.index,
            "name":                d.name,
            "alias":               cfg.devices.aliases.get(&d.name),
            "device_path":         d.device_path,
            "model":               d.model,
            "vendor":              d.vendor,
            "serial":              d.serial,
            "firmware":            d.firmware,
            "size":                d.size,
            "size_hr":             fmt_bytes(d.size),
            "logical_block_size":  d.logical_block_size,
            "physical_block_size": d.physical_block_size,
            "removable":           d.removable,
            "ejectable":           d.ejectable,
            "bus_type":            d.bus_type,
            "bus_location":        d.bus_location,
            "content_type":        d.content_type,
            "backend":             d.backend,
            "io_stats":            d.io_stats,
            "smart":               smart_json(&d.smart),
        })
    }).collect();

    json!({
        "diskinfo_version": env!("CARGO_PKG_VERSION"),
        "timestamp":        chrono::Local::now().to_rfc3339(),
        "disks":            disks,
    })
}

fn smart_json(smart: &Smart) -> Value {
    let base = json!({
        "type":        smart.smart_type(),
        "last_update": smart.last_update(),
        "status":      health::assess(smart),
        "score":       health::score(smart),
        "temperature": health::temperature(smart),
    });
    if !smart.last_update() {
        return base;
    }

    let detail = match smart {
        Smart::Generic(s) => json!({
            "attributes": s.attributes().iter().map(|a| json!({
                "id":        a.id,
                "name":      a.name(),
                "flags":     a.flags,
                "value":     a.current,
                "worst":     a.worst,
                "raw_value": a.raw_value,
                "prefail":   a.is_prefail(),
            })).collect::<Vec<_>>(),
            "supported_ids": s.supported_ids(),
        }),
        Smart::Nvme(s) => json!({
            "health_log": s.health(),
            "bytes_read": s.bytes_read(),
            "bytes_written": s.bytes_written(),
        }),
        Smart::Unsupported(_) => Value::Null,
    };

    match (base, detail) {
        (Value::Object(mut b), Value::Object(d)) => {
            b.extend(d);
            Value::Object(b)
        }
        (b, _) => b,
    }
}
